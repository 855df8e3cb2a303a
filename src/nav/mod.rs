//! Read-only traversal for caret movement.
//!
//! Every query is total: a missing block, an exhausted document or a tree
//! deeper than [`MAX_DEPTH`] all come back as `None`. The depth guard also
//! trips a `debug_assert!`, since only a malformed tree can reach it.

use crate::store::{BlockId, BlockStore, MAX_DEPTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    First,
    Last,
}

#[derive(Debug, Clone, Copy)]
pub struct Navigator<'a> {
    store: &'a BlockStore,
}

impl<'a> Navigator<'a> {
    pub fn new(store: &'a BlockStore) -> Self {
        Self { store }
    }

    /// First block in `id`'s subtree that can host the caret, skipping
    /// checkbox markers and non-editable children.
    pub fn first_editable_leaf(&self, id: BlockId) -> Option<BlockId> {
        self.edge_leaf(id, Edge::First, 0)
    }

    /// Last caret host in `id`'s subtree, skipping trailing non-editable
    /// children.
    pub fn last_editable_leaf(&self, id: BlockId) -> Option<BlockId> {
        self.edge_leaf(id, Edge::Last, 0)
    }

    /// Nearest caret host before `id` in document order, outside `id`'s own
    /// subtree.
    pub fn preceding_leaf_in_document(&self, id: BlockId) -> Option<BlockId> {
        let mut current = id;
        for _ in 0..=MAX_DEPTH {
            let block = self.store.get(current)?;
            let mut sibling = block.preceding();
            while let Some(candidate) = sibling {
                if let Some(leaf) = self.last_editable_leaf(candidate) {
                    return Some(leaf);
                }
                sibling = self.store.get(candidate)?.preceding();
            }
            current = block.parent()?;
        }
        debug_assert!(false, "ancestor walk exceeds MAX_DEPTH");
        None
    }

    /// Nearest caret host after `id` in document order, outside `id`'s own
    /// subtree.
    pub fn following_leaf_in_document(&self, id: BlockId) -> Option<BlockId> {
        let mut current = id;
        for _ in 0..=MAX_DEPTH {
            let block = self.store.get(current)?;
            let mut sibling = block.following();
            while let Some(candidate) = sibling {
                if let Some(leaf) = self.first_editable_leaf(candidate) {
                    return Some(leaf);
                }
                sibling = self.store.get(candidate)?.following();
            }
            current = block.parent()?;
        }
        debug_assert!(false, "ancestor walk exceeds MAX_DEPTH");
        None
    }

    /// Last caret host of the whole document.
    pub fn last_leaf_in_document(&self) -> Option<BlockId> {
        self.store
            .roots()
            .iter()
            .rev()
            .find_map(|root| self.last_editable_leaf(*root))
    }

    pub fn first_leaf_in_document(&self) -> Option<BlockId> {
        self.store
            .roots()
            .iter()
            .find_map(|root| self.first_editable_leaf(*root))
    }

    /// The caret block and every block enclosing it.
    pub fn active_blocks(&self, id: BlockId) -> Vec<BlockId> {
        self.store.ancestors(id)
    }

    fn edge_leaf(&self, id: BlockId, edge: Edge, depth: usize) -> Option<BlockId> {
        if depth > MAX_DEPTH {
            debug_assert!(false, "leaf descent exceeds MAX_DEPTH");
            return None;
        }
        let block = self.store.get(id)?;
        if !block.is_navigable() {
            return None;
        }
        if block.kind.is_caret_host() {
            return Some(id);
        }
        let children = block.children();
        match edge {
            Edge::First => children
                .iter()
                .find_map(|child| self.edge_leaf(*child, edge, depth + 1)),
            Edge::Last => children
                .iter()
                .rev()
                .find_map(|child| self.edge_leaf(*child, edge, depth + 1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeNode;

    #[test]
    fn test_task_checkbox_is_skipped() {
        let store = BlockStore::from_nodes(&[TreeNode::unordered_list(
            '-',
            vec![TreeNode::task_item(false, false, vec![TreeNode::paragraph("todo")])],
        )])
        .unwrap();
        let nav = Navigator::new(&store);
        let leaf = nav.first_editable_leaf(store.roots()[0]).unwrap();
        assert_eq!(store.get(leaf).unwrap().text, "todo");
    }

    #[test]
    fn test_non_editable_trailing_child_is_skipped() {
        let store = BlockStore::from_nodes(&[TreeNode::quote(vec![
            TreeNode::paragraph("kept"),
            TreeNode::paragraph("hidden").non_editable(),
        ])])
        .unwrap();
        let nav = Navigator::new(&store);
        let leaf = nav.last_editable_leaf(store.roots()[0]).unwrap();
        assert_eq!(store.get(leaf).unwrap().text, "kept");
    }

    #[test]
    fn test_empty_container_has_no_leaf() {
        let store = BlockStore::from_nodes(&[TreeNode::quote(vec![])]).unwrap();
        let nav = Navigator::new(&store);
        assert_eq!(nav.first_editable_leaf(store.roots()[0]), None);
        assert_eq!(nav.last_leaf_in_document(), None);
    }

    #[test]
    fn test_code_region_is_a_stop() {
        let store = BlockStore::from_nodes(&[
            TreeNode::paragraph("before"),
            TreeNode::math("x^2"),
        ])
        .unwrap();
        let nav = Navigator::new(&store);
        let first_span = nav.first_leaf_in_document().unwrap();
        let next = nav.following_leaf_in_document(first_span).unwrap();
        assert!(store.kind(next).unwrap().is_code_region());
        assert_eq!(nav.preceding_leaf_in_document(next), Some(first_span));
        assert_eq!(nav.following_leaf_in_document(next), None);
    }

    #[test]
    fn test_dangling_id_is_absent() {
        let store = BlockStore::new();
        let nav = Navigator::new(&store);
        let ghost = uuid::Uuid::new_v4();
        assert_eq!(nav.preceding_leaf_in_document(ghost), None);
        assert_eq!(nav.first_editable_leaf(ghost), None);
    }
}
