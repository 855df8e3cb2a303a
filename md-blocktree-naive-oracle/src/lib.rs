//! A naive, simple oracle implementation for differential testing.
//!
//! Blocks are plain nested vectors with no links and no index; every query
//! searches the whole tree.
use md_blocktree::{BlockId, BlockKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: BlockId,
    pub kind: BlockKind,
    pub editable: bool,
    pub children: Vec<Node>,
}

impl Node {
    fn contains(&self, id: BlockId) -> bool {
        self.children
            .iter()
            .any(|child| child.id == id || child.contains(id))
    }

    fn preorder(&self, out: &mut Vec<BlockId>) {
        out.push(self.id);
        for child in &self.children {
            child.preorder(out);
        }
    }

    fn stops(&self, out: &mut Vec<BlockId>) {
        let navigable = self.editable && !matches!(self.kind, BlockKind::TaskCheckbox { .. });
        if !navigable {
            return;
        }
        if self.kind.is_caret_host() {
            out.push(self.id);
            return;
        }
        for child in &self.children {
            child.stops(out);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    Missing,
    Unplaced,
    Cycle,
    Leaf,
}

#[derive(Debug, Default, Clone)]
pub struct Tree {
    roots: Vec<Node>,
    /// Subtrees not reachable from the roots.
    loose: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, id: BlockId, kind: BlockKind) {
        let editable = !matches!(kind, BlockKind::TaskCheckbox { .. });
        self.loose.push(Node {
            id,
            kind,
            editable,
            children: Vec::new(),
        });
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.find(id).is_some()
    }

    pub fn push_root(&mut self, block: BlockId) -> Result<(), Rejected> {
        let node = self.take(block).ok_or(Rejected::Missing)?;
        self.roots.push(node);
        Ok(())
    }

    pub fn insert_before(&mut self, new: BlockId, anchor: BlockId) -> Result<(), Rejected> {
        self.check_placement(new, anchor)?;
        let node = self.take(new).ok_or(Rejected::Missing)?;
        let (list, index) = self.locate_mut(anchor).ok_or(Rejected::Unplaced)?;
        list.insert(index, node);
        Ok(())
    }

    pub fn insert_after(&mut self, new: BlockId, anchor: BlockId) -> Result<(), Rejected> {
        self.check_placement(new, anchor)?;
        let node = self.take(new).ok_or(Rejected::Missing)?;
        let (list, index) = self.locate_mut(anchor).ok_or(Rejected::Unplaced)?;
        list.insert(index + 1, node);
        Ok(())
    }

    pub fn append_child(&mut self, parent: BlockId, block: BlockId) -> Result<(), Rejected> {
        self.check_child(parent, block)?;
        let node = self.take(block).ok_or(Rejected::Missing)?;
        let parent = self.find_mut(parent).ok_or(Rejected::Missing)?;
        parent.children.push(node);
        Ok(())
    }

    pub fn prepend_child(&mut self, parent: BlockId, block: BlockId) -> Result<(), Rejected> {
        self.check_child(parent, block)?;
        let node = self.take(block).ok_or(Rejected::Missing)?;
        let parent = self.find_mut(parent).ok_or(Rejected::Missing)?;
        parent.children.insert(0, node);
        Ok(())
    }

    pub fn replace(&mut self, new: BlockId, old: BlockId) -> Result<(), Rejected> {
        self.check_placement(new, old)?;
        let node = self.take(new).ok_or(Rejected::Missing)?;
        let (list, index) = self.locate_mut(old).ok_or(Rejected::Unplaced)?;
        let old_node = std::mem::replace(&mut list[index], node);
        self.loose.push(old_node);
        Ok(())
    }

    /// Removes a subtree, returning its ids in pre-order.
    pub fn remove(&mut self, id: BlockId) -> Result<Vec<BlockId>, Rejected> {
        let node = self.take(id).ok_or(Rejected::Missing)?;
        let mut removed = Vec::new();
        node.preorder(&mut removed);
        Ok(removed)
    }

    pub fn document_order(&self) -> Vec<BlockId> {
        let mut out = Vec::new();
        for root in &self.roots {
            root.preorder(&mut out);
        }
        out
    }

    pub fn parent(&self, id: BlockId) -> Option<BlockId> {
        self.all_nodes()
            .find(|node| node.children.iter().any(|child| child.id == id))
            .map(|node| node.id)
    }

    pub fn children(&self, id: BlockId) -> Vec<BlockId> {
        self.find(id)
            .map(|node| node.children.iter().map(|child| child.id).collect())
            .unwrap_or_default()
    }

    pub fn preceding(&self, id: BlockId) -> Option<BlockId> {
        let (list, index) = self.locate(id)?;
        index.checked_sub(1).map(|i| list[i].id)
    }

    pub fn following(&self, id: BlockId) -> Option<BlockId> {
        let (list, index) = self.locate(id)?;
        list.get(index + 1).map(|node| node.id)
    }

    pub fn preceding_leaf(&self, id: BlockId) -> Option<BlockId> {
        let mut current = Some(id);
        while let Some(at) = current {
            if let Some((list, index)) = self.locate(at) {
                for sibling in list[..index].iter().rev() {
                    let mut stops = Vec::new();
                    sibling.stops(&mut stops);
                    if let Some(last) = stops.last() {
                        return Some(*last);
                    }
                }
            }
            current = self.parent(at);
        }
        None
    }

    pub fn following_leaf(&self, id: BlockId) -> Option<BlockId> {
        let mut current = Some(id);
        while let Some(at) = current {
            if let Some((list, index)) = self.locate(at) {
                for sibling in &list[index + 1..] {
                    let mut stops = Vec::new();
                    sibling.stops(&mut stops);
                    if let Some(first) = stops.first() {
                        return Some(*first);
                    }
                }
            }
            current = self.parent(at);
        }
        None
    }

    fn check_placement(&self, new: BlockId, anchor: BlockId) -> Result<(), Rejected> {
        let new_node = self.find(new).ok_or(Rejected::Missing)?;
        self.find(anchor).ok_or(Rejected::Missing)?;
        if self.locate(anchor).is_none() {
            return Err(Rejected::Unplaced);
        }
        if new == anchor || new_node.contains(anchor) {
            return Err(Rejected::Cycle);
        }
        Ok(())
    }

    fn check_child(&self, parent: BlockId, block: BlockId) -> Result<(), Rejected> {
        let block_node = self.find(block).ok_or(Rejected::Missing)?;
        let parent_node = self.find(parent).ok_or(Rejected::Missing)?;
        if parent_node.kind.is_leaf() {
            return Err(Rejected::Leaf);
        }
        if block == parent || block_node.contains(parent) {
            return Err(Rejected::Cycle);
        }
        Ok(())
    }

    fn all_nodes(&self) -> impl Iterator<Item = &Node> {
        let mut stack: Vec<&Node> = self.roots.iter().chain(self.loose.iter()).collect();
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter());
            Some(node)
        })
    }

    fn find(&self, id: BlockId) -> Option<&Node> {
        self.all_nodes().find(|node| node.id == id)
    }

    fn find_mut(&mut self, id: BlockId) -> Option<&mut Node> {
        fn search(list: &mut [Node], id: BlockId) -> Option<&mut Node> {
            for node in list {
                if node.id == id {
                    return Some(node);
                }
                if let Some(found) = search(&mut node.children, id) {
                    return Some(found);
                }
            }
            None
        }
        if let Some(found) = search(&mut self.roots, id) {
            return Some(found);
        }
        search(&mut self.loose, id)
    }

    /// The sibling list holding `id` and its index there. Top-level loose
    /// subtrees have no sibling list.
    fn locate(&self, id: BlockId) -> Option<(&[Node], usize)> {
        if let Some(index) = self.roots.iter().position(|node| node.id == id) {
            return Some((self.roots.as_slice(), index));
        }
        let parent = self
            .all_nodes()
            .find(|node| node.children.iter().any(|child| child.id == id))?;
        let index = parent.children.iter().position(|child| child.id == id)?;
        Some((parent.children.as_slice(), index))
    }

    fn locate_mut(&mut self, id: BlockId) -> Option<(&mut Vec<Node>, usize)> {
        fn search(list: &mut Vec<Node>, id: BlockId) -> Option<(&mut Vec<Node>, usize)> {
            for node in list.iter_mut() {
                if let Some(index) = node.children.iter().position(|child| child.id == id) {
                    return Some((&mut node.children, index));
                }
                if let Some(found) = search(&mut node.children, id) {
                    return Some(found);
                }
            }
            None
        }
        if let Some(index) = self.roots.iter().position(|node| node.id == id) {
            return Some((&mut self.roots, index));
        }
        if let Some(found) = search(&mut self.roots, id) {
            return Some(found);
        }
        search(&mut self.loose, id)
    }

    fn take(&mut self, id: BlockId) -> Option<Node> {
        fn take_from(list: &mut Vec<Node>, id: BlockId) -> Option<Node> {
            if let Some(index) = list.iter().position(|node| node.id == id) {
                return Some(list.remove(index));
            }
            list.iter_mut()
                .find_map(|node| take_from(&mut node.children, id))
        }
        if let Some(node) = take_from(&mut self.roots, id) {
            return Some(node);
        }
        take_from(&mut self.loose, id)
    }
}
