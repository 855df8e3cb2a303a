//! Serializable nested snapshots of a block tree.
//!
//! A parser hands its output to the store as a list of [`TreeNode`]s, and
//! the store can be dumped back to the same shape for inspection or
//! fixtures. Identifiers are not part of a snapshot; loading assigns fresh
//! ones.

use serde::{Deserialize, Serialize};

use crate::store::{
    Alignment, BlockId, BlockKind, BlockStore, CodeVariant, HeadingStyle, MAX_DEPTH, StoreError,
};

#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("invalid tree json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0} blocks cannot carry text")]
    TextOnContainer(&'static str),
    #[error("tree nesting exceeds {MAX_DEPTH} levels")]
    TooDeep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// Falls back to the kind's default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<bool>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub temp: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            text: String::new(),
            editable: None,
            temp: false,
            children: Vec::new(),
        }
    }

    pub fn leaf(kind: BlockKind, text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::new(kind)
        }
    }

    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = children;
        self
    }

    pub fn push(mut self, child: TreeNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn non_editable(mut self) -> Self {
        self.editable = Some(false);
        self
    }

    /// Paragraph with one span per line of `text`.
    pub fn paragraph(text: &str) -> Self {
        Self::new(BlockKind::Paragraph).with_children(
            text.split('\n')
                .map(|line| Self::leaf(BlockKind::TextSpan, line))
                .collect(),
        )
    }

    pub fn heading(level: u8, text: &str) -> Self {
        Self::leaf(
            BlockKind::Heading {
                level,
                style: HeadingStyle::Atx,
            },
            text,
        )
    }

    pub fn setext_heading(level: u8, text: &str, marker: &str) -> Self {
        Self::leaf(
            BlockKind::Heading {
                level,
                style: HeadingStyle::Setext {
                    marker: marker.to_string(),
                },
            },
            text,
        )
    }

    pub fn thematic_break() -> Self {
        Self::leaf(BlockKind::ThematicBreak, "---")
    }

    pub fn quote(children: Vec<TreeNode>) -> Self {
        Self::new(BlockKind::BlockQuote).with_children(children)
    }

    pub fn ordered_list(start: u64, delimiter: char, items: Vec<TreeNode>) -> Self {
        Self::new(BlockKind::OrderedList { start, delimiter }).with_children(items)
    }

    pub fn unordered_list(bullet: char, items: Vec<TreeNode>) -> Self {
        Self::new(BlockKind::UnorderedList { bullet }).with_children(items)
    }

    pub fn list_item(loose: bool, children: Vec<TreeNode>) -> Self {
        Self::new(BlockKind::ListItem { loose }).with_children(children)
    }

    pub fn task_item(checked: bool, loose: bool, children: Vec<TreeNode>) -> Self {
        let mut all = vec![Self::new(BlockKind::TaskCheckbox { checked })];
        all.extend(children);
        Self::list_item(loose, all)
    }

    pub fn code(variant: CodeVariant, lang: Option<&str>, content: &str) -> Self {
        Self::new(BlockKind::code(variant, lang)).with_children(
            content
                .split('\n')
                .map(|line| Self::leaf(BlockKind::CodeLine, line))
                .collect(),
        )
    }

    pub fn html(content: &str) -> Self {
        Self::new(BlockKind::HtmlBlock).push(Self::code(CodeVariant::Html, Some("html"), content))
    }

    pub fn math(content: &str) -> Self {
        Self::new(BlockKind::MathBlock).push(Self::code(CodeVariant::Math, None, content))
    }

    pub fn diagram(lang: &str, content: &str) -> Self {
        Self::new(BlockKind::DiagramBlock {
            lang: lang.to_string(),
        })
        .push(Self::code(CodeVariant::Diagram, Some(lang), content))
    }

    pub fn front_matter(content: &str) -> Self {
        Self::new(BlockKind::FrontMatter).push(Self::code(
            CodeVariant::FrontMatter,
            Some("yaml"),
            content,
        ))
    }

    /// Table figure; the first row becomes header cells.
    pub fn table(align: &[Alignment], rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .enumerate()
            .map(|(row_index, cells)| {
                Self::new(BlockKind::TableRow).with_children(
                    cells
                        .iter()
                        .enumerate()
                        .map(|(column, text)| {
                            let align = align.get(column).copied().unwrap_or_default();
                            let kind = if row_index == 0 {
                                BlockKind::TableCellHeader { align }
                            } else {
                                BlockKind::TableCellBody { align }
                            };
                            Self::leaf(kind, text)
                        })
                        .collect(),
                )
            })
            .collect();
        Self::new(BlockKind::TableFigure).with_children(rows)
    }
}

impl BlockStore {
    pub fn from_nodes(nodes: &[TreeNode]) -> Result<Self, TreeError> {
        let mut store = Self::new();
        store.append_nodes(None, nodes)?;
        Ok(store)
    }

    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        let nodes: Vec<TreeNode> = serde_json::from_str(json)?;
        Self::from_nodes(&nodes)
    }

    /// Builds `nodes` and attaches them under `parent`, or as top-level
    /// blocks when `parent` is `None`.
    pub fn append_nodes(
        &mut self,
        parent: Option<BlockId>,
        nodes: &[TreeNode],
    ) -> Result<Vec<BlockId>, TreeError> {
        let mut ids = Vec::with_capacity(nodes.len());
        for node in nodes {
            let id = self.build_node(node, 0)?;
            match parent {
                Some(parent) => self.append_child(parent, id)?,
                None => self.push_root(id)?,
            }
            ids.push(id);
        }
        Ok(ids)
    }

    /// Builds a detached subtree from a snapshot.
    pub fn build_node(&mut self, node: &TreeNode, depth: usize) -> Result<BlockId, TreeError> {
        if depth > MAX_DEPTH {
            return Err(TreeError::TooDeep);
        }
        if !node.text.is_empty() && !node.kind.is_text_bearing() {
            return Err(TreeError::TextOnContainer(node.kind.name()));
        }
        let id = self.create_with_text(node.kind.clone(), &node.text);
        if let Some(editable) = node.editable {
            self.set_editable(id, editable)?;
        }
        if node.temp {
            self.set_temp(id, true)?;
        }
        for child in &node.children {
            let child = self.build_node(child, depth + 1)?;
            self.append_child(id, child)?;
        }
        Ok(id)
    }

    pub fn to_nodes(&self) -> Vec<TreeNode> {
        self.roots()
            .iter()
            .filter_map(|root| self.snapshot(*root))
            .collect()
    }

    pub fn to_json(&self) -> Result<String, TreeError> {
        Ok(serde_json::to_string_pretty(&self.to_nodes())?)
    }

    /// Snapshot of the subtree rooted at `id`.
    pub fn snapshot(&self, id: BlockId) -> Option<TreeNode> {
        self.snapshot_at(id, 0)
    }

    fn snapshot_at(&self, id: BlockId, depth: usize) -> Option<TreeNode> {
        if depth > MAX_DEPTH {
            debug_assert!(false, "snapshot exceeds MAX_DEPTH");
            return None;
        }
        let block = self.get(id)?;
        let default_editable = !matches!(block.kind, BlockKind::TaskCheckbox { .. });
        Some(TreeNode {
            kind: block.kind.clone(),
            text: block.text.clone(),
            editable: (block.editable != default_editable).then_some(block.editable),
            temp: block.temp,
            children: block
                .children()
                .iter()
                .filter_map(|child| self.snapshot_at(*child, depth + 1))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_round_trips_through_store() {
        let nodes = vec![
            TreeNode::heading(1, "Title"),
            TreeNode::unordered_list(
                '*',
                vec![TreeNode::task_item(
                    true,
                    false,
                    vec![TreeNode::paragraph("done")],
                )],
            ),
            TreeNode::table(
                &[Alignment::Left, Alignment::Right],
                &[&["a", "b"], &["1", "2"]],
            ),
        ];
        let store = BlockStore::from_nodes(&nodes).unwrap();
        store.verify().unwrap();
        assert_eq!(store.to_nodes(), nodes);
    }

    #[test]
    fn test_json_fills_kind_defaults() {
        let json = r#"[
            {"type": "ordered-list", "children": [
                {"type": "list-item", "children": [
                    {"type": "task-checkbox"},
                    {"type": "paragraph", "children": [{"type": "text-span", "text": "x"}]}
                ]}
            ]}
        ]"#;
        let store = BlockStore::from_json(json).unwrap();
        let list = store.get(store.roots()[0]).unwrap();
        assert_eq!(
            list.kind,
            BlockKind::OrderedList {
                start: 1,
                delimiter: '.'
            }
        );
        let item = store.get(list.children()[0]).unwrap();
        let checkbox = store.get(item.children()[0]).unwrap();
        assert!(!checkbox.editable);
    }

    #[test]
    fn test_text_on_container_is_rejected() {
        let mut node = TreeNode::quote(vec![]);
        node.text = "stray".into();
        assert!(matches!(
            BlockStore::from_nodes(&[node]),
            Err(TreeError::TextOnContainer("blockquote"))
        ));
    }

    #[test]
    fn test_bad_json_is_reported() {
        assert!(matches!(
            BlockStore::from_json(r#"[{"type": "no-such-kind"}]"#),
            Err(TreeError::Json(_))
        ));
    }
}
