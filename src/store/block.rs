//! Block entity and its closed set of kinds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BlockId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Alignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeadingStyle {
    #[default]
    Atx,
    /// `marker` is the underline as written (`===`, `---`).
    Setext { marker: String },
}

/// Rendering sub-role of a code region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodeVariant {
    #[default]
    Fenced,
    Indented,
    FrontMatter,
    Html,
    Math,
    Diagram,
}

/// Cursor position inside an embedded code editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EditorPosition {
    pub line: usize,
    pub ch: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum BlockKind {
    Paragraph,
    Heading {
        level: u8,
        #[serde(default)]
        style: HeadingStyle,
    },
    ListItem {
        #[serde(default)]
        loose: bool,
    },
    OrderedList {
        #[serde(default = "default_start")]
        start: u64,
        #[serde(default = "default_delimiter")]
        delimiter: char,
    },
    UnorderedList {
        #[serde(default = "default_bullet")]
        bullet: char,
    },
    BlockQuote,
    TableFigure,
    TableRow,
    TableCellHeader {
        #[serde(default)]
        align: Alignment,
    },
    TableCellBody {
        #[serde(default)]
        align: Alignment,
    },
    CodeFence {
        #[serde(default)]
        variant: CodeVariant,
        #[serde(default)]
        lang: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        resume_at: Option<EditorPosition>,
    },
    CodeLine,
    HtmlBlock,
    FrontMatter,
    MathBlock,
    DiagramBlock {
        lang: String,
    },
    ThematicBreak,
    TaskCheckbox {
        #[serde(default)]
        checked: bool,
    },
    TextSpan,
}

fn default_start() -> u64 {
    1
}

fn default_delimiter() -> char {
    '.'
}

fn default_bullet() -> char {
    '-'
}

impl BlockKind {
    pub fn code(variant: CodeVariant, lang: Option<&str>) -> Self {
        BlockKind::CodeFence {
            variant,
            lang: lang.map(str::to_string),
            resume_at: None,
        }
    }

    /// Kinds whose `text` field is their content.
    pub fn is_text_bearing(&self) -> bool {
        matches!(
            self,
            BlockKind::TextSpan
                | BlockKind::Heading { .. }
                | BlockKind::ThematicBreak
                | BlockKind::TableCellHeader { .. }
                | BlockKind::TableCellBody { .. }
                | BlockKind::CodeLine
        )
    }

    /// Leaves that may never hold children.
    pub fn is_leaf(&self) -> bool {
        self.is_text_bearing() || matches!(self, BlockKind::TaskCheckbox { .. })
    }

    /// Blocks the caret can rest in. Code regions count even though they
    /// hold their lines as children; the embedded editor owns the interior.
    pub fn is_caret_host(&self) -> bool {
        (self.is_text_bearing() && !matches!(self, BlockKind::CodeLine)) || self.is_code_region()
    }

    pub fn is_code_region(&self) -> bool {
        matches!(self, BlockKind::CodeFence { .. })
    }

    pub fn is_table_cell(&self) -> bool {
        matches!(
            self,
            BlockKind::TableCellHeader { .. } | BlockKind::TableCellBody { .. }
        )
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            BlockKind::OrderedList { .. } | BlockKind::UnorderedList { .. }
        )
    }

    /// Composite containers that wrap a non-paragraph unit.
    pub fn is_figure(&self) -> bool {
        matches!(
            self,
            BlockKind::TableFigure
                | BlockKind::HtmlBlock
                | BlockKind::FrontMatter
                | BlockKind::MathBlock
                | BlockKind::DiagramBlock { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading { .. } => "heading",
            BlockKind::ListItem { .. } => "list-item",
            BlockKind::OrderedList { .. } => "ordered-list",
            BlockKind::UnorderedList { .. } => "unordered-list",
            BlockKind::BlockQuote => "blockquote",
            BlockKind::TableFigure => "table-figure",
            BlockKind::TableRow => "table-row",
            BlockKind::TableCellHeader { .. } => "table-cell-header",
            BlockKind::TableCellBody { .. } => "table-cell-body",
            BlockKind::CodeFence { .. } => "code-fence",
            BlockKind::CodeLine => "code-line",
            BlockKind::HtmlBlock => "html-block",
            BlockKind::FrontMatter => "front-matter",
            BlockKind::MathBlock => "math-block",
            BlockKind::DiagramBlock { .. } => "diagram-block",
            BlockKind::ThematicBreak => "thematic-break",
            BlockKind::TaskCheckbox { .. } => "task-checkbox",
            BlockKind::TextSpan => "text-span",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    pub text: String,
    pub editable: bool,
    pub temp: bool,
    pub(crate) children: Vec<BlockId>,
    pub(crate) parent: Option<BlockId>,
    pub(crate) preceding: Option<BlockId>,
    pub(crate) following: Option<BlockId>,
}

impl Block {
    pub(crate) fn new(kind: BlockKind, text: String) -> Self {
        let editable = !matches!(kind, BlockKind::TaskCheckbox { .. });
        Self {
            id: Uuid::new_v4(),
            kind,
            text,
            editable,
            temp: false,
            children: Vec::new(),
            parent: None,
            preceding: None,
            following: None,
        }
    }

    pub fn children(&self) -> &[BlockId] {
        &self.children
    }

    pub fn parent(&self) -> Option<BlockId> {
        self.parent
    }

    pub fn preceding(&self) -> Option<BlockId> {
        self.preceding
    }

    pub fn following(&self) -> Option<BlockId> {
        self.following
    }

    pub fn first_child(&self) -> Option<BlockId> {
        self.children.first().copied()
    }

    pub fn last_child(&self) -> Option<BlockId> {
        self.children.last().copied()
    }

    /// Whether navigation may enter this block at all.
    pub fn is_navigable(&self) -> bool {
        self.editable && !matches!(self.kind, BlockKind::TaskCheckbox { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkbox_defaults_to_non_editable() {
        let marker = Block::new(BlockKind::TaskCheckbox { checked: true }, String::new());
        assert!(!marker.editable);
        assert!(!marker.is_navigable());
        let span = Block::new(BlockKind::TextSpan, "a".into());
        assert!(span.is_navigable());
    }

    #[test]
    fn test_code_region_is_caret_host_but_lines_are_not() {
        assert!(BlockKind::code(CodeVariant::Fenced, None).is_caret_host());
        assert!(!BlockKind::CodeLine.is_caret_host());
        assert!(BlockKind::CodeLine.is_leaf());
        assert!(!BlockKind::Paragraph.is_caret_host());
    }

    #[test]
    fn test_kind_serde_uses_kebab_tags() {
        let kind = BlockKind::OrderedList {
            start: 3,
            delimiter: ')',
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, r#"{"type":"ordered-list","start":3,"delimiter":")"}"#);
        let parsed: BlockKind = serde_json::from_str(r#"{"type":"unordered-list"}"#).unwrap();
        assert_eq!(parsed, BlockKind::UnorderedList { bullet: '-' });
    }
}
