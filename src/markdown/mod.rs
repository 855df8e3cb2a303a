//! Block tree to CommonMark/GFM text.
//!
//! Rendering walks the tree in document order carrying three pieces of
//! context, all local to one call:
//! - the indentation prefix (list continuation spaces and `> ` quote marks)
//! - a stack of enclosing lists with their running item counters
//! - whether the innermost list item is loose, which decides the blank line
//!   in front of a nested list
//!
//! The same tree and config always produce the same bytes.

mod stats;
mod table;

use serde::{Deserialize, Serialize};

pub use stats::{WordCount, word_count};

use crate::store::{Block, BlockId, BlockKind, BlockStore, CodeVariant, HeadingStyle, MAX_DEPTH};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineEnding {
    #[default]
    Lf,
    Crlf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodeFencePreference {
    /// Indented blocks stay indented.
    #[default]
    AsWritten,
    AlwaysFenced,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SerializeConfig {
    pub line_ending: LineEnding,
    pub code_fences: CodeFencePreference,
}

/// A block that cannot appear where it was found and was left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedBlock {
    pub id: BlockId,
    pub kind: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub markdown: String,
    pub skipped: Vec<SkippedBlock>,
}

/// Renders with the default config.
pub fn serialize(store: &BlockStore) -> String {
    render(store, &SerializeConfig::default()).markdown
}

pub fn render(store: &BlockStore, config: &SerializeConfig) -> Rendered {
    let mut renderer = Renderer {
        store,
        config,
        lists: Vec::new(),
        loose_parent: true,
        skipped: Vec::new(),
    };
    let body = renderer.blocks(store.roots(), "", 0);
    let markdown = match config.line_ending {
        LineEnding::Lf => body,
        LineEnding::Crlf => body.replace('\n', "\r\n"),
    };
    Rendered {
        markdown,
        skipped: renderer.skipped,
    }
}

#[derive(Debug, Clone, Copy)]
enum ListMarker {
    Ordered { counter: u64, delimiter: char },
    Bullet(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CodeStyle<'b> {
    Fenced(Option<&'b str>),
    Indented,
    FrontMatter,
    Html,
    Math,
    Diagram(&'b str),
}

struct Renderer<'a> {
    store: &'a BlockStore,
    config: &'a SerializeConfig,
    lists: Vec<ListMarker>,
    loose_parent: bool,
    skipped: Vec<SkippedBlock>,
}

impl<'a> Renderer<'a> {
    fn blocks(&mut self, ids: &[BlockId], indent: &str, depth: usize) -> String {
        if depth > MAX_DEPTH {
            debug_assert!(false, "rendering exceeds MAX_DEPTH");
            return String::new();
        }
        let store = self.store;
        let mut out: Vec<String> = Vec::new();
        // Marker of the list just emitted at this level, if the previous
        // sibling was a list.
        let mut last_marker: Option<char> = None;

        for id in ids {
            let Some(block) = store.get(*id) else {
                continue;
            };
            if !block.kind.is_list() {
                last_marker = None;
            }

            match &block.kind {
                BlockKind::Paragraph => {
                    line_break(&mut out, indent);
                    out.push(self.blocks(block.children(), indent, depth + 1));
                }
                BlockKind::TextSpan => out.push(format!("{indent}{}\n", block.text)),
                BlockKind::ThematicBreak => {
                    line_break(&mut out, indent);
                    let text = if block.text.is_empty() { "---" } else { &block.text };
                    out.push(format!("{indent}{text}\n"));
                }
                BlockKind::Heading { level, style } => {
                    line_break(&mut out, indent);
                    out.push(heading(&block.text, *level, style, indent));
                }
                BlockKind::BlockQuote => {
                    line_break(&mut out, indent);
                    let quoted = format!("{indent}> ");
                    out.push(self.blocks(block.children(), &quoted, depth + 1));
                }
                BlockKind::OrderedList { delimiter, .. } | BlockKind::UnorderedList { bullet: delimiter } => {
                    let mut blank = self.loose_parent;
                    self.loose_parent = true;
                    if last_marker.is_some_and(|marker| marker != *delimiter) {
                        blank = false;
                    }
                    last_marker = Some(*delimiter);
                    if blank {
                        line_break(&mut out, indent);
                    }
                    self.lists.push(list_marker(&block.kind));
                    out.push(self.blocks(block.children(), indent, depth + 1));
                    self.lists.pop();
                }
                BlockKind::ListItem { loose } => {
                    self.loose_parent = *loose;
                    if *loose {
                        line_break(&mut out, indent);
                    }
                    out.push(self.list_item(block, indent, depth));
                    self.loose_parent = true;
                }
                BlockKind::TableFigure => {
                    line_break(&mut out, indent);
                    out.push(table::render_table(store, block, indent));
                }
                BlockKind::HtmlBlock
                | BlockKind::MathBlock
                | BlockKind::DiagramBlock { .. }
                | BlockKind::FrontMatter => {
                    let region = block
                        .children()
                        .iter()
                        .filter_map(|child| store.get(*child))
                        .find(|child| child.kind.is_code_region());
                    match region {
                        Some(region) => {
                            line_break(&mut out, indent);
                            out.push(code(store, region, figure_style(&block.kind), indent));
                        }
                        None => self.skip(block),
                    }
                }
                BlockKind::CodeFence { variant, lang, .. } => {
                    line_break(&mut out, indent);
                    let style = self.region_style(*variant, lang.as_deref());
                    out.push(code(store, block, style, indent));
                }
                BlockKind::TableRow
                | BlockKind::TableCellHeader { .. }
                | BlockKind::TableCellBody { .. }
                | BlockKind::CodeLine
                | BlockKind::TaskCheckbox { .. } => self.skip(block),
            }
        }
        out.concat()
    }

    fn list_item(&mut self, item: &Block, indent: &str, depth: usize) -> String {
        let mut marker = match self.lists.last_mut() {
            Some(ListMarker::Ordered { counter, delimiter }) => {
                let marker = format!("{counter}{delimiter} ");
                *counter += 1;
                marker
            }
            Some(ListMarker::Bullet(bullet)) => format!("{bullet} "),
            None => "- ".to_string(),
        };

        let mut children = item.children();
        let checkbox = children
            .first()
            .and_then(|first| self.store.get(*first))
            .and_then(|first| match first.kind {
                BlockKind::TaskCheckbox { checked } => Some(checked),
                _ => None,
            });
        if let Some(checked) = checkbox {
            marker.push_str(if checked { "[x] " } else { "[ ] " });
            children = &children[1..];
        }

        let continuation = format!("{indent}{}", " ".repeat(marker.len()));
        let body = self.blocks(children, &continuation, depth + 1);
        if body.is_empty() {
            return format!("{indent}{}\n", marker.trim_end());
        }
        let body = body.strip_prefix(continuation.as_str()).unwrap_or(&body);
        format!("{indent}{marker}{body}")
    }

    fn region_style<'b>(&self, variant: CodeVariant, lang: Option<&'b str>) -> CodeStyle<'b> {
        match variant {
            CodeVariant::Fenced => CodeStyle::Fenced(lang),
            CodeVariant::Indented => match self.config.code_fences {
                CodeFencePreference::AsWritten => CodeStyle::Indented,
                CodeFencePreference::AlwaysFenced => CodeStyle::Fenced(lang),
            },
            CodeVariant::FrontMatter => CodeStyle::FrontMatter,
            CodeVariant::Html => CodeStyle::Html,
            CodeVariant::Math => CodeStyle::Math,
            CodeVariant::Diagram => CodeStyle::Diagram(lang.unwrap_or_default()),
        }
    }

    fn skip(&mut self, block: &Block) {
        tracing::warn!(block = %block.id, kind = block.kind.name(), "skipping block out of place");
        self.skipped.push(SkippedBlock {
            id: block.id,
            kind: block.kind.name(),
        });
    }
}

fn line_break(out: &mut Vec<String>, indent: &str) {
    if !out.is_empty() {
        out.push(format!("{indent}\n"));
    }
}

fn list_marker(kind: &BlockKind) -> ListMarker {
    match kind {
        BlockKind::OrderedList { start, delimiter } => ListMarker::Ordered {
            counter: *start,
            delimiter: *delimiter,
        },
        BlockKind::UnorderedList { bullet } => ListMarker::Bullet(*bullet),
        _ => ListMarker::Bullet('-'),
    }
}

fn heading(text: &str, level: u8, style: &HeadingStyle, indent: &str) -> String {
    let level = level.clamp(1, 6);
    if let HeadingStyle::Setext { marker } = style {
        if level <= 2 {
            let underline = match marker.trim() {
                "" if level == 1 => "===",
                "" => "---",
                marker => marker,
            };
            return format!("{indent}{text}\n{indent}{underline}\n");
        }
    }
    let hashes = "#".repeat(usize::from(level));
    match text.trim() {
        "" => format!("{indent}{hashes}\n"),
        text => format!("{indent}{hashes} {text}\n"),
    }
}

fn figure_style(kind: &BlockKind) -> CodeStyle<'_> {
    match kind {
        BlockKind::HtmlBlock => CodeStyle::Html,
        BlockKind::MathBlock => CodeStyle::Math,
        BlockKind::DiagramBlock { lang } => CodeStyle::Diagram(lang),
        _ => CodeStyle::FrontMatter,
    }
}

fn code(store: &BlockStore, region: &Block, style: CodeStyle<'_>, indent: &str) -> String {
    let lines = region
        .children()
        .iter()
        .filter_map(|line| store.get(*line))
        .map(|line| line.text.as_str());
    let mut out = String::new();
    match style {
        CodeStyle::Fenced(lang) => {
            out.push_str(&format!("{indent}```{}\n", lang.unwrap_or_default()));
            lines.for_each(|line| out.push_str(&format!("{indent}{line}\n")));
            out.push_str(&format!("{indent}```\n"));
        }
        CodeStyle::Indented => {
            lines.for_each(|line| out.push_str(&format!("{indent}    {line}\n")));
        }
        CodeStyle::FrontMatter => {
            out.push_str("---\n");
            lines.for_each(|line| out.push_str(&format!("{line}\n")));
            out.push_str("---\n");
        }
        CodeStyle::Html => {
            lines.for_each(|line| out.push_str(&format!("{indent}{line}\n")));
        }
        CodeStyle::Math => {
            out.push_str(&format!("{indent}$$\n"));
            lines.for_each(|line| out.push_str(&format!("{indent}{line}\n")));
            out.push_str(&format!("{indent}$$\n"));
        }
        CodeStyle::Diagram(lang) => {
            out.push_str(&format!("{indent}```{lang}\n"));
            lines.for_each(|line| out.push_str(&format!("{indent}{line}\n")));
            out.push_str(&format!("{indent}```\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Alignment;
    use crate::tree::TreeNode;

    fn md(nodes: Vec<TreeNode>) -> String {
        serialize(&BlockStore::from_nodes(&nodes).unwrap())
    }

    #[test]
    fn test_paragraphs_are_separated_by_blank_line() {
        assert_eq!(
            md(vec![TreeNode::paragraph("one\ntwo"), TreeNode::paragraph("three")]),
            "one\ntwo\n\nthree\n"
        );
    }

    #[test]
    fn test_headings() {
        assert_eq!(md(vec![TreeNode::heading(2, "  Title  ")]), "## Title\n");
        assert_eq!(md(vec![TreeNode::heading(3, "")]), "###\n");
        assert_eq!(
            md(vec![TreeNode::setext_heading(1, "Title", "=====")]),
            "Title\n=====\n"
        );
        assert_eq!(
            md(vec![TreeNode::setext_heading(3, "Deep", "---")]),
            "### Deep\n"
        );
    }

    #[test]
    fn test_loose_ordered_list_with_tight_children() {
        let item = |text: &str, subs: [&str; 2]| {
            TreeNode::list_item(
                true,
                vec![
                    TreeNode::paragraph(text),
                    TreeNode::unordered_list(
                        '-',
                        subs.iter()
                            .map(|sub| TreeNode::list_item(false, vec![TreeNode::paragraph(sub)]))
                            .collect(),
                    ),
                ],
            )
        };
        let out = md(vec![TreeNode::ordered_list(
            3,
            '.',
            vec![item("item-a", ["sub-a", "sub-b"]), item("item-b", ["sub-c", "sub-d"])],
        )]);
        assert_eq!(
            out,
            "3. item-a\n   \n   - sub-a\n   - sub-b\n\n4. item-b\n   \n   - sub-c\n   - sub-d\n"
        );
    }

    #[test]
    fn test_bullet_change_starts_list_without_blank_line() {
        let list = |bullet| {
            TreeNode::unordered_list(
                bullet,
                vec![TreeNode::list_item(false, vec![TreeNode::paragraph("x")])],
            )
        };
        assert_eq!(md(vec![list('-'), list('*')]), "- x\n* x\n");
        assert_eq!(md(vec![list('-'), list('-')]), "- x\n\n- x\n");
    }

    #[test]
    fn test_task_items() {
        let out = md(vec![TreeNode::unordered_list(
            '-',
            vec![
                TreeNode::task_item(true, false, vec![TreeNode::paragraph("done")]),
                TreeNode::task_item(false, false, vec![TreeNode::paragraph("open\nmore")]),
            ],
        )]);
        assert_eq!(out, "- [x] done\n- [ ] open\n      more\n");
    }

    #[test]
    fn test_block_quote_prefixes_every_line() {
        let out = md(vec![TreeNode::quote(vec![
            TreeNode::paragraph("a"),
            TreeNode::paragraph("b"),
        ])]);
        assert_eq!(out, "> a\n> \n> b\n");
    }

    #[test]
    fn test_code_variants() {
        assert_eq!(
            md(vec![TreeNode::code(CodeVariant::Fenced, Some("rust"), "let x;\nx")]),
            "```rust\nlet x;\nx\n```\n"
        );
        assert_eq!(
            md(vec![TreeNode::code(CodeVariant::Indented, None, "a\nb")]),
            "    a\n    b\n"
        );
        assert_eq!(
            md(vec![TreeNode::front_matter("title: x")]),
            "---\ntitle: x\n---\n"
        );
        assert_eq!(md(vec![TreeNode::math("a+b")]), "$$\na+b\n$$\n");
        assert_eq!(
            md(vec![TreeNode::diagram("mermaid", "graph TD")]),
            "```mermaid\ngraph TD\n```\n"
        );
        assert_eq!(md(vec![TreeNode::html("<div>\n</div>")]), "<div>\n</div>\n");
    }

    #[test]
    fn test_always_fenced_preference() {
        let store =
            BlockStore::from_nodes(&[TreeNode::code(CodeVariant::Indented, None, "a")]).unwrap();
        let config = SerializeConfig {
            code_fences: CodeFencePreference::AlwaysFenced,
            ..SerializeConfig::default()
        };
        assert_eq!(render(&store, &config).markdown, "```\na\n```\n");
    }

    #[test]
    fn test_crlf_is_applied_last() {
        let store = BlockStore::from_nodes(&[
            TreeNode::paragraph("a"),
            TreeNode::paragraph("b"),
        ])
        .unwrap();
        let config = SerializeConfig {
            line_ending: LineEnding::Crlf,
            ..SerializeConfig::default()
        };
        assert_eq!(render(&store, &config).markdown, "a\r\n\r\nb\r\n");
    }

    #[test]
    fn test_out_of_place_blocks_are_skipped_and_reported() {
        let store = BlockStore::from_nodes(&[
            TreeNode::paragraph("kept"),
            TreeNode::new(BlockKind::TableRow),
            TreeNode::leaf(BlockKind::CodeLine, "stray"),
        ])
        .unwrap();
        let rendered = render(&store, &SerializeConfig::default());
        assert_eq!(rendered.markdown, "kept\n");
        let kinds: Vec<_> = rendered.skipped.iter().map(|skip| skip.kind).collect();
        assert_eq!(kinds, vec!["table-row", "code-line"]);
    }

    #[test]
    fn test_table_inside_document() {
        let out = md(vec![
            TreeNode::paragraph("intro"),
            TreeNode::table(&[Alignment::Right], &[&["n"], &["1"]]),
        ]);
        assert_eq!(out, "intro\n\n| n   |\n| ---:|\n| 1   |\n");
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: SerializeConfig = serde_json::from_str(r#"{"line-ending": "crlf"}"#).unwrap();
        assert_eq!(config.line_ending, LineEnding::Crlf);
        assert_eq!(config.code_fences, CodeFencePreference::AsWritten);
    }
}
