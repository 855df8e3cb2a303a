//! One editing session: the document, its caret and the host wiring.

use unicode_segmentation::UnicodeSegmentation;

use crate::caret::{
    ArrowKey, ArrowOutcome, CaretController, CodeEditors, Cursor, RenderSink, SelectionService,
    SuggestionOverlay,
};
use crate::markdown::{Rendered, SerializeConfig, WordCount, render, serialize, word_count};
use crate::nav::Navigator;
use crate::store::{BlockId, BlockKind, BlockStore, Removal, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub block: BlockId,
    /// Grapheme range within the block's text.
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchMatches {
    pub value: String,
    pub matches: Vec<SearchMatch>,
    pub index: Option<usize>,
}

impl SearchMatches {
    pub fn active(&self) -> Option<&SearchMatch> {
        self.index.and_then(|index| self.matches.get(index))
    }
}

/// Everything a full re-render needs.
#[derive(Debug, Clone)]
pub struct RenderFrame<'a> {
    pub store: &'a BlockStore,
    pub cursor: &'a Cursor,
    /// The caret block and its ancestors.
    pub active_blocks: Vec<BlockId>,
    pub search: &'a SearchMatches,
}

#[derive(Debug, Clone)]
pub struct EditorSession {
    store: BlockStore,
    cursor: Cursor,
    overlay: SuggestionOverlay,
    search: SearchMatches,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    /// A document holding one empty paragraph.
    pub fn new() -> Self {
        Self::from_store(BlockStore::new())
    }

    /// Takes over a parsed document and puts the caret at the end of its last
    /// leaf.
    pub fn from_store(mut store: BlockStore) -> Self {
        let cursor = end_of_document(&mut store);
        Self {
            store,
            cursor,
            overlay: SuggestionOverlay::default(),
            search: SearchMatches::default(),
        }
    }

    pub fn store(&self) -> &BlockStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut BlockStore {
        &mut self.store
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: Cursor) {
        self.cursor = cursor;
    }

    pub fn overlay_mut(&mut self) -> &mut SuggestionOverlay {
        &mut self.overlay
    }

    pub fn search_matches(&self) -> &SearchMatches {
        &self.search
    }

    /// Runs the caret controller and applies a caret move to the host:
    /// selection, code editor focus and a full re-render.
    pub fn handle_arrow_key(
        &mut self,
        key: ArrowKey,
        selection: &mut dyn SelectionService,
        editors: &mut dyn CodeEditors,
        sink: &mut dyn RenderSink,
    ) -> ArrowOutcome {
        let outcome = CaretController::new(&mut self.store, &mut self.overlay).handle_arrow_key(
            key,
            &*selection,
            &*editors,
        );
        if let ArrowOutcome::CaretMoved { cursor, .. } = &outcome {
            self.cursor = *cursor;
            selection.set_range(*cursor);
            self.focus_code_region(editors);
            self.render(sink);
        }
        outcome
    }

    pub fn remove_block(
        &mut self,
        id: BlockId,
        editors: &mut dyn CodeEditors,
    ) -> Result<Removal, StoreError> {
        let removal = self.store.remove_block(id)?;
        self.after_removal(&removal, editors);
        Ok(removal)
    }

    pub fn remove_range(
        &mut self,
        before: BlockId,
        after: BlockId,
        include_after: bool,
        editors: &mut dyn CodeEditors,
    ) -> Result<Removal, StoreError> {
        let removal = self.store.remove_range(before, after, include_after)?;
        self.after_removal(&removal, editors);
        Ok(removal)
    }

    /// Copies live editor buffers into their code regions' lines. Returns the
    /// number of regions whose text changed. An active search is re-run over
    /// the new lines, keeping its position when it still exists.
    pub fn flush_code_regions(&mut self, editors: &dyn CodeEditors) -> Result<usize, StoreError> {
        let regions: Vec<BlockId> = self
            .store
            .document_order()
            .into_iter()
            .filter(|id| self.store.kind(*id).is_some_and(|kind| kind.is_code_region()))
            .collect();
        let mut flushed = 0;
        for region in regions {
            let Some(contents) = editors.contents(region) else {
                continue;
            };
            if self.store.code_text(region).as_deref() == Some(contents.as_str()) {
                continue;
            }
            self.store.replace_code_lines(region, &contents)?;
            flushed += 1;
        }
        if flushed > 0 {
            tracing::debug!(regions = flushed, "flushed code editors");
            self.refresh_search();
        }
        Ok(flushed)
    }

    /// Flushes the editors, then serializes.
    pub fn to_markdown(
        &mut self,
        editors: &dyn CodeEditors,
        config: &SerializeConfig,
    ) -> Result<Rendered, StoreError> {
        self.flush_code_regions(editors)?;
        Ok(render(&self.store, config))
    }

    /// Finds every occurrence of `value` in text-bearing blocks, in document
    /// order, and makes the first one active.
    pub fn search(&mut self, value: &str) -> usize {
        let mut matches = Vec::new();
        if !value.is_empty() {
            for id in self.store.document_order() {
                let Some(block) = self.store.get(id) else {
                    continue;
                };
                if !block.kind.is_text_bearing() {
                    continue;
                }
                for (byte, _) in block.text.match_indices(value) {
                    let start = block.text[..byte].graphemes(true).count();
                    let end = start + value.graphemes(true).count();
                    matches.push(SearchMatch { block: id, start, end });
                }
            }
        }
        let index = (!matches.is_empty()).then_some(0);
        let count = matches.len();
        self.search = SearchMatches {
            value: value.to_string(),
            matches,
            index,
        };
        count
    }

    /// Activates the next match, wrapping around.
    pub fn next_match(&mut self) -> Option<SearchMatch> {
        let len = self.search.matches.len();
        if len == 0 {
            return None;
        }
        let next = self.search.index.map_or(0, |index| (index + 1) % len);
        self.search.index = Some(next);
        self.search.matches.get(next).copied()
    }

    pub fn clear_search(&mut self) {
        self.search = SearchMatches::default();
    }

    pub fn frame(&self) -> RenderFrame<'_> {
        RenderFrame {
            store: &self.store,
            cursor: &self.cursor,
            active_blocks: Navigator::new(&self.store).active_blocks(self.cursor.start.block),
            search: &self.search,
        }
    }

    pub fn render(&self, sink: &mut dyn RenderSink) {
        sink.render(&self.frame());
    }

    pub fn partial_render(&self, block: BlockId, sink: &mut dyn RenderSink) {
        sink.partial_render(block, &self.cursor);
    }

    pub fn markdown(&self) -> String {
        serialize(&self.store)
    }

    pub fn word_count(&self) -> WordCount {
        word_count(&self.markdown(), self.store.roots().len())
    }

    fn after_removal(&mut self, removal: &Removal, editors: &mut dyn CodeEditors) {
        for region in &removal.code_regions {
            editors.release(*region);
        }
        let caret_gone = !self.store.in_document(self.cursor.start.block)
            || !self.store.in_document(self.cursor.end.block);
        if caret_gone {
            self.cursor = end_of_document(&mut self.store);
        }
        self.search.matches.retain(|found| removal.removed.iter().all(|id| *id != found.block));
        if self.search.index.is_some_and(|index| index >= self.search.matches.len()) {
            self.search.index = (!self.search.matches.is_empty()).then_some(0);
        }
    }

    fn refresh_search(&mut self) {
        if self.search.value.is_empty() {
            return;
        }
        let index = self.search.index;
        let value = std::mem::take(&mut self.search.value);
        let count = self.search(&value);
        if let Some(index) = index.filter(|index| *index < count) {
            self.search.index = Some(index);
        }
    }

    /// Hands the caret to a code region's editor, at the recorded resume
    /// point or else its last line.
    fn focus_code_region(&self, editors: &mut dyn CodeEditors) {
        let region = self.cursor.start.block;
        let Some(kind) = self.store.kind(region) else {
            return;
        };
        if let BlockKind::CodeFence { resume_at, .. } = kind {
            let position = resume_at.unwrap_or_else(|| editors.end_position(region));
            editors.focus_and_set_cursor(region, position);
        }
    }
}

/// Caret at the end of the last leaf, adding a paragraph when the document
/// has nowhere to put it.
fn end_of_document(store: &mut BlockStore) -> Cursor {
    if let Some(leaf) = Navigator::new(store).last_leaf_in_document() {
        return Cursor::collapsed(leaf, store.text_len(leaf));
    }
    let paragraph = store.create_paragraph("");
    let span = store
        .get(paragraph)
        .and_then(|block| block.first_child())
        .unwrap_or(paragraph);
    if let Err(err) = store.push_root(paragraph) {
        tracing::warn!(%err, "could not add an empty paragraph");
    }
    Cursor::collapsed(span, 0)
}
