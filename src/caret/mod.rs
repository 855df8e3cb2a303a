//! Arrow-key caret movement.
//!
//! The controller resolves the caret's block, sorts it into one of three
//! cases ([`CaretClass`]) and runs the handler for that case. Handlers may
//! splice a fresh paragraph into the store when the caret would otherwise
//! land inside a block it cannot enter directly; see [`requires_placeholder`].
//!
//! The host UI is reached only through the collaborator traits in this
//! module. The controller reads selection and editor state and returns an
//! [`ArrowOutcome`]; applying that outcome to the UI is the session's job.

mod placeholder;

use serde::{Deserialize, Serialize};

pub use placeholder::{Role, requires_placeholder};

use crate::nav::Navigator;
use crate::session::RenderFrame;
use crate::store::{BlockId, BlockKind, BlockStore, EditorPosition, StoreError};

/// A point in the document; `offset` counts graphemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub block: BlockId,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub start: Position,
    pub end: Position,
}

impl Cursor {
    pub fn collapsed(block: BlockId, offset: usize) -> Self {
        let position = Position { block, offset };
        Self {
            start: position,
            end: position,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowKey {
    Up,
    Down,
    Left,
    Right,
}

impl ArrowKey {
    pub fn direction(self) -> Direction {
        match self {
            ArrowKey::Up | ArrowKey::Left => Direction::Backward,
            ArrowKey::Down | ArrowKey::Right => Direction::Forward,
        }
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, ArrowKey::Up | ArrowKey::Down)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

/// Graphemes before and after the caret within a block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaretOffsets {
    pub left: usize,
    pub right: usize,
}

/// The host's selection layer, translated into block coordinates.
pub trait SelectionService {
    /// Block holding the start of the current selection, if it maps to one.
    fn selection_start_block(&self) -> Option<BlockId>;
    fn caret_offsets(&self, block: BlockId) -> CaretOffsets;
    fn current_range(&self) -> Cursor;
    fn set_range(&mut self, cursor: Cursor);
}

/// Embedded code editors, one per live code region.
pub trait CodeEditors {
    fn is_at_first_line(&self, region: BlockId) -> bool;
    fn is_at_last_line(&self, region: BlockId) -> bool;
    fn is_at_line_start(&self, region: BlockId) -> bool;
    fn is_at_line_end(&self, region: BlockId) -> bool;
    fn begin_position(&self, region: BlockId) -> EditorPosition;
    fn end_position(&self, region: BlockId) -> EditorPosition;
    fn focus_and_set_cursor(&mut self, region: BlockId, position: EditorPosition);
    /// Live buffer of the region's editor, `None` when it has no editor.
    fn contents(&self, region: BlockId) -> Option<String>;
    /// Disposes of the region's editor once the region is gone.
    fn release(&mut self, region: BlockId);
}

pub trait RenderSink {
    fn render(&mut self, frame: &RenderFrame<'_>);
    fn partial_render(&mut self, block: BlockId, cursor: &Cursor);
}

/// Completion popup; while open it takes vertical arrows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuggestionOverlay {
    items: usize,
    index: usize,
}

impl SuggestionOverlay {
    pub fn open(&mut self, items: usize) {
        self.items = items;
        self.index = 0;
    }

    pub fn close(&mut self) {
        self.items = 0;
        self.index = 0;
    }

    pub fn is_active(&self) -> bool {
        self.items > 0
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.is_active().then_some(self.index)
    }

    fn step(&mut self, key: ArrowKey) -> usize {
        match key {
            ArrowKey::Up => self.index = self.index.saturating_sub(1),
            ArrowKey::Down => self.index = (self.index + 1).min(self.items.saturating_sub(1)),
            ArrowKey::Left | ArrowKey::Right => {}
        }
        self.index
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrowOutcome {
    /// Nothing matched; the host keeps its default caret motion.
    Unhandled,
    OverlayMoved { index: usize },
    /// The caret moves to `cursor`; default motion is suppressed.
    /// `inserted` is a paragraph created to host it.
    CaretMoved {
        cursor: Cursor,
        inserted: Option<BlockId>,
    },
}

impl ArrowOutcome {
    pub fn is_handled(&self) -> bool {
        !matches!(self, ArrowOutcome::Unhandled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretClass {
    CodeRegion,
    TableCell,
    Leaf,
}

pub fn classify(kind: &BlockKind) -> CaretClass {
    if kind.is_code_region() {
        CaretClass::CodeRegion
    } else if kind.is_table_cell() {
        CaretClass::TableCell
    } else {
        CaretClass::Leaf
    }
}

pub struct CaretController<'s> {
    store: &'s mut BlockStore,
    overlay: &'s mut SuggestionOverlay,
}

impl<'s> CaretController<'s> {
    pub fn new(store: &'s mut BlockStore, overlay: &'s mut SuggestionOverlay) -> Self {
        Self { store, overlay }
    }

    pub fn handle_arrow_key(
        &mut self,
        key: ArrowKey,
        selection: &dyn SelectionService,
        editors: &dyn CodeEditors,
    ) -> ArrowOutcome {
        let Some(block) = selection
            .selection_start_block()
            .and_then(|id| self.resolve(id))
        else {
            tracing::warn!(?key, "caret block cannot be resolved");
            return ArrowOutcome::Unhandled;
        };

        if self.overlay.is_active() && key.is_vertical() {
            let index = self.overlay.step(key);
            return ArrowOutcome::OverlayMoved { index };
        }

        let range = selection.current_range();
        if !range.is_collapsed() {
            return ArrowOutcome::Unhandled;
        }

        let Some(class) = self.store.kind(block).map(classify) else {
            return ArrowOutcome::Unhandled;
        };
        let result = match class {
            CaretClass::CodeRegion => self.from_code_region(block, key, editors),
            CaretClass::TableCell => {
                self.from_table_cell(block, key, selection.caret_offsets(block), editors)
            }
            CaretClass::Leaf => self.from_leaf(block, key, range.start.offset, editors),
        };
        match result {
            Ok(outcome) => {
                tracing::debug!(?key, ?class, ?outcome, "arrow key");
                outcome
            }
            Err(err) => {
                tracing::warn!(%err, ?key, "caret move aborted");
                ArrowOutcome::Unhandled
            }
        }
    }

    /// Maps the selection's block to the block the caret logic works on:
    /// a code line stands for its region.
    fn resolve(&self, id: BlockId) -> Option<BlockId> {
        let block = self.store.get(id)?;
        if block.kind == BlockKind::CodeLine {
            return block
                .parent()
                .filter(|parent| self.store.kind(*parent).is_some_and(BlockKind::is_code_region));
        }
        Some(id)
    }

    fn from_code_region(
        &mut self,
        region: BlockId,
        key: ArrowKey,
        editors: &dyn CodeEditors,
    ) -> Result<ArrowOutcome, StoreError> {
        let leaving = match key {
            ArrowKey::Up => editors.is_at_first_line(region),
            ArrowKey::Left => editors.is_at_first_line(region) && editors.is_at_line_start(region),
            ArrowKey::Down => editors.is_at_last_line(region),
            ArrowKey::Right => editors.is_at_last_line(region) && editors.is_at_line_end(region),
        };
        if !leaving {
            return Ok(ArrowOutcome::Unhandled);
        }

        let direction = key.direction();
        let neighbor = self.neighbor(region, direction);
        let anchor = self.figure_anchor(region);
        match neighbor {
            None => self.land_on_new_paragraph(anchor, direction, false),
            Some(neighbor) if requires_placeholder(Role::CodeRegion, direction, self.role(neighbor)) => {
                self.land_on_new_paragraph(anchor, direction, true)
            }
            Some(neighbor) => self.move_to_neighbor(direction, Some(neighbor), editors),
        }
    }

    fn from_table_cell(
        &mut self,
        cell: BlockId,
        key: ArrowKey,
        offsets: CaretOffsets,
        editors: &dyn CodeEditors,
    ) -> Result<ArrowOutcome, StoreError> {
        let Some(figure) = self.store.enclosing_figure(cell) else {
            return self.from_leaf(cell, key, offsets.left, editors);
        };
        let (first_row, last_row) = self
            .store
            .parent(cell)
            .map_or((false, false), |row| {
                (row.preceding().is_none(), row.following().is_none())
            });

        let direction = key.direction();
        let (neighbor, leaving) = match key {
            ArrowKey::Up if first_row => (self.neighbor(figure, direction), true),
            ArrowKey::Down if last_row => (self.neighbor(figure, direction), true),
            ArrowKey::Up | ArrowKey::Down => (self.neighbor(cell, direction), false),
            ArrowKey::Left if offsets.left == 0 => self.cell_neighbor(cell, figure, direction),
            ArrowKey::Right if offsets.right == 0 => self.cell_neighbor(cell, figure, direction),
            ArrowKey::Left | ArrowKey::Right => return Ok(ArrowOutcome::Unhandled),
        };

        let from = self.role(cell);
        let blocked = neighbor
            .is_some_and(|neighbor| requires_placeholder(from, direction, self.role(neighbor)));
        if leaving && blocked {
            return self.land_on_new_paragraph(figure, direction, true);
        }
        self.move_to_neighbor(direction, neighbor, editors)
    }

    fn from_leaf(
        &mut self,
        block: BlockId,
        key: ArrowKey,
        offset: usize,
        editors: &dyn CodeEditors,
    ) -> Result<ArrowOutcome, StoreError> {
        let at_boundary = match key {
            ArrowKey::Up | ArrowKey::Down => true,
            ArrowKey::Left => offset == 0,
            ArrowKey::Right => offset >= self.store.text_len(block),
        };
        if !at_boundary {
            return Ok(ArrowOutcome::Unhandled);
        }
        let direction = key.direction();
        let neighbor = self.neighbor(block, direction);
        self.move_to_neighbor(direction, neighbor, editors)
    }

    /// Puts the caret on `neighbor`: the far end of its text when moving
    /// backward, the start when moving forward. A code region gets its
    /// editor resume point instead. With no neighbor, moving forward grows
    /// the document by one paragraph.
    fn move_to_neighbor(
        &mut self,
        direction: Direction,
        neighbor: Option<BlockId>,
        editors: &dyn CodeEditors,
    ) -> Result<ArrowOutcome, StoreError> {
        let Some(neighbor) = neighbor else {
            return match direction {
                Direction::Backward => Ok(ArrowOutcome::Unhandled),
                Direction::Forward => self.append_paragraph(),
            };
        };

        if self.role(neighbor) == Role::CodeRegion {
            let resume_at = match direction {
                Direction::Backward => editors.end_position(neighbor),
                Direction::Forward => editors.begin_position(neighbor),
            };
            self.store.set_resume_at(neighbor, Some(resume_at))?;
            return Ok(ArrowOutcome::CaretMoved {
                cursor: Cursor::collapsed(neighbor, 0),
                inserted: None,
            });
        }

        let offset = match direction {
            Direction::Backward => self.store.text_len(neighbor),
            Direction::Forward => 0,
        };
        Ok(ArrowOutcome::CaretMoved {
            cursor: Cursor::collapsed(neighbor, offset),
            inserted: None,
        })
    }

    fn append_paragraph(&mut self) -> Result<ArrowOutcome, StoreError> {
        let paragraph = self.store.create_paragraph("");
        self.store.push_root(paragraph)?;
        let span = self
            .store
            .get(paragraph)
            .and_then(|block| block.first_child())
            .ok_or(StoreError::BlockNotFound(paragraph))?;
        Ok(ArrowOutcome::CaretMoved {
            cursor: Cursor::collapsed(span, 0),
            inserted: Some(paragraph),
        })
    }

    fn land_on_new_paragraph(
        &mut self,
        anchor: BlockId,
        direction: Direction,
        temp: bool,
    ) -> Result<ArrowOutcome, StoreError> {
        let (paragraph, span) = placeholder::insert_paragraph(self.store, anchor, direction, temp)?;
        Ok(ArrowOutcome::CaretMoved {
            cursor: Cursor::collapsed(span, 0),
            inserted: Some(paragraph),
        })
    }

    fn neighbor(&self, id: BlockId, direction: Direction) -> Option<BlockId> {
        let nav = Navigator::new(self.store);
        match direction {
            Direction::Backward => nav.preceding_leaf_in_document(id),
            Direction::Forward => nav.following_leaf_in_document(id),
        }
    }

    /// Horizontal neighbor of a cell, and whether reaching it leaves the
    /// table.
    fn cell_neighbor(
        &self,
        cell: BlockId,
        figure: BlockId,
        direction: Direction,
    ) -> (Option<BlockId>, bool) {
        let neighbor = self.neighbor(cell, direction);
        let leaving = !neighbor.is_some_and(|neighbor| self.store.is_descendant(figure, neighbor));
        (neighbor, leaving)
    }

    /// Block next to which placeholders for `region` are spliced: the
    /// wrapping figure when there is one.
    fn figure_anchor(&self, region: BlockId) -> BlockId {
        self.store
            .parent(region)
            .filter(|parent| parent.kind.is_figure())
            .map_or(region, |parent| parent.id)
    }

    fn role(&self, id: BlockId) -> Role {
        self.store.kind(id).map_or(Role::Text, Role::of)
    }
}
