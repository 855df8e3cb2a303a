//! Which neighbors the caret may not enter directly, and the paragraphs
//! synthesized in their place.

use crate::store::{BlockId, BlockKind, BlockStore, StoreError};

use super::Direction;

/// How a caret host behaves when the caret crosses into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Text,
    CodeRegion,
    HeaderCell,
    BodyCell,
}

impl Role {
    pub fn of(kind: &BlockKind) -> Self {
        match kind {
            BlockKind::CodeFence { .. } => Role::CodeRegion,
            BlockKind::TableCellHeader { .. } => Role::HeaderCell,
            BlockKind::TableCellBody { .. } => Role::BodyCell,
            _ => Role::Text,
        }
    }
}

/// Whether leaving a `from` block in `direction` onto `neighbor` must land
/// on a fresh paragraph instead.
///
/// | from        | backward onto          | forward onto             |
/// |-------------|------------------------|--------------------------|
/// | code region | code region, any cell  | code region, any cell    |
/// | header cell | code region, body cell | -                        |
/// | body cell   | -                      | code region, header cell |
/// | text        | -                      | -                        |
pub fn requires_placeholder(from: Role, direction: Direction, neighbor: Role) -> bool {
    use Direction::{Backward, Forward};
    use Role::{BodyCell, CodeRegion, HeaderCell};

    matches!(
        (from, direction, neighbor),
        (CodeRegion, _, CodeRegion | HeaderCell | BodyCell)
            | (HeaderCell, Backward, CodeRegion | BodyCell)
            | (BodyCell, Forward, CodeRegion | HeaderCell)
    )
}

/// Empty paragraph placed next to `anchor` on the side the caret is heading.
/// Returns the paragraph and its text span.
pub fn insert_paragraph(
    store: &mut BlockStore,
    anchor: BlockId,
    direction: Direction,
    temp: bool,
) -> Result<(BlockId, BlockId), StoreError> {
    let paragraph = store.create_paragraph("");
    match direction {
        Direction::Backward => store.insert_before(paragraph, anchor)?,
        Direction::Forward => store.insert_after(paragraph, anchor)?,
    }
    store.set_temp(paragraph, temp)?;
    let span = store
        .get(paragraph)
        .and_then(|block| block.first_child())
        .ok_or(StoreError::BlockNotFound(paragraph))?;
    tracing::debug!(paragraph = %paragraph, anchor = %anchor, temp, "inserted caret paragraph");
    Ok((paragraph, span))
}
