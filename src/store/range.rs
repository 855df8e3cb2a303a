//! Removal of everything between two blocks in document order.

use std::cmp::Ordering;
use std::collections::HashSet;

use super::{BlockId, BlockStore, MAX_DEPTH, Removal, StoreError};

/// State for one `remove_range` call. Dropped with the call, so an aborted
/// removal leaves nothing behind.
#[derive(Debug, Default)]
struct RemovalSession {
    /// Table figures holding a boundary cell; their blocks are cleared
    /// instead of removed.
    exempt: HashSet<BlockId>,
    removal: Removal,
}

impl RemovalSession {
    fn is_exempt(&self, store: &BlockStore, id: BlockId) -> bool {
        self.exempt
            .iter()
            .any(|figure| *figure == id || store.is_descendant(*figure, id))
    }

    fn contains_exempt(&self, store: &BlockStore, id: BlockId) -> bool {
        self.exempt
            .iter()
            .any(|figure| store.is_descendant(id, *figure))
    }
}

impl BlockStore {
    /// Removes every block strictly between `before` and `after`, climbing
    /// through their ancestors until the two sides meet. `after` itself goes
    /// too when `include_after` is set.
    ///
    /// A collapsed range removes nothing. When `after` lies inside `before`,
    /// only the blocks ahead of it within `before` go. `after` preceding
    /// `before` in document order is an [`StoreError::InvalidRange`].
    pub fn remove_range(
        &mut self,
        before: BlockId,
        after: BlockId,
        include_after: bool,
    ) -> Result<Removal, StoreError> {
        let mut paths = Vec::with_capacity(2);
        for boundary in [before, after] {
            if !self.contains(boundary) {
                return Err(StoreError::BlockNotFound(boundary));
            }
            paths.push(self.sibling_path(boundary).ok_or(StoreError::Detached(boundary))?);
        }
        let nested = match paths[0].cmp(&paths[1]) {
            Ordering::Equal => return Ok(Removal::default()),
            Ordering::Greater => return Err(StoreError::InvalidRange { before, after }),
            Ordering::Less => paths[1].starts_with(&paths[0]),
        };

        let mut session = RemovalSession::default();
        let exempt = [before, after]
            .into_iter()
            .filter(|boundary| self.kind(*boundary).is_some_and(|kind| kind.is_table_cell()))
            .filter_map(|cell| self.enclosing_figure(cell));
        session.exempt.extend(exempt);

        if nested {
            self.remove_inside(before, after, include_after, &mut session);
        } else {
            self.remove_between(before, after, include_after, &mut session, 0);
        }
        tracing::debug!(
            before = %before,
            after = %after,
            removed = session.removal.removed.len(),
            cleared = session.removal.cleared.len(),
            "removed range"
        );
        Ok(session.removal)
    }

    fn remove_between(
        &mut self,
        before: BlockId,
        after: BlockId,
        remove_after: bool,
        session: &mut RemovalSession,
        depth: usize,
    ) {
        if depth > MAX_DEPTH {
            debug_assert!(false, "range removal exceeds MAX_DEPTH");
            return;
        }

        let mut next = self.get(before).and_then(|block| block.following);
        let mut met = false;
        while let Some(id) = next {
            if id == after || self.is_descendant(id, after) {
                met = true;
                break;
            }
            next = self.get(id).and_then(|block| block.following);
            self.remove_text_or_block(id, session, depth);
        }
        let before_parent = self.get(before).and_then(|block| block.parent);
        if let (false, Some(parent)) = (met, before_parent) {
            self.remove_between(parent, after, false, session, depth + 1);
        }

        let mut prev = self.get(after).and_then(|block| block.preceding);
        let mut met = false;
        while let Some(id) = prev {
            if id == before || self.is_descendant(id, before) {
                met = true;
                break;
            }
            prev = self.get(id).and_then(|block| block.preceding);
            self.remove_text_or_block(id, session, depth);
        }
        let after_parent = self.get(after).and_then(|block| block.parent);
        if let (false, Some(parent)) = (met, after_parent) {
            // An emptied parent goes with `after`, never without it.
            let emptied = remove_after && self.is_only_child(after);
            self.remove_between(before, parent, emptied, session, depth + 1);
        }

        if remove_after {
            self.remove_text_or_block(after, session, depth);
        }
    }

    /// Removes what precedes `after` at each level up to its ancestor
    /// `before`.
    fn remove_inside(
        &mut self,
        before: BlockId,
        after: BlockId,
        remove_after: bool,
        session: &mut RemovalSession,
    ) {
        let chain = self.ancestors(after);
        for level in chain.iter().take_while(|id| **id != before) {
            let mut prev = self.get(*level).and_then(|block| block.preceding);
            while let Some(id) = prev {
                prev = self.get(id).and_then(|block| block.preceding);
                self.remove_text_or_block(id, session, 0);
            }
        }
        if remove_after {
            self.remove_text_or_block(after, session, 0);
        }
    }

    /// Sibling indices from the top level down to `id`. Lexicographic order
    /// on these is document order, and an ancestor's path prefixes its
    /// descendants'. `None` for blocks outside the document.
    fn sibling_path(&self, id: BlockId) -> Option<Vec<usize>> {
        let mut path = self
            .ancestors(id)
            .into_iter()
            .map(|level| {
                let parent = self.get(level)?.parent;
                self.position(parent, level)
            })
            .collect::<Option<Vec<_>>>()?;
        path.reverse();
        Some(path)
    }

    fn remove_text_or_block(&mut self, id: BlockId, session: &mut RemovalSession, depth: usize) {
        if depth > MAX_DEPTH || !self.contains(id) {
            return;
        }
        if session.is_exempt(self, id) || session.contains_exempt(self, id) {
            if let Some(block) = self.get_mut(id) {
                block.text.clear();
            }
            session.removal.cleared.push(id);
            let children = self
                .get(id)
                .map(|block| block.children.clone())
                .unwrap_or_default();
            for child in children {
                self.remove_text_or_block(child, session, depth + 1);
            }
        } else if let Ok(removal) = self.remove_block(id) {
            session.removal.absorb(removal);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::store::{Alignment, BlockKind, BlockStore};

    #[test]
    fn test_range_between_siblings() {
        let mut store = BlockStore::new();
        let ids: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .map(|text| {
                let id = store.create_paragraph(text);
                store.push_root(id).unwrap();
                id
            })
            .collect();
        let removal = store.remove_range(ids[0], ids[3], false).unwrap();
        assert_eq!(store.roots(), &[ids[0], ids[3]]);
        assert_eq!(removal.removed.len(), 4);
        store.verify().unwrap();

        store.remove_range(ids[0], ids[3], true).unwrap();
        assert_eq!(store.roots(), &[ids[0]]);
        store.verify().unwrap();
    }

    #[test]
    fn test_range_climbs_out_of_nested_blocks() {
        let mut store = BlockStore::new();
        let quote = store.create(BlockKind::BlockQuote);
        store.push_root(quote).unwrap();
        let first = store.create_paragraph("first");
        let second = store.create_paragraph("second");
        store.append_child(quote, first).unwrap();
        store.append_child(quote, second).unwrap();
        let tail = store.create_paragraph("tail");
        store.push_root(tail).unwrap();
        let last = store.create_paragraph("last");
        store.push_root(last).unwrap();

        let span = store.get(first).unwrap().children()[0];
        store.remove_range(span, last, false).unwrap();

        assert_eq!(store.roots(), &[quote, last]);
        assert_eq!(store.get(quote).unwrap().children(), &[first]);
        store.verify().unwrap();
    }

    #[test]
    fn test_missing_boundary_is_reported() {
        let mut store = BlockStore::new();
        let a = store.create_paragraph("a");
        store.push_root(a).unwrap();
        let ghost = uuid::Uuid::new_v4();
        assert!(store.remove_range(a, ghost, false).is_err());
        assert_eq!(store.roots(), &[a]);
    }

    #[test]
    fn test_boundary_cell_exempts_only_its_own_table() {
        let mut store = BlockStore::new();
        let figure = store.create(BlockKind::TableFigure);
        store.push_root(figure).unwrap();
        let mut cells = Vec::new();
        for (row_index, texts) in [["h1", "h2"], ["b1", "b2"]].iter().enumerate() {
            let row = store.create(BlockKind::TableRow);
            store.append_child(figure, row).unwrap();
            for text in texts {
                let kind = if row_index == 0 {
                    BlockKind::TableCellHeader {
                        align: Alignment::None,
                    }
                } else {
                    BlockKind::TableCellBody {
                        align: Alignment::None,
                    }
                };
                let cell = store.create_with_text(kind, text);
                store.append_child(row, cell).unwrap();
                cells.push(cell);
            }
        }
        let after = store.create_paragraph("after");
        store.push_root(after).unwrap();

        let removal = store.remove_range(cells[0], after, false).unwrap();
        assert_eq!(store.get(cells[1]).unwrap().text, "");
        assert_eq!(store.get(cells[2]).unwrap().text, "");
        assert_eq!(store.get(cells[3]).unwrap().text, "");
        assert_eq!(store.get(cells[0]).unwrap().text, "h1");
        assert!(removal.removed.is_empty());
        assert_eq!(store.table_shape(figure), Some((2, 2)));
        store.verify().unwrap();
    }
}
