//! Block store: the document tree and every structural mutation on it.
//!
//! Blocks live in a dense slot vector addressed through an `id -> slot`
//! index, so lookups never walk the tree. Each block carries its parent,
//! its ordered children and both sibling links; every mutation below keeps
//! the four in agreement before it returns.
//!
//! - [`BlockStore::insert_before`] / [`BlockStore::insert_after`] splice a
//!   block next to an attached anchor
//! - [`BlockStore::append_child`] / [`BlockStore::prepend_child`] attach under
//!   a parent
//! - [`BlockStore::replace_block`] swaps a block into another's slot
//! - [`BlockStore::remove_block`] destroys a subtree
//! - [`BlockStore::remove_range`] removes everything between two boundaries

use std::collections::HashMap;
use unicode_segmentation::UnicodeSegmentation;

mod block;
mod range;
mod verify;

pub use block::{
    Alignment, Block, BlockId, BlockKind, CodeVariant, EditorPosition, HeadingStyle,
};
pub use verify::InvariantViolation;

/// Upper bound on tree depth for every walk over parent or child links.
pub const MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("block not found: {0}")]
    BlockNotFound(BlockId),
    #[error("block is not attached to the document: {0}")]
    Detached(BlockId),
    #[error("placing {block} at {anchor} would make it its own ancestor")]
    WouldCycle { block: BlockId, anchor: BlockId },
    #[error("leaf block cannot hold children: {0}")]
    LeafCannotHaveChildren(BlockId),
    #[error("block does not carry text: {0}")]
    NotTextBearing(BlockId),
    #[error("block is not a code region: {0}")]
    NotCodeRegion(BlockId),
    #[error("invalid offset")]
    InvalidOffset,
    #[error("range boundary {after} precedes {before}")]
    InvalidRange { before: BlockId, after: BlockId },
}

/// What a removal destroyed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Removal {
    /// Every destroyed block, subtrees included.
    pub removed: Vec<BlockId>,
    /// Destroyed code regions; their embedded-editor state must be released.
    pub code_regions: Vec<BlockId>,
    /// Blocks kept in place with their text cleared.
    pub cleared: Vec<BlockId>,
}

impl Removal {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.cleared.is_empty()
    }

    fn absorb(&mut self, other: Removal) {
        self.removed.extend(other.removed);
        self.code_regions.extend(other.code_regions);
        self.cleared.extend(other.cleared);
    }
}

#[derive(Debug, Default, Clone)]
pub struct BlockStore {
    slots: Vec<Option<Block>>,
    index: HashMap<BlockId, usize>,
    free: Vec<usize>,
    roots: Vec<BlockId>,
}

impl BlockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live blocks, attached or not.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Top-level blocks in document order.
    pub fn roots(&self) -> &[BlockId] {
        &self.roots
    }

    pub fn contains(&self, id: BlockId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.index
            .get(&id)
            .and_then(|slot| self.slots.get(*slot))
            .and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: BlockId) -> Option<&mut Block> {
        let slot = *self.index.get(&id)?;
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    pub fn kind(&self, id: BlockId) -> Option<&BlockKind> {
        self.get(id).map(|block| &block.kind)
    }

    pub fn parent(&self, id: BlockId) -> Option<&Block> {
        self.get(id)?.parent.and_then(|parent| self.get(parent))
    }

    pub fn preceding_sibling(&self, id: BlockId) -> Option<&Block> {
        self.get(id)?.preceding.and_then(|sibling| self.get(sibling))
    }

    pub fn following_sibling(&self, id: BlockId) -> Option<&Block> {
        self.get(id)?.following.and_then(|sibling| self.get(sibling))
    }

    /// Allocates a detached block with a fresh identifier.
    pub fn create(&mut self, kind: BlockKind) -> BlockId {
        self.create_with_text(kind, "")
    }

    pub fn create_with_text(&mut self, kind: BlockKind, text: &str) -> BlockId {
        let block = Block::new(kind, text.to_string());
        let id = block.id;
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(block);
                slot
            }
            None => {
                self.slots.push(Some(block));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
        id
    }

    /// Detached paragraph holding a single text span.
    pub fn create_paragraph(&mut self, text: &str) -> BlockId {
        let paragraph = self.create(BlockKind::Paragraph);
        let span = self.create_with_text(BlockKind::TextSpan, text);
        self.attach(Some(paragraph), 0, span);
        paragraph
    }

    /// Whether the block sits in a sibling list, under a parent or at the
    /// top level. Blocks inside a detached subtree count.
    pub fn is_attached(&self, id: BlockId) -> bool {
        match self.get(id) {
            Some(block) => block.parent.is_some() || self.roots.contains(&id),
            None => false,
        }
    }

    /// Whether the block is reachable from the top-level blocks.
    pub fn in_document(&self, id: BlockId) -> bool {
        self.outermost(id)
            .is_some_and(|root| self.roots.contains(&root))
    }

    pub fn insert_before(&mut self, new: BlockId, anchor: BlockId) -> Result<(), StoreError> {
        let (parent, _) = self.check_placement(new, anchor)?;
        self.detach(new)?;
        let index = self.position(parent, anchor).ok_or(StoreError::Detached(anchor))?;
        self.attach(parent, index, new);
        Ok(())
    }

    pub fn insert_after(&mut self, new: BlockId, anchor: BlockId) -> Result<(), StoreError> {
        let (parent, _) = self.check_placement(new, anchor)?;
        self.detach(new)?;
        let index = self.position(parent, anchor).ok_or(StoreError::Detached(anchor))?;
        self.attach(parent, index + 1, new);
        Ok(())
    }

    pub fn append_child(&mut self, parent: BlockId, block: BlockId) -> Result<(), StoreError> {
        self.check_child(parent, block)?;
        self.detach(block)?;
        let len = self.get(parent).map_or(0, |p| p.children.len());
        self.attach(Some(parent), len, block);
        Ok(())
    }

    pub fn prepend_child(&mut self, parent: BlockId, block: BlockId) -> Result<(), StoreError> {
        self.check_child(parent, block)?;
        self.detach(block)?;
        self.attach(Some(parent), 0, block);
        Ok(())
    }

    /// Appends `block` as the last top-level block.
    pub fn push_root(&mut self, block: BlockId) -> Result<(), StoreError> {
        if !self.contains(block) {
            return Err(StoreError::BlockNotFound(block));
        }
        self.detach(block)?;
        let len = self.roots.len();
        self.attach(None, len, block);
        Ok(())
    }

    /// Puts `new` into `old`'s slot. `old` ends up detached with its
    /// children untouched.
    pub fn replace_block(&mut self, new: BlockId, old: BlockId) -> Result<(), StoreError> {
        self.check_placement(new, old)?;
        self.detach(new)?;
        let parent = self.get(old).and_then(|b| b.parent);
        let index = self.position(parent, old).ok_or(StoreError::Detached(old))?;
        if let Some(list) = self.siblings_mut(parent) {
            list[index] = new;
        }
        if let Some(block) = self.get_mut(new) {
            block.parent = parent;
        }
        if let Some(block) = self.get_mut(old) {
            block.parent = None;
            block.preceding = None;
            block.following = None;
        }
        self.relink(parent, index);
        tracing::debug!(new = %new, old = %old, "replaced block");
        Ok(())
    }

    /// Detaches `id` and destroys it together with its subtree.
    pub fn remove_block(&mut self, id: BlockId) -> Result<Removal, StoreError> {
        if !self.contains(id) {
            return Err(StoreError::BlockNotFound(id));
        }
        self.detach(id)?;
        let mut removal = Removal::default();
        for doomed in self.subtree(id) {
            let Some(slot) = self.index.remove(&doomed) else {
                continue;
            };
            let was_code = self.slots[slot]
                .take()
                .is_some_and(|block| block.kind.is_code_region());
            if was_code {
                removal.code_regions.push(doomed);
            }
            self.free.push(slot);
            removal.removed.push(doomed);
        }
        tracing::debug!(block = %id, removed = removal.removed.len(), "removed block");
        Ok(removal)
    }

    /// Unlinks `id` from its parent and siblings, keeping it alive. A block
    /// that is not attached is left as is.
    pub fn detach(&mut self, id: BlockId) -> Result<(), StoreError> {
        let parent = self
            .get(id)
            .ok_or(StoreError::BlockNotFound(id))?
            .parent;
        let Some(index) = self.position(parent, id) else {
            return Ok(());
        };
        if let Some(list) = self.siblings_mut(parent) {
            list.remove(index);
        }
        if let Some(block) = self.get_mut(id) {
            block.parent = None;
            block.preceding = None;
            block.following = None;
        }
        if index > 0 {
            self.relink(parent, index - 1);
        }
        self.relink(parent, index);
        Ok(())
    }

    pub fn set_text(&mut self, id: BlockId, text: &str) -> Result<(), StoreError> {
        let block = self.text_block_mut(id)?;
        block.text = text.to_string();
        Ok(())
    }

    /// Inserts `text` at a grapheme offset, returning the byte offset used.
    pub fn insert_text(
        &mut self,
        id: BlockId,
        grapheme_offset: usize,
        text: &str,
    ) -> Result<usize, StoreError> {
        let block = self.text_block_mut(id)?;
        let byte_offset = grapheme_offset_to_byte(&block.text, grapheme_offset)
            .ok_or(StoreError::InvalidOffset)?;
        block.text.insert_str(byte_offset, text);
        Ok(byte_offset)
    }

    /// Length of a block's text in graphemes, the unit of caret offsets.
    pub fn text_len(&self, id: BlockId) -> usize {
        self.get(id).map_or(0, |block| grapheme_len(&block.text))
    }

    pub fn set_editable(&mut self, id: BlockId, editable: bool) -> Result<(), StoreError> {
        let block = self.get_mut(id).ok_or(StoreError::BlockNotFound(id))?;
        block.editable = editable;
        Ok(())
    }

    pub fn set_temp(&mut self, id: BlockId, temp: bool) -> Result<(), StoreError> {
        let block = self.get_mut(id).ok_or(StoreError::BlockNotFound(id))?;
        block.temp = temp;
        Ok(())
    }

    /// Changes a block's kind; a leaf kind is refused while children remain.
    pub fn set_kind(&mut self, id: BlockId, kind: BlockKind) -> Result<(), StoreError> {
        let block = self.get_mut(id).ok_or(StoreError::BlockNotFound(id))?;
        if kind.is_leaf() && !block.children.is_empty() {
            return Err(StoreError::LeafCannotHaveChildren(id));
        }
        block.kind = kind;
        Ok(())
    }

    /// Records where the embedded editor should put its cursor next time the
    /// region is focused.
    pub fn set_resume_at(
        &mut self,
        region: BlockId,
        position: Option<EditorPosition>,
    ) -> Result<(), StoreError> {
        let block = self
            .get_mut(region)
            .ok_or(StoreError::BlockNotFound(region))?;
        match &mut block.kind {
            BlockKind::CodeFence { resume_at, .. } => {
                *resume_at = position;
                Ok(())
            }
            _ => Err(StoreError::NotCodeRegion(region)),
        }
    }

    /// Rebuilds a code region's lines from an editor buffer.
    pub fn replace_code_lines(
        &mut self,
        region: BlockId,
        content: &str,
    ) -> Result<Removal, StoreError> {
        let block = self.get(region).ok_or(StoreError::BlockNotFound(region))?;
        if !block.kind.is_code_region() {
            return Err(StoreError::NotCodeRegion(region));
        }
        let old_lines = block.children.clone();
        let mut removal = Removal::default();
        for line in old_lines {
            removal.absorb(self.remove_block(line)?);
        }
        for line in content.split('\n') {
            let id = self.create_with_text(BlockKind::CodeLine, line);
            self.append_child(region, id)?;
        }
        Ok(removal)
    }

    /// Text of a code region's lines joined with newlines.
    pub fn code_text(&self, region: BlockId) -> Option<String> {
        let block = self.get(region)?;
        let lines: Vec<&str> = block
            .children
            .iter()
            .filter_map(|line| self.get(*line))
            .map(|line| line.text.as_str())
            .collect();
        Some(lines.join("\n"))
    }

    /// `id` followed by its ancestors, innermost first.
    pub fn ancestors(&self, id: BlockId) -> Vec<BlockId> {
        let mut chain = Vec::new();
        let mut current = self.get(id);
        while let Some(block) = current {
            chain.push(block.id);
            if chain.len() > MAX_DEPTH {
                debug_assert!(false, "ancestor chain exceeds MAX_DEPTH");
                break;
            }
            current = block.parent.and_then(|parent| self.get(parent));
        }
        chain
    }

    /// Top-level block containing `id`.
    pub fn outermost(&self, id: BlockId) -> Option<BlockId> {
        self.ancestors(id).last().copied()
    }

    /// Whether `id` lies strictly inside `ancestor`'s subtree.
    pub fn is_descendant(&self, ancestor: BlockId, id: BlockId) -> bool {
        self.ancestors(id).iter().skip(1).any(|candidate| *candidate == ancestor)
    }

    /// Nearest figure at or above `id`.
    pub fn enclosing_figure(&self, id: BlockId) -> Option<BlockId> {
        self.ancestors(id)
            .into_iter()
            .find(|candidate| self.kind(*candidate).is_some_and(BlockKind::is_figure))
    }

    pub fn is_first_child(&self, id: BlockId) -> bool {
        self.get(id).is_some_and(|block| block.preceding.is_none())
    }

    pub fn is_last_child(&self, id: BlockId) -> bool {
        self.get(id).is_some_and(|block| block.following.is_none())
    }

    pub fn is_only_child(&self, id: BlockId) -> bool {
        self.is_first_child(id) && self.is_last_child(id)
    }

    pub fn last_child(&self, id: BlockId) -> Option<&Block> {
        self.get(id)?.last_child().and_then(|child| self.get(child))
    }

    /// Pre-order ids of `id`'s subtree, `id` first.
    pub fn subtree(&self, id: BlockId) -> Vec<BlockId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(block) = self.get(current) else {
                continue;
            };
            out.push(current);
            stack.extend(block.children.iter().rev().copied());
        }
        out
    }

    /// Every attached block in document order.
    pub fn document_order(&self) -> Vec<BlockId> {
        self.roots
            .iter()
            .flat_map(|root| self.subtree(*root))
            .collect()
    }

    /// `(rows, columns)` of a table figure, counting the header row.
    pub fn table_shape(&self, figure: BlockId) -> Option<(usize, usize)> {
        let block = self.get(figure)?;
        if block.kind != BlockKind::TableFigure {
            return None;
        }
        let columns = block
            .first_child()
            .and_then(|row| self.get(row))
            .map_or(0, |row| row.children.len());
        Some((block.children.len(), columns))
    }

    fn text_block_mut(&mut self, id: BlockId) -> Result<&mut Block, StoreError> {
        let block = self.get_mut(id).ok_or(StoreError::BlockNotFound(id))?;
        if !block.kind.is_text_bearing() {
            return Err(StoreError::NotTextBearing(id));
        }
        Ok(block)
    }

    /// Validates that `new` may take a place next to `anchor` and returns the
    /// anchor's parent.
    fn check_placement(
        &self,
        new: BlockId,
        anchor: BlockId,
    ) -> Result<(Option<BlockId>, BlockId), StoreError> {
        if !self.contains(new) {
            return Err(StoreError::BlockNotFound(new));
        }
        let anchor_block = self.get(anchor).ok_or(StoreError::BlockNotFound(anchor))?;
        if !self.is_attached(anchor) {
            return Err(StoreError::Detached(anchor));
        }
        if new == anchor || self.is_descendant(new, anchor) {
            return Err(StoreError::WouldCycle { block: new, anchor });
        }
        Ok((anchor_block.parent, anchor))
    }

    fn check_child(&self, parent: BlockId, block: BlockId) -> Result<(), StoreError> {
        if !self.contains(block) {
            return Err(StoreError::BlockNotFound(block));
        }
        let parent_block = self.get(parent).ok_or(StoreError::BlockNotFound(parent))?;
        if parent_block.kind.is_leaf() {
            return Err(StoreError::LeafCannotHaveChildren(parent));
        }
        if block == parent || self.is_descendant(block, parent) {
            return Err(StoreError::WouldCycle {
                block,
                anchor: parent,
            });
        }
        Ok(())
    }

    fn siblings(&self, parent: Option<BlockId>) -> Option<&Vec<BlockId>> {
        match parent {
            None => Some(&self.roots),
            Some(parent) => self.get(parent).map(|block| &block.children),
        }
    }

    fn siblings_mut(&mut self, parent: Option<BlockId>) -> Option<&mut Vec<BlockId>> {
        match parent {
            None => Some(&mut self.roots),
            Some(parent) => self.get_mut(parent).map(|block| &mut block.children),
        }
    }

    fn position(&self, parent: Option<BlockId>, id: BlockId) -> Option<usize> {
        self.siblings(parent)?.iter().position(|child| *child == id)
    }

    /// Inserts a detached block into a sibling list and fixes the links
    /// around it.
    fn attach(&mut self, parent: Option<BlockId>, index: usize, id: BlockId) {
        if let Some(list) = self.siblings_mut(parent) {
            list.insert(index, id);
        }
        if let Some(block) = self.get_mut(id) {
            block.parent = parent;
        }
        if index > 0 {
            self.relink(parent, index - 1);
        }
        self.relink(parent, index);
        self.relink(parent, index + 1);
    }

    /// Recomputes the sibling links of the block at `index` from the list.
    fn relink(&mut self, parent: Option<BlockId>, index: usize) {
        let Some(list) = self.siblings(parent) else {
            return;
        };
        let Some(id) = list.get(index).copied() else {
            return;
        };
        let preceding = index.checked_sub(1).and_then(|i| list.get(i).copied());
        let following = list.get(index + 1).copied();
        if let Some(block) = self.get_mut(id) {
            block.preceding = preceding;
            block.following = following;
        }
    }
}

pub fn grapheme_len(text: &str) -> usize {
    text.graphemes(true).count()
}

fn grapheme_offset_to_byte(text: &str, grapheme_offset: usize) -> Option<usize> {
    if grapheme_offset == 0 {
        return Some(0);
    }

    let mut count = 0;
    for (byte_index, _) in text.grapheme_indices(true) {
        if count == grapheme_offset {
            return Some(byte_index);
        }
        count += 1;
    }
    if count == grapheme_offset {
        Some(text.len())
    } else {
        None
    }
}
