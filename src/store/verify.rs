//! Structural invariant checks over the whole store.

use super::{BlockId, BlockStore};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("index entry for {0} points at a missing or foreign slot")]
    StaleIndex(BlockId),
    #[error("{live} live blocks but {indexed} index entries")]
    IndexSizeMismatch { live: usize, indexed: usize },
    #[error("{owner:?} lists missing child {child}")]
    DanglingChild { owner: Option<BlockId>, child: BlockId },
    #[error("{child} is listed under {expected:?} but points at {actual:?}")]
    ParentMismatch {
        child: BlockId,
        expected: Option<BlockId>,
        actual: Option<BlockId>,
    },
    #[error("{0} has a parent that does not list it")]
    OrphanedChild(BlockId),
    #[error("sibling links of {0} disagree with its parent's child order")]
    SiblingMismatch(BlockId),
    #[error("{0} is its own ancestor")]
    Cycle(BlockId),
    #[error("leaf {0} has children")]
    LeafWithChildren(BlockId),
    #[error("container {0} carries text")]
    TextOnContainer(BlockId),
}

impl BlockStore {
    /// Checks every structural invariant and reports the first violation.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let live = self.slots.iter().flatten().count();
        if live != self.index.len() {
            return Err(InvariantViolation::IndexSizeMismatch {
                live,
                indexed: self.index.len(),
            });
        }
        for block in self.slots.iter().flatten() {
            if self.get(block.id).map(|found| found.id) != Some(block.id) {
                return Err(InvariantViolation::StaleIndex(block.id));
            }
        }

        self.verify_siblings(None, &self.roots)?;
        for block in self.slots.iter().flatten() {
            self.verify_siblings(Some(block.id), &block.children)?;

            match block.parent {
                Some(parent) => {
                    let listed = self
                        .get(parent)
                        .is_some_and(|p| p.children.contains(&block.id));
                    if !listed {
                        return Err(InvariantViolation::OrphanedChild(block.id));
                    }
                }
                None => {
                    let is_root = self.roots.contains(&block.id);
                    if !is_root && (block.preceding.is_some() || block.following.is_some()) {
                        return Err(InvariantViolation::SiblingMismatch(block.id));
                    }
                }
            }

            if block.kind.is_leaf() && !block.children.is_empty() {
                return Err(InvariantViolation::LeafWithChildren(block.id));
            }
            if !block.kind.is_text_bearing() && !block.text.is_empty() {
                return Err(InvariantViolation::TextOnContainer(block.id));
            }
        }

        let bound = self.len() + 1;
        for block in self.slots.iter().flatten() {
            let mut steps = 0;
            let mut current = block.parent;
            while let Some(parent) = current {
                steps += 1;
                if parent == block.id || steps > bound {
                    return Err(InvariantViolation::Cycle(block.id));
                }
                current = self.get(parent).and_then(|p| p.parent);
            }
        }

        Ok(())
    }

    fn verify_siblings(
        &self,
        owner: Option<BlockId>,
        list: &[BlockId],
    ) -> Result<(), InvariantViolation> {
        for (i, child) in list.iter().enumerate() {
            let block = self
                .get(*child)
                .ok_or(InvariantViolation::DanglingChild {
                    owner,
                    child: *child,
                })?;
            if block.parent != owner {
                return Err(InvariantViolation::ParentMismatch {
                    child: *child,
                    expected: owner,
                    actual: block.parent,
                });
            }
            let preceding = i.checked_sub(1).map(|j| list[j]);
            let following = list.get(i + 1).copied();
            if block.preceding != preceding || block.following != following {
                return Err(InvariantViolation::SiblingMismatch(*child));
            }
        }
        Ok(())
    }
}
