//! md-blocktree: the block tree behind a rich markdown editor.
//!
//! This crate keeps a parsed markdown document as a tree of structural
//! blocks and provides the algorithms an editor runs on it:
//!
//! - **Block store** - arena-backed tree with O(1) lookup, structural
//!   mutations, range removal and invariant checks
//! - **Navigator** - nearest caret host before/after any block
//! - **Caret controller** - arrow-key movement across code regions, tables
//!   and document boundaries
//! - **Markdown serializer** - deterministic CommonMark/GFM output
//! - **Editing session** - the store, caret and host collaborators wired
//!   together
//!
//! # Quick Start
//!
//! ```rust
//! use md_blocktree::{BlockStore, TreeNode, serialize};
//!
//! let store = BlockStore::from_nodes(&[
//!     TreeNode::heading(1, "Hello"),
//!     TreeNode::paragraph("World"),
//! ])
//! .unwrap();
//!
//! assert_eq!(serialize(&store), "# Hello\n\nWorld\n");
//! ```

// Block tree storage and mutation
pub mod store;

// Serializable tree snapshots
pub mod tree;

// Read-only traversal
pub mod nav;

// Arrow-key caret movement
pub mod caret;

// Session wiring
pub mod session;

// Markdown output and statistics
pub mod markdown;

pub use store::{
    Alignment, Block, BlockId, BlockKind, BlockStore, CodeVariant, EditorPosition, HeadingStyle,
    InvariantViolation, MAX_DEPTH, Removal, StoreError, grapheme_len,
};

pub use tree::{TreeError, TreeNode};

pub use nav::Navigator;

pub use caret::{
    ArrowKey, ArrowOutcome, CaretClass, CaretController, CaretOffsets, CodeEditors, Cursor,
    Direction, Position, RenderSink, Role, SelectionService, SuggestionOverlay, classify,
    requires_placeholder,
};

pub use session::{EditorSession, RenderFrame, SearchMatch, SearchMatches};

pub use markdown::{
    CodeFencePreference, LineEnding, Rendered, SerializeConfig, SkippedBlock, WordCount, render,
    serialize, word_count,
};
