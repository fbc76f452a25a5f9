//! Piece-table text buffer.
//!
//! Document content is described by an ordered list of pieces referencing
//! two append-only backing buffers: the original text supplied at
//! construction and an added buffer that accumulates every insertion.
//! Localized edits rewrite a handful of piece descriptors instead of
//! shifting the text itself, so inserts and deletes stay cheap on large
//! documents.
//!
//! ```
//! use piece_table::TextBuffer;
//!
//! let mut buffer = TextBuffer::new("This is a document with some text.");
//! buffer.insert(10, "large ").unwrap();
//! assert_eq!(buffer.string_at(10, 5).unwrap().as_deref(), Some("large"));
//! buffer.delete(10, 6).unwrap();
//! assert_eq!(buffer.get_sequence(), "This is a document with some text.");
//! ```

pub mod buffer;
pub mod piece_table;

pub use buffer::{Chunks, TextBuffer};
pub use piece_table::{BufferKind, OutOfBounds, Piece, PieceTable, ResolvedOffset, TableStats};
