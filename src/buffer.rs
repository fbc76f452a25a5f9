use crate::piece_table::{BufferKind, OutOfBounds, Piece, PieceTable, TableStats};

/// Append-only backing storage for document text.
///
/// The original buffer is fixed at construction and never touched again; the
/// added buffer only ever grows at its end. Because neither buffer moves or
/// overwrites existing bytes, a piece can hold a `(kind, offset, bytes)`
/// reference indefinitely and the piece list can be edited by pure
/// index/length arithmetic.
#[derive(Debug, Clone, Default)]
struct BufferStore {
    original: Vec<u8>,
    added: Vec<u8>,
}

impl BufferStore {
    fn new(original: Vec<u8>) -> Self {
        BufferStore {
            original,
            added: Vec::new(),
        }
    }

    /// Append data to the added buffer, returning the offset where the
    /// appended data starts (the buffer's length before the append).
    fn append(&mut self, data: &[u8]) -> usize {
        let start = self.added.len();
        self.added.extend_from_slice(data);
        start
    }

    fn source(&self, kind: BufferKind) -> &[u8] {
        match kind {
            BufferKind::Original => &self.original,
            BufferKind::Added => &self.added,
        }
    }

    /// The bytes a piece denotes in its source buffer
    fn slice(&self, piece: &Piece) -> &[u8] {
        &self.source(piece.kind)[piece.offset..piece.end()]
    }

    /// An arbitrary range of one source buffer
    fn slice_raw(&self, kind: BufferKind, start: usize, end: usize) -> &[u8] {
        &self.source(kind)[start..end]
    }
}

/// A text buffer that manages document content as a piece table: an ordered
/// list of descriptors into two append-only buffers. Localized edits rewrite
/// a handful of descriptors instead of shifting text, so inserts and deletes
/// stay cheap on large documents.
///
/// All offsets are byte offsets into the current logical document. The
/// buffer is fully synchronous and owns its storage exclusively; mutation
/// requires `&mut self`, queries take `&self`.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    /// The piece list describing the current document text
    table: PieceTable,
    /// Backing storage referenced by the pieces
    store: BufferStore,
    /// Monotonic version counter for change tracking
    version: u64,
}

impl TextBuffer {
    /// Create a buffer seeded with `initial_text`. The piece list starts
    /// with exactly one piece covering the whole original buffer, present
    /// even when the text is empty.
    pub fn new(initial_text: &str) -> Self {
        TextBuffer {
            table: PieceTable::new(initial_text.len()),
            store: BufferStore::new(initial_text.as_bytes().to_vec()),
            version: 0,
        }
    }

    /// Current buffer version (monotonic, wraps on overflow)
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Length of the document in bytes
    pub fn len(&self) -> usize {
        self.table.total_bytes()
    }

    /// Check if the document is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The live piece list in document order, for debugging and tests
    pub fn pieces(&self) -> &[Piece] {
        self.table.pieces()
    }

    /// Piece-list statistics for debugging
    pub fn stats(&self) -> TableStats {
        self.table.stats()
    }

    /// Insert `text` at the given byte offset.
    ///
    /// Inserting an empty string is a no-op. Resolution precedes every
    /// mutation, so a failed call leaves the piece list, both buffers, and
    /// the version counter exactly as they were.
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<(), OutOfBounds> {
        if text.is_empty() {
            return Ok(());
        }

        let at = self.table.resolve(offset)?;
        let added_offset = self.store.append(text.as_bytes());
        self.table.insert(at, added_offset, text.len());
        self.bump_version();

        tracing::debug!(
            "TextBuffer::insert: {} bytes at offset {}, now {} pieces",
            text.len(),
            offset,
            self.table.pieces().len()
        );
        Ok(())
    }

    /// Delete `bytes` bytes at `offset`.
    ///
    /// A negative length deletes backward: `delete(o, -n)` is equivalent to
    /// `delete(o - n, n)`. The sign is folded away once at entry, then both
    /// endpoints are resolved before anything is touched. A zero-length
    /// delete with a valid offset is a no-op.
    pub fn delete(&mut self, offset: usize, bytes: isize) -> Result<(), OutOfBounds> {
        let (start, len) = self.normalize_span(offset, bytes)?;
        let start_at = self.table.resolve(start)?;
        let end_at = self.table.resolve(start + len)?;
        if len == 0 {
            return Ok(());
        }

        self.table.delete(start_at, end_at, len);
        self.bump_version();

        tracing::debug!(
            "TextBuffer::delete: {} bytes at offset {}, now {} pieces",
            len,
            start,
            self.table.pieces().len()
        );
        Ok(())
    }

    /// Materialize the entire document by concatenating every piece's run
    /// in list order
    pub fn get_sequence(&self) -> String {
        let mut result = Vec::with_capacity(self.len());
        for chunk in self.chunks() {
            result.extend_from_slice(chunk);
        }
        String::from_utf8_lossy(&result).into_owned()
    }

    /// Read `bytes` bytes starting at `offset`, with the same sign handling
    /// as [`TextBuffer::delete`].
    ///
    /// Returns `Ok(None)` whenever the materialized span is empty (a
    /// well-formed zero-length read included), never `Ok(Some(""))`. The
    /// `Option` is the explicit no-value representation; callers that treat
    /// an empty read as empty text can flatten it with `unwrap_or_default`.
    pub fn string_at(&self, offset: usize, bytes: isize) -> Result<Option<String>, OutOfBounds> {
        let (start, len) = self.normalize_span(offset, bytes)?;
        let first = self.table.resolve(start)?;
        let last = self.table.resolve(start + len)?;
        if len == 0 {
            return Ok(None);
        }

        let pieces = self.table.pieces();
        let first_piece = pieces[first.piece];

        // Fast path: the whole span lies inside the first touched piece.
        if first.piece == last.piece {
            let slice =
                self.store
                    .slice_raw(first_piece.kind, first.buffer_offset, last.buffer_offset);
            return Ok(Some(String::from_utf8_lossy(slice).into_owned()));
        }

        // Tail of the first piece, every interior piece in full, head of the
        // last piece.
        let mut result = Vec::with_capacity(len);
        result.extend_from_slice(self.store.slice_raw(
            first_piece.kind,
            first.buffer_offset,
            first_piece.end(),
        ));
        for piece in &pieces[first.piece + 1..last.piece] {
            result.extend_from_slice(self.store.slice(piece));
        }
        let last_piece = pieces[last.piece];
        result.extend_from_slice(self.store.slice_raw(
            last_piece.kind,
            last_piece.offset,
            last.buffer_offset,
        ));

        if result.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&result).into_owned()))
    }

    /// Iterate over the byte run each piece denotes, in document order
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks {
            buffer: self,
            index: 0,
        }
    }

    /// Find the next occurrence of `pattern` at or after `start_pos`,
    /// wrapping around to the beginning of the document. Returns the byte
    /// offset of the match, or `None` if the pattern is empty or absent.
    pub fn find_next(&self, pattern: &str, start_pos: usize) -> Option<usize> {
        if pattern.is_empty() {
            return None;
        }

        let len = self.len();
        let pattern = pattern.as_bytes();

        // Search from start_pos to end
        if start_pos < len {
            if let Some(offset) = self.find_in_range(start_pos, len, pattern) {
                return Some(offset);
            }
        }

        // Wrap around: search from the beginning up to start_pos
        if start_pos > 0 {
            if let Some(offset) = self.find_in_range(0, start_pos.min(len), pattern) {
                return Some(offset);
            }
        }

        None
    }

    /// Find a byte pattern within `[start, end)` of the document
    fn find_in_range(&self, start: usize, end: usize, pattern: &[u8]) -> Option<usize> {
        if start >= end || pattern.is_empty() {
            return None;
        }

        let haystack = self.bytes_at(start, end - start);
        haystack
            .windows(pattern.len())
            .position(|window| window == pattern)
            .map(|index| start + index)
    }

    /// Collect the raw bytes of a document range by clipping each piece's
    /// run against it
    fn bytes_at(&self, offset: usize, bytes: usize) -> Vec<u8> {
        let mut result = Vec::with_capacity(bytes);
        let end = offset + bytes;
        let mut doc_offset = 0;

        for piece in self.table.pieces() {
            let piece_start = doc_offset;
            let piece_end = doc_offset + piece.bytes;
            doc_offset = piece_end;

            if piece_end <= offset {
                continue;
            }
            if piece_start >= end {
                break;
            }

            let read_start = offset.max(piece_start) - piece_start;
            let read_end = end.min(piece_end) - piece_start;
            result.extend_from_slice(&self.store.slice(piece)[read_start..read_end]);
        }

        result
    }

    /// Fold a sign-sensitive `(offset, length)` span into a forward one,
    /// rejecting spans that start before the document
    fn normalize_span(&self, offset: usize, bytes: isize) -> Result<(usize, usize), OutOfBounds> {
        let start = offset as isize + bytes.min(0);
        if start < 0 {
            return Err(OutOfBounds {
                offset: start,
                len: self.len(),
            });
        }
        Ok((start as usize, bytes.unsigned_abs()))
    }
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self::new("")
    }
}

impl From<&str> for TextBuffer {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Iterator over the byte runs the piece list denotes, in document order.
/// Concatenating every item yields the current document text.
pub struct Chunks<'a> {
    buffer: &'a TextBuffer,
    index: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let piece = self.buffer.table.pieces().get(self.index)?;
        self.index += 1;
        Some(self.buffer.store.slice(piece))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "This is a document with some text.";
    const INSERTED: &str = "This is some more text to insert at offset 33.";

    #[test]
    fn test_new_materializes_initial_text() {
        let buffer = TextBuffer::new(DOC);
        assert_eq!(buffer.get_sequence(), DOC);
        assert_eq!(buffer.len(), 34);
        assert_eq!(buffer.pieces().len(), 1);
    }

    #[test]
    fn test_new_empty_document() {
        let buffer = TextBuffer::new("");
        assert_eq!(buffer.get_sequence(), "");
        assert!(buffer.is_empty());
        assert_eq!(buffer.pieces().len(), 1);
        assert_eq!(buffer.pieces()[0].bytes, 0);
    }

    #[test]
    fn test_insert_then_read_back() {
        let mut buffer = TextBuffer::new(DOC);
        buffer.insert(33, INSERTED).unwrap();

        assert_eq!(
            buffer.string_at(33, INSERTED.len() as isize).unwrap(),
            Some(INSERTED.to_string())
        );
        assert_eq!(buffer.len(), DOC.len() + INSERTED.len());
    }

    #[test]
    fn test_delete_inverts_insert() {
        let mut buffer = TextBuffer::new(DOC);
        buffer.insert(33, INSERTED).unwrap();
        buffer.delete(33, INSERTED.len() as isize).unwrap();

        assert_eq!(buffer.get_sequence(), DOC);
    }

    #[test]
    fn test_backward_delete_inverts_insert() {
        let mut buffer = TextBuffer::new(DOC);
        buffer.insert(33, INSERTED).unwrap();

        // delete(o, -n) deletes the n bytes ending at o.
        let end = 33 + INSERTED.len();
        buffer.delete(end, -(INSERTED.len() as isize)).unwrap();

        assert_eq!(buffer.get_sequence(), DOC);
    }

    #[test]
    fn test_string_at_slices_original() {
        let buffer = TextBuffer::new(DOC);
        assert_eq!(
            buffer.string_at(10, 8).unwrap(),
            Some("document".to_string())
        );
    }

    #[test]
    fn test_string_at_spanning_pieces() {
        let mut buffer = TextBuffer::new(DOC);
        buffer.insert(10, "large ").unwrap();

        // Spans the original prefix, the added piece, and the original
        // suffix.
        assert_eq!(
            buffer.string_at(8, 16).unwrap(),
            Some("a large document".to_string())
        );
    }

    #[test]
    fn test_string_at_zero_length_is_no_value() {
        let buffer = TextBuffer::new(DOC);
        assert_eq!(buffer.string_at(5, 0).unwrap(), None);
        assert_eq!(buffer.string_at(0, 0).unwrap(), None);
        assert_eq!(buffer.string_at(buffer.len(), 0).unwrap(), None);
    }

    #[test]
    fn test_string_at_negative_length() {
        let buffer = TextBuffer::new(DOC);
        assert_eq!(
            buffer.string_at(18, -8).unwrap(),
            Some("document".to_string())
        );
    }

    #[test]
    fn test_insert_on_empty_document() {
        let mut buffer = TextBuffer::new("");
        buffer.insert(0, "X").unwrap();

        assert_eq!(buffer.get_sequence(), "X");
        assert_eq!(buffer.pieces().len(), 1);
        assert_eq!(buffer.pieces()[0].kind, BufferKind::Added);
    }

    #[test]
    fn test_empty_insert_is_noop() {
        let mut buffer = TextBuffer::new(DOC);
        let before = buffer.pieces().to_vec();
        let version = buffer.version();

        buffer.insert(5, "").unwrap();

        assert_eq!(buffer.pieces(), &before[..]);
        assert_eq!(buffer.version(), version);
        assert_eq!(buffer.get_sequence(), DOC);
    }

    #[test]
    fn test_zero_length_delete_is_noop() {
        let mut buffer = TextBuffer::new(DOC);
        let version = buffer.version();

        buffer.delete(5, 0).unwrap();

        assert_eq!(buffer.get_sequence(), DOC);
        assert_eq!(buffer.version(), version);
    }

    #[test]
    fn test_zero_length_delete_still_validates_offset() {
        let mut buffer = TextBuffer::new(DOC);
        assert!(buffer.delete(buffer.len() + 1, 0).is_err());
    }

    #[test]
    fn test_out_of_bounds_leaves_state_unchanged() {
        let mut buffer = TextBuffer::new(DOC);
        buffer.insert(10, "big ").unwrap();
        let sequence = buffer.get_sequence();
        let version = buffer.version();

        let err = buffer.insert(buffer.len() + 1, "nope").unwrap_err();
        assert_eq!(err.len, buffer.len());
        assert!(buffer.delete(0, buffer.len() as isize + 1).is_err());
        assert!(buffer.delete(2, -3).is_err());
        assert!(buffer.string_at(buffer.len() + 5, 1).is_err());

        assert_eq!(buffer.get_sequence(), sequence);
        assert_eq!(buffer.version(), version);
    }

    #[test]
    fn test_backward_delete_reports_computed_offset() {
        let mut buffer = TextBuffer::new(DOC);
        let err = buffer.delete(2, -3).unwrap_err();
        assert_eq!(err.offset, -1);
    }

    #[test]
    fn test_sequential_typing_coalesces() {
        let mut buffer = TextBuffer::new("");
        for (i, ch) in ["h", "e", "l", "l", "o"].iter().enumerate() {
            buffer.insert(i, ch).unwrap();
        }

        assert_eq!(buffer.get_sequence(), "hello");
        assert_eq!(buffer.stats().piece_count, 1);
    }

    #[test]
    fn test_typing_after_cursor_move_does_not_coalesce() {
        let mut buffer = TextBuffer::new("");
        buffer.insert(0, "world").unwrap();
        buffer.insert(0, "hello ").unwrap();

        assert_eq!(buffer.get_sequence(), "hello world");
        assert_eq!(buffer.stats().piece_count, 2);
    }

    #[test]
    fn test_version_counts_successful_mutations_only() {
        let mut buffer = TextBuffer::new(DOC);
        assert_eq!(buffer.version(), 0);

        buffer.insert(0, "A").unwrap();
        buffer.delete(0, 1).unwrap();
        assert_eq!(buffer.version(), 2);

        let _ = buffer.insert(1000, "B");
        let _ = buffer.string_at(0, 4);
        assert_eq!(buffer.version(), 2);
    }

    #[test]
    fn test_chunks_concatenate_to_sequence() {
        let mut buffer = TextBuffer::new(DOC);
        buffer.insert(10, "large ").unwrap();
        buffer.delete(0, 5).unwrap();

        let mut collected = Vec::new();
        for chunk in buffer.chunks() {
            collected.extend_from_slice(chunk);
        }
        assert_eq!(collected, buffer.get_sequence().into_bytes());
    }

    #[test]
    fn test_find_next_forward_and_wrapping() {
        let buffer = TextBuffer::new(DOC);

        assert_eq!(buffer.find_next("is", 0), Some(2));
        assert_eq!(buffer.find_next("is", 3), Some(5));
        // Past the last occurrence, the search wraps to the front.
        assert_eq!(buffer.find_next("is", 6), Some(2));
        assert_eq!(buffer.find_next("missing", 0), None);
        assert_eq!(buffer.find_next("", 0), None);
    }

    #[test]
    fn test_find_next_sees_through_piece_seams() {
        let mut buffer = TextBuffer::new("ab");
        buffer.insert(1, "XY").unwrap();

        // "aXYb": the match spans the added piece and the original suffix.
        assert_eq!(buffer.find_next("Yb", 0), Some(2));
    }

    #[test]
    fn test_multibyte_text_round_trips() {
        let mut buffer = TextBuffer::new("héllo wörld");
        let prefix = "café ";

        buffer.insert(0, prefix).unwrap();
        assert_eq!(buffer.get_sequence(), "café héllo wörld");
        assert_eq!(
            buffer.string_at(0, prefix.len() as isize).unwrap(),
            Some(prefix.to_string())
        );
    }

    #[test]
    fn test_delete_everything_then_reuse() {
        let mut buffer = TextBuffer::new(DOC);
        buffer.insert(10, "huge ").unwrap();
        buffer.delete(0, buffer.len() as isize).unwrap();

        assert_eq!(buffer.get_sequence(), "");
        assert!(buffer.is_empty());

        buffer.insert(0, "fresh start").unwrap();
        assert_eq!(buffer.get_sequence(), "fresh start");
    }

    #[test]
    fn test_piece_length_sum_matches_sequence() {
        let mut buffer = TextBuffer::new(DOC);
        buffer.insert(33, INSERTED).unwrap();
        buffer.delete(4, 8).unwrap();
        buffer.insert(0, ">>> ").unwrap();

        let piece_sum: usize = buffer.pieces().iter().map(|p| p.bytes).sum();
        assert_eq!(piece_sum, buffer.get_sequence().len());
        assert_eq!(piece_sum, buffer.len());
    }
}
