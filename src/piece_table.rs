use thiserror::Error;

/// Identifies which backing buffer a piece of text comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Data is in the original buffer, fixed at construction
    Original,
    /// Data is in the append-only added buffer
    Added,
}

/// A descriptor for a contiguous run of text inside one backing buffer.
/// The piece list references buffer contents by range; it never owns text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    /// Which buffer this piece's data lives in
    pub kind: BufferKind,
    /// Offset within the source buffer where this piece starts
    pub offset: usize,
    /// Number of bytes in this piece
    pub bytes: usize,
}

impl Piece {
    pub fn new(kind: BufferKind, offset: usize, bytes: usize) -> Self {
        Piece {
            kind,
            offset,
            bytes,
        }
    }

    /// Offset one past the last byte this piece covers in its source buffer
    pub fn end(&self) -> usize {
        self.offset + self.bytes
    }
}

/// Error returned when an offset falls outside the current document.
/// Carries the offending offset (signed, so normalized backward ranges
/// report the value that was actually computed) and the document length
/// at the time of the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("offset {offset} is out of bounds (document is {len} bytes)")]
pub struct OutOfBounds {
    pub offset: isize,
    pub len: usize,
}

/// Result of resolving a document offset against the piece list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOffset {
    /// Index of the piece the offset binds to
    pub piece: usize,
    /// Matching position inside that piece's source buffer
    pub buffer_offset: usize,
}

/// Statistics about the piece list shape, for debugging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableStats {
    pub total_bytes: usize,
    pub piece_count: usize,
}

/// The ordered piece list whose concatenated runs are the current document
/// text. Pure index/length arithmetic: the table never touches text itself,
/// which is what keeps every edit O(piece count) regardless of document
/// size.
#[derive(Debug, Clone)]
pub struct PieceTable {
    pieces: Vec<Piece>,
    total_bytes: usize,
}

impl PieceTable {
    /// Create a table with a single piece covering the whole original
    /// buffer. The piece is present even for an empty document, so
    /// resolution is total from the start.
    pub fn new(original_bytes: usize) -> Self {
        PieceTable {
            pieces: vec![Piece::new(BufferKind::Original, 0, original_bytes)],
            total_bytes: original_bytes,
        }
    }

    /// Get the total number of bytes in the document
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Get the live piece list in document order
    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Get piece-list statistics for debugging
    pub fn stats(&self) -> TableStats {
        TableStats {
            total_bytes: self.total_bytes,
            piece_count: self.pieces.len(),
        }
    }

    /// Resolve a document offset to a piece index and a position inside that
    /// piece's source buffer.
    ///
    /// An offset that sits exactly on the seam between two pieces binds to
    /// the END of the earlier piece, never the start of the later one: the
    /// walk hands the offset to the first piece whose length is `>=` the
    /// remaining offset. Insert relies on this to detect when the insertion
    /// point is the tail of the most recently appended run.
    pub fn resolve(&self, offset: usize) -> Result<ResolvedOffset, OutOfBounds> {
        if offset > self.total_bytes {
            return Err(OutOfBounds {
                offset: offset as isize,
                len: self.total_bytes,
            });
        }

        let mut remaining = offset;
        for (index, piece) in self.pieces.iter().enumerate() {
            if remaining <= piece.bytes {
                return Ok(ResolvedOffset {
                    piece: index,
                    buffer_offset: piece.offset + remaining,
                });
            }
            remaining -= piece.bytes;
        }

        // Unreachable while the length invariant holds: the bounds check
        // above guarantees the walk terminates inside the list.
        Err(OutOfBounds {
            offset: offset as isize,
            len: self.total_bytes,
        })
    }

    /// Splice a freshly appended added-buffer run into the table at a
    /// resolved insertion point. `added_offset` is the run's start in the
    /// added buffer, which is also the added buffer's length before the
    /// append.
    pub fn insert(&mut self, at: ResolvedOffset, added_offset: usize, bytes: usize) {
        debug_assert!(bytes > 0, "zero-length inserts are filtered by the caller");
        let piece = self.pieces[at.piece];

        // Coalescing fast path: the resolved piece is the most recently
        // appended run and the insertion point is its tail, so the new run
        // is contiguous with it in the added buffer. Grow the piece in
        // place instead of splitting.
        if piece.kind == BufferKind::Added
            && at.buffer_offset == piece.end()
            && piece.end() == added_offset
        {
            self.pieces[at.piece].bytes += bytes;
            self.total_bytes += bytes;
            return;
        }

        let prefix = Piece::new(piece.kind, piece.offset, at.buffer_offset - piece.offset);
        let inserted = Piece::new(BufferKind::Added, added_offset, bytes);
        let suffix = Piece::new(piece.kind, at.buffer_offset, piece.end() - at.buffer_offset);

        self.replace_range(at.piece, at.piece, [prefix, inserted, suffix]);
        self.total_bytes += bytes;
    }

    /// Remove `bytes` bytes between two resolved endpoints. Interior pieces
    /// are dropped wholesale; the underlying buffer bytes stay where they
    /// are and simply become unreachable through the list.
    pub fn delete(&mut self, start: ResolvedOffset, end: ResolvedOffset, bytes: usize) {
        debug_assert!(bytes > 0, "zero-length deletes are filtered by the caller");

        if start.piece == end.piece {
            let piece = &mut self.pieces[start.piece];

            // Front trim: the deletion starts exactly at the piece's start.
            if start.buffer_offset == piece.offset {
                piece.offset += bytes;
                piece.bytes -= bytes;
                self.total_bytes -= bytes;
                return;
            }

            // Tail trim: the deletion ends exactly at the piece's end.
            if end.buffer_offset == piece.end() {
                piece.bytes -= bytes;
                self.total_bytes -= bytes;
                return;
            }
        }

        let first = self.pieces[start.piece];
        let last = self.pieces[end.piece];
        let prefix = Piece::new(first.kind, first.offset, start.buffer_offset - first.offset);
        let suffix = Piece::new(last.kind, end.buffer_offset, last.end() - end.buffer_offset);

        self.replace_range(start.piece, end.piece, [prefix, suffix]);
        self.total_bytes -= bytes;

        if self.pieces.is_empty() {
            // Re-seed the construction state so resolution stays total.
            self.pieces.push(Piece::new(BufferKind::Original, 0, 0));
        }
    }

    /// Replace the inclusive piece range `[first, last]` with the non-empty
    /// candidates, preserving order. The single list-surgery primitive both
    /// insert and delete build on.
    fn replace_range<I>(&mut self, first: usize, last: usize, candidates: I)
    where
        I: IntoIterator<Item = Piece>,
    {
        self.pieces
            .splice(first..=last, candidates.into_iter().filter(|p| p.bytes > 0));
    }
}
