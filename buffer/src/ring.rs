//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

/// Capacity used when a caller asks for a zero-sized buffer.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Bytes per line in diagnostic hex dumps.
const CHUNK: usize = 16;

/// Errors from the in-place splice operations.
///
/// Fill, drain, append, and search never produce these; only
/// [`RingBuffer::insert_byte`] does. The position contracts the original
/// implementation trusted callers to uphold are enforced here instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// The position is outside the active region `[write_cursor, read_cursor]`.
    OutOfRange {
        /// The offending position.
        position: usize,
    },
    /// The arena has no spare room at its tail for an insertion.
    NoRoom,
}

impl std::error::Error for BufferError {}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::OutOfRange { position } => {
                write!(f, "position {position} outside the active region")
            }
            BufferError::NoRoom => write!(f, "no spare room in buffer"),
        }
    }
}

/// A fixed-capacity linear byte buffer with stream-backed fill and drain.
///
/// See the crate documentation for the cursor model. The buffer is owned by
/// exactly one connection task and is never shared; none of its operations
/// take locks.
pub struct RingBuffer {
    /// Diagnostic name ("network", "serial", "housekeeping").
    label: String,
    /// Owned byte arena, `capacity` bytes long.
    arena: Vec<u8>,
    /// Oldest byte not yet drained.
    write_cursor: usize,
    /// One past the newest byte; where the next fill or append lands.
    read_cursor: usize,
    /// Bytes currently in the active region.
    buffered: usize,
    /// Set once the fill stream reported end-of-stream.
    eof_seen: bool,
}

impl RingBuffer {
    /// Creates an empty buffer with a zeroed arena of `capacity` bytes.
    ///
    /// A `capacity` of zero falls back to [`DEFAULT_CAPACITY`].
    pub fn new(label: impl Into<String>, capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            DEFAULT_CAPACITY
        } else {
            capacity
        };
        let mut buffer = RingBuffer {
            label: label.into(),
            arena: vec![0u8; capacity],
            write_cursor: 0,
            read_cursor: 0,
            buffered: 0,
            eof_seen: false,
        };
        buffer.reset();
        buffer
    }

    /// Returns both cursors to the arena origin, empties the active region,
    /// and zero-fills the arena.
    ///
    /// Called at creation and whenever a drain consumes the last buffered
    /// byte; the `eof_seen` flag survives a reset.
    pub fn reset(&mut self) {
        self.write_cursor = 0;
        self.read_cursor = 0;
        self.buffered = 0;
        self.arena.fill(0);
    }

    /// The buffer's diagnostic label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Total arena capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.arena.len()
    }

    /// Number of bytes in the active region.
    pub fn len(&self) -> usize {
        self.buffered
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buffered == 0
    }

    /// True once the fill stream has reported end-of-stream.
    pub fn eof(&self) -> bool {
        self.eof_seen
    }

    /// Position of the oldest undrained byte.
    pub fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Position one past the newest buffered byte.
    pub fn read_cursor(&self) -> usize {
        self.read_cursor
    }

    /// Read-only view of the active region.
    pub fn active(&self) -> &[u8] {
        debug_assert_eq!(self.write_cursor + self.buffered, self.read_cursor);
        &self.arena[self.write_cursor..self.write_cursor + self.buffered]
    }

    /// The byte at an absolute arena `position`, if it lies within the
    /// active region.
    pub fn get(&self, position: usize) -> Option<u8> {
        if position >= self.write_cursor && position < self.read_cursor {
            Some(self.arena[position])
        } else {
            None
        }
    }

    /// How many bytes one fill may read.
    ///
    /// The buffer is full exactly when the cursors meet with data buffered;
    /// the whole capacity is reported free only at reset. Because the layout
    /// is linear, a partially drained buffer offers only the tail beyond
    /// `read_cursor` even though the drained prefix is dead space.
    pub fn room_to_read(&self) -> usize {
        let bytes = if self.read_cursor < self.write_cursor {
            self.write_cursor - self.read_cursor
        } else if self.read_cursor > self.write_cursor {
            self.capacity() - self.read_cursor
        } else if self.buffered == 0 {
            self.capacity()
        } else {
            0
        };
        if bytes == 0 {
            trace!(label = %self.label, "buffer is full");
        }
        bytes
    }

    /// How many bytes one drain may write: the contiguous run of buffered
    /// bytes starting at `write_cursor`.
    pub fn room_to_write(&self) -> usize {
        if self.read_cursor > self.write_cursor {
            self.read_cursor - self.write_cursor
        } else if self.read_cursor < self.write_cursor {
            self.capacity() - self.write_cursor
        } else if self.buffered == 0 {
            0
        } else {
            self.capacity() - self.write_cursor
        }
    }

    /// Performs at most one read from `reader` into the free tail of the
    /// arena, advancing `read_cursor` by the bytes obtained.
    ///
    /// Returns `Ok(0)` when the buffer is full, when the read would block or
    /// was interrupted, or at end-of-stream (which also latches the
    /// [`eof`](Self::eof) flag). Hard I/O errors are returned as-is.
    pub async fn fill_from<R>(&mut self, reader: &mut R) -> std::io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        let room = self.room_to_read();
        if room == 0 {
            return Ok(0);
        }
        let span = self.read_cursor..self.read_cursor + room;
        match reader.read(&mut self.arena[span]).await {
            Ok(0) => {
                debug!(label = %self.label, "eof on stream");
                self.eof_seen = true;
                Ok(0)
            }
            Ok(count) => {
                self.advance_read_cursor(count);
                trace!(label = %self.label, count, buffered = self.buffered, "filled");
                Ok(count)
            }
            Err(error)
                if matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) =>
            {
                Ok(0)
            }
            Err(error) => Err(error),
        }
    }

    /// Performs at most one write to `writer` from the head of the active
    /// region, advancing `write_cursor` by the bytes accepted.
    ///
    /// When the last buffered byte is drained the buffer resets to the arena
    /// origin. Returns `Ok(0)` when empty or when the write would block or
    /// was interrupted; hard I/O errors are returned as-is.
    pub async fn drain_to<W>(&mut self, writer: &mut W) -> std::io::Result<usize>
    where
        W: AsyncWrite + Unpin,
    {
        let bytes = self.room_to_write();
        if bytes == 0 {
            return Ok(0);
        }
        let span = self.write_cursor..self.write_cursor + bytes;
        match writer.write(&self.arena[span]).await {
            Ok(0) => {
                debug!(label = %self.label, "write accepted 0 bytes");
                Ok(0)
            }
            Ok(count) => {
                self.advance_write_cursor(count);
                trace!(label = %self.label, count, buffered = self.buffered, "drained");
                Ok(count)
            }
            Err(error)
                if matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) =>
            {
                Ok(0)
            }
            Err(error) => Err(error),
        }
    }

    /// Finds the first occurrence of `target` in the active region.
    ///
    /// Safe against embedded NUL bytes. Returns the absolute arena position.
    pub fn find_byte(&self, target: u8) -> Option<usize> {
        self.find_byte_at(self.write_cursor, target)
    }

    /// Finds the first occurrence of `target` at or after the absolute
    /// position `from` within the active region.
    pub fn find_byte_at(&self, from: usize, target: u8) -> Option<usize> {
        let start = from.max(self.write_cursor);
        if start >= self.read_cursor {
            return None;
        }
        self.arena[start..self.read_cursor]
            .iter()
            .position(|&byte| byte == target)
            .map(|offset| start + offset)
    }

    /// Inserts `byte` at the absolute `position`, shifting everything in
    /// `[position, read_cursor)` one slot to the right and growing the
    /// active region by one.
    ///
    /// The position must satisfy `write_cursor <= position <= read_cursor`
    /// and the arena must have spare room at its tail; otherwise the buffer
    /// is left untouched and an error is returned.
    pub fn insert_byte(&mut self, position: usize, byte: u8) -> Result<(), BufferError> {
        if position < self.write_cursor || position > self.read_cursor {
            return Err(BufferError::OutOfRange { position });
        }
        if self.read_cursor == self.capacity() {
            return Err(BufferError::NoRoom);
        }
        self.arena
            .copy_within(position..self.read_cursor, position + 1);
        self.arena[position] = byte;
        self.advance_read_cursor(1);
        Ok(())
    }

    /// Removes up to `count` bytes beginning at the absolute `position`,
    /// shifting the tail of the active region left over the gap.
    ///
    /// Returns the number of bytes removed, with one deliberate quirk: when
    /// `count` covers everything buffered the buffer resets and the
    /// *requested* count is returned unclamped, so callers can compare it
    /// against what they asked for to detect "whole buffer consumed". An
    /// out-of-range position removes nothing and returns zero.
    pub fn remove_range(&mut self, position: usize, count: usize) -> usize {
        if position < self.write_cursor || position > self.read_cursor {
            return 0;
        }
        if count >= self.buffered {
            self.reset();
            return count;
        }
        let count = count.min(self.read_cursor - position);
        self.arena
            .copy_within(position + count..self.read_cursor, position);
        self.read_cursor -= count;
        self.buffered -= count;
        count
    }

    /// Appends as many of `bytes` as fit, silently truncating to the free
    /// room at the arena tail. Returns the number of bytes copied; callers
    /// that must detect truncation compare it against `bytes.len()`.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        self.append_limited(bytes, bytes.len())
    }

    /// Appends at most `max` bytes of `bytes`, truncating like
    /// [`append`](Self::append). Returns the number of bytes copied.
    pub fn append_limited(&mut self, bytes: &[u8], max: usize) -> usize {
        let mut len = max.min(bytes.len());
        let free = self.capacity() - self.buffered;
        if len > free {
            len = free;
        }
        // the active region must stay contiguous, so only the tail beyond
        // read_cursor is usable
        let tail = self.capacity() - self.read_cursor;
        if len > tail {
            warn!(
                label = %self.label,
                requested = max.min(bytes.len()),
                tail,
                "append clamped to arena tail"
            );
            len = tail;
        }
        self.arena[self.read_cursor..self.read_cursor + len].copy_from_slice(&bytes[..len]);
        self.advance_read_cursor(len);
        len
    }

    /// Emits the buffer's state, and at trace level its contents, to the
    /// diagnostic log.
    pub fn dump(&self, verbose: bool) {
        if verbose {
            trace!(
                label = %self.label,
                capacity = self.capacity(),
                write_cursor = self.write_cursor,
                read_cursor = self.read_cursor,
                buffered = self.buffered,
                "dumping buffer"
            );
        } else {
            debug!(label = %self.label, buffered = self.buffered, "buffer state");
        }
        if self.buffered > 0 {
            for chunk in self.active().chunks(CHUNK) {
                trace!(label = %self.label, "  {}", hex_line(chunk));
            }
        }
    }

    fn advance_read_cursor(&mut self, count: usize) {
        self.buffered += count;
        self.read_cursor += count;
    }

    fn advance_write_cursor(&mut self, count: usize) {
        self.buffered -= count;
        if self.buffered > 0 {
            self.write_cursor += count;
        } else {
            self.reset();
        }
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("label", &self.label)
            .field("capacity", &self.capacity())
            .field("write_cursor", &self.write_cursor)
            .field("read_cursor", &self.read_cursor)
            .field("buffered", &self.buffered)
            .field("eof_seen", &self.eof_seen)
            .finish()
    }
}

fn hex_line(chunk: &[u8]) -> String {
    use std::fmt::Write;
    let mut line = String::with_capacity(chunk.len() * 3 + chunk.len() + 2);
    for byte in chunk {
        let _ = write!(line, "{byte:02x} ");
    }
    line.push(' ');
    for &byte in chunk {
        line.push(if (0x20..0x7f).contains(&byte) {
            byte as char
        } else {
            '.'
        });
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_empty_with_full_room() {
        let buffer = RingBuffer::new("network", 64);
        assert_eq!(buffer.len(), 0);
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 64);
        assert_eq!(buffer.room_to_read(), 64);
        assert_eq!(buffer.room_to_write(), 0);
        assert!(!buffer.eof());
    }

    #[test]
    fn zero_capacity_falls_back_to_default() {
        let buffer = RingBuffer::new("network", 0);
        assert_eq!(buffer.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn append_and_active_round_trip() {
        let mut buffer = RingBuffer::new("serial", 16);
        assert_eq!(buffer.append(b"hello"), 5);
        assert_eq!(buffer.active(), b"hello");
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.room_to_write(), 5);
    }

    #[test]
    fn append_truncates_silently() {
        let mut buffer = RingBuffer::new("serial", 4);
        assert_eq!(buffer.append(b"abcdef"), 4);
        assert_eq!(buffer.active(), b"abcd");
        // full: nothing more fits
        assert_eq!(buffer.append(b"xy"), 0);
    }

    #[test]
    fn append_limited_honors_max() {
        let mut buffer = RingBuffer::new("serial", 16);
        assert_eq!(buffer.append_limited(b"abcdef", 3), 3);
        assert_eq!(buffer.active(), b"abc");
    }

    #[test]
    fn find_byte_handles_embedded_nul() {
        let mut buffer = RingBuffer::new("network", 16);
        buffer.append(&[1, 0, 0, 7, 0, 9]);
        assert_eq!(buffer.find_byte(7), Some(3));
        assert_eq!(buffer.find_byte(9), Some(5));
        assert_eq!(buffer.find_byte(42), None);
    }

    #[test]
    fn find_byte_at_respects_start() {
        let mut buffer = RingBuffer::new("network", 16);
        buffer.append(&[5, 1, 5, 1, 5]);
        assert_eq!(buffer.find_byte_at(1, 5), Some(2));
        assert_eq!(buffer.find_byte_at(3, 5), Some(4));
        assert_eq!(buffer.find_byte_at(5, 5), None);
    }

    #[test]
    fn insert_byte_then_find() {
        let mut buffer = RingBuffer::new("serial", 16);
        buffer.append(b"abcd");
        buffer.insert_byte(2, b'X').unwrap();
        assert_eq!(buffer.active(), b"abXcd");
        assert_eq!(buffer.find_byte(b'X'), Some(2));
    }

    #[test]
    fn insert_byte_at_read_cursor_appends() {
        let mut buffer = RingBuffer::new("serial", 16);
        buffer.append(b"ab");
        buffer.insert_byte(buffer.read_cursor(), b'c').unwrap();
        assert_eq!(buffer.active(), b"abc");
    }

    #[test]
    fn insert_byte_rejects_out_of_range_and_full() {
        let mut buffer = RingBuffer::new("serial", 4);
        buffer.append(b"ab");
        assert_eq!(
            buffer.insert_byte(3, b'X'),
            Err(BufferError::OutOfRange { position: 3 })
        );
        buffer.append(b"cd");
        assert_eq!(buffer.insert_byte(1, b'X'), Err(BufferError::NoRoom));
        assert_eq!(buffer.active(), b"abcd");
    }

    #[test]
    fn remove_range_shifts_left() {
        let mut buffer = RingBuffer::new("network", 16);
        buffer.append(b"abcdef");
        assert_eq!(buffer.remove_range(1, 2), 2);
        assert_eq!(buffer.active(), b"adef");
        assert_eq!(buffer.find_byte(b'b'), None);
        assert_eq!(buffer.find_byte(b'c'), None);
    }

    #[test]
    fn remove_range_reports_unclamped_count_when_emptying() {
        let mut buffer = RingBuffer::new("network", 16);
        buffer.append(b"abc");
        // asking for more than is buffered empties the buffer but reports
        // the requested count
        assert_eq!(buffer.remove_range(0, 100), 100);
        assert!(buffer.is_empty());
        assert_eq!(buffer.room_to_read(), 16);
    }

    #[test]
    fn remove_range_clamps_to_region_tail() {
        let mut buffer = RingBuffer::new("network", 16);
        buffer.append(b"abcdef");
        // 4 bytes from position 4 onward, but only 2 exist past it and
        // count < buffered, so the removal clamps
        assert_eq!(buffer.remove_range(4, 4), 2);
        assert_eq!(buffer.active(), b"abcd");
    }

    #[test]
    fn remove_range_out_of_range_removes_nothing() {
        let mut buffer = RingBuffer::new("network", 16);
        buffer.append(b"abc");
        assert_eq!(buffer.remove_range(7, 1), 0);
        assert_eq!(buffer.active(), b"abc");
    }

    #[tokio::test]
    async fn fill_then_drain_preserves_payload() {
        let (mut near, mut far) = tokio::io::duplex(64);
        let mut buffer = RingBuffer::new("network", 32);

        far.write_all(b"payload bytes").await.unwrap();
        let filled = buffer.fill_from(&mut near).await.unwrap();
        assert_eq!(filled, 13);
        assert_eq!(buffer.active(), b"payload bytes");

        let (mut sink_near, mut sink_far) = tokio::io::duplex(64);
        let drained = buffer.drain_to(&mut sink_near).await.unwrap();
        assert_eq!(drained, 13);
        assert!(buffer.is_empty());
        // empty after drain means the cursors reset to the origin
        assert_eq!(buffer.room_to_read(), 32);

        let mut copied = vec![0u8; 13];
        sink_far.read_exact(&mut copied).await.unwrap();
        assert_eq!(&copied, b"payload bytes");
    }

    #[tokio::test]
    async fn fill_sets_eof_on_closed_stream() {
        let (mut near, far) = tokio::io::duplex(64);
        drop(far);
        let mut buffer = RingBuffer::new("network", 32);
        let filled = buffer.fill_from(&mut near).await.unwrap();
        assert_eq!(filled, 0);
        assert!(buffer.eof());
    }

    #[tokio::test]
    async fn fill_on_full_buffer_reads_nothing() {
        let (mut near, mut far) = tokio::io::duplex(64);
        far.write_all(b"xx").await.unwrap();
        let mut buffer = RingBuffer::new("network", 4);
        buffer.append(b"abcd");
        assert_eq!(buffer.fill_from(&mut near).await.unwrap(), 0);
        assert_eq!(buffer.active(), b"abcd");
    }

    #[tokio::test]
    async fn bookkeeping_across_partial_drains() {
        let mut buffer = RingBuffer::new("network", 32);
        buffer.append(b"abcdefgh");

        // drain into a tiny duplex so only part is accepted at once
        let (mut sink_near, mut sink_far) = tokio::io::duplex(3);
        let drained = buffer.drain_to(&mut sink_near).await.unwrap();
        assert!(drained > 0 && drained < 8);
        assert_eq!(buffer.len(), 8 - drained);

        let mut front = vec![0u8; drained];
        sink_far.read_exact(&mut front).await.unwrap();
        assert_eq!(&front[..], &b"abcdefgh"[..drained]);

        // the remainder is still intact at the new write cursor
        assert_eq!(buffer.active(), &b"abcdefgh"[drained..]);
    }
}
