//! Mapped-window lifecycle.
//!
//! The quantum file is written through a sequence of fixed-capacity
//! memory-mapped windows. At most one window is live at a time; it is owned
//! and mutated only by the worker thread. A window never accepts a write
//! that does not fit in its remaining capacity; the worker forces the old
//! window and maps the next one instead, so no envelope ever spans two
//! windows.

use std::fs::File;
use std::io;

use memmap2::{MmapMut, MmapOptions};

/// Default window capacity: just under 2^31 bytes, the practical limit of a
/// single mapped region's addressable range in the surrounding system.
pub const DEFAULT_WINDOW_CAPACITY: usize = i32::MAX as usize;

/// A write did not fit in the live window's remaining capacity.
///
/// The caller is expected to force the window, rotate, and retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeedsRotation {
    /// Bytes the rejected write required
    pub required: usize,
    /// Bytes left in the window
    pub remaining: usize,
}

/// A fixed-capacity mapped view onto a contiguous region of the log file.
///
/// Anchored at `base` (a file offset), with a cursor marking the next free
/// byte. The file is extended to `base + capacity` when the window is
/// mapped; unwritten tail bytes stay zero until the writer truncates the
/// file to its logical length on close.
pub struct MappedWindow {
    mmap: MmapMut,
    base: u64,
    capacity: usize,
    cursor: usize,
}

impl MappedWindow {
    /// Maps a window of `capacity` bytes anchored at file offset `base`,
    /// extending the file as needed.
    pub fn map(file: &File, base: u64, capacity: usize) -> io::Result<Self> {
        let required_len = base + capacity as u64;
        if file.metadata()?.len() < required_len {
            file.set_len(required_len)?;
            // File growth is metadata; it must reach disk before forced
            // pages in the new region count as durable.
            file.sync_all()?;
        }

        // SAFETY: the file is owned exclusively by one writer, only the
        // worker thread touches the mapping, and the file is never shrunk
        // while a window is live.
        let mmap = unsafe {
            MmapOptions::new()
                .offset(base)
                .len(capacity)
                .map_mut(file)?
        };

        Ok(Self {
            mmap,
            base,
            capacity,
            cursor: 0,
        })
    }

    /// Appends `bytes` at the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`NeedsRotation`] without writing anything if the window's
    /// remaining capacity is insufficient. Partial writes never happen.
    pub fn try_write(&mut self, bytes: &[u8]) -> Result<(), NeedsRotation> {
        let remaining = self.remaining();
        if bytes.len() > remaining {
            return Err(NeedsRotation {
                required: bytes.len(),
                remaining,
            });
        }

        self.mmap[self.cursor..self.cursor + bytes.len()].copy_from_slice(bytes);
        self.cursor += bytes.len();
        Ok(())
    }

    /// Forces the window's dirty pages to stable storage.
    pub fn force(&self) -> io::Result<()> {
        self.mmap.flush()
    }

    /// Bytes left before the window is exhausted.
    pub fn remaining(&self) -> usize {
        self.capacity - self.cursor
    }

    /// File offset of the window's first byte.
    pub fn base_offset(&self) -> u64 {
        self.base
    }

    /// File offset one past the last written byte. Rotation anchors the
    /// next window here, so the byte stream stays gap-free across window
    /// boundaries.
    pub fn logical_end(&self) -> u64 {
        self.base + self.cursor as u64
    }
}
