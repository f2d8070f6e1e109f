//! Buffer manager: the pinned-page contract over pool and disk.
//!
//! Every page access begins with a pin (`read_page` or `alloc_page`)
//! and ends with exactly one `unpin_page`, whose dirty flag must be
//! true iff the caller wrote to the page image. Unpinning a page that
//! holds no pin is a caller bug and fails with `PageNotPinned`.
//! `flush_file` requires all pins on the file to have been released.

use crate::disk::DiskManager;
use acorn_buffer::{BufferFrame, BufferPool, BufferPoolConfig, EvictedPage};
use acorn_common::page::{PageId, PAGE_SIZE};
use acorn_common::{AcornError, Result};
use std::sync::Arc;

/// Buffer manager combining the frame pool with disk I/O.
///
/// Page images live in the pool; misses are read from disk, and dirty
/// pages evicted by the pool are written back here before their frame
/// is reused.
pub struct BufferManager {
    disk: Arc<DiskManager>,
    pool: BufferPool,
}

impl BufferManager {
    /// Creates a buffer manager over a disk manager.
    pub fn new(disk: Arc<DiskManager>, config: BufferPoolConfig) -> Self {
        Self {
            disk,
            pool: BufferPool::new(config),
        }
    }

    /// Returns the underlying disk manager, for file-level operations
    /// (existence probes, open, create, delete).
    pub fn disk(&self) -> &DiskManager {
        &self.disk
    }

    fn write_back(&self, evicted: Option<EvictedPage>) -> Result<()> {
        if let Some(page) = evicted {
            self.disk.write_page(page.page_id, &page.data)?;
        }
        Ok(())
    }

    /// Pins a page, reading it from disk on a pool miss.
    pub fn read_page(&self, page_id: PageId) -> Result<&BufferFrame> {
        if let Some(frame) = self.pool.fetch_page(page_id) {
            return Ok(frame);
        }

        let image = self.disk.read_page(page_id)?;
        let (frame, evicted) = self.pool.load_page(page_id, &image)?;
        self.write_back(evicted)?;
        Ok(frame)
    }

    /// Allocates a fresh page in the file and pins it. The page image
    /// starts zeroed; its content is the caller's to define.
    pub fn alloc_page(&self, file_id: u32) -> Result<(PageId, &BufferFrame)> {
        let page_id = self.disk.allocate_page(file_id)?;
        let (frame, evicted) = self.pool.new_page(page_id)?;
        self.write_back(evicted)?;
        Ok((page_id, frame))
    }

    /// Releases one pin. `dirty` must be true iff the caller modified
    /// the page image while holding the pin.
    pub fn unpin_page(&self, page_id: PageId, dirty: bool) -> Result<()> {
        if self.pool.unpin_page(page_id, dirty) {
            Ok(())
        } else {
            Err(AcornError::PageNotPinned { page_id })
        }
    }

    /// Writes all dirty pages of a file to disk and syncs it. Fails
    /// with `PagePinned` if any page of the file is still pinned.
    pub fn flush_file(&self, file_id: u32) -> Result<()> {
        self.pool.flush_file(file_id, |page_id, data| {
            let image: &[u8; PAGE_SIZE] = data
                .try_into()
                .map_err(|_| AcornError::Corrupted(format!("bad image size for {}", page_id)))?;
            self.disk.write_page(page_id, image)
        })?;
        self.disk.flush_file(file_id)
    }

    /// Returns the pin count currently held on a page (0 if absent).
    /// Intended for assertions on the pin discipline.
    pub fn pin_count(&self, page_id: PageId) -> u32 {
        self.pool.pin_count(page_id)
    }
}
