//! Buffer pool: a fixed array of frames caching file pages.

use crate::frame::{BufferFrame, FrameId};
use crate::page_table::PageTable;
use crate::replacer::{ClockReplacer, Replacer};
use acorn_common::page::{PageId, PAGE_SIZE};
use acorn_common::{AcornError, Result};
use parking_lot::Mutex;

/// A dirty page that was evicted to make room. The caller must write
/// it back to disk before reusing the frame's old contents are lost.
#[derive(Debug)]
pub struct EvictedPage {
    pub page_id: PageId,
    pub data: Box<[u8; PAGE_SIZE]>,
}

/// Configuration for the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferPoolConfig {
    /// Number of frames in the pool.
    pub num_frames: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self { num_frames: 1024 }
    }
}

/// Buffer pool manager.
///
/// Holds page images in a fixed set of frames, tracks residency in a
/// page table, counts pins, and evicts unpinned frames with a clock
/// policy when the pool is full. The pool performs no I/O itself:
/// loading takes the page image from the caller, and eviction hands a
/// dirty image back as [`EvictedPage`] for the caller to write out.
pub struct BufferPool {
    frames: Vec<BufferFrame>,
    page_table: PageTable,
    free_list: Mutex<Vec<FrameId>>,
    replacer: ClockReplacer,
}

impl BufferPool {
    /// Creates a new buffer pool.
    pub fn new(config: BufferPoolConfig) -> Self {
        let num_frames = config.num_frames;
        let frames: Vec<_> = (0..num_frames)
            .map(|i| BufferFrame::new(FrameId(i as u32)))
            .collect();
        // Popped from the back, so low frame ids go out first.
        let free_list: Vec<_> = (0..num_frames).rev().map(|i| FrameId(i as u32)).collect();

        Self {
            frames,
            page_table: PageTable::new(num_frames),
            free_list: Mutex::new(free_list),
            replacer: ClockReplacer::new(num_frames),
        }
    }

    /// Returns the number of frames in the pool.
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    /// Returns the number of free frames.
    pub fn free_count(&self) -> usize {
        self.free_list.lock().len()
    }

    /// Returns the number of pages currently resident.
    pub fn page_count(&self) -> usize {
        self.page_table.len()
    }

    /// Returns true if a page is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.page_table.contains(page_id)
    }

    /// Fetches a resident page, pinning it. Returns None on a miss.
    pub fn fetch_page(&self, page_id: PageId) -> Option<&BufferFrame> {
        let frame_id = self.page_table.get(page_id)?;
        let frame = &self.frames[frame_id.0 as usize];
        frame.pin();
        self.replacer.record_access(frame_id);
        Some(frame)
    }

    /// Claims a frame: from the free list if possible, otherwise by
    /// evicting an unpinned resident page.
    fn allocate_frame(&self) -> Result<(FrameId, Option<EvictedPage>)> {
        if let Some(frame_id) = self.free_list.lock().pop() {
            return Ok((frame_id, None));
        }

        let victim_id = self
            .replacer
            .evict(&|fid| self.frames[fid.0 as usize].pin_count() == 0)
            .ok_or(AcornError::BufferPoolFull)?;
        let frame = &self.frames[victim_id.0 as usize];

        let evicted = match (frame.is_dirty(), frame.page_id()) {
            (true, Some(page_id)) => {
                let mut data = Box::new([0u8; PAGE_SIZE]);
                data.copy_from_slice(&**frame.read_data());
                Some(EvictedPage { page_id, data })
            }
            _ => None,
        };

        if let Some(old_page_id) = frame.page_id() {
            self.page_table.remove(old_page_id);
        }

        Ok((victim_id, evicted))
    }

    /// Makes a page resident with zeroed content and pins it.
    ///
    /// If the page is already resident, the existing frame is pinned
    /// and returned. The second element is any dirty page that was
    /// evicted; the caller must write it back.
    pub fn new_page(&self, page_id: PageId) -> Result<(&BufferFrame, Option<EvictedPage>)> {
        if let Some(frame_id) = self.page_table.get(page_id) {
            let frame = &self.frames[frame_id.0 as usize];
            frame.pin();
            self.replacer.record_access(frame_id);
            return Ok((frame, None));
        }

        let (frame_id, evicted) = self.allocate_frame()?;
        let frame = &self.frames[frame_id.0 as usize];
        frame.reset();
        frame.set_page_id(Some(page_id));
        frame.pin();
        self.replacer.record_access(frame_id);
        self.page_table.insert(page_id, frame_id);

        Ok((frame, evicted))
    }

    /// Makes a page resident with the given image and pins it.
    pub fn load_page(
        &self,
        page_id: PageId,
        data: &[u8],
    ) -> Result<(&BufferFrame, Option<EvictedPage>)> {
        let (frame, evicted) = self.new_page(page_id)?;
        frame.copy_from(data);
        Ok((frame, evicted))
    }

    /// Releases one pin on a resident page, optionally marking it dirty.
    ///
    /// Returns false if the page is not resident or holds no pins.
    pub fn unpin_page(&self, page_id: PageId, dirty: bool) -> bool {
        let Some(frame_id) = self.page_table.get(page_id) else {
            return false;
        };
        let frame = &self.frames[frame_id.0 as usize];
        if frame.pin_count() == 0 {
            return false;
        }
        if dirty {
            frame.set_dirty(true);
        }
        frame.unpin();
        true
    }

    /// Returns the pin count of a resident page (0 if not resident).
    pub fn pin_count(&self, page_id: PageId) -> u32 {
        self.page_table
            .get(page_id)
            .map(|fid| self.frames[fid.0 as usize].pin_count())
            .unwrap_or(0)
    }

    /// Flushes every dirty resident page of one file through `flush_fn`
    /// and clears the dirty flags. Fails with `PagePinned` if any page
    /// of the file still holds a pin; the flush contract requires the
    /// caller to have released all pins first.
    pub fn flush_file<F>(&self, file_id: u32, mut flush_fn: F) -> Result<usize>
    where
        F: FnMut(PageId, &[u8]) -> Result<()>,
    {
        let mut pages = Vec::new();
        self.page_table.for_each(|page_id, frame_id| {
            if page_id.file_id == file_id {
                pages.push((page_id, frame_id));
            }
        });

        for &(page_id, frame_id) in &pages {
            if self.frames[frame_id.0 as usize].is_pinned() {
                return Err(AcornError::PagePinned { page_id });
            }
        }

        let mut flushed = 0;
        for (page_id, frame_id) in pages {
            let frame = &self.frames[frame_id.0 as usize];
            if frame.is_dirty() {
                flush_fn(page_id, &**frame.read_data())?;
                frame.set_dirty(false);
                flushed += 1;
            }
        }
        Ok(flushed)
    }

    /// Flushes all dirty resident pages through `flush_fn`, regardless
    /// of owning file. Used at shutdown.
    pub fn flush_all<F>(&self, mut flush_fn: F) -> Result<usize>
    where
        F: FnMut(PageId, &[u8]) -> Result<()>,
    {
        let mut pages = Vec::new();
        self.page_table.for_each(|page_id, frame_id| {
            pages.push((page_id, frame_id));
        });

        let mut flushed = 0;
        for (page_id, frame_id) in pages {
            let frame = &self.frames[frame_id.0 as usize];
            if frame.is_dirty() {
                flush_fn(page_id, &**frame.read_data())?;
                frame.set_dirty(false);
                flushed += 1;
            }
        }
        Ok(flushed)
    }
}
