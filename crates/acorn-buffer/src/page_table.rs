//! Page table mapping resident page ids to frame ids.

use crate::frame::FrameId;
use acorn_common::page::PageId;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Map from PageId to the frame currently holding that page.
pub struct PageTable {
    map: Mutex<HashMap<PageId, FrameId>>,
}

impl PageTable {
    /// Creates a page table sized for the given number of frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            map: Mutex::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Looks up the frame holding a page, if resident.
    pub fn get(&self, page_id: PageId) -> Option<FrameId> {
        self.map.lock().get(&page_id).copied()
    }

    /// Records that a page now resides in a frame.
    pub fn insert(&self, page_id: PageId, frame_id: FrameId) {
        self.map.lock().insert(page_id, frame_id);
    }

    /// Removes a page's mapping, returning its frame if it was resident.
    pub fn remove(&self, page_id: PageId) -> Option<FrameId> {
        self.map.lock().remove(&page_id)
    }

    /// Returns true if the page is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        self.map.lock().contains_key(&page_id)
    }

    /// Number of resident pages.
    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    /// Returns true if no pages are resident.
    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }

    /// Calls `f` for each resident (page, frame) pair. Iteration order
    /// is unspecified.
    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(PageId, FrameId),
    {
        for (&page_id, &frame_id) in self.map.lock().iter() {
            f(page_id, frame_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get() {
        let table = PageTable::new(8);
        let page_id = PageId::new(0, 42);

        table.insert(page_id, FrameId(7));
        assert_eq!(table.get(page_id), Some(FrameId(7)));
        assert!(table.contains(page_id));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_remove() {
        let table = PageTable::new(8);
        let page_id = PageId::new(1, 42);

        table.insert(page_id, FrameId(3));
        assert_eq!(table.remove(page_id), Some(FrameId(3)));
        assert_eq!(table.get(page_id), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_update_existing() {
        let table = PageTable::new(8);
        let page_id = PageId::new(0, 1);

        table.insert(page_id, FrameId(1));
        table.insert(page_id, FrameId(2));
        assert_eq!(table.get(page_id), Some(FrameId(2)));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_for_each() {
        let table = PageTable::new(8);
        table.insert(PageId::new(0, 1), FrameId(1));
        table.insert(PageId::new(0, 2), FrameId(2));

        let mut seen = Vec::new();
        table.for_each(|page_id, frame_id| seen.push((page_id, frame_id)));
        seen.sort_by_key(|(p, _)| p.page_num);
        assert_eq!(
            seen,
            vec![
                (PageId::new(0, 1), FrameId(1)),
                (PageId::new(0, 2), FrameId(2)),
            ]
        );
    }
}
