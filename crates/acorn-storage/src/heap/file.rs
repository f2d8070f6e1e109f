//! Heap files: relations stored as a sequence of slotted pages.

use crate::bufmgr::BufferManager;
use crate::heap::page::HeapPage;
use crate::tuple::{RecordId, Tuple};
use acorn_common::page::PageId;
use acorn_common::{AcornError, Result};
use std::sync::Arc;

/// A heap file holding the tuples of one relation.
///
/// Inserts append to the last page, allocating a new one when it is
/// full. There is no delete or update path; the file exists to be
/// built once and scanned.
pub struct HeapFile {
    bufmgr: Arc<BufferManager>,
    file_id: u32,
    name: String,
}

impl HeapFile {
    /// Creates a new empty heap file.
    pub fn create(name: &str, bufmgr: Arc<BufferManager>) -> Result<Self> {
        let file_id = bufmgr.disk().create(name)?;
        log::debug!("created heap file {} (file id {})", name, file_id);
        Ok(Self {
            bufmgr,
            file_id,
            name: name.to_string(),
        })
    }

    /// Opens an existing heap file.
    pub fn open(name: &str, bufmgr: Arc<BufferManager>) -> Result<Self> {
        let file_id = bufmgr.disk().open(name)?;
        Ok(Self {
            bufmgr,
            file_id,
            name: name.to_string(),
        })
    }

    /// Returns the relation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the disk manager file id.
    pub fn file_id(&self) -> u32 {
        self.file_id
    }

    /// Returns the number of pages in the file.
    pub fn num_pages(&self) -> Result<u32> {
        self.bufmgr.disk().num_pages(self.file_id)
    }

    /// Inserts a record, returning its record id.
    pub fn insert_record(&self, record: &[u8]) -> Result<RecordId> {
        let num_pages = self.num_pages()?;

        // Records are appended in file order, so only the last page can
        // have room.
        if num_pages > 0 {
            let page_id = PageId::new(self.file_id, num_pages - 1);
            let frame = self.bufmgr.read_page(page_id)?;
            let mut page = HeapPage::from_bytes(&frame.read_data());
            match page.insert_record(record) {
                Ok(slot) => {
                    frame.write_data().copy_from_slice(page.as_bytes());
                    self.bufmgr.unpin_page(page_id, true)?;
                    return Ok(RecordId::new(page_id.page_num, slot));
                }
                Err(AcornError::PageFull) => {
                    self.bufmgr.unpin_page(page_id, false)?;
                }
                Err(e) => {
                    self.bufmgr.unpin_page(page_id, false)?;
                    return Err(e);
                }
            }
        }

        let (page_id, frame) = self.bufmgr.alloc_page(self.file_id)?;
        let mut page = HeapPage::new();
        let slot = match page.insert_record(record) {
            Ok(slot) => slot,
            Err(e) => {
                self.bufmgr.unpin_page(page_id, false)?;
                return Err(e);
            }
        };
        frame.write_data().copy_from_slice(page.as_bytes());
        self.bufmgr.unpin_page(page_id, true)?;
        Ok(RecordId::new(page_id.page_num, slot))
    }

    /// Fetches the tuple a record id points at, or None if the slot
    /// does not exist on that page.
    pub fn record(&self, rid: RecordId) -> Result<Option<Tuple>> {
        let page_id = PageId::new(self.file_id, rid.page_num);
        let frame = self.bufmgr.read_page(page_id)?;
        let record = HeapPage::from_bytes(&frame.read_data()).record(rid.slot);
        self.bufmgr.unpin_page(page_id, false)?;
        Ok(record.map(Tuple::new))
    }

    /// Starts a scan over all records in file order.
    pub fn scan(&self) -> Result<HeapScan<'_>> {
        Ok(HeapScan {
            heap: self,
            num_pages: self.num_pages()?,
            next_page: 0,
            next_slot: 0,
        })
    }

    /// Flushes all dirty pages of the file to disk.
    pub fn flush(&self) -> Result<()> {
        self.bufmgr.flush_file(self.file_id)
    }
}

/// Cursor over the records of a heap file.
///
/// `next_record` yields `(RecordId, Tuple)` pairs in file order and
/// reports exhaustion as `AcornError::EndOfFile`, which callers
/// driving a bulk load recover from to end their loop.
pub struct HeapScan<'a> {
    heap: &'a HeapFile,
    num_pages: u32,
    next_page: u32,
    next_slot: u16,
}

impl HeapScan<'_> {
    /// Returns the next record, or `EndOfFile` once the file is
    /// exhausted. Pages are pinned only for the duration of each call.
    pub fn next_record(&mut self) -> Result<(RecordId, Tuple)> {
        while self.next_page < self.num_pages {
            let page_id = PageId::new(self.heap.file_id, self.next_page);
            let frame = self.heap.bufmgr.read_page(page_id)?;
            let page = HeapPage::from_bytes(&frame.read_data());
            let record = page.record(self.next_slot);
            self.heap.bufmgr.unpin_page(page_id, false)?;

            match record {
                Some(data) => {
                    let rid = RecordId::new(self.next_page, self.next_slot);
                    self.next_slot += 1;
                    return Ok((rid, Tuple::new(data)));
                }
                None => {
                    self.next_page += 1;
                    self.next_slot = 0;
                }
            }
        }
        Err(AcornError::EndOfFile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::{DiskManager, DiskManagerConfig};
    use acorn_buffer::BufferPoolConfig;
    use tempfile::tempdir;

    fn create_test_bufmgr() -> (Arc<BufferManager>, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let disk = Arc::new(
            DiskManager::new(DiskManagerConfig {
                data_dir: dir.path().to_path_buf(),
                fsync_enabled: false,
            })
            .unwrap(),
        );
        let bufmgr = Arc::new(BufferManager::new(
            disk,
            BufferPoolConfig { num_frames: 32 },
        ));
        (bufmgr, dir)
    }

    #[test]
    fn test_create_and_insert() {
        let (bufmgr, _dir) = create_test_bufmgr();
        let heap = HeapFile::create("relA", bufmgr).unwrap();

        let rid = heap.insert_record(b"hello world").unwrap();
        assert_eq!(rid.page_num, 0);
        assert_eq!(rid.slot, 0);

        let tuple = heap.record(rid).unwrap().unwrap();
        assert_eq!(tuple.data().as_ref(), b"hello world");
    }

    #[test]
    fn test_insert_spans_pages() {
        let (bufmgr, _dir) = create_test_bufmgr();
        let heap = HeapFile::create("relA", bufmgr).unwrap();

        // ~1 KB records: four fit per 4 KB page.
        let record = vec![7u8; 1000];
        let mut rids = Vec::new();
        for _ in 0..10 {
            rids.push(heap.insert_record(&record).unwrap());
        }

        assert!(heap.num_pages().unwrap() > 1);
        for rid in rids {
            assert!(heap.record(rid).unwrap().is_some());
        }
    }

    #[test]
    fn test_scan_yields_all_records_in_order() {
        let (bufmgr, _dir) = create_test_bufmgr();
        let heap = HeapFile::create("relA", bufmgr).unwrap();

        let mut expected = Vec::new();
        for i in 0..500u32 {
            let record = i.to_le_bytes();
            expected.push((heap.insert_record(&record).unwrap(), record));
        }

        let mut scan = heap.scan().unwrap();
        let mut seen = 0;
        loop {
            match scan.next_record() {
                Ok((rid, tuple)) => {
                    let (expected_rid, expected_data) = expected[seen];
                    assert_eq!(rid, expected_rid);
                    assert_eq!(tuple.data().as_ref(), &expected_data);
                    seen += 1;
                }
                Err(AcornError::EndOfFile) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(seen, 500);
    }

    #[test]
    fn test_scan_empty_file() {
        let (bufmgr, _dir) = create_test_bufmgr();
        let heap = HeapFile::create("relA", bufmgr).unwrap();

        let mut scan = heap.scan().unwrap();
        assert!(matches!(scan.next_record(), Err(AcornError::EndOfFile)));
    }

    #[test]
    fn test_open_missing_relation() {
        let (bufmgr, _dir) = create_test_bufmgr();
        assert!(matches!(
            HeapFile::open("ghost", bufmgr),
            Err(AcornError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_reopen_preserves_records() {
        let (bufmgr, _dir) = create_test_bufmgr();
        {
            let heap = HeapFile::create("relA", bufmgr.clone()).unwrap();
            heap.insert_record(b"durable").unwrap();
            heap.flush().unwrap();
        }
        let heap = HeapFile::open("relA", bufmgr).unwrap();
        let tuple = heap.record(RecordId::new(0, 0)).unwrap().unwrap();
        assert_eq!(tuple.data().as_ref(), b"durable");
    }
}
