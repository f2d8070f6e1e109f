//! Disk manager for page-level I/O over named files.
//!
//! Every relation and index lives in its own file under the data
//! directory. Files are registered by name and addressed afterwards by
//! a numeric file id, which also keys the pages in the buffer pool.

use acorn_common::page::{PageId, PAGE_SIZE};
use acorn_common::{AcornError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Configuration for the disk manager.
#[derive(Debug, Clone)]
pub struct DiskManagerConfig {
    /// Base directory for data files.
    pub data_dir: PathBuf,
    /// Enable fsync after writes.
    pub fsync_enabled: bool,
}

impl Default for DiskManagerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            fsync_enabled: true,
        }
    }
}

/// Handle for an open data file.
struct FileHandle {
    file: File,
    name: String,
    /// Number of pages currently in the file.
    num_pages: u32,
}

#[derive(Default)]
struct DiskInner {
    files: HashMap<u32, FileHandle>,
    ids_by_name: HashMap<String, u32>,
    next_file_id: u32,
}

/// Manages reading and writing pages of named files.
pub struct DiskManager {
    config: DiskManagerConfig,
    inner: Mutex<DiskInner>,
}

impl DiskManager {
    /// Creates a new disk manager, creating the data directory if needed.
    pub fn new(config: DiskManagerConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        Ok(Self {
            config,
            inner: Mutex::new(DiskInner::default()),
        })
    }

    /// Returns the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.config.data_dir.join(name)
    }

    /// Returns true if a file with this name exists on disk.
    pub fn exists(&self, name: &str) -> bool {
        self.file_path(name).exists()
    }

    fn register(&self, inner: &mut DiskInner, name: &str, file: File) -> Result<u32> {
        let file_size = file.metadata()?.len();
        let num_pages = (file_size / PAGE_SIZE as u64) as u32;

        let file_id = inner.next_file_id;
        inner.next_file_id += 1;
        inner.files.insert(
            file_id,
            FileHandle {
                file,
                name: name.to_string(),
                num_pages,
            },
        );
        inner.ids_by_name.insert(name.to_string(), file_id);
        Ok(file_id)
    }

    /// Opens an existing file, returning its file id. Opening a file
    /// that is already open returns the same id.
    pub fn open(&self, name: &str) -> Result<u32> {
        let mut inner = self.inner.lock();
        if let Some(&file_id) = inner.ids_by_name.get(name) {
            return Ok(file_id);
        }

        let path = self.file_path(name);
        if !path.exists() {
            return Err(AcornError::FileNotFound(name.to_string()));
        }
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        self.register(&mut inner, name, file)
    }

    /// Creates a new empty file, returning its file id.
    pub fn create(&self, name: &str) -> Result<u32> {
        let mut inner = self.inner.lock();
        if inner.ids_by_name.contains_key(name) || self.file_path(name).exists() {
            return Err(AcornError::FileExists(name.to_string()));
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(self.file_path(name))?;
        self.register(&mut inner, name, file)
    }

    fn handle<'a>(inner: &'a mut DiskInner, file_id: u32) -> Result<&'a mut FileHandle> {
        inner
            .files
            .get_mut(&file_id)
            .ok_or_else(|| AcornError::Corrupted(format!("file {} is not open", file_id)))
    }

    /// Reads a page from disk.
    pub fn read_page(&self, page_id: PageId) -> Result<[u8; PAGE_SIZE]> {
        let mut inner = self.inner.lock();
        let handle = Self::handle(&mut inner, page_id.file_id)?;

        if page_id.page_num >= handle.num_pages {
            return Err(AcornError::PageNotFound { page_id });
        }

        let offset = (page_id.page_num as u64) * (PAGE_SIZE as u64);
        handle.file.seek(SeekFrom::Start(offset))?;

        let mut buffer = [0u8; PAGE_SIZE];
        handle.file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Writes a page to disk.
    pub fn write_page(&self, page_id: PageId, data: &[u8; PAGE_SIZE]) -> Result<()> {
        let fsync = self.config.fsync_enabled;
        let mut inner = self.inner.lock();
        let handle = Self::handle(&mut inner, page_id.file_id)?;

        let offset = (page_id.page_num as u64) * (PAGE_SIZE as u64);
        handle.file.seek(SeekFrom::Start(offset))?;
        handle.file.write_all(data)?;
        if fsync {
            handle.file.sync_all()?;
        }

        if page_id.page_num >= handle.num_pages {
            handle.num_pages = page_id.page_num + 1;
        }
        Ok(())
    }

    /// Extends a file by one zeroed page and returns its PageId.
    pub fn allocate_page(&self, file_id: u32) -> Result<PageId> {
        let fsync = self.config.fsync_enabled;
        let mut inner = self.inner.lock();
        let handle = Self::handle(&mut inner, file_id)?;

        let page_num = handle.num_pages;
        let offset = (page_num as u64) * (PAGE_SIZE as u64);
        handle.file.seek(SeekFrom::Start(offset))?;
        handle.file.write_all(&[0u8; PAGE_SIZE])?;
        if fsync {
            handle.file.sync_all()?;
        }
        handle.num_pages = page_num + 1;

        Ok(PageId::new(file_id, page_num))
    }

    /// Returns the number of pages in a file.
    pub fn num_pages(&self, file_id: u32) -> Result<u32> {
        let mut inner = self.inner.lock();
        Ok(Self::handle(&mut inner, file_id)?.num_pages)
    }

    /// Syncs a file's contents to disk.
    pub fn flush_file(&self, file_id: u32) -> Result<()> {
        let mut inner = self.inner.lock();
        Self::handle(&mut inner, file_id)?.file.sync_all()?;
        Ok(())
    }

    /// Closes a file, syncing it first.
    pub fn close_file(&self, file_id: u32) -> Result<()> {
        let mut inner = self.inner.lock();
        if let Some(handle) = inner.files.remove(&file_id) {
            inner.ids_by_name.remove(&handle.name);
            handle.file.sync_all()?;
        }
        Ok(())
    }

    /// Deletes a file from disk, closing it if open.
    pub fn delete_file(&self, name: &str) -> Result<()> {
        {
            let mut inner = self.inner.lock();
            if let Some(file_id) = inner.ids_by_name.remove(name) {
                inner.files.remove(&file_id);
            }
        }
        let path = self.file_path(name);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Closes all open files.
    pub fn close_all(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.ids_by_name.clear();
        for (_, handle) in inner.files.drain() {
            handle.file.sync_all()?;
        }
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let _ = self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn create_test_disk() -> (DiskManager, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = DiskManagerConfig {
            data_dir: dir.path().to_path_buf(),
            fsync_enabled: false,
        };
        (DiskManager::new(config).unwrap(), dir)
    }

    #[test]
    fn test_create_and_exists() {
        let (disk, _dir) = create_test_disk();

        assert!(!disk.exists("relA"));
        disk.create("relA").unwrap();
        assert!(disk.exists("relA"));
    }

    #[test]
    fn test_create_twice_fails() {
        let (disk, _dir) = create_test_disk();

        disk.create("relA").unwrap();
        assert!(matches!(
            disk.create("relA"),
            Err(AcornError::FileExists(_))
        ));
    }

    #[test]
    fn test_open_missing_fails() {
        let (disk, _dir) = create_test_disk();
        assert!(matches!(
            disk.open("nope"),
            Err(AcornError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_open_returns_same_id() {
        let (disk, _dir) = create_test_disk();
        let id = disk.create("relA").unwrap();
        assert_eq!(disk.open("relA").unwrap(), id);
    }

    #[test]
    fn test_allocate_and_count() {
        let (disk, _dir) = create_test_disk();
        let file_id = disk.create("relA").unwrap();

        assert_eq!(disk.num_pages(file_id).unwrap(), 0);

        let p0 = disk.allocate_page(file_id).unwrap();
        let p1 = disk.allocate_page(file_id).unwrap();
        assert_eq!(p0.page_num, 0);
        assert_eq!(p1.page_num, 1);
        assert_eq!(disk.num_pages(file_id).unwrap(), 2);
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (disk, _dir) = create_test_disk();
        let file_id = disk.create("relA").unwrap();
        let page_id = disk.allocate_page(file_id).unwrap();

        let mut data = [0u8; PAGE_SIZE];
        data[0] = 0xAB;
        data[PAGE_SIZE - 1] = 0xEF;
        disk.write_page(page_id, &data).unwrap();

        let read = disk.read_page(page_id).unwrap();
        assert_eq!(read[0], 0xAB);
        assert_eq!(read[PAGE_SIZE - 1], 0xEF);
    }

    #[test]
    fn test_read_past_end_fails() {
        let (disk, _dir) = create_test_disk();
        let file_id = disk.create("relA").unwrap();
        disk.allocate_page(file_id).unwrap();

        let result = disk.read_page(PageId::new(file_id, 99));
        assert!(matches!(result, Err(AcornError::PageNotFound { .. })));
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let page_num;
        {
            let disk = DiskManager::new(DiskManagerConfig {
                data_dir: dir.path().to_path_buf(),
                fsync_enabled: true,
            })
            .unwrap();
            let file_id = disk.create("relA").unwrap();
            let page_id = disk.allocate_page(file_id).unwrap();
            page_num = page_id.page_num;

            let mut data = [0u8; PAGE_SIZE];
            data[7] = 0x77;
            disk.write_page(page_id, &data).unwrap();
        }
        {
            let disk = DiskManager::new(DiskManagerConfig {
                data_dir: dir.path().to_path_buf(),
                fsync_enabled: true,
            })
            .unwrap();
            let file_id = disk.open("relA").unwrap();
            assert_eq!(disk.num_pages(file_id).unwrap(), 1);
            let data = disk.read_page(PageId::new(file_id, page_num)).unwrap();
            assert_eq!(data[7], 0x77);
        }
    }

    #[test]
    fn test_delete_file() {
        let (disk, dir) = create_test_disk();
        disk.create("relA").unwrap();
        assert!(dir.path().join("relA").exists());

        disk.delete_file("relA").unwrap();
        assert!(!dir.path().join("relA").exists());
        assert!(!disk.exists("relA"));
    }

    #[test]
    fn test_close_and_reopen() {
        let (disk, _dir) = create_test_disk();
        let file_id = disk.create("relA").unwrap();
        disk.allocate_page(file_id).unwrap();
        disk.close_file(file_id).unwrap();

        let reopened = disk.open("relA").unwrap();
        assert_eq!(disk.num_pages(reopened).unwrap(), 1);
    }
}
