//! Error types for AcornDB.

use crate::page::PageId;
use thiserror::Error;

/// Result type alias using AcornError.
pub type Result<T> = std::result::Result<T, AcornError>;

/// Errors that can occur in AcornDB operations.
#[derive(Debug, Error)]
pub enum AcornError {
    // I/O and file errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("file already exists: {0}")]
    FileExists(String),

    #[error("page {page_id} does not exist")]
    PageNotFound { page_id: PageId },

    // Buffer manager errors
    #[error("buffer pool full, unable to allocate a frame")]
    BufferPoolFull,

    #[error("page {page_id} is not pinned")]
    PageNotPinned { page_id: PageId },

    #[error("page {page_id} is still pinned")]
    PagePinned { page_id: PageId },

    // Heap file errors
    #[error("page full, unable to insert record")]
    PageFull,

    #[error("record too large: {size} bytes (page holds at most {max})")]
    RecordTooLarge { size: usize, max: usize },

    /// Raised by the relation scan once all records have been read.
    /// The index build loop recovers from this internally.
    #[error("end of file reached")]
    EndOfFile,

    // Index errors
    #[error("bad index info: {0}")]
    BadIndexInfo(String),

    #[error("bad scan operator")]
    BadOpcodes,

    #[error("bad scan range: low {low} exceeds high {high}")]
    BadScanrange { low: i32, high: i32 },

    #[error("no key found in the requested range")]
    NoSuchKeyFound,

    #[error("scan is not initialized")]
    ScanNotInitialized,

    #[error("index scan completed")]
    IndexScanCompleted,

    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    // Internal errors
    #[error("corrupted data: {0}")]
    Corrupted(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_conversion() {
        let io_err = IoError::new(ErrorKind::NotFound, "missing");
        let err: AcornError = io_err.into();
        assert!(matches!(err, AcornError::Io(_)));
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_buffer_errors_display() {
        let page_id = PageId::new(1, 7);
        assert_eq!(
            AcornError::PageNotPinned { page_id }.to_string(),
            "page 1:7 is not pinned"
        );
        assert_eq!(
            AcornError::PagePinned { page_id }.to_string(),
            "page 1:7 is still pinned"
        );
        assert_eq!(
            AcornError::BufferPoolFull.to_string(),
            "buffer pool full, unable to allocate a frame"
        );
    }

    #[test]
    fn test_scan_errors_display() {
        assert_eq!(
            AcornError::BadScanrange { low: 5, high: 2 }.to_string(),
            "bad scan range: low 5 exceeds high 2"
        );
        assert_eq!(AcornError::BadOpcodes.to_string(), "bad scan operator");
        assert_eq!(
            AcornError::NoSuchKeyFound.to_string(),
            "no key found in the requested range"
        );
        assert_eq!(
            AcornError::ScanNotInitialized.to_string(),
            "scan is not initialized"
        );
        assert_eq!(
            AcornError::IndexScanCompleted.to_string(),
            "index scan completed"
        );
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(AcornError::EndOfFile)
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AcornError>();
    }
}
