//! Storage engine for AcornDB.
//!
//! This crate provides:
//! - Disk manager for page-level I/O over named files
//! - Buffer manager enforcing the pin/unpin page contract
//! - Heap files for record storage and relation scans
//! - A disk-resident B+ tree secondary index over an integer attribute

mod btree;
mod bufmgr;
mod disk;
mod heap;
mod tuple;

pub use btree::{
    BTreeIndex, IndexMetaPage, InternalNode, LeafEntry, LeafNode, Operator,
    INTERNAL_CAPACITY, LEAF_CAPACITY,
};
pub use bufmgr::BufferManager;
pub use disk::{DiskManager, DiskManagerConfig};
pub use heap::{HeapFile, HeapPage, HeapScan};
pub use tuple::{RecordId, Tuple};
