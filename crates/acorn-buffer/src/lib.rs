//! Buffer pool management for AcornDB.
//!
//! This crate provides in-memory page caching with:
//! - Fixed-size buffer pool with configurable frame count
//! - Pin counting to protect pages in active use
//! - Dirty page tracking for write-back
//! - Clock eviction when the pool is full
//!
//! The pool is I/O-free: page images are loaded by the caller, and
//! eviction hands dirty images back for the caller to persist.

mod frame;
mod page_table;
mod pool;
mod replacer;

pub use frame::{BufferFrame, FrameId};
pub use pool::{BufferPool, BufferPoolConfig, EvictedPage};
pub use replacer::{ClockReplacer, Replacer};
