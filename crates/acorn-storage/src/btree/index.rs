//! B+ tree index lifecycle and insertion.

use crate::btree::node::{
    IndexMetaPage, InternalNode, LeafNode, RELATION_NAME_SIZE,
};
use crate::btree::scan::ScanState;
use crate::bufmgr::BufferManager;
use crate::heap::HeapFile;
use crate::tuple::RecordId;
use acorn_common::page::PageId;
use acorn_common::types::KeyType;
use acorn_common::{AcornError, Result};
use std::sync::Arc;

/// Page number of the header page within an index file.
const HEADER_PAGE_NUM: u32 = 0;

/// Page number of the root leaf created with the file. The root only
/// ever moves away from here, on promotion, so "root is still the
/// initial page" is equivalent to "the tree is a single leaf".
const INITIAL_ROOT_PAGE_NUM: u32 = 1;

/// Upper bound on tree depth, far beyond what the page capacities can
/// produce; descents that exceed it indicate a corrupted file.
const MAX_HEIGHT: usize = 16;

/// A B+ tree secondary index over one integer attribute of a relation.
///
/// The index lives in its own page file. Keys are 32-bit signed
/// integers extracted from each record at a fixed byte offset, values
/// are the records' [`RecordId`]s. Keys are assumed unique; the design
/// supports insertion and range scans only.
pub struct BTreeIndex {
    bufmgr: Arc<BufferManager>,
    file_id: u32,
    index_name: String,
    relation_name: String,
    key_byte_offset: usize,
    key_type: KeyType,
    root_page_num: u32,
    /// True while the tree is a single leaf (the initial root).
    single_root: bool,
    pub(crate) scan: Option<ScanState>,
}

impl BTreeIndex {
    /// Returns the index file name derived from a relation name and
    /// key byte offset.
    pub fn index_file_name(relation_name: &str, key_byte_offset: usize) -> String {
        format!("{}.{}", relation_name, key_byte_offset)
    }

    /// Opens the index for `relation_name` keyed at `key_byte_offset`,
    /// building it from the relation's tuples if no index file exists.
    ///
    /// Opening an existing file validates the stored relation name,
    /// key offset, and key type against the parameters and fails with
    /// `BadIndexInfo` on any mismatch.
    pub fn open_or_build(
        relation_name: &str,
        bufmgr: Arc<BufferManager>,
        key_byte_offset: usize,
        key_type: KeyType,
    ) -> Result<Self> {
        if relation_name.len() > RELATION_NAME_SIZE {
            return Err(AcornError::BadIndexInfo(format!(
                "relation name exceeds {} bytes",
                RELATION_NAME_SIZE
            )));
        }

        let index_name = Self::index_file_name(relation_name, key_byte_offset);
        if bufmgr.disk().exists(&index_name) {
            Self::open(relation_name, index_name, bufmgr, key_byte_offset, key_type)
        } else {
            Self::build(relation_name, index_name, bufmgr, key_byte_offset, key_type)
        }
    }

    /// Returns the name of the index file.
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Returns the indexed relation's name.
    pub fn relation_name(&self) -> &str {
        &self.relation_name
    }

    /// Returns the key byte offset within each record.
    pub fn key_byte_offset(&self) -> usize {
        self.key_byte_offset
    }

    fn page(&self, page_num: u32) -> PageId {
        PageId::new(self.file_id, page_num)
    }

    fn open(
        relation_name: &str,
        index_name: String,
        bufmgr: Arc<BufferManager>,
        key_byte_offset: usize,
        key_type: KeyType,
    ) -> Result<Self> {
        let file_id = bufmgr.disk().open(&index_name)?;

        let header_id = PageId::new(file_id, HEADER_PAGE_NUM);
        let frame = bufmgr.read_page(header_id)?;
        let meta = IndexMetaPage::read(&frame.read_data());
        bufmgr.unpin_page(header_id, false)?;
        let meta = meta?;

        if meta.relation_name != relation_name
            || meta.key_byte_offset as usize != key_byte_offset
            || meta.key_type != key_type
        {
            return Err(AcornError::BadIndexInfo(format!(
                "index {} was built over {} (offset {}, {}), not {} (offset {}, {})",
                index_name,
                meta.relation_name,
                meta.key_byte_offset,
                meta.key_type,
                relation_name,
                key_byte_offset,
                key_type,
            )));
        }

        let root_page_num = meta.root_page_num;
        log::debug!(
            "opened index {} (root page {})",
            index_name,
            root_page_num
        );

        Ok(Self {
            bufmgr,
            file_id,
            index_name,
            relation_name: relation_name.to_string(),
            key_byte_offset,
            key_type,
            root_page_num,
            single_root: root_page_num == INITIAL_ROOT_PAGE_NUM,
            scan: None,
        })
    }

    fn build(
        relation_name: &str,
        index_name: String,
        bufmgr: Arc<BufferManager>,
        key_byte_offset: usize,
        key_type: KeyType,
    ) -> Result<Self> {
        if key_type != KeyType::Int32 {
            return Err(AcornError::UnsupportedKeyType(key_type.to_string()));
        }

        let file_id = bufmgr.disk().create(&index_name)?;

        let (header_id, header_frame) = bufmgr.alloc_page(file_id)?;
        debug_assert_eq!(header_id.page_num, HEADER_PAGE_NUM);
        let meta = IndexMetaPage {
            relation_name: relation_name.to_string(),
            key_byte_offset: key_byte_offset as u32,
            key_type,
            root_page_num: INITIAL_ROOT_PAGE_NUM,
        };
        meta.write(&mut header_frame.write_data());
        bufmgr.unpin_page(header_id, true)?;

        let (root_id, root_frame) = bufmgr.alloc_page(file_id)?;
        debug_assert_eq!(root_id.page_num, INITIAL_ROOT_PAGE_NUM);
        LeafNode::new().write(&mut root_frame.write_data());
        bufmgr.unpin_page(root_id, true)?;

        log::debug!("created index {}, building from {}", index_name, relation_name);

        let mut index = Self {
            bufmgr: bufmgr.clone(),
            file_id,
            index_name,
            relation_name: relation_name.to_string(),
            key_byte_offset,
            key_type,
            root_page_num: INITIAL_ROOT_PAGE_NUM,
            single_root: true,
            scan: None,
        };

        let relation = HeapFile::open(relation_name, bufmgr)?;
        let mut scan = relation.scan()?;
        let mut built = 0u64;
        loop {
            match scan.next_record() {
                Ok((rid, tuple)) => {
                    let key = tuple.read_i32_at(key_byte_offset).ok_or_else(|| {
                        AcornError::Corrupted(format!(
                            "record {} of {} is too short for a key at offset {}",
                            rid, relation_name, key_byte_offset
                        ))
                    })?;
                    index.insert_entry(key, rid)?;
                    built += 1;
                }
                Err(AcornError::EndOfFile) => break,
                Err(e) => return Err(e),
            }
        }
        log::debug!("built index {} over {} tuples", index.index_name, built);

        Ok(index)
    }

    /// Descends from the root to the leaf that would contain `key`.
    ///
    /// Returns the leaf's page number plus the internal ancestors
    /// visited, root first. Each ancestor page is unpinned (clean)
    /// before its child is examined.
    pub(crate) fn search_to_leaf(&self, key: i32) -> Result<(u32, Vec<u32>)> {
        if self.single_root {
            return Ok((self.root_page_num, Vec::new()));
        }

        let mut ancestors = Vec::new();
        let mut current = self.root_page_num;
        for _ in 0..MAX_HEIGHT {
            let page_id = self.page(current);
            let frame = self.bufmgr.read_page(page_id)?;
            let node = InternalNode::read(&frame.read_data());
            self.bufmgr.unpin_page(page_id, false)?;

            let child = node.children[node.child_index(key)];
            ancestors.push(current);
            if node.level == 1 {
                return Ok((child, ancestors));
            }
            current = child;
        }
        Err(AcornError::Corrupted(format!(
            "index {} deeper than {} levels",
            self.index_name, MAX_HEIGHT
        )))
    }

    /// Inserts a (key, rid) data entry.
    ///
    /// Keys are assumed unique; inserting a duplicate leaves the tree
    /// ordered but which entry a scan returns first is unspecified.
    pub fn insert_entry(&mut self, key: i32, rid: RecordId) -> Result<()> {
        let bufmgr = self.bufmgr.clone();
        let (leaf_num, mut ancestors) = self.search_to_leaf(key)?;

        let leaf_id = self.page(leaf_num);
        let frame = bufmgr.read_page(leaf_id)?;
        let mut leaf = LeafNode::read(&frame.read_data());

        if !leaf.is_full() {
            leaf.insert(key, rid);
            leaf.write(&mut frame.write_data());
            return bufmgr.unpin_page(leaf_id, true);
        }

        let (new_id, new_frame) = bufmgr.alloc_page(self.file_id)?;
        let (separator, new_leaf) = leaf.split_insert(key, rid, new_id.page_num);
        leaf.write(&mut frame.write_data());
        new_leaf.write(&mut new_frame.write_data());
        bufmgr.unpin_page(leaf_id, true)?;
        bufmgr.unpin_page(new_id, true)?;
        log::trace!(
            "split leaf {} of {}, new leaf {}",
            leaf_num,
            self.index_name,
            new_id.page_num
        );

        self.propagate_split(separator, leaf_num, new_id.page_num, true, &mut ancestors)
    }

    /// Carries a (separator, new right child) pair up the ancestor
    /// stack after a split, splitting ancestors as needed and
    /// promoting a new root when the stack runs dry.
    fn propagate_split(
        &mut self,
        separator: i32,
        left_child: u32,
        right_child: u32,
        from_leaf: bool,
        ancestors: &mut Vec<u32>,
    ) -> Result<()> {
        let bufmgr = self.bufmgr.clone();
        let mut separator = separator;
        let mut left_child = left_child;
        let mut right_child = right_child;
        let mut children_are_leaves = from_leaf;

        loop {
            let Some(parent_num) = ancestors.pop() else {
                return self.promote_root(
                    separator,
                    left_child,
                    right_child,
                    children_are_leaves,
                );
            };

            let parent_id = self.page(parent_num);
            let frame = bufmgr.read_page(parent_id)?;
            let mut parent = InternalNode::read(&frame.read_data());

            if !parent.is_full() {
                parent.insert(separator, right_child);
                parent.write(&mut frame.write_data());
                return bufmgr.unpin_page(parent_id, true);
            }

            let (new_id, new_frame) = bufmgr.alloc_page(self.file_id)?;
            let (up_key, new_node) = parent.split_insert(separator, right_child);
            parent.write(&mut frame.write_data());
            new_node.write(&mut new_frame.write_data());
            bufmgr.unpin_page(parent_id, true)?;
            bufmgr.unpin_page(new_id, true)?;
            log::trace!(
                "split internal {} of {}, new node {}",
                parent_num,
                self.index_name,
                new_id.page_num
            );

            separator = up_key;
            left_child = parent_num;
            right_child = new_id.page_num;
            children_are_leaves = false;
        }
    }

    /// Installs a new root over a split pair and records it in the
    /// header page.
    fn promote_root(
        &mut self,
        separator: i32,
        left_child: u32,
        right_child: u32,
        children_are_leaves: bool,
    ) -> Result<()> {
        let bufmgr = self.bufmgr.clone();

        let (root_id, root_frame) = bufmgr.alloc_page(self.file_id)?;
        let level = if children_are_leaves { 1 } else { 0 };
        InternalNode::new_root(level, separator, left_child, right_child)
            .write(&mut root_frame.write_data());
        bufmgr.unpin_page(root_id, true)?;

        let header_id = self.page(HEADER_PAGE_NUM);
        let frame = bufmgr.read_page(header_id)?;
        let meta = IndexMetaPage::read(&frame.read_data());
        match meta {
            Ok(mut meta) => {
                meta.root_page_num = root_id.page_num;
                meta.write(&mut frame.write_data());
                bufmgr.unpin_page(header_id, true)?;
            }
            Err(e) => {
                bufmgr.unpin_page(header_id, false)?;
                return Err(e);
            }
        }

        self.root_page_num = root_id.page_num;
        self.single_root = false;
        log::debug!(
            "promoted page {} to root of {} (level {})",
            root_id.page_num,
            self.index_name,
            level
        );
        Ok(())
    }

    /// Writes all dirty index pages to disk. Fails with `PagePinned`
    /// if a pin is still outstanding on any page of the index.
    pub fn flush(&self) -> Result<()> {
        self.bufmgr.flush_file(self.file_id)
    }

    /// Reads a leaf node, pinning the page only for the copy.
    pub(crate) fn read_leaf(&self, page_num: u32) -> Result<LeafNode> {
        let page_id = self.page(page_num);
        let frame = self.bufmgr.read_page(page_id)?;
        let leaf = LeafNode::read(&frame.read_data());
        self.bufmgr.unpin_page(page_id, false)?;
        Ok(leaf)
    }
}

impl Drop for BTreeIndex {
    fn drop(&mut self) {
        self.scan = None;
        if let Err(e) = self.bufmgr.flush_file(self.file_id) {
            log::warn!("failed to flush index {}: {}", self.index_name, e);
        }
        if let Err(e) = self.bufmgr.disk().close_file(self.file_id) {
            log::warn!("failed to close index {}: {}", self.index_name, e);
        }
    }
}
