//! Range scans over the B+ tree.

use crate::btree::index::BTreeIndex;
use crate::tuple::RecordId;
use acorn_common::page::INVALID_PAGE_NUM;
use acorn_common::{AcornError, Result};

/// Comparison operator for a scan bound.
///
/// The low bound accepts `GreaterThan`/`GreaterThanOrEqual`, the high
/// bound `LessThan`/`LessThanOrEqual`; anything else fails validation
/// with `BadOpcodes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    LessThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    GreaterThan,
}

/// State of an active range scan.
///
/// Pages are pinned only inside each `scan_next` call; between calls
/// the scan holds page numbers, not pins.
#[derive(Debug, Clone)]
pub(crate) struct ScanState {
    pub low: i32,
    pub high: i32,
    pub low_op: Operator,
    pub high_op: Operator,
    /// Leaf currently being walked.
    pub current_page_num: u32,
    /// Index of the next entry to emit; None once the range is drained.
    pub next_entry: Option<usize>,
}

/// True if `key` satisfies the lower bound.
fn satisfies_lower(key: i32, low: i32, op: Operator) -> bool {
    match op {
        Operator::GreaterThan => key > low,
        _ => key >= low,
    }
}

/// True if `key` is still inside the upper bound: keys above it are
/// out, a key equal to it is out only under the strict operator.
fn within_upper(key: i32, high: i32, op: Operator) -> bool {
    match key.cmp(&high) {
        std::cmp::Ordering::Greater => false,
        std::cmp::Ordering::Equal => op == Operator::LessThanOrEqual,
        std::cmp::Ordering::Less => true,
    }
}

impl BTreeIndex {
    /// Begins a range scan over `(low, high)` under the given bound
    /// operators, positioning on the first in-range key.
    ///
    /// An already-active scan is ended first. Fails with
    /// `BadScanrange` if `low > high`, `BadOpcodes` for an operator
    /// outside the permitted set, and `NoSuchKeyFound` (leaving no
    /// scan active) if the range contains no keys.
    pub fn start_scan(
        &mut self,
        low: i32,
        low_op: Operator,
        high: i32,
        high_op: Operator,
    ) -> Result<()> {
        if self.scan.is_some() {
            self.scan = None;
        }

        if low > high {
            return Err(AcornError::BadScanrange { low, high });
        }
        if !matches!(low_op, Operator::GreaterThan | Operator::GreaterThanOrEqual) {
            return Err(AcornError::BadOpcodes);
        }
        if !matches!(high_op, Operator::LessThan | Operator::LessThanOrEqual) {
            return Err(AcornError::BadOpcodes);
        }

        let (leaf_num, _) = self.search_to_leaf(low)?;
        let mut current = leaf_num;
        let mut leaf = self.read_leaf(current)?;
        let mut entry = leaf
            .entries
            .partition_point(|e| !satisfies_lower(e.key, low, low_op));

        if entry == leaf.entries.len() {
            // The first candidate sits past a leaf boundary: the right
            // sibling's first key is the smallest key above the probe.
            if leaf.right_sibling == INVALID_PAGE_NUM {
                return Err(AcornError::NoSuchKeyFound);
            }
            current = leaf.right_sibling;
            leaf = self.read_leaf(current)?;
            if leaf.entries.is_empty() {
                return Err(AcornError::NoSuchKeyFound);
            }
            entry = 0;
        }

        if !within_upper(leaf.entries[entry].key, high, high_op) {
            return Err(AcornError::NoSuchKeyFound);
        }

        self.scan = Some(ScanState {
            low,
            high,
            low_op,
            high_op,
            current_page_num: current,
            next_entry: Some(entry),
        });
        Ok(())
    }

    /// Emits the record id of the next in-range entry and advances.
    ///
    /// Fails with `ScanNotInitialized` if no scan is active and with
    /// `IndexScanCompleted` once the range is drained (the scan stays
    /// active until `end_scan`).
    pub fn scan_next(&mut self) -> Result<RecordId> {
        let state = self.scan.as_ref().ok_or(AcornError::ScanNotInitialized)?;
        let entry = state.next_entry.ok_or(AcornError::IndexScanCompleted)?;
        let (low, low_op) = (state.low, state.low_op);
        let (high, high_op, current) = (state.high, state.high_op, state.current_page_num);

        let leaf = self.read_leaf(current)?;
        let emitted = *leaf
            .entries
            .get(entry)
            .ok_or_else(|| AcornError::Corrupted(format!("leaf {} shrank mid-scan", current)))?;
        debug_assert!(satisfies_lower(emitted.key, low, low_op));

        let mut next_page = current;
        let next_entry = if entry + 1 < leaf.entries.len() {
            within_upper(leaf.entries[entry + 1].key, high, high_op).then_some(entry + 1)
        } else if leaf.right_sibling == INVALID_PAGE_NUM {
            None
        } else {
            let sibling = self.read_leaf(leaf.right_sibling)?;
            next_page = leaf.right_sibling;
            match sibling.entries.first() {
                Some(first) if within_upper(first.key, high, high_op) => Some(0),
                _ => None,
            }
        };

        let state = self.scan.as_mut().ok_or(AcornError::ScanNotInitialized)?;
        state.current_page_num = next_page;
        state.next_entry = next_entry;
        Ok(emitted.rid)
    }

    /// Ends the active scan. Fails with `ScanNotInitialized` if none
    /// is active. No pages are held across scan calls, so there is no
    /// unpinning to do here.
    pub fn end_scan(&mut self) -> Result<()> {
        if self.scan.take().is_none() {
            return Err(AcornError::ScanNotInitialized);
        }
        Ok(())
    }
}
