//! Record identifiers and tuple payloads.

use bytes::Bytes;

/// Identifier for a record in a heap file: the page holding it plus
/// its slot within that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    /// Page number within the heap file.
    pub page_num: u32,
    /// Slot number within the page.
    pub slot: u16,
}

impl RecordId {
    /// On-disk size of a record id as stored in index leaf entries.
    pub const SIZE: usize = 8;

    /// Invalid record id.
    pub const INVALID: RecordId = RecordId {
        page_num: u32::MAX,
        slot: u16::MAX,
    };

    /// Creates a new record id.
    pub fn new(page_num: u32, slot: u16) -> Self {
        Self { page_num, slot }
    }

    /// Returns true if this record id is valid.
    pub fn is_valid(&self) -> bool {
        self.page_num != u32::MAX
    }

    /// Serializes to the 8-byte wire form.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.page_num.to_le_bytes());
        buf[4..6].copy_from_slice(&self.slot.to_le_bytes());
        // bytes 6..8 reserved
        buf
    }

    /// Deserializes from the 8-byte wire form.
    pub fn from_bytes(buf: &[u8]) -> Self {
        Self {
            page_num: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            slot: u16::from_le_bytes([buf[4], buf[5]]),
        }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.page_num, self.slot)
    }
}

/// A tuple (record) as stored in a heap file: an opaque byte payload.
///
/// The index never interprets whole tuples; it fingerprints them by
/// reading a fixed-width field at a configured byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    data: Bytes,
}

impl Tuple {
    /// Creates a tuple from its raw bytes.
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// Returns the raw bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Returns the payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reads a native-endian i32 field at the given byte offset, or
    /// None if the tuple is too short to hold one there.
    pub fn read_i32_at(&self, offset: usize) -> Option<i32> {
        let end = offset.checked_add(4)?;
        let bytes = self.data.get(offset..end)?;
        Some(i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
