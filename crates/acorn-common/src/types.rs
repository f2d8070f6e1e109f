//! Key type tags for indexed attributes.

use serde::{Deserialize, Serialize};

/// Identifier for the type of an indexed attribute.
///
/// The tag is persisted in the index header page and validated when an
/// existing index file is opened. Only `Int32` keys are currently
/// supported by the B+ tree; the other tags exist so that an index file
/// built by a future version is rejected cleanly rather than misread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum KeyType {
    /// 32-bit signed integer key.
    Int32 = 0,
    /// 64-bit signed integer key.
    Int64 = 1,
    /// 64-bit floating point key.
    Float64 = 2,
}

impl KeyType {
    /// Returns the key size in bytes.
    pub fn size(&self) -> usize {
        match self {
            KeyType::Int32 => 4,
            KeyType::Int64 => 8,
            KeyType::Float64 => 8,
        }
    }

    /// Returns the on-disk tag for this key type.
    pub fn as_tag(&self) -> u32 {
        *self as u32
    }

    /// Decodes an on-disk tag, or None for an unknown value.
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(KeyType::Int32),
            1 => Some(KeyType::Int64),
            2 => Some(KeyType::Float64),
            _ => None,
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            KeyType::Int32 => "INT32",
            KeyType::Int64 => "INT64",
            KeyType::Float64 => "FLOAT64",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_sizes() {
        assert_eq!(KeyType::Int32.size(), 4);
        assert_eq!(KeyType::Int64.size(), 8);
        assert_eq!(KeyType::Float64.size(), 8);
    }

    #[test]
    fn test_tag_roundtrip() {
        for key_type in [KeyType::Int32, KeyType::Int64, KeyType::Float64] {
            assert_eq!(KeyType::from_tag(key_type.as_tag()), Some(key_type));
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(KeyType::from_tag(99), None);
        assert_eq!(KeyType::from_tag(u32::MAX), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(KeyType::Int32.to_string(), "INT32");
        assert_eq!(KeyType::Int64.to_string(), "INT64");
        assert_eq!(KeyType::Float64.to_string(), "FLOAT64");
    }

    #[test]
    fn test_serde_roundtrip() {
        let original = KeyType::Int32;
        let serialized = serde_json::to_string(&original).unwrap();
        let deserialized: KeyType = serde_json::from_str(&serialized).unwrap();
        assert_eq!(original, deserialized);
    }
}
