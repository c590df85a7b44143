//! Chain object identifiers: block hashes and operation hashes.
//!
//! Both are 32-byte BLAKE2b digests with their own base58 prefix
//! (`B...` for blocks, `o...` for operations). They are plain value
//! types; hashing itself happens in the `crypto` crate.

use std::fmt;
use std::str::FromStr;

use crate::base58::{self, Base58Error, BLOCK, OPERATION};

// ---------------------------------------------------------------------------
// BlockHash
// ---------------------------------------------------------------------------

/// A block hash (`B...`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58::encode(BLOCK, &self.0))
    }
}

impl FromStr for BlockHash {
    type Err = Base58Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = base58::decode(BLOCK, s)?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&payload);
        Ok(Self(bytes))
    }
}

// ---------------------------------------------------------------------------
// OperationHash
// ---------------------------------------------------------------------------

/// An operation hash (`o...`), the sole handle for inclusion tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationHash(pub [u8; 32]);

impl OperationHash {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for OperationHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58::encode(OPERATION, &self.0))
    }
}

impl FromStr for OperationHash {
    type Err = Base58Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = base58::decode(OPERATION, s)?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&payload);
        Ok(Self(bytes))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_hash_roundtrip() {
        let h = BlockHash([3; 32]);
        let s = h.to_string();
        assert!(s.starts_with('B'));
        assert_eq!(s.parse::<BlockHash>().unwrap(), h);
    }

    #[test]
    fn operation_hash_roundtrip() {
        let h = OperationHash([5; 32]);
        let s = h.to_string();
        assert!(s.starts_with('o'));
        assert_eq!(s.parse::<OperationHash>().unwrap(), h);
    }

    #[test]
    fn hash_kinds_do_not_cross_parse() {
        let block = BlockHash([1; 32]).to_string();
        assert!(block.parse::<OperationHash>().is_err());
    }
}
