//! Core types for the FinP2P Tezos gateway.
//!
//! This crate provides the foundational chain types used across the
//! workspace:
//!
//! - [`Network`] -- target Tezos network (Mainnet, Ghostnet, Sandbox)
//! - [`Address`] / [`ContractAddress`] -- tz1 implicit and KT1 originated
//!   accounts
//! - [`PublicKey`] -- Ed25519 public key (edpk)
//! - [`BlockHash`] / [`OperationHash`] -- chain object identifiers
//! - [`Watermark`] -- signature-domain prefix byte
//! - [`base58`] -- the base58check codec with Tezos prefixes
//!
//! Everything here is a plain value type: no I/O, no crypto beyond the
//! base58 checksum. Key derivation and hashing live in the `crypto` crate.

pub mod address;
pub mod base58;
pub mod hashes;
pub mod keys;

pub use address::{Address, ContractAddress};
pub use base58::Base58Error;
pub use hashes::{BlockHash, OperationHash};
pub use keys::PublicKey;

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Target Tezos network.
///
/// Selects the default node endpoint set in `config` and is echoed in
/// receipts so clients can tell environments apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    /// Tezos mainnet.
    Mainnet,

    /// Ghostnet public testnet.
    Ghostnet,

    /// Local sandbox (e.g. octez-node in sandboxed mode or flextesa).
    Sandbox,
}

impl Network {
    /// Lowercase identifier used in logs and receipts.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Ghostnet => "ghostnet",
            Self::Sandbox => "sandbox",
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Watermark
// ---------------------------------------------------------------------------

/// Signature-domain prefix byte.
///
/// Prepended to the forged bytes before hashing for signature, so a
/// signature over an operation can never be replayed as e.g. a block
/// signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Watermark {
    /// Block signing (0x01).
    Block,
    /// Consensus operation signing (0x02).
    Endorsement,
    /// Generic manager operation signing (0x03).
    GenericOperation,
}

impl Watermark {
    /// The wire byte for this domain.
    pub const fn byte(&self) -> u8 {
        match self {
            Self::Block => 0x01,
            Self::Endorsement => 0x02,
            Self::GenericOperation => 0x03,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_display() {
        assert_eq!(Network::Mainnet.to_string(), "mainnet");
        assert_eq!(Network::Ghostnet.to_string(), "ghostnet");
        assert_eq!(Network::Sandbox.to_string(), "sandbox");
    }

    #[test]
    fn watermark_bytes() {
        assert_eq!(Watermark::GenericOperation.byte(), 0x03);
        assert_eq!(Watermark::Block.byte(), 0x01);
        assert_eq!(Watermark::Endorsement.byte(), 0x02);
    }
}
