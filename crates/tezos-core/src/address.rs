//! Account addresses: tz1 implicit accounts and KT1 originated contracts.
//!
//! An [`Address`] is the 20-byte BLAKE2b hash of an Ed25519 public key,
//! rendered as `tz1...`. A [`ContractAddress`] is the 20-byte origination
//! hash of a deployed contract, rendered as `KT1...`.
//!
//! Both types also know their binary forms as used inside forged
//! operations:
//!
//! - `Address::to_tagged_bytes` -- 21 bytes, `00` (Ed25519 curve tag)
//!   followed by the hash; used for the `source` field and inside
//!   `contract_bytes`.
//! - `*::to_contract_bytes` -- 22 bytes, the `contract_id` encoding used
//!   for transaction destinations (`00` + tagged pkh for implicit,
//!   `01` + hash + `00` padding for originated).

use std::fmt;
use std::str::FromStr;

use crate::base58::{self, Base58Error, KT1, TZ1};

// ---------------------------------------------------------------------------
// Address (implicit account)
// ---------------------------------------------------------------------------

/// A tz1 implicit account address (Ed25519 public key hash, 20 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// 21-byte tagged public key hash: `00` (Ed25519) + hash.
    pub fn to_tagged_bytes(&self) -> [u8; 21] {
        let mut out = [0u8; 21];
        out[1..].copy_from_slice(&self.0);
        out
    }

    /// 22-byte `contract_id` encoding for transaction destinations.
    pub fn to_contract_bytes(&self) -> [u8; 22] {
        let mut out = [0u8; 22];
        out[2..].copy_from_slice(&self.0);
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58::encode(TZ1, &self.0))
    }
}

impl FromStr for Address {
    type Err = Base58Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = base58::decode(TZ1, s)?;
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&payload);
        Ok(Self(bytes))
    }
}

// ---------------------------------------------------------------------------
// ContractAddress (originated contract)
// ---------------------------------------------------------------------------

/// A KT1 originated contract address (20 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContractAddress(pub [u8; 20]);

impl ContractAddress {
    /// Raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// 22-byte `contract_id` encoding: `01` + hash + `00` padding.
    pub fn to_contract_bytes(&self) -> [u8; 22] {
        let mut out = [0u8; 22];
        out[0] = 0x01;
        out[1..21].copy_from_slice(&self.0);
        out
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58::encode(KT1, &self.0))
    }
}

impl FromStr for ContractAddress {
    type Err = Base58Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = base58::decode(KT1, s)?;
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&payload);
        Ok(Self(bytes))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
