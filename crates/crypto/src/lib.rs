//! Hashing and signing primitives for Tezos operations.
//!
//! This crate provides:
//!
//! - [`blake2b_256`] / [`blake2b_160`] -- the digests Tezos uses for
//!   operation hashes and public key hashes
//! - [`Keypair`] -- an Ed25519 key pair with watermark-aware operation
//!   signing and raw digest signing for contract-level authorizations
//! - [`Signature`] -- a 64-byte Ed25519 signature (`edsig...`)
//!
//! The heavy lifting is delegated to `ed25519-dalek` and `blake2`;
//! nothing here reimplements a primitive.

pub mod keypair;

pub use keypair::{Keypair, KeypairError, Signature};

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;

// ---------------------------------------------------------------------------
// BLAKE2b digests
// ---------------------------------------------------------------------------

/// 32-byte BLAKE2b digest over the concatenation of `parts`.
///
/// Used for operation hashes and signature digests.
pub fn blake2b_256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2bVar::new(32).expect("32 is a valid blake2b output size");
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    hasher
        .finalize_variable(&mut out)
        .expect("output size matches");
    out
}

/// 20-byte BLAKE2b digest, used for public key hashes (tz1 addresses).
pub fn blake2b_160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Blake2bVar::new(20).expect("20 is a valid blake2b output size");
    hasher.update(data);
    let mut out = [0u8; 20];
    hasher
        .finalize_variable(&mut out)
        .expect("output size matches");
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
