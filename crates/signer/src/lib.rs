//! Signing abstractions for the gateway.
//!
//! This crate provides:
//!
//! - [`Signer`] trait -- the signing capability resolved per account
//! - [`LocalSigner`] -- in-process implementation backed by a
//!   [`crypto::Keypair`]
//! - [`SignerRegistry`] -- maps tz1 address to signing capability
//!
//! # Design
//!
//! The trait is object-safe and synchronous so registries can hold
//! heterogeneous `Arc<dyn Signer>` entries. Implementations backed by a
//! remote signer should perform their own blocking-to-async bridging;
//! the pipeline treats every `sign` call as potentially slow.

pub mod registry;

pub use registry::SignerRegistry;

use std::fmt;

use crypto::{Keypair, Signature};
use tezos_core::{Address, PublicKey, Watermark};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from a signing backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The backend failed to produce a signature.
    Backend(String),
}

impl fmt::Display for SignerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(reason) => write!(f, "signing failed: {reason}"),
        }
    }
}

impl std::error::Error for SignerError {}

// ---------------------------------------------------------------------------
// Signer trait
// ---------------------------------------------------------------------------

/// Signing capability for one account.
///
/// Implementations handle the cryptographic details (digesting,
/// watermarking, curve operations) so the pipeline stays agnostic to
/// the key backend.
pub trait Signer: Send + Sync {
    /// The account's Ed25519 public key.
    fn public_key(&self) -> PublicKey;

    /// The account's tz1 address (public key hash).
    fn public_key_hash(&self) -> Address;

    /// Sign forged operation bytes under the given watermark.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError`] if the backend fails (e.g. HSM timeout).
    fn sign(&self, watermark: Watermark, bytes: &[u8]) -> Result<Signature, SignerError>;

    /// Sign a 32-byte digest directly (contract-level authorization).
    fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature, SignerError>;
}

// ---------------------------------------------------------------------------
// LocalSigner
// ---------------------------------------------------------------------------

/// In-process signer holding its key pair in memory.
pub struct LocalSigner {
    keypair: Keypair,
}

impl LocalSigner {
    /// Wrap an existing key pair.
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }
}

impl Signer for LocalSigner {
    fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    fn public_key_hash(&self) -> Address {
        self.keypair.address()
    }

    fn sign(&self, watermark: Watermark, bytes: &[u8]) -> Result<Signature, SignerError> {
        Ok(self.keypair.sign_operation(watermark, bytes))
    }

    fn sign_digest(&self, digest: &[u8; 32]) -> Result<Signature, SignerError> {
        Ok(self.keypair.sign_digest(digest))
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.public_key_hash().to_string())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
