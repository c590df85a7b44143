//! Ed25519 key pairs for Tezos accounts.
//!
//! A [`Keypair`] signs in two distinct domains:
//!
//! - **Operation signing** ([`Keypair::sign_operation`]): the 32-byte
//!   BLAKE2b digest of `watermark || forged_bytes` is signed, matching
//!   what the chain's signature check expects.
//! - **Digest signing** ([`Keypair::sign_digest`]): a caller-supplied
//!   32-byte digest is signed directly. Used for the contract-level
//!   hash-group authorizations, which the proxy contract verifies with
//!   `CHECK_SIGNATURE` against the account's finId key.

use std::fmt;

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand_core::{CryptoRng, RngCore};

use tezos_core::base58::{self, Base58Error, EDSIG, EDSK};
use tezos_core::{Address, PublicKey, Watermark};

use crate::{blake2b_160, blake2b_256};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from key construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeypairError {
    /// The seed material is shorter than 32 bytes.
    SeedTooShort { got: usize },

    /// The base58 secret key string is malformed.
    BadSecretKey(Base58Error),
}

impl fmt::Display for KeypairError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SeedTooShort { got } => {
                write!(f, "seed must be at least 32 bytes, got {got}")
            }
            Self::BadSecretKey(e) => write!(f, "invalid edsk secret key: {e}"),
        }
    }
}

impl std::error::Error for KeypairError {}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// A 64-byte Ed25519 signature (`edsig...`).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58::encode(EDSIG, &self.0))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({self})")
    }
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// An Ed25519 key pair backing a tz1 account.
pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    /// Generate a fresh random key pair.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut secret = [0u8; 32];
        rng.fill_bytes(&mut secret);
        Self {
            signing: SigningKey::from_bytes(&secret),
        }
    }

    /// Build a key pair from raw 32-byte secret key material.
    pub fn from_secret_bytes(secret: [u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(&secret),
        }
    }

    /// Build a key pair from seed material (e.g. a BIP39 seed).
    ///
    /// The first 32 bytes of the seed become the Ed25519 secret scalar
    /// seed.
    pub fn from_seed(seed: &[u8]) -> Result<Self, KeypairError> {
        if seed.len() < 32 {
            return Err(KeypairError::SeedTooShort { got: seed.len() });
        }
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&seed[..32]);
        Ok(Self::from_secret_bytes(secret))
    }

    /// Parse an unencrypted `edsk...` secret key string (32-byte seed form).
    pub fn from_b58_secret(s: &str) -> Result<Self, KeypairError> {
        let payload = base58::decode(EDSK, s).map_err(KeypairError::BadSecretKey)?;
        let mut secret = [0u8; 32];
        secret.copy_from_slice(&payload);
        Ok(Self::from_secret_bytes(secret))
    }

    /// The public key (`edpk...`), also the account's finId.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing.verifying_key().to_bytes())
    }

    /// The tz1 address: 20-byte BLAKE2b hash of the public key.
    pub fn address(&self) -> Address {
        Address(blake2b_160(&self.public_key().0))
    }

    /// Sign forged operation bytes under the given watermark.
    ///
    /// The signed message is `BLAKE2b-256(watermark_byte || bytes)`.
    pub fn sign_operation(&self, watermark: Watermark, bytes: &[u8]) -> Signature {
        let digest = blake2b_256(&[&[watermark.byte()], bytes]);
        self.sign_digest(&digest)
    }

    /// Sign a 32-byte digest directly (contract-level authorization).
    pub fn sign_digest(&self, digest: &[u8; 32]) -> Signature {
        Signature(self.signing.sign(digest).to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret material.
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key().to_string())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify an operation signature against a public key.
pub fn verify_operation(
    public_key: &PublicKey,
    watermark: Watermark,
    bytes: &[u8],
    signature: &Signature,
) -> bool {
    let digest = blake2b_256(&[&[watermark.byte()], bytes]);
    verify_digest(public_key, &digest, signature)
}

/// Verify a signature over a raw 32-byte digest.
pub fn verify_digest(public_key: &PublicKey, digest: &[u8; 32], signature: &Signature) -> bool {
    let Ok(vk) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify(digest, &sig).is_ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
