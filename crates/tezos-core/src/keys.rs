//! Ed25519 public keys (`edpk...`).

use std::fmt;
use std::str::FromStr;

use crate::base58::{self, Base58Error, EDPK};

/// An Ed25519 public key (32 bytes, `edpk...`).
///
/// Doubles as the FinP2P account identity ("finId"): asset-level
/// authorizations are signatures made with the matching secret key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// 33-byte tagged encoding used in reveal operations: `00` (Ed25519)
    /// followed by the key bytes.
    pub fn to_tagged_bytes(&self) -> [u8; 33] {
        let mut out = [0u8; 33];
        out[1..].copy_from_slice(&self.0);
        out
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&base58::encode(EDPK, &self.0))
    }
}

impl FromStr for PublicKey {
    type Err = Base58Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = base58::decode(EDPK, s)?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&payload);
        Ok(Self(bytes))
    }
}
