//! Base58check codec with Tezos type prefixes.
//!
//! Tezos identifiers are base58check strings whose payload is preceded by
//! a short type prefix, so every kind of object gets a recognizable
//! human-readable lead-in (`tz1`, `KT1`, `B`, `o`, `edpk`, ...). The
//! checksum is the first four bytes of a double SHA-256 over
//! `prefix || payload`, handled by `bs58`'s check mode.
//!
//! Each [`Prefix`] pins both the prefix bytes and the expected payload
//! length, so decoding validates kind and size in one step.

use std::fmt;

// ---------------------------------------------------------------------------
// Prefixes
// ---------------------------------------------------------------------------

/// A Tezos base58check type prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefix {
    /// Raw prefix bytes prepended to the payload before encoding.
    pub bytes: &'static [u8],
    /// Expected payload length in bytes (excluding the prefix).
    pub payload_len: usize,
    /// Human-readable lead-in, used in error messages.
    pub label: &'static str,
}

/// `tz1` -- Ed25519 public key hash (20 bytes).
pub const TZ1: Prefix = Prefix {
    bytes: &[6, 161, 159],
    payload_len: 20,
    label: "tz1",
};

/// `KT1` -- originated contract hash (20 bytes).
pub const KT1: Prefix = Prefix {
    bytes: &[2, 90, 121],
    payload_len: 20,
    label: "KT1",
};

/// `B` -- block hash (32 bytes).
pub const BLOCK: Prefix = Prefix {
    bytes: &[1, 52],
    payload_len: 32,
    label: "B",
};

/// `o` -- operation hash (32 bytes).
pub const OPERATION: Prefix = Prefix {
    bytes: &[5, 116],
    payload_len: 32,
    label: "o",
};

/// `edpk` -- Ed25519 public key (32 bytes).
pub const EDPK: Prefix = Prefix {
    bytes: &[13, 15, 37, 217],
    payload_len: 32,
    label: "edpk",
};

/// `edsk` -- Ed25519 secret seed (32 bytes).
pub const EDSK: Prefix = Prefix {
    bytes: &[13, 15, 58, 7],
    payload_len: 32,
    label: "edsk",
};

/// `edsig` -- Ed25519 signature (64 bytes).
pub const EDSIG: Prefix = Prefix {
    bytes: &[9, 245, 205, 134, 18],
    payload_len: 64,
    label: "edsig",
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from base58check decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Base58Error {
    /// The string is not valid base58check (bad alphabet or checksum).
    InvalidEncoding,

    /// The decoded bytes do not start with the expected type prefix.
    WrongPrefix { expected: &'static str },

    /// The payload length does not match the prefix's expected length.
    WrongLength { expected: usize, got: usize },
}

impl fmt::Display for Base58Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEncoding => write!(f, "invalid base58check string"),
            Self::WrongPrefix { expected } => {
                write!(f, "expected a {expected} identifier")
            }
            Self::WrongLength { expected, got } => {
                write!(f, "expected {expected} payload bytes, got {got}")
            }
        }
    }
}

impl std::error::Error for Base58Error {}

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Encode `payload` under the given prefix.
///
/// Panics in debug builds if `payload` does not match the prefix's
/// expected length; all call sites pass fixed-size arrays.
pub fn encode(prefix: Prefix, payload: &[u8]) -> String {
    debug_assert_eq!(payload.len(), prefix.payload_len);
    let mut data = Vec::with_capacity(prefix.bytes.len() + payload.len());
    data.extend_from_slice(prefix.bytes);
    data.extend_from_slice(payload);
    bs58::encode(data).with_check().into_string()
}

/// Decode a base58check string, verifying prefix and payload length.
pub fn decode(prefix: Prefix, s: &str) -> Result<Vec<u8>, Base58Error> {
    let raw = bs58::decode(s)
        .with_check(None)
        .into_vec()
        .map_err(|_| Base58Error::InvalidEncoding)?;

    let Some(payload) = raw.strip_prefix(prefix.bytes) else {
        return Err(Base58Error::WrongPrefix {
            expected: prefix.label,
        });
    };

    if payload.len() != prefix.payload_len {
        return Err(Base58Error::WrongLength {
            expected: prefix.payload_len,
            got: payload.len(),
        });
    }

    Ok(payload.to_vec())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
