//! Hash groups: the contract-level authorization digests.
//!
//! The proxy contract authenticates a request independently of the
//! Tezos operation signature: the acting account signs a digest over
//! the request's typed fields, and the contract re-derives the digest
//! and checks the signature against the account's finId key.
//!
//! The digest has two levels. Each *group* hashes an ordered list of
//! typed fields (every field is hashed with a type tag, the group is
//! the SHA-256 of the concatenated field hashes). The *asset group*
//! covers the transfer-specific fields; actions with settlement terms
//! add a second *settlement group*. The signed digest is the SHA-256
//! of the concatenated group hashes.
//!
//! Field values are canonicalized before hashing: amounts hash their
//! decimal representation, so an amount parsed from `"150"` and one
//! built from the integer `150` produce the same digest.
//!
//! # Type Tags
//!
//! | Tag | Meaning |
//! |-----|---------|
//! | `s` | UTF-8 string |
//! | `r` | raw bytes |
//! | `i` | amount (decimal ASCII) |

use sha2::{Digest, Sha256};

use tezos_core::PublicKey;

const STRING_TAG: &[u8] = b"s";
const BYTES_TAG: &[u8] = b"r";
const AMOUNT_TAG: &[u8] = b"i";

// ---------------------------------------------------------------------------
// Fields and groups
// ---------------------------------------------------------------------------

/// One typed field of a hash group.
#[derive(Debug, Clone, Copy)]
pub enum Field<'a> {
    /// A UTF-8 string (asset ids, operation tags, hold ids).
    Str(&'a str),
    /// Raw bytes (nonces, finId public keys).
    Bytes(&'a [u8]),
    /// A token amount or timestamp, hashed in decimal form.
    Amount(u128),
}

/// `SHA256(tag || encoding)` of one field.
fn hash_field(field: &Field<'_>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    match field {
        Field::Str(s) => {
            hasher.update(STRING_TAG);
            hasher.update(s.as_bytes());
        }
        Field::Bytes(b) => {
            hasher.update(BYTES_TAG);
            hasher.update(b);
        }
        Field::Amount(v) => {
            hasher.update(AMOUNT_TAG);
            hasher.update(v.to_string().as_bytes());
        }
    }
    hasher.finalize().into()
}

/// Hash an ordered field list into a group digest.
pub fn hash_group(fields: &[Field<'_>]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for field in fields {
        hasher.update(hash_field(field));
    }
    hasher.finalize().into()
}

/// Combine the asset group with an optional settlement group into the
/// digest the account signs.
pub fn signing_digest(asset_group: &[u8; 32], settlement_group: Option<&[u8; 32]>) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(asset_group);
    if let Some(group) = settlement_group {
        hasher.update(group);
    }
    hasher.finalize().into()
}

// ---------------------------------------------------------------------------
// Domain group builders
// ---------------------------------------------------------------------------

/// Asset hash group of a transfer.
pub fn transfer_asset_group(
    nonce: &[u8],
    asset_id: &str,
    source: &PublicKey,
    destination: &PublicKey,
    quantity: u128,
) -> [u8; 32] {
    hash_group(&[
        Field::Bytes(nonce),
        Field::Str("transfer"),
        Field::Str(asset_id),
        Field::Bytes(&source.0),
        Field::Bytes(&destination.0),
        Field::Amount(quantity),
    ])
}

/// Asset hash group of a redemption.
pub fn redeem_asset_group(
    nonce: &[u8],
    asset_id: &str,
    source: &PublicKey,
    quantity: u128,
) -> [u8; 32] {
    hash_group(&[
        Field::Bytes(nonce),
        Field::Str("redeem"),
        Field::Str(asset_id),
        Field::Bytes(&source.0),
        Field::Amount(quantity),
    ])
}

/// Asset hash group of a hold.
pub fn hold_asset_group(
    hold_id: &str,
    asset_id: &str,
    source: &PublicKey,
    destination: Option<&PublicKey>,
    quantity: u128,
    expiry: u64,
) -> [u8; 32] {
    let mut fields = vec![
        Field::Str("hold"),
        Field::Str(hold_id),
        Field::Str(asset_id),
        Field::Bytes(&source.0),
    ];
    if let Some(destination) = destination {
        fields.push(Field::Bytes(&destination.0));
    }
    fields.push(Field::Amount(quantity));
    fields.push(Field::Amount(expiry as u128));
    hash_group(&fields)
}

/// Settlement hash group over the settlement terms.
pub fn settlement_group(asset_id: &str, amount: u128) -> [u8; 32] {
    hash_group(&[Field::Str(asset_id), Field::Amount(amount)])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(seed: u8) -> PublicKey {
        PublicKey([seed; 32])
    }

    #[test]
    fn group_hash_is_deterministic() {
        let a = transfer_asset_group(&[1, 2, 3], "asset-A", &pk(1), &pk(2), 150);
        let b = transfer_asset_group(&[1, 2, 3], "asset-A", &pk(1), &pk(2), 150);
        assert_eq!(a, b);
    }

    #[test]
    fn field_order_matters() {
        let ab = hash_group(&[Field::Str("a"), Field::Str("b")]);
        let ba = hash_group(&[Field::Str("b"), Field::Str("a")]);
        assert_ne!(ab, ba);
    }

    #[test]
    fn type_tags_separate_equal_encodings() {
        // The string "1" and the amount 1 share their payload bytes but
        // must hash differently.
        let as_string = hash_group(&[Field::Str("1")]);
        let as_amount = hash_group(&[Field::Amount(1)]);
        assert_ne!(as_string, as_amount);
    }

    #[test]
    fn every_field_influences_the_digest() {
        let base = transfer_asset_group(&[0], "asset-A", &pk(1), &pk(2), 150);
        assert_ne!(
            base,
            transfer_asset_group(&[1], "asset-A", &pk(1), &pk(2), 150)
        );
        assert_ne!(
            base,
            transfer_asset_group(&[0], "asset-B", &pk(1), &pk(2), 150)
        );
        assert_ne!(
            base,
            transfer_asset_group(&[0], "asset-A", &pk(3), &pk(2), 150)
        );
        assert_ne!(
            base,
            transfer_asset_group(&[0], "asset-A", &pk(1), &pk(2), 151)
        );
    }

    #[test]
    fn settlement_group_extends_the_digest() {
        let asset = transfer_asset_group(&[0], "asset-A", &pk(1), &pk(2), 1);
        let settlement = settlement_group("USD", 100);

        let without = signing_digest(&asset, None);
        let with = signing_digest(&asset, Some(&settlement));
        assert_ne!(without, with);

        // Two-level structure: combining is itself deterministic.
        assert_eq!(with, signing_digest(&asset, Some(&settlement)));
    }

    #[test]
    fn hold_group_distinguishes_missing_destination() {
        let with = hold_asset_group("h-1", "asset-A", &pk(1), Some(&pk(2)), 50, 9999);
        let without = hold_asset_group("h-1", "asset-A", &pk(1), None, 50, 9999);
        assert_ne!(with, without);
    }
}
