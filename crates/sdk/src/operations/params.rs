//! Micheline parameter builders for the proxy contract entrypoints.
//!
//! Structural mapping only: each builder mirrors its entrypoint's
//! parameter type as a right-nested pair. The hash-group digests and
//! signatures are produced elsewhere and passed in as plain bytes.

use crypto::Signature;
use tezos_core::PublicKey;

use crate::micheline::Micheline;

/// `issue_tokens (pair asset_id (pair destination quantity))`
pub fn issue_tokens(asset_id: &str, destination: &PublicKey, quantity: u128) -> Micheline {
    Micheline::pair(
        Micheline::string(asset_id),
        Micheline::pair(
            Micheline::bytes(destination.0.to_vec()),
            Micheline::nat(quantity),
        ),
    )
}

/// `transfer_tokens (pair nonce (pair asset_id (pair source (pair destination (pair quantity signature)))))`
pub fn transfer_tokens(
    nonce: &[u8],
    asset_id: &str,
    source: &PublicKey,
    destination: &PublicKey,
    quantity: u128,
    signature: &Signature,
) -> Micheline {
    Micheline::pair(
        Micheline::bytes(nonce.to_vec()),
        Micheline::pair(
            Micheline::string(asset_id),
            Micheline::pair(
                Micheline::bytes(source.0.to_vec()),
                Micheline::pair(
                    Micheline::bytes(destination.0.to_vec()),
                    Micheline::pair(
                        Micheline::nat(quantity),
                        Micheline::bytes(signature.0.to_vec()),
                    ),
                ),
            ),
        ),
    )
}

/// `redeem_tokens (pair nonce (pair asset_id (pair source (pair quantity signature))))`
pub fn redeem_tokens(
    nonce: &[u8],
    asset_id: &str,
    source: &PublicKey,
    quantity: u128,
    signature: &Signature,
) -> Micheline {
    Micheline::pair(
        Micheline::bytes(nonce.to_vec()),
        Micheline::pair(
            Micheline::string(asset_id),
            Micheline::pair(
                Micheline::bytes(source.0.to_vec()),
                Micheline::pair(
                    Micheline::nat(quantity),
                    Micheline::bytes(signature.0.to_vec()),
                ),
            ),
        ),
    )
}

/// `hold_tokens (pair hold_id (pair asset_id (pair source (pair (option destination) (pair quantity (pair expiry signature))))))`
#[allow(clippy::too_many_arguments)]
pub fn hold_tokens(
    hold_id: &str,
    asset_id: &str,
    source: &PublicKey,
    destination: Option<&PublicKey>,
    quantity: u128,
    expiry: u64,
    signature: &Signature,
) -> Micheline {
    Micheline::pair(
        Micheline::string(hold_id),
        Micheline::pair(
            Micheline::string(asset_id),
            Micheline::pair(
                Micheline::bytes(source.0.to_vec()),
                Micheline::pair(
                    Micheline::option(destination.map(|d| Micheline::bytes(d.0.to_vec()))),
                    Micheline::pair(
                        Micheline::nat(quantity),
                        Micheline::pair(
                            Micheline::nat(expiry as u128),
                            Micheline::bytes(signature.0.to_vec()),
                        ),
                    ),
                ),
            ),
        ),
    )
}

/// `release_hold (pair hold_id asset_id)`
pub fn release_hold(hold_id: &str, asset_id: &str) -> Micheline {
    Micheline::pair(Micheline::string(hold_id), Micheline::string(asset_id))
}

/// `execute_hold (pair hold_id (option destination))`
pub fn execute_hold(hold_id: &str, destination: Option<&PublicKey>) -> Micheline {
    Micheline::pair(
        Micheline::string(hold_id),
        Micheline::option(destination.map(|d| Micheline::bytes(d.0.to_vec()))),
    )
}

/// Input of the `get_balance` / `get_spendable_balance` views:
/// `(pair asset_id owner)`
pub fn balance_view_input(asset_id: &str, owner: &PublicKey) -> Micheline {
    Micheline::pair(
        Micheline::string(asset_id),
        Micheline::bytes(owner.0.to_vec()),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
