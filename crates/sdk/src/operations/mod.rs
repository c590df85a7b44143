//! The token service facade: issue, transfer, redeem, hold, release,
//! execute, balance and receipt queries.
//!
//! Each mutating operation follows the same path: parse and validate
//! the request, derive the contract-level authorization (hash-group
//! digest signed by the acting account), package the entrypoint
//! parameters, then drive batch building, sign-and-inject, and
//! inclusion tracking end to end. The returned receipt is derived
//! purely from the injection/inclusion result plus echoed request
//! fields -- the gateway maintains no ledger of its own.
//!
//! Balance queries are live `run_view` reads against the proxy
//! contract; the chain is the single source of truth.

pub mod hashgroup;
pub mod params;
pub mod requests;

pub use requests::{
    Balance, ExecuteRequest, HoldRequest, IssueRequest, Receipt, ReceiptStatus, RedeemRequest,
    ReleaseRequest, SettlementTerms, TransferRequest,
};

use std::sync::Arc;

use serde_json::Value;

use tezos_core::{Address, OperationHash, PublicKey};

use crate::batch::{build_batch, Action};
use crate::chain::ChainRpc;
use crate::confirm::{track, TrackOutcome, TrackerConfig};
use crate::error::SdkError;
use crate::inject::sign_and_inject;
use crate::operations::hashgroup::{signing_digest, settlement_group};
use crate::utils::hex_decode;
use crate::Sdk;

// ---------------------------------------------------------------------------
// Request parsing
// ---------------------------------------------------------------------------

fn parse_finid(raw: &str) -> Result<PublicKey, SdkError> {
    raw.parse().map_err(|e| SdkError::InvalidRequest {
        reason: format!("bad finId '{raw}': {e}"),
    })
}

fn parse_quantity(raw: &str) -> Result<u128, SdkError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SdkError::InvalidRequest {
            reason: format!("bad quantity '{raw}'"),
        });
    }
    raw.parse().map_err(|_| SdkError::InvalidRequest {
        reason: format!("quantity '{raw}' out of range"),
    })
}

fn parse_nonce(raw: &str) -> Result<Vec<u8>, SdkError> {
    let bytes = hex_decode(raw).ok_or_else(|| SdkError::InvalidRequest {
        reason: format!("bad nonce hex '{raw}'"),
    })?;
    if bytes.is_empty() {
        return Err(SdkError::InvalidRequest {
            reason: "empty nonce".into(),
        });
    }
    Ok(bytes)
}

fn parse_settlement(terms: &SettlementTerms) -> Result<[u8; 32], SdkError> {
    Ok(settlement_group(
        &terms.asset_id,
        parse_quantity(&terms.amount)?,
    ))
}

/// Echoed request fields carried into the receipt.
#[derive(Debug, Default)]
struct Echo {
    asset_id: Option<String>,
    source: Option<String>,
    destination: Option<String>,
    quantity: Option<String>,
}

fn status_of(outcome: TrackOutcome) -> ReceiptStatus {
    match outcome {
        TrackOutcome::Confirmed {
            block,
            level,
            confirmations,
        } => ReceiptStatus::Confirmed {
            block: block.to_string(),
            level,
            confirmations,
        },
        TrackOutcome::TimedOut { .. } => ReceiptStatus::Pending,
        TrackOutcome::Dropped { .. } => ReceiptStatus::Dropped,
    }
}

// ---------------------------------------------------------------------------
// Facade
// ---------------------------------------------------------------------------

impl<C: ChainRpc> Sdk<C> {
    /// Signer of the acting asset account, resolved by the address
    /// derived from its finId.
    fn account_signer(&self, finid: &PublicKey) -> Result<Arc<dyn signer::Signer>, SdkError> {
        let address = Address(crypto::blake2b_160(&finid.0));
        self.inner
            .registry
            .resolve(&address)
            .ok_or(SdkError::UnregisteredSigner { address })
    }

    /// Sign a hash-group digest with the acting account's key.
    fn authorize(
        &self,
        finid: &PublicKey,
        digest: &[u8; 32],
    ) -> Result<crypto::Signature, SdkError> {
        self.account_signer(finid)?
            .sign_digest(digest)
            .map_err(|e| SdkError::SigningFailed {
                reason: e.to_string(),
            })
    }

    /// Drive one proxy call through the full lifecycle and await its
    /// inclusion.
    async fn submit(
        &self,
        kind: &str,
        value: crate::micheline::Micheline,
        entrypoint: &str,
        echo: Echo,
    ) -> Result<Receipt, SdkError> {
        self.check_cancelled()?;

        let operator = self.inner.operator;
        let operator_signer =
            self.inner
                .registry
                .resolve(&operator)
                .ok_or(SdkError::UnregisteredSigner {
                    address: operator,
                })?;

        let action = Action::Call {
            destination: self.inner.config.proxy_contract,
            entrypoint: entrypoint.to_owned(),
            value,
        };

        let batch = build_batch(
            &self.inner.chain,
            operator,
            &operator_signer.public_key(),
            vec![action],
        )
        .await?;

        let injected = sign_and_inject(
            &self.inner.chain,
            &self.inner.registry,
            batch,
            self.inner.config.branch_offset,
        )
        .await?;

        tracing::info!(kind, operation = %injected.hash, "operation injected, awaiting inclusion");

        let outcome = track(
            &self.inner.chain,
            &injected.hash,
            &TrackerConfig::from(&self.inner.config),
            &self.inner.cancel,
        )
        .await?;

        Ok(Receipt {
            operation: injected.hash.to_string(),
            kind: kind.to_owned(),
            asset_id: echo.asset_id,
            source: echo.source,
            destination: echo.destination,
            quantity: echo.quantity,
            status: status_of(outcome),
        })
    }

    // -----------------------------------------------------------------------
    // issue
    // -----------------------------------------------------------------------

    /// Issue new units of an asset to a destination account.
    ///
    /// Issuance is operator-authorized; no account-level signature is
    /// involved.
    pub async fn issue(&self, request: IssueRequest) -> Result<Receipt, SdkError> {
        let destination = parse_finid(&request.destination)?;
        let quantity = parse_quantity(&request.quantity)?;

        let value = params::issue_tokens(&request.asset_id, &destination, quantity);
        self.submit(
            "issue",
            value,
            "issue_tokens",
            Echo {
                asset_id: Some(request.asset_id),
                destination: Some(request.destination),
                quantity: Some(request.quantity),
                ..Echo::default()
            },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // transfer
    // -----------------------------------------------------------------------

    /// Transfer units between accounts.
    ///
    /// The source account authorizes the transfer by signing the
    /// two-level hash-group digest; the contract verifies that
    /// signature against the source finId.
    pub async fn transfer(&self, request: TransferRequest) -> Result<Receipt, SdkError> {
        let source = parse_finid(&request.source)?;
        let destination = parse_finid(&request.destination)?;
        let quantity = parse_quantity(&request.quantity)?;
        let nonce = parse_nonce(&request.nonce)?;

        let asset_group = hashgroup::transfer_asset_group(
            &nonce,
            &request.asset_id,
            &source,
            &destination,
            quantity,
        );
        let settlement = match &request.settlement {
            Some(terms) => Some(parse_settlement(terms)?),
            None => None,
        };
        let digest = signing_digest(&asset_group, settlement.as_ref());
        let signature = self.authorize(&source, &digest)?;

        let value = params::transfer_tokens(
            &nonce,
            &request.asset_id,
            &source,
            &destination,
            quantity,
            &signature,
        );
        self.submit(
            "transfer",
            value,
            "transfer_tokens",
            Echo {
                asset_id: Some(request.asset_id),
                source: Some(request.source),
                destination: Some(request.destination),
                quantity: Some(request.quantity),
            },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // redeem
    // -----------------------------------------------------------------------

    /// Redeem (burn) units from the source account.
    pub async fn redeem(&self, request: RedeemRequest) -> Result<Receipt, SdkError> {
        let source = parse_finid(&request.source)?;
        let quantity = parse_quantity(&request.quantity)?;
        let nonce = parse_nonce(&request.nonce)?;

        let asset_group =
            hashgroup::redeem_asset_group(&nonce, &request.asset_id, &source, quantity);
        let digest = signing_digest(&asset_group, None);
        let signature = self.authorize(&source, &digest)?;

        let value =
            params::redeem_tokens(&nonce, &request.asset_id, &source, quantity, &signature);
        self.submit(
            "redeem",
            value,
            "redeem_tokens",
            Echo {
                asset_id: Some(request.asset_id),
                source: Some(request.source),
                quantity: Some(request.quantity),
                ..Echo::default()
            },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // hold
    // -----------------------------------------------------------------------

    /// Place a hold on part of the source's balance.
    pub async fn hold(&self, request: HoldRequest) -> Result<Receipt, SdkError> {
        let source = parse_finid(&request.source)?;
        let destination = request
            .destination
            .as_deref()
            .map(parse_finid)
            .transpose()?;
        let quantity = parse_quantity(&request.quantity)?;

        let asset_group = hashgroup::hold_asset_group(
            &request.hold_id,
            &request.asset_id,
            &source,
            destination.as_ref(),
            quantity,
            request.expiry,
        );
        let settlement = match &request.settlement {
            Some(terms) => Some(parse_settlement(terms)?),
            None => None,
        };
        let digest = signing_digest(&asset_group, settlement.as_ref());
        let signature = self.authorize(&source, &digest)?;

        let value = params::hold_tokens(
            &request.hold_id,
            &request.asset_id,
            &source,
            destination.as_ref(),
            quantity,
            request.expiry,
            &signature,
        );
        self.submit(
            "hold",
            value,
            "hold_tokens",
            Echo {
                asset_id: Some(request.asset_id),
                source: Some(request.source),
                destination: request.destination,
                quantity: Some(request.quantity),
            },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // release
    // -----------------------------------------------------------------------

    /// Release a hold back to the source's spendable balance.
    pub async fn release(&self, request: ReleaseRequest) -> Result<Receipt, SdkError> {
        let value = params::release_hold(&request.hold_id, &request.asset_id);
        self.submit(
            "release",
            value,
            "release_hold",
            Echo {
                asset_id: Some(request.asset_id),
                ..Echo::default()
            },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // execute
    // -----------------------------------------------------------------------

    /// Execute a hold, moving the held units to the destination.
    pub async fn execute(&self, request: ExecuteRequest) -> Result<Receipt, SdkError> {
        let destination = request
            .destination
            .as_deref()
            .map(parse_finid)
            .transpose()?;

        let value = params::execute_hold(&request.hold_id, destination.as_ref());
        self.submit(
            "execute",
            value,
            "execute_hold",
            Echo {
                destination: request.destination,
                ..Echo::default()
            },
        )
        .await
    }

    // -----------------------------------------------------------------------
    // balance
    // -----------------------------------------------------------------------

    /// Live balance read for one account and asset.
    pub async fn get_balance(&self, asset_id: &str, account: &str) -> Result<Balance, SdkError> {
        self.check_cancelled()?;
        let owner = parse_finid(account)?;
        let input = params::balance_view_input(asset_id, &owner).to_json();

        let proxy = &self.inner.config.proxy_contract;
        let total = view_nat(
            self.inner
                .chain
                .run_view(proxy, "get_balance", input.clone())
                .await?,
        )?;
        let spendable = view_nat(
            self.inner
                .chain
                .run_view(proxy, "get_spendable_balance", input)
                .await?,
        )?;

        Ok(Balance {
            asset_id: asset_id.to_owned(),
            account: account.to_owned(),
            total: total.to_string(),
            spendable: spendable.to_string(),
        })
    }

    // -----------------------------------------------------------------------
    // receipt
    // -----------------------------------------------------------------------

    /// Re-check the inclusion status of a previously injected
    /// operation.
    pub async fn get_receipt(&self, operation: &str) -> Result<Receipt, SdkError> {
        self.check_cancelled()?;
        let hash: OperationHash = operation.parse().map_err(|e| SdkError::InvalidRequest {
            reason: format!("bad operation hash '{operation}': {e}"),
        })?;

        let outcome = track(
            &self.inner.chain,
            &hash,
            &TrackerConfig::from(&self.inner.config),
            &self.inner.cancel,
        )
        .await?;

        Ok(Receipt {
            operation: operation.to_owned(),
            kind: "operation".into(),
            asset_id: None,
            source: None,
            destination: None,
            quantity: None,
            status: status_of(outcome),
        })
    }
}

/// Parse the `{"int": "<nat>"}` result of a balance view.
fn view_nat(value: Value) -> Result<u128, SdkError> {
    value
        .get("int")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| SdkError::Rpc {
            message: format!("balance view returned unexpected value: {value}"),
            transient: false,
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
