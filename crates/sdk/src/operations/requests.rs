//! Request and receipt types of the domain operations.
//!
//! These are the JSON bodies exchanged with the HTTP layer. FinP2P
//! identities (finIds) travel as `edpk...` strings and quantities as
//! decimal strings; the facade parses and validates both, so the route
//! layer stays a thin pass-through.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Issue new units of an asset to an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
    pub asset_id: String,
    /// Receiving finId (`edpk...`).
    pub destination: String,
    /// Decimal quantity.
    pub quantity: String,
}

/// Settlement terms hashed into the second hash group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementTerms {
    /// Settlement asset identifier (e.g. a currency code).
    pub asset_id: String,
    /// Decimal settlement amount.
    pub amount: String,
}

/// Transfer units between accounts, authorized by the source's
/// signature over the hash-group digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Hex request nonce; replay protection at the contract level.
    pub nonce: String,
    pub asset_id: String,
    /// Sending finId (`edpk...`).
    pub source: String,
    /// Receiving finId (`edpk...`).
    pub destination: String,
    pub quantity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SettlementTerms>,
}

/// Redeem (burn) units from an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemRequest {
    pub nonce: String,
    pub asset_id: String,
    pub source: String,
    pub quantity: String,
}

/// Place a hold on part of an account's balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldRequest {
    pub hold_id: String,
    pub asset_id: String,
    pub source: String,
    /// Optional pre-committed destination for later execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    pub quantity: String,
    /// Hold expiry as a UNIX timestamp (seconds).
    pub expiry: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SettlementTerms>,
}

/// Release a hold back to the source's spendable balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseRequest {
    pub hold_id: String,
    pub asset_id: String,
}

/// Execute a hold, moving the held units to the destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub hold_id: String,
    /// Required when the hold was created without a destination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// Inclusion status of a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ReceiptStatus {
    /// The operation was injected but not observed within the tracking
    /// budget. It may still land; poll the receipt endpoint.
    Pending,

    /// Included and confirmed at the required depth.
    Confirmed {
        block: String,
        level: u32,
        confirmations: u32,
    },

    /// The operation was included and then lost to a chain
    /// reorganization. It will not reappear without resubmission.
    Dropped,
}

/// Receipt returned to the HTTP layer.
///
/// Derived entirely from the injection/inclusion result and the echoed
/// request fields; the gateway keeps no ledger of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    /// Operation hash (`o...`), the durable handle.
    pub operation: String,
    /// Which domain action produced this receipt.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<String>,
    pub status: ReceiptStatus,
}

/// Live balance snapshot of one account for one asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub asset_id: String,
    /// Owning finId (`edpk...`).
    pub account: String,
    /// Total balance, including held units.
    pub total: String,
    /// Balance not locked by active holds.
    pub spendable: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
