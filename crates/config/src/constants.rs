//! Protocol-level parameters shared across the workspace.
//!
//! Values mirror the current mainnet protocol economics. They feed the
//! fee model in the batch builder and the budgets of the inclusion
//! tracker; deployment-specific knobs live on `GatewayConfig` instead.

// ---------------------------------------------------------------------------
// Inclusion tracking
// ---------------------------------------------------------------------------

/// How many blocks behind the head the branch anchor is taken.
///
/// Anchoring slightly behind the head tolerates propagation delay: the
/// head the gateway sees may not yet be the head every baker sees.
pub const DEFAULT_BRANCH_OFFSET: u32 = 2;

/// How many blocks of history the inclusion tracker scans before
/// falling back to the live head stream.
pub const DEFAULT_SEARCH_DEPTH: u32 = 10;

/// How many new heads the tracker observes without finding the
/// operation before giving up.
pub const DEFAULT_MAX_HEADS: u32 = 10;

/// Confirmations required before an inclusion is reported final.
pub const DEFAULT_CONFIRMATIONS: u32 = 2;

/// Bounded transparent reconnects for a broken head stream. Each
/// reconnect restarts the tracker from its history scan.
pub const MAX_STREAM_RECONNECTS: u32 = 2;

// ---------------------------------------------------------------------------
// Fee model
// ---------------------------------------------------------------------------

/// Flat minimal fee per operation, in mutez.
pub const MINIMAL_FEE_MUTEZ: u64 = 100;

/// Fee per consumed gas unit, in nanotez.
pub const NANOTEZ_PER_GAS_UNIT: u64 = 100;

/// Fee per operation byte, in nanotez.
pub const NANOTEZ_PER_BYTE: u64 = 1000;

/// Extra bytes budgeted per operation when sizing fees: the 64-byte
/// signature share plus headroom for the fee field's own encoding.
pub const FEE_SIZE_MARGIN_BYTES: u64 = 96;

// ---------------------------------------------------------------------------
// Gas and storage limits
// ---------------------------------------------------------------------------

/// Safety margin added to simulated gas consumption.
pub const GAS_SAFETY_MARGIN: u64 = 100;

/// Safety margin added to the simulated storage size diff, in bytes.
pub const STORAGE_SAFETY_MARGIN: u64 = 20;

/// Protocol hard cap on gas per operation.
pub const HARD_GAS_LIMIT_PER_OPERATION: u64 = 1_040_000;

/// Protocol hard cap on storage per operation, in bytes.
pub const HARD_STORAGE_LIMIT_PER_OPERATION: u64 = 60_000;

/// Gas limit used when simulating (before the real consumption is known).
pub const SIMULATION_GAS_LIMIT: u64 = HARD_GAS_LIMIT_PER_OPERATION;

/// Storage limit used when simulating.
pub const SIMULATION_STORAGE_LIMIT: u64 = HARD_STORAGE_LIMIT_PER_OPERATION;
