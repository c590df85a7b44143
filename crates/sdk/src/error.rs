//! SDK error types.
//!
//! [`SdkError`] is the unified error type for the transaction lifecycle.
//! The taxonomy deliberately separates failures that must never be
//! retried blindly (estimation, injection, hash consistency) from
//! transient transport trouble, which is the only class eligible for
//! transparent reconnection.
//!
//! Inclusion timeout and reorg loss are *not* errors: they are
//! [`TrackOutcome`](crate::confirm::TrackOutcome) values the caller
//! handles explicitly.

use std::fmt;

use tezos_core::{Address, OperationHash};

// ---------------------------------------------------------------------------
// SdkError
// ---------------------------------------------------------------------------

/// Errors from SDK operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// The SDK has been shut down (cancellation token fired).
    Cancelled,

    /// A batch was requested with no actions.
    EmptyBatch,

    /// The operations in a group do not share one source account.
    MixedSources,

    /// Simulation rejected an action; the whole batch was aborted.
    /// Carries the protocol error identifiers (e.g. a balance check).
    EstimationFailed { reason: String },

    /// The node rejected the signed bytes. The locally computed hash is
    /// attached so the failure can be correlated even though nothing
    /// was accepted on-chain. Retrying requires rebuilding the batch
    /// with a fresh counter; it is never done automatically.
    InjectionFailed {
        attempted: OperationHash,
        cause: String,
    },

    /// The node returned a different hash than locally computed for the
    /// same signed bytes. Fatal consistency error, never swallowed.
    HashMismatch {
        computed: OperationHash,
        returned: OperationHash,
    },

    /// No signing capability is registered for the account.
    UnregisteredSigner { address: Address },

    /// The signing backend failed to produce a signature.
    SigningFailed { reason: String },

    /// A node RPC call failed. `transient` marks pure network trouble
    /// (connect failure, mid-stream disconnect) as opposed to a node
    /// that answered with an error.
    Rpc { message: String, transient: bool },

    /// The request is malformed (bad key, bad quantity, unknown hold).
    InvalidRequest { reason: String },
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::EmptyBatch => write!(f, "batch contains no actions"),
            Self::MixedSources => write!(f, "operation group mixes source accounts"),
            Self::EstimationFailed { reason } => {
                write!(f, "estimation failed: {reason}")
            }
            Self::InjectionFailed { attempted, cause } => {
                write!(f, "injection of {attempted} rejected: {cause}")
            }
            Self::HashMismatch { computed, returned } => {
                write!(
                    f,
                    "node returned operation hash {returned}, locally computed {computed}"
                )
            }
            Self::UnregisteredSigner { address } => {
                write!(f, "no signer registered for {address}")
            }
            Self::SigningFailed { reason } => write!(f, "signing failed: {reason}"),
            Self::Rpc { message, .. } => write!(f, "chain rpc failed: {message}"),
            Self::InvalidRequest { reason } => write!(f, "invalid request: {reason}"),
        }
    }
}

impl std::error::Error for SdkError {}

impl SdkError {
    /// True if this error is transient network trouble that may succeed
    /// on reconnect. Chain-state-dependent failures (counters, balances,
    /// estimation) are deliberately excluded: blind retry risks
    /// double-submission.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc { transient: true, .. })
    }
}
