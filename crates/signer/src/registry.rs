//! Account signer registry.
//!
//! Maps tz1 address to signing capability. The registry is an explicit,
//! dependency-injected instance: each process (or test) constructs its
//! own rather than sharing module-level state.
//!
//! # Consistency
//!
//! Registration overwrites: no two capabilities may be live for one
//! address, and the last write wins. `resolve`/`resolve` is safe under
//! concurrency; concurrent registrations for the same derived address
//! resolve to whichever write lands last. Signer identities are expected
//! to be stable for the process lifetime.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tezos_core::Address;

use crate::Signer;

/// Shared, read-mostly registry of account signers.
#[derive(Default)]
pub struct SignerRegistry {
    entries: RwLock<HashMap<Address, Arc<dyn Signer>>>,
}

impl SignerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a signer under an explicitly supplied address.
    ///
    /// Overwrites any existing entry for the address.
    pub fn register(&self, address: Address, signer: Arc<dyn Signer>) {
        self.entries
            .write()
            .expect("registry lock poisoned")
            .insert(address, signer);
    }

    /// Register a signer under the address derived from its own public
    /// key hash, returning that address.
    ///
    /// The entry becomes visible only once the derivation completes;
    /// callers must not assume visibility before this returns.
    pub fn register_derived(&self, signer: Arc<dyn Signer>) -> Address {
        let address = signer.public_key_hash();
        self.register(address, signer);
        address
    }

    /// Look up the signing capability for an address.
    pub fn resolve(&self, address: &Address) -> Option<Arc<dyn Signer>> {
        self.entries
            .read()
            .expect("registry lock poisoned")
            .get(address)
            .cloned()
    }

    /// Number of registered signers.
    pub fn len(&self) -> usize {
        self.entries.read().expect("registry lock poisoned").len()
    }

    /// True if no signers are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for SignerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerRegistry")
            .field("entries", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
