//! Per-signer write serialization.
//!
//! At most one state-changing call per signing identity is in flight at a
//! time; reads never take a lock.

use crate::domain::Address;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of async mutexes keyed by signer address.
#[derive(Debug, Default)]
pub struct SignerLocks {
    locks: Mutex<HashMap<Address, Arc<AsyncMutex<()>>>>,
}

impl SignerLocks {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access for `signer`.
    ///
    /// Entries nobody holds or waits on are pruned on the way in.
    pub async fn acquire(&self, signer: Address) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(signer)
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of signers tracked; idle ones linger until the next `acquire`.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Whether no signer is tracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
