//! Per-contract serialization.
//!
//! Confirmation can arrive from the notification endpoint and the
//! reconciliation loop for the same charge at nearly the same time. Handlers
//! that mutate a contract take its lock first, so the second arrival observes
//! the transaction already settled and becomes a no-op.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::foundation::ContractId;

/// Registry of per-contract mutexes.
///
/// Locks are created lazily and never reaped; the map grows with the number
/// of distinct contracts touched by one process lifetime, which is bounded
/// and small.
#[derive(Default)]
pub struct ContractLocks {
    inner: Mutex<HashMap<ContractId, Arc<Mutex<()>>>>,
}

impl ContractLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for one contract, waiting if another workflow
    /// holds it.
    pub async fn acquire(&self, contract_id: &ContractId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(*contract_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}
