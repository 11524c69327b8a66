use std::ops::ControlFlow;

use near_sdk::store::IterableMap;
use near_sdk::{near, IntoStorageKey};

use crate::hashlock::HashLock;
use crate::htlc::Htlc;

/// Persistent map from hash lock to HTLC record. Settled records stay in the
/// store; nothing is ever deleted.
#[near(serializers = [borsh])]
pub struct HtlcStore {
    htlcs: IterableMap<HashLock, Htlc>,
}

impl HtlcStore {
    pub fn new<S: IntoStorageKey>(prefix: S) -> Self {
        Self {
            htlcs: IterableMap::new(prefix),
        }
    }

    pub fn has(&self, hash_lock: &HashLock) -> bool {
        self.htlcs.contains_key(hash_lock)
    }

    pub fn get(&self, hash_lock: &HashLock) -> Option<Htlc> {
        self.htlcs.get(hash_lock).cloned()
    }

    /// Inserts or fully overwrites the record under `hash_lock`.
    pub fn set(&mut self, hash_lock: HashLock, htlc: Htlc) {
        self.htlcs.insert(hash_lock, htlc);
    }

    pub fn flush(&mut self) {
        self.htlcs.flush();
    }

    /// Visits every record in storage order until `op` breaks.
    pub fn iterate<F>(&self, mut op: F)
    where
        F: FnMut(&HashLock, &Htlc) -> ControlFlow<()>,
    {
        for (hash_lock, htlc) in self.htlcs.iter() {
            if op(hash_lock, htlc).is_break() {
                break;
            }
        }
    }
}
