use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::logging::LogContext;
use crate::models::{is_valid_address, normalize_address, Transaction};
use crate::store::TransactionStore;

#[derive(Debug, Default)]
struct StoreState {
    current_block: u64,
    watched: HashSet<String>,
    transactions: HashMap<String, Vec<Transaction>>,
}

/// Volatile store guarding all indexed state behind one reader/writer lock
pub struct MemoryStore {
    state: RwLock<StoreState>,
    log: LogContext,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_logger(LogContext::new("store", "init"))
    }

    pub fn with_logger(log: LogContext) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            log,
        }
    }

    // Critical sections never leave partial state behind; a poisoned guard is safe to reuse.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransactionStore for MemoryStore {
    fn current_block(&self) -> u64 {
        self.read().current_block
    }

    fn set_current_block(&self, block_number: u64) {
        self.write().current_block = block_number;
    }

    fn subscribe(&self, address: &str) -> bool {
        if !is_valid_address(address) {
            return false;
        }

        let normalized = normalize_address(address);
        let inserted = self.write().watched.insert(normalized.clone());
        if inserted {
            self.log
                .for_operation("subscribe")
                .with_address(&normalized)
                .debug("Address added to watch list");
        }
        true
    }

    fn is_subscribed(&self, address: &str) -> bool {
        if address.is_empty() {
            return false;
        }
        self.read().watched.contains(&normalize_address(address))
    }

    fn add_transaction(&self, tx: Transaction) -> usize {
        let [from, to] = tx.counterparties().map(normalize_address);
        let keys = if from == to { vec![from] } else { vec![from, to] };

        let mut state = self.write();
        let mut recorded = 0;

        for key in keys {
            if state.watched.contains(&key) {
                state.transactions.entry(key).or_default().push(tx.clone());
                recorded += 1;
            }
        }

        recorded
    }

    fn transactions_for(&self, address: &str) -> Vec<Transaction> {
        if address.is_empty() {
            return Vec::new();
        }
        self.read()
            .transactions
            .get(&normalize_address(address))
            .cloned()
            .unwrap_or_default()
    }

    fn subscription_count(&self) -> usize {
        self.read().watched.len()
    }
}
