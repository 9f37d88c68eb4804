use std::sync::Arc;

use crate::logging::LogContext;
use crate::models::Transaction;
use crate::store::TransactionStore;

/// Snapshot served by the status endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerStatus {
    pub current_block: u64,
    pub watched_addresses: usize,
}

/// Entry points used by the HTTP layer, delegating straight to the store
#[derive(Clone)]
pub struct QueryFacade {
    store: Arc<dyn TransactionStore>,
    log: LogContext,
}

impl QueryFacade {
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self::with_logger(store, LogContext::new("query_facade", "init"))
    }

    pub fn with_logger(store: Arc<dyn TransactionStore>, log: LogContext) -> Self {
        Self { store, log }
    }

    pub fn current_block(&self) -> u64 {
        self.store.current_block()
    }

    pub fn subscribe(&self, address: &str) -> bool {
        let log = self.log.for_operation("subscribe").with_address(address);
        let accepted = self.store.subscribe(address);
        if accepted {
            log.info("Subscribed to address");
        } else {
            log.warn("Rejected invalid address");
        }
        accepted
    }

    pub fn transactions_for(&self, address: &str) -> Vec<Transaction> {
        self.log
            .for_operation("transactions_for")
            .with_address(address)
            .trace("Retrieving transactions");
        self.store.transactions_for(address)
    }

    pub fn status(&self) -> IndexerStatus {
        IndexerStatus {
            current_block: self.store.current_block(),
            watched_addresses: self.store.subscription_count(),
        }
    }
}
