use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use serde_json::{json, Value};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::blockchain::block_decoder::{block_tag, decode_block, parse_block_number};
use crate::blockchain::rpc_client::ChainClient;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::logging::{ErrorLogger, LogContext, MetricsLogger, PerformanceMonitor};
use crate::store::TransactionStore;

/// Outcome of one catch-up pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Cursor value the pass started from (after the initial rebase)
    pub start_block: u64,
    /// Chain tip observed at the start of the pass
    pub tip: u64,
    pub blocks_processed: u64,
    pub transactions_matched: usize,
    /// The pass stopped early on a cancellation request
    pub cancelled: bool,
}

/// Incremental scanner from the stored cursor up to the chain tip
pub struct SyncEngine {
    client: Arc<dyn ChainClient>,
    store: Arc<dyn TransactionStore>,
    config: SyncConfig,
    cancel: CancellationToken,
    log: LogContext,
}

impl SyncEngine {
    pub fn new(
        client: Arc<dyn ChainClient>,
        store: Arc<dyn TransactionStore>,
        config: SyncConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self::with_logger(client, store, config, cancel, LogContext::new("sync_engine", "init"))
    }

    pub fn with_logger(
        client: Arc<dyn ChainClient>,
        store: Arc<dyn TransactionStore>,
        config: SyncConfig,
        cancel: CancellationToken,
        log: LogContext,
    ) -> Self {
        Self {
            client,
            store,
            config,
            cancel,
            log,
        }
    }

    /// Token that stops the current pass at the next block boundary and ends [`SyncEngine::run`]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one catch-up pass from `current_block + 1` through the chain tip.
    ///
    /// The cursor moves only after a block is fully indexed, so on error it
    /// points at the last good block and the next call resumes right after it.
    pub async fn advance(&self) -> Result<SyncReport> {
        let tip = self.fetch_tip().await?;

        let mut cursor = self.store.current_block();
        if cursor == 0 {
            cursor = tip.saturating_sub(self.config.backfill_window);
            self.store.set_current_block(cursor);
            self.log
                .for_operation("advance")
                .with_metadata("tip", json!(tip))
                .with_block_number(cursor)
                .info(&format!("First sync pass, starting {} blocks behind tip", tip - cursor));
        }

        let mut report = SyncReport {
            start_block: cursor,
            tip,
            ..SyncReport::default()
        };

        // an empty range once the cursor sits on the last representable block
        let pending = match cursor.checked_add(1) {
            Some(start) => start..=tip,
            None => RangeInclusive::new(1, 0),
        };

        for block_number in pending {
            if self.cancel.is_cancelled() {
                self.log
                    .for_operation("advance")
                    .with_block_number(self.store.current_block())
                    .info("Cancellation requested, stopping at block boundary");
                report.cancelled = true;
                break;
            }

            let matched = self
                .process_block(block_number)
                .await
                .map_err(|e| e.at_block(block_number))?;

            self.store.set_current_block(block_number);
            report.blocks_processed += 1;
            report.transactions_matched += matched;
        }

        MetricsLogger::log_sync_pass(report.start_block, tip, report.blocks_processed, report.transactions_matched);
        Ok(report)
    }

    async fn fetch_tip(&self) -> Result<u64> {
        let result = self.client.call("eth_blockNumber", Vec::new()).await?;
        parse_block_number(&result)
    }

    /// Fetch, decode and index one block; returns how many index entries it added
    async fn process_block(&self, block_number: u64) -> Result<usize> {
        let monitor = PerformanceMonitor::new("process_block")
            .with_metadata("block_number", json!(block_number));

        let params = vec![Value::String(block_tag(block_number)), Value::Bool(true)];
        let result = self.client.call("eth_getBlockByNumber", params).await?;
        let transactions = decode_block(block_number, result)?;
        let transaction_count = transactions.len();

        let mut matched = 0;
        for tx in transactions {
            let hash = tx.hash.clone();
            let recorded = self.store.add_transaction(tx);
            if recorded > 0 {
                self.log
                    .for_operation("process_block")
                    .with_block_number(block_number)
                    .with_transaction_hash(&hash)
                    .debug("Found relevant transaction");
            }
            matched += recorded;
        }

        let duration = monitor.elapsed_ms();
        MetricsLogger::log_block_processed(block_number, transaction_count, matched, duration);
        Ok(matched)
    }

    /// Call [`SyncEngine::advance`] every poll interval until cancelled.
    ///
    /// Errors are logged and the next tick tries again.
    pub async fn run(&self) {
        let period = Duration::from_secs(self.config.poll_interval_seconds);
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.log
            .for_operation("run")
            .with_metadata("poll_interval_seconds", json!(self.config.poll_interval_seconds))
            .info("Starting block synchronization");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.log
                        .for_operation("run")
                        .with_block_number(self.store.current_block())
                        .info("Stopping block synchronization");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.advance().await {
                        ErrorLogger::log_error(&e, Some(self.log.for_operation("advance")));
                    }
                }
            }
        }
    }
}
