use log::{info, warn, error, debug, trace};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::config::LoggingConfig;
use crate::error::{ErrorSeverity, IndexerError};

/// Structured logging context handed to each component at construction
#[derive(Debug, Clone)]
pub struct LogContext {
    pub component: String,
    pub operation: String,
    pub metadata: HashMap<String, Value>,
}

impl LogContext {
    pub fn new(component: &str, operation: &str) -> Self {
        Self {
            component: component.to_string(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    /// Derive a context for another operation of the same component
    pub fn for_operation(&self, operation: &str) -> Self {
        Self {
            component: self.component.clone(),
            operation: operation.to_string(),
            metadata: self.metadata.clone(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn with_block_number(self, block_number: u64) -> Self {
        self.with_metadata("block_number", json!(block_number))
    }

    pub fn with_transaction_hash(self, tx_hash: &str) -> Self {
        self.with_metadata("transaction_hash", json!(tx_hash))
    }

    pub fn with_address(self, address: &str) -> Self {
        self.with_metadata("address", json!(address))
    }

    pub fn with_duration_ms(self, duration_ms: u64) -> Self {
        self.with_metadata("duration_ms", json!(duration_ms))
    }

    pub fn with_retry_count(self, retry_count: u32) -> Self {
        self.with_metadata("retry_count", json!(retry_count))
    }

    fn format_message(&self, level: &str, message: &str) -> String {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut log_entry = json!({
            "timestamp": timestamp,
            "level": level,
            "component": self.component,
            "operation": self.operation,
            "message": message,
        });

        for (key, value) in &self.metadata {
            log_entry[key] = value.clone();
        }

        log_entry.to_string()
    }

    pub fn info(&self, message: &str) {
        info!("{}", self.format_message("INFO", message));
    }

    pub fn warn(&self, message: &str) {
        warn!("{}", self.format_message("WARN", message));
    }

    pub fn error(&self, message: &str) {
        error!("{}", self.format_message("ERROR", message));
    }

    pub fn debug(&self, message: &str) {
        debug!("{}", self.format_message("DEBUG", message));
    }

    pub fn trace(&self, message: &str) {
        trace!("{}", self.format_message("TRACE", message));
    }
}

/// Times an operation and logs the outcome when finished
pub struct PerformanceMonitor {
    start_time: Instant,
    operation: String,
    metadata: HashMap<String, Value>,
}

impl PerformanceMonitor {
    pub fn new(operation: &str) -> Self {
        Self {
            start_time: Instant::now(),
            operation: operation.to_string(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }

    pub fn finish_with_result<T, E>(self, result: &Result<T, E>) -> u64
    where
        E: std::fmt::Display,
    {
        let duration = self.elapsed_ms();

        let mut context = LogContext::new("performance", &self.operation)
            .with_duration_ms(duration);

        for (key, value) in self.metadata {
            context = context.with_metadata(&key, value);
        }

        match result {
            Ok(_) => {
                context.trace(&format!("Operation completed successfully in {}ms", duration));
            }
            Err(e) => {
                context = context.with_metadata("error", json!(e.to_string()));
                context.debug(&format!("Operation failed after {}ms: {}", duration, e));
            }
        }

        duration
    }
}

/// Error logging utilities
pub struct ErrorLogger;

impl ErrorLogger {
    pub fn log_error(error: &IndexerError, context: Option<LogContext>) {
        let severity = error.severity();

        let mut log_context = context.unwrap_or_else(|| LogContext::new("error", "unknown"));
        log_context = log_context
            .with_metadata("error_kind", json!(format!("{:?}", error.kind())))
            .with_metadata("severity", json!(format!("{:?}", severity)))
            .with_metadata("recoverable", json!(error.is_recoverable()));

        if let Some(block_number) = error.block_number() {
            log_context = log_context.with_block_number(block_number);
        }
        if let Some(delay) = error.retry_delay() {
            log_context = log_context.with_metadata("retry_delay_seconds", json!(delay));
        }

        let message = format!("Error occurred: {}", error);

        match severity {
            ErrorSeverity::Critical | ErrorSeverity::High => log_context.error(&message),
            ErrorSeverity::Medium => log_context.warn(&message),
            ErrorSeverity::Low => log_context.info(&message),
        }
    }

    pub fn log_recovery_attempt(operation: &str, error: &IndexerError, attempt: u32, max_attempts: u32) {
        let context = LogContext::new("recovery", operation)
            .with_retry_count(attempt)
            .with_metadata("max_attempts", json!(max_attempts))
            .with_metadata("error_kind", json!(format!("{:?}", error.kind())));

        if attempt >= max_attempts {
            context.error(&format!("Final attempt failed: {}", error));
        } else {
            context.warn(&format!("Attempt {} of {} failed: {}", attempt, max_attempts, error));
        }
    }

    pub fn log_recovery_success(operation: &str, attempts: u32, total_duration_ms: u64) {
        let context = LogContext::new("recovery", operation)
            .with_retry_count(attempts)
            .with_duration_ms(total_duration_ms);

        context.info(&format!("Operation recovered after {} attempts in {}ms", attempts, total_duration_ms));
    }
}

/// Application metrics emitted as structured log lines
pub struct MetricsLogger;

impl MetricsLogger {
    pub fn log_block_processed(block_number: u64, transaction_count: usize, matched: usize, processing_time_ms: u64) {
        let context = LogContext::new("metrics", "block_processed")
            .with_block_number(block_number)
            .with_metadata("transaction_count", json!(transaction_count))
            .with_metadata("matched", json!(matched))
            .with_duration_ms(processing_time_ms);

        context.debug(&format!(
            "Block {} processed: {} transactions, {} matched",
            block_number, transaction_count, matched
        ));
    }

    pub fn log_rpc_call(method: &str, duration_ms: u64, success: bool) {
        let context = LogContext::new("metrics", "rpc_call")
            .with_metadata("method", json!(method))
            .with_duration_ms(duration_ms)
            .with_metadata("success", json!(success));

        if success {
            context.trace(&format!("RPC call {} completed in {}ms", method, duration_ms));
        } else {
            context.warn(&format!("RPC call {} failed after {}ms", method, duration_ms));
        }
    }

    pub fn log_sync_pass(start_block: u64, tip: u64, blocks_processed: u64, matched: usize) {
        let context = LogContext::new("metrics", "sync_pass")
            .with_metadata("start_block", json!(start_block))
            .with_metadata("tip", json!(tip))
            .with_metadata("blocks_processed", json!(blocks_processed))
            .with_metadata("transactions_matched", json!(matched));

        if blocks_processed > 0 {
            context.info(&format!(
                "Processed {} blocks up to {}, {} matching transactions",
                blocks_processed, tip, matched
            ));
        } else {
            context.debug(&format!("No new blocks (tip {})", tip));
        }
    }
}

/// Initialize the process-wide logger from configuration
pub fn init_logging(config: &LoggingConfig) -> Result<(), log::SetLoggerError> {
    let json_format = config.format == "json";

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.level.as_str()))
        .format(move |buf, record| {
            use std::io::Write;

            let message = record.args().to_string();
            match serde_json::from_str::<Value>(&message) {
                Ok(json_value) if json_format => writeln!(buf, "{}", json_value),
                Ok(json_value) => writeln!(buf, "{}", serde_json::to_string_pretty(&json_value)?),
                Err(_) if json_format => writeln!(
                    buf,
                    "{}",
                    json!({
                        "timestamp": chrono::Utc::now().to_rfc3339(),
                        "level": record.level().to_string(),
                        "target": record.target(),
                        "message": message,
                    })
                ),
                Err(_) => writeln!(
                    buf,
                    "{} [{}] {}: {}",
                    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ),
            }
        })
        .try_init()?;

    info!("Logging initialized (level={}, format={})", config.level, config.format);
    Ok(())
}
