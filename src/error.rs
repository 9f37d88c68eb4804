use std::time::Duration;
use thiserror::Error;

/// Main error type for the transaction indexer
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to process block {block_number}: {source}")]
    Block {
        block_number: u64,
        #[source]
        source: Box<IndexerError>,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Transport-level failures talking to the chain node
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status {status}")]
    Status { status: u16 },

    #[error("RPC method error: code={code}, message={message}")]
    Method { code: i64, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Rate limit exceeded{}", retry_after_suffix(.retry_after))]
    RateLimit {
        /// `Retry-After` in seconds, when the node sent one
        retry_after: Option<u64>,
    },

    #[error("Block not found: {block_number}")]
    BlockNotFound { block_number: u64 },

    #[error("Connection failed: {0}")]
    Connection(String),
}

/// Shape mismatches in chain payloads
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid block number format: {0}")]
    BlockNumber(String),

    #[error("Block {block_number} has unexpected shape: {reason}")]
    Block { block_number: u64, reason: String },

    #[error("Malformed transaction at index {index} in block {block_number}: {reason}")]
    Transaction {
        block_number: u64,
        index: usize,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Configuration parsing failed: {0}")]
    Parsing(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
}

fn retry_after_suffix(retry_after: &Option<u64>) -> String {
    match retry_after {
        Some(seconds) => format!(", retry after {} seconds", seconds),
        None => String::new(),
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, IndexerError>;

/// Coarse classification used when logging and deciding whether to retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Decode,
    Config,
    Unexpected,
}

/// Error severity levels for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl IndexerError {
    /// Wrap an error with the block number it occurred on
    pub fn at_block(self, block_number: u64) -> Self {
        IndexerError::Block {
            block_number,
            source: Box::new(self),
        }
    }

    /// Block number attached by [`IndexerError::at_block`], if any
    pub fn block_number(&self) -> Option<u64> {
        match self {
            IndexerError::Block { block_number, .. } => Some(*block_number),
            _ => None,
        }
    }

    /// Innermost error, skipping block context wrappers
    pub fn root(&self) -> &IndexerError {
        match self {
            IndexerError::Block { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            IndexerError::Rpc(_) => ErrorKind::Transport,
            IndexerError::Decode(_) => ErrorKind::Decode,
            IndexerError::Validation(_) => ErrorKind::Validation,
            IndexerError::Config(_) => ErrorKind::Config,
            IndexerError::Unexpected(_) | IndexerError::Block { .. } => ErrorKind::Unexpected,
        }
    }

    /// Get the severity level of an error
    pub fn severity(&self) -> ErrorSeverity {
        match self.root() {
            IndexerError::Config(_) => ErrorSeverity::Critical,
            IndexerError::Unexpected(_) => ErrorSeverity::Critical,

            IndexerError::Rpc(RpcError::Connection(_)) => ErrorSeverity::High,
            IndexerError::Decode(_) => ErrorSeverity::High,

            IndexerError::Rpc(RpcError::BlockNotFound { .. }) => ErrorSeverity::Low,
            IndexerError::Validation(_) => ErrorSeverity::Low,

            _ => ErrorSeverity::Medium,
        }
    }

    /// Check if the error is recoverable (can be retried)
    pub fn is_recoverable(&self) -> bool {
        match self.root() {
            IndexerError::Rpc(RpcError::Timeout { .. }) => true,
            IndexerError::Rpc(RpcError::RateLimit { .. }) => true,
            IndexerError::Rpc(RpcError::Connection(_)) => true,
            IndexerError::Rpc(RpcError::Status { status }) => *status >= 500,
            IndexerError::Rpc(RpcError::Http(e)) => e.is_timeout() || e.is_connect(),
            IndexerError::Rpc(RpcError::BlockNotFound { .. }) => true,

            // Non-recoverable errors
            IndexerError::Rpc(RpcError::Method { .. }) => false,
            IndexerError::Rpc(RpcError::InvalidResponse(_)) => false,
            IndexerError::Decode(_) => false,
            IndexerError::Validation(_) => false,
            IndexerError::Config(_) => false,
            _ => false,
        }
    }

    /// Wait explicitly requested by the node before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self.root() {
            IndexerError::Rpc(RpcError::RateLimit { retry_after }) => retry_after.map(Duration::from_secs),
            _ => None,
        }
    }

    /// Get suggested retry delay in seconds for recoverable errors
    pub fn retry_delay(&self) -> Option<u64> {
        if !self.is_recoverable() {
            return None;
        }

        match self.root() {
            IndexerError::Rpc(RpcError::RateLimit { retry_after }) => Some(retry_after.unwrap_or(5)),
            IndexerError::Rpc(RpcError::Timeout { .. }) => Some(5),
            IndexerError::Rpc(RpcError::Connection(_)) => Some(10),
            _ => Some(5),
        }
    }
}
