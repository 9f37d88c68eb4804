pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod retry;
pub mod store;

pub use api::{ApiServer, QueryFacade};
pub use blockchain::{ChainClient, RpcClient, RpcValue, SyncEngine, SyncReport};
pub use config::{ApiConfig, AppConfig, LoggingConfig, RpcConfig, SyncConfig};
pub use error::{ErrorKind, IndexerError, Result};
pub use logging::{ErrorLogger, LogContext, MetricsLogger, PerformanceMonitor};
pub use models::Transaction;
pub use retry::{RetryConfig, RetryManager};
pub use store::{MemoryStore, TransactionStore};
