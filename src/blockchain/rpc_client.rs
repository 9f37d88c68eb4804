use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::config::RpcConfig;
use crate::error::{IndexerError, Result, RpcError};
use crate::logging::{LogContext, MetricsLogger, PerformanceMonitor};
use crate::retry::{RetryConfig, RetryManager};

/// Result of a JSON-RPC call, split by the shapes callers care about
#[derive(Debug, Clone, PartialEq)]
pub enum RpcValue {
    Text(String),
    Object(Map<String, Value>),
    Null,
    Other(Value),
}

impl From<Value> for RpcValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => RpcValue::Text(s),
            Value::Object(map) => RpcValue::Object(map),
            Value::Null => RpcValue::Null,
            other => RpcValue::Other(other),
        }
    }
}

impl RpcValue {
    /// Short name of the JSON shape, for error messages
    pub fn shape(&self) -> &'static str {
        match self {
            RpcValue::Text(_) => "string",
            RpcValue::Object(_) => "object",
            RpcValue::Null => "null",
            RpcValue::Other(Value::Array(_)) => "array",
            RpcValue::Other(Value::Number(_)) => "number",
            RpcValue::Other(Value::Bool(_)) => "bool",
            RpcValue::Other(_) => "value",
        }
    }
}

/// Remote chain access: call `method` with `params`, get a result or an error
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<RpcValue>;
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: &'a [Value],
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 client over HTTP
pub struct RpcClient {
    client: Client,
    endpoint: String,
    timeout_seconds: u64,
    retry: RetryManager,
    next_id: AtomicU64,
    log: LogContext,
}

impl RpcClient {
    pub fn new(config: &RpcConfig) -> Result<Self> {
        Self::with_retry(config, RetryConfig::from(config))
    }

    pub fn with_retry(config: &RpcConfig, retry: RetryConfig) -> Result<Self> {
        let log = LogContext::new("rpc_client", "init")
            .with_metadata("endpoint", serde_json::json!(config.endpoint));
        log.info(&format!(
            "Initializing RPC client (timeout={}s, attempts={})",
            config.timeout_seconds, retry.max_attempts
        ));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IndexerError::Unexpected(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout_seconds: config.timeout_seconds,
            retry: RetryManager::new(retry),
            next_id: AtomicU64::new(1),
            log,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_request(&self, method: &str, params: &[Value]) -> Result<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        self.log
            .for_operation("call")
            .with_metadata("method", serde_json::json!(method))
            .trace(&format!("Sending RPC request: {}", method));

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify_http_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok());
            return Err(RpcError::RateLimit { retry_after }.into());
        }
        if !status.is_success() {
            return Err(RpcError::Status { status: status.as_u16() }.into());
        }

        let body = response.bytes().await.map_err(|e| self.classify_http_error(e))?;
        let rpc_response: JsonRpcResponse = serde_json::from_slice(&body)
            .map_err(|e| RpcError::InvalidResponse(format!("Malformed JSON-RPC response: {}", e)))?;

        if let Some(error) = rpc_response.error {
            return Err(RpcError::Method {
                code: error.code,
                message: error.message,
            }
            .into());
        }

        Ok(rpc_response.result.unwrap_or(Value::Null))
    }

    fn classify_http_error(&self, e: reqwest::Error) -> IndexerError {
        if e.is_timeout() {
            RpcError::Timeout { seconds: self.timeout_seconds }.into()
        } else if e.is_connect() {
            RpcError::Connection(e.to_string()).into()
        } else {
            RpcError::Http(e).into()
        }
    }
}

#[async_trait]
impl ChainClient for RpcClient {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<RpcValue> {
        let monitor = PerformanceMonitor::new(&format!("rpc_{}", method));

        let result = self
            .retry
            .execute(method, || self.send_request(method, &params))
            .await;

        let duration = monitor.finish_with_result(&result);
        MetricsLogger::log_rpc_call(method, duration, result.is_ok());

        result.map(RpcValue::from)
    }
}
