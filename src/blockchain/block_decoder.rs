use serde::Deserialize;
use serde_json::{Map, Value};

use crate::blockchain::rpc_client::RpcValue;
use crate::error::{DecodeError, IndexerError, Result, RpcError};
use crate::models::Transaction;

/// Transaction object as returned by `eth_getBlockByNumber(_, true)`
#[derive(Debug, Deserialize)]
struct RawTransaction {
    hash: String,
    from: String,
    /// `null` for contract creations
    to: Option<String>,
    value: String,
}

/// Parse an `eth_blockNumber` result: a `0x`-prefixed hex quantity
pub fn parse_block_number(value: &RpcValue) -> Result<u64> {
    let RpcValue::Text(text) = value else {
        return Err(DecodeError::BlockNumber(format!("expected hex string, got {}", value.shape())).into());
    };

    parse_hex_quantity(text)
        .ok_or_else(|| DecodeError::BlockNumber(format!("'{}' is not a hex quantity", text)).into())
}

fn parse_hex_quantity(text: &str) -> Option<u64> {
    let digits = text.strip_prefix("0x")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Block tag parameter for `eth_getBlockByNumber`
pub fn block_tag(block_number: u64) -> String {
    format!("0x{:x}", block_number)
}

/// Decode every transaction of a full block.
///
/// Any malformed entry fails the whole block; nothing is partially returned.
pub fn decode_block(block_number: u64, value: RpcValue) -> Result<Vec<Transaction>> {
    let block = match value {
        RpcValue::Object(map) => map,
        RpcValue::Null => return Err(IndexerError::Rpc(RpcError::BlockNotFound { block_number })),
        other => {
            return Err(DecodeError::Block {
                block_number,
                reason: format!("expected object, got {}", other.shape()),
            }
            .into())
        }
    };

    let entries = transactions_array(block_number, block)?;

    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| decode_transaction(block_number, index, entry))
        .collect()
}

fn transactions_array(block_number: u64, mut block: Map<String, Value>) -> Result<Vec<Value>> {
    match block.remove("transactions") {
        Some(Value::Array(entries)) => Ok(entries),
        Some(_) => Err(DecodeError::Block {
            block_number,
            reason: "'transactions' is not an array".to_string(),
        }
        .into()),
        None => Err(DecodeError::Block {
            block_number,
            reason: "missing 'transactions'".to_string(),
        }
        .into()),
    }
}

fn decode_transaction(block_number: u64, index: usize, entry: Value) -> Result<Transaction> {
    let raw: RawTransaction = serde_json::from_value(entry).map_err(|e| DecodeError::Transaction {
        block_number,
        index,
        reason: e.to_string(),
    })?;

    Ok(Transaction {
        hash: raw.hash,
        from: raw.from,
        to: raw.to.unwrap_or_default(),
        value: raw.value,
        block_number,
    })
}
