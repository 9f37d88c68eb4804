use serde::{Deserialize, Serialize};

/// A transaction matched against the watch list
///
/// `value` is the hex quantity exactly as the node returned it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value: String,
    pub block_number: u64,
}

impl Transaction {
    /// Both counterparties of the transfer, `to` is empty for contract creations
    pub fn counterparties(&self) -> [&str; 2] {
        [&self.from, &self.to]
    }
}
