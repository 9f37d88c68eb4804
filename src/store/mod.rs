pub mod memory;


pub use memory::MemoryStore;

use crate::models::Transaction;

/// Owner of the watch list, the sync cursor and the address index.
///
/// Implementations must be safe to call from many tasks at once. None of the
/// operations fail: invalid input degrades to `false` or an empty result.
pub trait TransactionStore: Send + Sync {
    /// Highest block fully processed, 0 before the first sync pass
    fn current_block(&self) -> u64;

    /// Move the cursor. Monotonicity is the caller's responsibility.
    fn set_current_block(&self, block_number: u64);

    /// Add `address` to the watch list; `false` if it is not a valid address
    fn subscribe(&self, address: &str) -> bool;

    fn is_subscribed(&self, address: &str) -> bool;

    /// Append `tx` to the sequence of every watched counterparty and return
    /// how many sequences received it
    fn add_transaction(&self, tx: Transaction) -> usize;

    /// Matched transactions for `address` in discovery order
    fn transactions_for(&self, address: &str) -> Vec<Transaction>;

    fn subscription_count(&self) -> usize;
}
