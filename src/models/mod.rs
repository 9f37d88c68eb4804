pub mod address;
pub mod transaction;

pub use address::{is_valid_address, normalize_address, ADDRESS_LENGTH};
pub use transaction::Transaction;
