//! Address shape checks and canonical form.

/// Length of a `0x`-prefixed 20-byte hex address
pub const ADDRESS_LENGTH: usize = 42;

/// Canonical form used for watch-list keys: ASCII lowercase
pub fn normalize_address(address: &str) -> String {
    address.to_ascii_lowercase()
}

/// True iff `address` is `0x` followed by exactly 40 hex digits.
///
/// The prefix is case-sensitive: `0X...` is rejected.
pub fn is_valid_address(address: &str) -> bool {
    address.len() == ADDRESS_LENGTH
        && address.starts_with("0x")
        && address[2..].chars().all(|c| c.is_ascii_hexdigit())
}
