//! Stored timeout value encoding
//!
//! A lock column's value is the microsecond epoch timestamp at which the
//! lock becomes stale, stored as decimal text. The value `0` is a reserved
//! sentinel meaning "no application-level timeout": the column never goes
//! stale on its own and only store-side TTL can expire it.

use std::num::ParseIntError;

/// Sentinel stored timeout meaning "no application-level timeout".
pub const NO_TIMEOUT: i64 = 0;

/// Serialize a stored timeout for insertion as a column value.
pub fn encode_timeout(micros: i64) -> String {
    micros.to_string()
}

/// Deserialize a column value back into a stored timeout.
///
/// Strict decimal parse; anything else in a lock column indicates
/// corruption or a foreign writer.
pub fn decode_timeout(raw: &str) -> Result<i64, ParseIntError> {
    raw.parse::<i64>()
}
