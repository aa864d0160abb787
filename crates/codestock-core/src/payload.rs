//! Write-payload size accounting.

use serde::Serialize;

use crate::error::CoreError;

/// Largest serialized create/update body the Gateway will send (1 MiB).
pub const MAX_WRITE_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Byte length of `value` once serialized as compact JSON, i.e. exactly what
/// goes on the wire.
pub fn encoded_len<T: Serialize>(value: &T) -> Result<usize, CoreError> {
    Ok(serde_json::to_vec(value)?.len())
}

pub fn exceeds_limit(len: usize) -> bool {
    len > MAX_WRITE_PAYLOAD_BYTES
}
