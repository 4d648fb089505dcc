use chrono::Utc;

/// Get current timestamp in milliseconds (UTC)
pub fn get_current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format an epoch-milliseconds timestamp as RFC3339 (UTC).
/// Out-of-range inputs yield an empty string rather than a panic.
pub fn rfc3339_from_ms(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

// ============================================================================
// Store key encoding
// ============================================================================
//
// Composite keys are big-endian so that sled's byte order equals numeric
// order. Layout: [owner_id: 8 bytes BE][record_id: 8 bytes BE].
// Snowflake ids are time-ordered, so a prefix scan over an owner yields
// records in commit order and a reverse scan yields newest-first.

/// Encode a single u64 as a big-endian key
#[inline]
pub fn key_u64(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// Encode (owner_id, record_id) as a 16-byte composite key
#[inline]
pub fn key_owner_record(owner_id: u64, record_id: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&owner_id.to_be_bytes());
    key[8..].copy_from_slice(&record_id.to_be_bytes());
    key
}

/// Decode the record id from a 16-byte composite key
#[inline]
pub fn record_id_from_key(key: &[u8]) -> Option<u64> {
    if key.len() != 16 {
        return None;
    }
    let bytes: [u8; 8] = key[8..].try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}
