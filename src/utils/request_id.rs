use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Simple Snowflake-style ID generator for missions and ledger transactions
/// Format: 44 bits timestamp (ms) + 20 bits sequence
///
/// Ids are time-ordered, so big-endian store keys built from them scan in
/// commit order.
const SEQ_BITS: u64 = 20;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub fn generate_record_id() -> u64 {
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64;

    let seq = SEQUENCE.fetch_add(1, Ordering::SeqCst) % (1 << SEQ_BITS);

    (timestamp_ms << SEQ_BITS) | seq
}

/// Extract the embedded creation timestamp (epoch ms) from a record id
pub fn record_timestamp_ms(id: u64) -> u64 {
    id >> SEQ_BITS
}
