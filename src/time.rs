use chrono::{DateTime, TimeZone, Utc};

/// Offset between the Unix epoch and the ledger epoch (2000-01-01T00:00:00Z).
pub const LEDGER_EPOCH_OFFSET: i64 = 946_684_800;

/// Convert ledger-epoch seconds (`date`, `ledger_time`) to UTC.
pub fn from_ledger_epoch(seconds: u64) -> Option<DateTime<Utc>> {
    let unix = i64::try_from(seconds).ok()?.checked_add(LEDGER_EPOCH_OFFSET)?;
    Utc.timestamp_opt(unix, 0).single()
}
