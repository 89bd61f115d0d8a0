use crate::config::AppConfig;
use crate::error::Result;
use crate::store::RecordStore;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

/// Spread the synthetic "last scanned" timestamps of all active records
/// across the scan interval, so rescans and the notice/archive deadlines
/// they trigger do not all land on the same day. Returns the number of
/// records touched. A no-op for intervals of one day or less, where every
/// record is due daily anyway.
pub fn load_balance(store: &RecordStore, config: &AppConfig, now: DateTime<Utc>) -> Result<usize> {
    if config.scan_interval <= 1 {
        return Ok(0);
    }
    let records = store.list_active()?;
    let count = records.len();
    for (i, mut record) in records.into_iter().enumerate() {
        let back_days = (i as i64 % config.scan_interval) + 1;
        record.scan_time = Some(now - Duration::days(back_days));
        store.put(&record)?;
    }
    debug!("redistributed scan times of {} records", count);
    Ok(count)
}
