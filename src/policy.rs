use crate::config::AppConfig;
use crate::store::DatasetRecord;
use chrono::{DateTime, Utc};

/// Whole days elapsed between two instants, counted on calendar dates so
/// that a scan at 23:59 followed by one at 00:01 still counts as a day.
pub fn days_since(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.date_naive()
        .signed_duration_since(then.date_naive())
        .num_days()
}

/// Days until the archive deadline. Zero or negative means the dataset is
/// due for archiving today.
pub fn days_left(last_modify: DateTime<Utc>, now: DateTime<Utc>, archive_interval: i64) -> i64 {
    archive_interval - days_since(last_modify, now)
}

/// The notice threshold that applies at the current days-left count, if
/// any. Thresholds are walked in descending order; any threshold at least
/// as loose as one already sent is skipped, so notices only ever tighten.
pub fn next_notice(thresholds: &[i64], noticed_left_days: i64, days_left: i64) -> Option<i64> {
    thresholds
        .iter()
        .copied()
        .filter(|&t| !(noticed_left_days > 0 && noticed_left_days <= t))
        .find(|&t| days_left <= t)
}

/// Whether a record is due for a full rescan of its directory tree.
///
/// True when the record has never been scanned, when the scan interval has
/// elapsed, when the archive deadline has been reached (a final re-check
/// for last-minute changes before archiving), or when an unsent notice
/// threshold would apply today. Everything else can wait, which is what
/// spreads expensive tree walks out over the interval.
pub fn should_scan(record: &DatasetRecord, now: DateTime<Utc>, config: &AppConfig) -> bool {
    let Some(scan_time) = record.scan_time else {
        return true;
    };
    if days_since(scan_time, now) >= config.scan_interval {
        return true;
    }
    let Some(last_modify) = record.last_modify_time else {
        return false;
    };
    let left = days_left(last_modify, now, config.archive_interval);
    if left <= 0 {
        return true;
    }
    next_notice(&config.notice_before, record.noticed_left_days, left).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::path::Path;

    fn record(scan_days_ago: Option<i64>, modify_days_ago: Option<i64>) -> DatasetRecord {
        let now = Utc::now();
        let mut record = DatasetRecord::new("ds".to_string(), Path::new("/data/ds"));
        record.scan_time = scan_days_ago.map(|d| now - Duration::days(d));
        record.last_modify_time = modify_days_ago.map(|d| now - Duration::days(d));
        record
    }

    fn config() -> AppConfig {
        AppConfig::default()
    }

    #[test]
    fn test_never_scanned_always_scans() {
        assert!(should_scan(&record(None, None), Utc::now(), &config()));
        assert!(should_scan(&record(None, Some(1)), Utc::now(), &config()));
    }

    #[test]
    fn test_fresh_record_waits() {
        // Scanned yesterday, modified yesterday, nothing due for weeks.
        assert!(!should_scan(&record(Some(1), Some(1)), Utc::now(), &config()));
    }

    #[test]
    fn test_scan_interval_elapsed() {
        let config = config();
        assert!(should_scan(
            &record(Some(config.scan_interval), Some(1)),
            Utc::now(),
            &config
        ));
    }

    #[test]
    fn test_archive_deadline_forces_rescan() {
        // interval 30, unchanged for 31 days: due even though scanned today.
        assert!(should_scan(&record(Some(0), Some(31)), Utc::now(), &config()));
        assert!(should_scan(&record(Some(0), Some(30)), Utc::now(), &config()));
        assert!(!should_scan(&record(Some(0), Some(19)), Utc::now(), &config()));
    }

    #[test]
    fn test_pending_notice_forces_rescan() {
        // 25 days unchanged, 5 left, thresholds [10, 5, 1]: a notice is due.
        assert!(should_scan(&record(Some(0), Some(25)), Utc::now(), &config()));

        // Same record once the tightest threshold has been sent.
        let mut noticed = record(Some(0), Some(25));
        noticed.noticed_left_days = 1;
        assert!(!should_scan(&noticed, Utc::now(), &config()));
    }

    #[test]
    fn test_days_since_uses_calendar_days() {
        let then = "2024-03-01T23:50:00Z".parse::<DateTime<Utc>>().unwrap();
        let now = "2024-03-02T00:10:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(days_since(then, now), 1);
        assert_eq!(days_since(now, now), 0);
    }

    #[test]
    fn test_next_notice_boundary() {
        // Fires exactly at the threshold, not one day before.
        assert_eq!(next_notice(&[5], 0, 5), Some(5));
        assert_eq!(next_notice(&[5], 0, 6), None);
        assert_eq!(next_notice(&[5], 0, 4), Some(5));
    }

    #[test]
    fn test_next_notice_takes_loosest_unsent_threshold() {
        // Nothing sent yet: the first descending threshold covering the
        // current days-left fires.
        assert_eq!(next_notice(&[10, 5, 1], 0, 5), Some(10));
        assert_eq!(next_notice(&[10, 5, 1], 0, 11), None);
    }

    #[test]
    fn test_next_notice_only_tightens() {
        // Threshold 10 already sent: only tighter thresholds remain.
        assert_eq!(next_notice(&[10, 5, 1], 10, 7), None);
        assert_eq!(next_notice(&[10, 5, 1], 10, 5), Some(5));
        // Threshold 5 sent: a later pass never re-fires 10.
        assert_eq!(next_notice(&[10, 5, 1], 5, 8), None);
        assert_eq!(next_notice(&[10, 5, 1], 5, 1), Some(1));
    }
}
