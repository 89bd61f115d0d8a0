use crate::actions::{Archiver, BackupExecutor};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::marker;
use crate::policy;
use crate::report::{ArchiveNotice, ArchivedFolder, ScanError, ScanMessage, ScanReport};
use crate::scanner;
use crate::store::{DatasetRecord, RecordStore};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, warn};

/// Drives one orchestration pass over all active records: a worker pool
/// scans and settles each record independently, and a single aggregator
/// thread owns the report that workers feed over a channel.
pub struct ScanEngine<'a> {
    store: &'a RecordStore,
    config: &'a AppConfig,
    archiver: &'a dyn Archiver,
    backup: Option<&'a dyn BackupExecutor>,
}

impl<'a> ScanEngine<'a> {
    pub fn new(
        store: &'a RecordStore,
        config: &'a AppConfig,
        archiver: &'a dyn Archiver,
        backup: Option<&'a dyn BackupExecutor>,
    ) -> Self {
        Self {
            store,
            config,
            archiver,
            backup,
        }
    }

    /// Run the scan pass:
    /// 1. Snapshot the active records (later additions wait for the next run)
    /// 2. Fan out over a fixed-size worker pool, one task per record
    /// 3. Fan results into the aggregator until every worker is done
    ///
    /// Per-record failures land in the report; only store access failures
    /// abort the run.
    pub fn scan_records(&self) -> Result<ScanReport> {
        let records = self.store.list_active()?;
        let now = Utc::now();
        debug!(
            "scanning {} active records with {} workers",
            records.len(),
            self.config.cores
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.cores)
            .build()?;
        let (tx, rx) = std::sync::mpsc::channel::<ScanMessage>();
        let aggregator = thread::spawn(move || {
            let mut report = ScanReport::default();
            for message in rx {
                report.apply(message);
            }
            report
        });

        // The scope closure owns the original sender; every worker gets a
        // clone. When the scope returns, all senders are gone, the channel
        // closes, and the aggregator drains out.
        pool.scope(move |scope| {
            for record in records {
                let tx = tx.clone();
                scope.spawn(move |_| self.scan_record(record, now, &tx));
            }
        });

        aggregator
            .join()
            .map_err(|_| Error::Other("result aggregator panicked".to_string()))
    }

    fn scan_record(&self, mut record: DatasetRecord, now: DateTime<Utc>, tx: &Sender<ScanMessage>) {
        let path = PathBuf::from(&record.path);
        match fs::metadata(&path) {
            // A vanished dataset is an expected end state, not a failure.
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.remove_vanished(&record, tx);
                return;
            }
            Err(e) => {
                warn!("failed to stat {}: {}", record.path, e);
                self.send_error(tx, &record, &e.to_string());
                return;
            }
            Ok(meta) if !meta.is_dir() => {
                self.remove_vanished(&record, tx);
                return;
            }
            Ok(_) => {}
        }

        if !policy::should_scan(&record, now, self.config) {
            return;
        }

        let last_modify = match scanner::latest_modify_time(&path) {
            Ok(last_modify) => last_modify,
            Err(e) => {
                warn!("failed to scan modify time of {}: {}", record.path, e);
                self.send_error(tx, &record, &e.to_string());
                return;
            }
        };
        record.last_modify_time = Some(last_modify);
        record.scan_time = Some(now);
        self.settle(record, last_modify, now, tx);
    }

    /// Post-scan decision for one record: archive when the deadline has
    /// passed, otherwise back up incrementally and emit at most one notice.
    fn settle(
        &self,
        mut record: DatasetRecord,
        last_modify: DateTime<Utc>,
        now: DateTime<Utc>,
        tx: &Sender<ScanMessage>,
    ) {
        let path = PathBuf::from(&record.path);
        let left = policy::days_left(last_modify, now, self.config.archive_interval);

        if left <= 0 {
            match self.archiver.archive(&path, &record.id) {
                Err(e) => {
                    warn!("failed to archive {}: {}", record.path, e);
                    self.send_error(tx, &record, &e.to_string());
                    // Keep the refreshed scan state; the next due scan retries.
                    self.persist(&record, tx);
                }
                Ok(()) => {
                    record.archive_time = Some(now);
                    match self.store.archive(&record) {
                        Ok(()) => {
                            let _ = tx.send(ScanMessage::Archived(ArchivedFolder {
                                id: record.id.clone(),
                                path: record.path.clone(),
                            }));
                        }
                        Err(e) => self.send_error(
                            tx,
                            &record,
                            &format!("failed to save archived record: {e}"),
                        ),
                    }
                }
            }
            return;
        }

        if let Some(backup) = self.backup {
            if let Err(e) = run_backup(backup, &path, now) {
                warn!("failed to back up {}: {}", record.path, e);
                self.send_error(tx, &record, &e.to_string());
                self.persist(&record, tx);
                return;
            }
        }

        if let Some(threshold) =
            policy::next_notice(&self.config.notice_before, record.noticed_left_days, left)
        {
            record.noticed_left_days = threshold;
            let _ = tx.send(ScanMessage::Notice(ArchiveNotice {
                id: record.id.clone(),
                path: record.path.clone(),
                days_before_archive: threshold,
            }));
        }
        self.persist(&record, tx);
    }

    fn remove_vanished(&self, record: &DatasetRecord, tx: &Sender<ScanMessage>) {
        debug!("removing vanished dataset {} ({})", record.id, record.path);
        if let Err(e) = self.store.delete(&record.id) {
            self.send_error(tx, record, &format!("failed to delete record: {e}"));
        }
    }

    fn persist(&self, record: &DatasetRecord, tx: &Sender<ScanMessage>) {
        if let Err(e) = self.store.put(record) {
            self.send_error(tx, record, &format!("failed to persist record: {e}"));
        }
    }

    fn send_error(&self, tx: &Sender<ScanMessage>, record: &DatasetRecord, message: &str) {
        let _ = tx.send(ScanMessage::Error(ScanError {
            id: record.id.clone(),
            path: record.path.clone(),
            message: message.to_string(),
        }));
    }
}

/// Incremental backup of one dataset directory. Collects the paths changed
/// since the marker's watermark, hands them to the executor, and advances
/// the watermark only after the executor succeeded. Nothing changed means
/// nothing runs and the watermark stays put.
pub fn run_backup(executor: &dyn BackupExecutor, path: &Path, now: DateTime<Utc>) -> Result<()> {
    let Some(mut dataset_marker) = marker::read(path)? else {
        return Err(Error::Marker(format!(
            "missing marker file in {}",
            path.display()
        )));
    };

    let (changed, max_update, full_update) =
        scanner::collect_changed(path, Path::new("."), dataset_marker.backup_time)?;
    // The watermark never moves backwards.
    let max_update = match (dataset_marker.backup_time, max_update) {
        (Some(mark), Some(seen)) if seen < mark => Some(mark),
        (mark, None) => mark,
        (_, seen) => seen,
    };
    if changed.is_empty() {
        return Ok(());
    }

    executor.backup(
        path,
        &dataset_marker.id,
        &changed,
        full_update,
        &now.format("%Y-%m-%d").to_string(),
    )?;
    dataset_marker.backup_time = max_update;
    marker::write(path, &dataset_marker)
}
