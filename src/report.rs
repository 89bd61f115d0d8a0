use serde::Serialize;

/// A per-record failure observed during a scan pass. The record stays in a
/// retryable state; the next due scan picks it up again.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanError {
    pub id: String,
    pub path: String,
    pub message: String,
}

/// An advance warning that a dataset will be archived soon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchiveNotice {
    pub id: String,
    pub path: String,
    pub days_before_archive: i64,
}

/// A dataset archived during this pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchivedFolder {
    pub id: String,
    pub path: String,
}

/// One result produced by a scan worker, sent over the channel to the
/// aggregator that owns the report.
#[derive(Debug, Clone)]
pub enum ScanMessage {
    Error(ScanError),
    Notice(ArchiveNotice),
    Archived(ArchivedFolder),
}

/// Aggregated outcome of one orchestration run. Entry order carries no
/// meaning; the report is a set, filled by a single owner.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ScanReport {
    pub errors: Vec<ScanError>,
    pub notices: Vec<ArchiveNotice>,
    pub archived: Vec<ArchivedFolder>,
}

impl ScanReport {
    pub fn apply(&mut self, message: ScanMessage) {
        match message {
            ScanMessage::Error(e) => self.errors.push(e),
            ScanMessage::Notice(n) => self.notices.push(n),
            ScanMessage::Archived(a) => self.archived.push(a),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.notices.is_empty() && self.archived.is_empty()
    }

    pub fn total_entries(&self) -> usize {
        self.errors.len() + self.notices.len() + self.archived.len()
    }
}
