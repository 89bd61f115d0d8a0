use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use rocksdb::{ColumnFamily, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::path::Path;

const CF_ACTIVE: &str = "active";
const CF_ARCHIVED: &str = "archived";

/// Persisted lifecycle state of one dataset folder, keyed by its id.
///
/// Timestamps are optional on purpose: a record that has never been scanned
/// carries no `scan_time` at all, which is not the same thing as a scan at
/// the epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: String,
    pub path: String,
    /// Latest modify time of any file in the folder.
    pub last_modify_time: Option<DateTime<Utc>>,
    /// When the folder was last scanned.
    pub scan_time: Option<DateTime<Utc>>,
    /// Tightest days-before-archive threshold already noticed, 0 for none.
    pub noticed_left_days: i64,
    /// When the record was moved to the archived collection.
    pub archive_time: Option<DateTime<Utc>>,
}

impl DatasetRecord {
    pub fn new(id: String, path: &Path) -> Self {
        Self {
            id,
            path: path.to_string_lossy().into_owned(),
            last_modify_time: None,
            scan_time: None,
            noticed_left_days: 0,
            archive_time: None,
        }
    }
}

/// Transactional record store backed by RocksDB, with the active and
/// archived collections in separate column families. RocksDB serializes
/// writes internally, so a store handle can be shared across scan workers
/// without additional locking.
pub struct RecordStore {
    db: DB,
}

impl RecordStore {
    /// Open (or create) the store at `path`. Failure here is fatal to the
    /// caller: no lifecycle decision can be made without durable state.
    pub fn open(path: &Path) -> Result<Self> {
        let mut options = Options::default();
        options.create_if_missing(true);
        options.create_missing_column_families(true);
        let db = DB::open_cf(&options, path, [CF_ACTIVE, CF_ARCHIVED])?;
        Ok(Self { db })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Other(format!("missing column family '{name}'")))
    }

    // ── Active collection ────────────────────────────────────────

    pub fn put(&self, record: &DatasetRecord) -> Result<()> {
        let cf = self.cf(CF_ACTIVE)?;
        self.db
            .put_cf(cf, record.id.as_bytes(), encode_record(record)?)?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<DatasetRecord>> {
        self.get_in(CF_ACTIVE, id)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let cf = self.cf(CF_ACTIVE)?;
        self.db.delete_cf(cf, id.as_bytes())?;
        Ok(())
    }

    pub fn list_active(&self) -> Result<Vec<DatasetRecord>> {
        self.list_in(CF_ACTIVE)
    }

    // ── Archived collection ──────────────────────────────────────

    /// Atomically remove the record from the active collection and insert
    /// it into the archived one. A crash leaves the record in exactly one
    /// of the two collections, never both and never neither.
    pub fn archive(&self, record: &DatasetRecord) -> Result<()> {
        let mut batch = WriteBatch::default();
        batch.delete_cf(self.cf(CF_ACTIVE)?, record.id.as_bytes());
        batch.put_cf(
            self.cf(CF_ARCHIVED)?,
            record.id.as_bytes(),
            encode_record(record)?,
        );
        self.db.write(batch)?;
        Ok(())
    }

    pub fn get_archived(&self, id: &str) -> Result<Option<DatasetRecord>> {
        self.get_in(CF_ARCHIVED, id)
    }

    pub fn list_archived(&self) -> Result<Vec<DatasetRecord>> {
        self.list_in(CF_ARCHIVED)
    }

    // ── Internals ────────────────────────────────────────────────

    fn get_in(&self, cf_name: &str, id: &str) -> Result<Option<DatasetRecord>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, id.as_bytes())? {
            Some(data) => Ok(Some(decode_record(&data)?)),
            None => Ok(None),
        }
    }

    fn list_in(&self, cf_name: &str) -> Result<Vec<DatasetRecord>> {
        let cf = self.cf(cf_name)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            records.push(decode_record(&value)?);
        }
        Ok(records)
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("path", &self.db.path())
            .finish()
    }
}

fn encode_record(record: &DatasetRecord) -> Result<Vec<u8>> {
    Ok(bincode::serialize(record)?)
}

fn decode_record(data: &[u8]) -> Result<DatasetRecord> {
    Ok(bincode::deserialize(data)?)
}
