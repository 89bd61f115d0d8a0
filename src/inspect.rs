use crate::error::Result;
use crate::store::{DatasetRecord, RecordStore};
use serde::Serialize;

/// Snapshot of both record collections, for operator inspection.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub active: Vec<DatasetRecord>,
    pub archived: Vec<DatasetRecord>,
}

pub fn inspect(store: &RecordStore) -> Result<InspectReport> {
    Ok(InspectReport {
        active: store.list_active()?,
        archived: store.list_archived()?,
    })
}
