use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use uuid::Uuid;

/// Name of the marker file identifying a directory as a dataset.
pub const MARKER_FILE_NAME: &str = ".dataset";

/// On-disk marker carried by every dataset directory. The id survives moves
/// of the directory and restores of the store; the backup watermark is kept
/// here rather than in the store because backup content is computed from the
/// filesystem, not from the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DatasetMarker {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_time: Option<DateTime<Utc>>,
}

/// Read the marker of a dataset directory. `Ok(None)` when the directory
/// carries no marker file.
pub fn read(dir: &Path) -> Result<Option<DatasetMarker>> {
    let path = dir.join(MARKER_FILE_NAME);
    let data = match fs::read_to_string(&path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let marker = toml::from_str(&data)
        .map_err(|e| Error::Marker(format!("{}: {e}", path.display())))?;
    Ok(Some(marker))
}

/// Write (or overwrite) the marker file of a dataset directory.
pub fn write(dir: &Path, marker: &DatasetMarker) -> Result<()> {
    let path = dir.join(MARKER_FILE_NAME);
    let data = toml::to_string(marker)
        .map_err(|e| Error::Marker(format!("{}: {e}", path.display())))?;
    fs::write(&path, data)?;
    Ok(())
}

/// Mark a directory as a dataset by dropping a marker file with a freshly
/// generated id into it.
pub fn create(dir: &Path) -> Result<DatasetMarker> {
    let marker = DatasetMarker {
        id: Uuid::new_v4().to_string(),
        backup_time: None,
    };
    write(dir, &marker)?;
    Ok(marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_marker() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read(dir.path()).unwrap(), None);
    }

    #[test]
    fn test_create_and_read_back() {
        let dir = TempDir::new().unwrap();
        let marker = create(dir.path()).unwrap();
        assert!(!marker.id.is_empty());
        assert_eq!(marker.backup_time, None);

        let read_back = read(dir.path()).unwrap().unwrap();
        assert_eq!(read_back, marker);
    }

    #[test]
    fn test_backup_time_round_trip() {
        let dir = TempDir::new().unwrap();
        let marker = DatasetMarker {
            id: "ds-1".to_string(),
            backup_time: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()),
        };
        write(dir.path(), &marker).unwrap();
        assert_eq!(read(dir.path()).unwrap().unwrap(), marker);
    }

    #[test]
    fn test_malformed_marker_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(MARKER_FILE_NAME), "not = [valid").unwrap();
        assert!(read(dir.path()).is_err());
    }
}
