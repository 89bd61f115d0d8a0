use crate::config::AppConfig;
use crate::error::Result;
use crate::marker;
use crate::store::{DatasetRecord, RecordStore};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Walk the configured root and reconcile the record store with the
/// datasets found on disk. New datasets get a marker and an active record;
/// moved datasets get their stored path repaired.
pub fn scan_folders(store: &RecordStore, config: &AppConfig) -> Result<()> {
    visit(store, config, Path::new(&config.root), 1)
}

fn visit(store: &RecordStore, config: &AppConfig, dir: &Path, level: u32) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        // Symlinked directories are never descended into or classified;
        // following them could loop or double-count a dataset.
        if file_type.is_symlink() || !file_type.is_dir() {
            continue;
        }
        let path = entry.path();
        if reconcile(store, config, &path)? {
            continue;
        }
        if level >= config.scan_level {
            // Depth exhausted: everything at this level becomes a dataset.
            if let Err(e) = add_dataset(store, &path) {
                warn!("error adding dataset {}: {}", path.display(), e);
            }
            continue;
        }
        visit(store, config, &path, level + 1)?;
    }
    Ok(())
}

/// Classify one directory. Returns true when it is (now) a dataset.
///
/// A marker file wins unconditionally: its id is trusted even when the
/// store disagrees, repairing a store that lost the record or a directory
/// that moved. Without a marker the content-folder heuristic decides.
pub fn reconcile(store: &RecordStore, config: &AppConfig, path: &Path) -> Result<bool> {
    match marker::read(path)? {
        Some(existing) => {
            let path_str = path.to_string_lossy();
            match store.get(&existing.id)? {
                None => {
                    debug!("re-adding lost record for {}", path.display());
                    store.put(&DatasetRecord::new(existing.id, path))?;
                }
                Some(mut record) if record.path != path_str => {
                    debug!("repairing moved dataset {} -> {}", record.path, path_str);
                    record.path = path_str.into_owned();
                    store.put(&record)?;
                }
                Some(_) => {}
            }
            Ok(true)
        }
        None => {
            if contains_content_folder(path, &config.content_folders) {
                add_dataset(store, path)?;
                return Ok(true);
            }
            Ok(false)
        }
    }
}

/// Mark a directory as a dataset: drop a marker file into it and insert a
/// fresh active record.
pub fn add_dataset(store: &RecordStore, path: &Path) -> Result<String> {
    let new_marker = marker::create(path)?;
    store.put(&DatasetRecord::new(new_marker.id.clone(), path))?;
    debug!("added dataset {} at {}", new_marker.id, path.display());
    Ok(new_marker.id)
}

fn contains_content_folder(path: &Path, content_folders: &[String]) -> bool {
    content_folders
        .iter()
        .any(|name| path.join(name).is_dir())
}
