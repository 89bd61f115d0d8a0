use crate::error::{Error, Result};
use crate::marker::MARKER_FILE_NAME;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Walk a dataset tree and return the most recent modify time observed,
/// marker file excluded. Per-entry failures are logged and skipped so one
/// unreadable file does not hide the rest of the tree; a walk that yields
/// nothing usable at all is an error.
pub fn latest_modify_time(root: &Path) -> Result<DateTime<Utc>> {
    let mut latest: Option<DateTime<Utc>> = None;
    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("error walking {}: {}", root.display(), e);
                continue;
            }
        };
        if entry.file_name() == MARKER_FILE_NAME {
            continue;
        }
        let modified = match entry.metadata().map(|m| m.modified()) {
            Ok(Ok(modified)) => DateTime::<Utc>::from(modified),
            Ok(Err(e)) => {
                warn!("error reading mtime of {}: {}", entry.path().display(), e);
                continue;
            }
            Err(e) => {
                warn!("error reading metadata of {}: {}", entry.path().display(), e);
                continue;
            }
        };
        if Some(modified) > latest {
            latest = Some(modified);
        }
    }
    latest.ok_or_else(|| Error::Other(format!("no readable entries under {}", root.display())))
}

/// Recursively collect the paths under `base` modified after `watermark`,
/// relative to `base`. Returns the changed paths, the maximum modify time
/// observed, and whether everything seen was changed. A subtree in which
/// every file changed collapses to the subtree's own relative path, so the
/// list handed to the backup command stays short for fresh datasets.
///
/// Symlinks and the marker file are skipped. Entries whose metadata cannot
/// be read are skipped as well; they will be picked up by a later pass.
pub fn collect_changed(
    base: &Path,
    rel: &Path,
    watermark: Option<DateTime<Utc>>,
) -> Result<(Vec<PathBuf>, Option<DateTime<Utc>>, bool)> {
    let abs = base.join(rel);
    let mut changed: Vec<PathBuf> = Vec::new();
    let mut max_update: Option<DateTime<Utc>> = None;
    let mut full_update = true;

    for entry in fs::read_dir(&abs)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(_) => continue,
        };
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(_) => continue,
        };
        if file_type.is_symlink() || entry.file_name() == MARKER_FILE_NAME {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(_) => continue,
        };

        let rel_path = if rel == Path::new(".") {
            PathBuf::from(entry.file_name())
        } else {
            rel.join(entry.file_name())
        };

        if file_type.is_dir() {
            let (sub_paths, sub_max, sub_full) = collect_changed(base, &rel_path, watermark)?;
            if sub_full {
                if !sub_paths.is_empty() {
                    changed.push(rel_path);
                }
            } else {
                changed.extend(sub_paths);
                full_update = false;
            }
            if sub_max > max_update {
                max_update = sub_max;
            }
        } else {
            match watermark {
                // Unchanged since the last backup.
                Some(mark) if mark >= modified => {
                    full_update = false;
                }
                _ => changed.push(rel_path),
            }
        }
        if Some(modified) > max_update {
            max_update = Some(modified);
        }
    }

    // A fully-changed subtree is reported as the subtree itself, except at
    // the top level where the caller wants the individual entries.
    if !changed.is_empty() && full_update && rel != Path::new(".") {
        return Ok((vec![rel.to_path_buf()], max_update, true));
    }
    Ok((changed, max_update, full_update))
}
