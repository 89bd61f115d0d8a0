use crate::error::{Error, Result};
use config::{Config, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;

/// Runtime configuration. Loaded once at startup and treated as immutable
/// for the rest of the run.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AppConfig {
    /// Path of the record store database.
    pub db: String,
    /// Root folder whose subtree is scanned for datasets.
    pub root: String,
    /// Depth at which directories are forced to become datasets.
    pub scan_level: u32,
    /// Days between full rescans of a dataset.
    pub scan_interval: i64,
    /// Days of inactivity after which a dataset is archived.
    pub archive_interval: i64,
    /// Days-before-archive thresholds at which a notice is sent.
    pub notice_before: Vec<i64>,
    /// Worker threads used by the scan orchestrator.
    pub cores: usize,
    /// Child folder names that mark a directory as dataset content.
    pub content_folders: Vec<String>,
    /// Archive command template, `${path}` and `${id}` are substituted.
    pub archive_command: String,
    /// Backup command template, `${id}`, `${dir}`, `${file}` and `${date}`
    /// are substituted. Empty disables incremental backups.
    pub backup_command: String,
    /// Folder for log files. Empty logs to stdout only.
    pub log_folder: String,
    /// Lock file guarding against concurrent runs. Empty disables locking.
    pub pid_file: String,
    /// Host name used in report headers.
    pub server_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db: "archive.db".to_string(),
            root: String::new(),
            scan_level: 3,
            scan_interval: 3,
            archive_interval: 30,
            notice_before: vec![10, 5, 1],
            cores: num_cpus::get(),
            content_folders: vec!["frames".to_string(), "Images-Disc1".to_string()],
            archive_command: String::new(),
            backup_command: String::new(),
            log_folder: String::new(),
            pid_file: "/tmp/shelf-life.pid".to_string(),
            server_name: String::new(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let builder = Config::builder()
            .add_source(ConfigFile::from(path.to_path_buf()))
            .build()?;
        let mut config: AppConfig = builder.try_deserialize()?;
        if config.archive_command.is_empty() {
            return Err(Error::Other("archive-command must be provided".to_string()));
        }
        config.normalize();
        Ok(config)
    }

    /// Sort notice thresholds descending and drop duplicates, so decision
    /// code can walk them front to back without re-sorting per record.
    pub fn normalize(&mut self) {
        self.notice_before.sort_unstable_by(|a, b| b.cmp(a));
        self.notice_before.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
db = "lifecycle.db"
root = "/srv/datasets"
scan-level = 2
scan-interval = 5
archive-interval = 60
notice-before = [14, 7]
archive-command = "true ${{path}}"
log-folder = "log"
cores = 2
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.db, "lifecycle.db");
        assert_eq!(config.root, "/srv/datasets");
        assert_eq!(config.scan_level, 2);
        assert_eq!(config.scan_interval, 5);
        assert_eq!(config.archive_interval, 60);
        assert_eq!(config.notice_before, vec![14, 7]);
        assert_eq!(config.cores, 2);
        // Defaults fill unlisted keys.
        assert_eq!(config.pid_file, "/tmp/shelf-life.pid");
        assert!(config.backup_command.is_empty());
    }

    #[test]
    fn test_archive_command_is_required() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "root = \"/srv/datasets\"").unwrap();
        assert!(AppConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_normalize_sorts_and_dedups_thresholds() {
        let mut config = AppConfig {
            notice_before: vec![5, 10, 5, 1, 10],
            ..AppConfig::default()
        };
        config.normalize();
        assert_eq!(config.notice_before, vec![10, 5, 1]);
    }
}
