use crate::error::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Archives one dataset directory. Implementations must tolerate being
/// re-invoked for the same dataset: a failed archive is retried on the next
/// due scan without any extra bookkeeping.
pub trait Archiver: Send + Sync {
    fn archive(&self, path: &Path, id: &str) -> Result<()>;
}

/// Performs an incremental backup of one dataset directory given the
/// relative paths changed since the last watermark.
pub trait BackupExecutor: Send + Sync {
    fn backup(
        &self,
        dir: &Path,
        id: &str,
        changed: &[PathBuf],
        full_update: bool,
        date: &str,
    ) -> Result<()>;
}

/// Archiver that runs a configured command template, with `${path}` and
/// `${id}` substituted.
pub struct CommandArchiver {
    template: String,
}

impl CommandArchiver {
    pub fn new(template: String) -> Self {
        Self { template }
    }
}

impl Archiver for CommandArchiver {
    fn archive(&self, path: &Path, id: &str) -> Result<()> {
        let command = self
            .template
            .replace("${path}", &path.to_string_lossy())
            .replace("${id}", id);
        run_command(&command)
    }
}

/// Backup executor that runs a configured command template, with `${id}`,
/// `${dir}`, `${file}` and `${date}` substituted. `${file}` points at a
/// temporary file holding the changed paths, one per line, so the command
/// can pass it straight to e.g. `tar --files-from`.
pub struct CommandBackup {
    template: String,
}

impl CommandBackup {
    pub fn new(template: String) -> Self {
        Self { template }
    }
}

impl BackupExecutor for CommandBackup {
    fn backup(
        &self,
        dir: &Path,
        id: &str,
        changed: &[PathBuf],
        full_update: bool,
        date: &str,
    ) -> Result<()> {
        let mut list = tempfile::NamedTempFile::new()?;
        for path in changed {
            writeln!(list, "{}", path.display())?;
        }
        list.flush()?;

        debug!(
            "backing up {} ({} changed paths, full_update={})",
            dir.display(),
            changed.len(),
            full_update
        );
        let command = self
            .template
            .replace("${id}", id)
            .replace("${dir}", &dir.to_string_lossy())
            .replace("${file}", &list.path().to_string_lossy())
            .replace("${date}", date);
        run_command(&command)
        // The list file is removed when `list` drops.
    }
}

/// Split a command line into argv fields. Space-delimited with CSV quoting
/// rules, so templates can quote arguments containing spaces.
fn split_command(command: &str) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b' ')
        .from_reader(command.as_bytes());
    let record = reader
        .records()
        .next()
        .ok_or_else(|| Error::Command(format!("empty command: '{command}'")))?
        .map_err(|e| Error::Command(format!("can not parse command '{command}': {e}")))?;
    Ok(record.iter().map(str::to_string).collect())
}

fn run_command(command: &str) -> Result<()> {
    let fields = split_command(command)?;
    let (program, args) = fields
        .split_first()
        .ok_or_else(|| Error::Command(format!("empty command: '{command}'")))?;
    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(Error::Command(format!(
            "'{command}' exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    debug!(
        "output of '{}':\n{}",
        command,
        String::from_utf8_lossy(&output.stdout)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_command() {
        let fields = split_command("tar -cf out.tar data").unwrap();
        assert_eq!(fields, vec!["tar", "-cf", "out.tar", "data"]);
    }

    #[test]
    fn test_split_quoted_argument() {
        let fields = split_command("rm -rf \"/srv/data sets/old\"").unwrap();
        assert_eq!(fields, vec!["rm", "-rf", "/srv/data sets/old"]);
    }

    #[test]
    fn test_archive_command_substitution_and_success() {
        let archiver = CommandArchiver::new("echo ${id} ${path}".to_string());
        archiver.archive(Path::new("/srv/ds1"), "abc").unwrap();
    }

    #[test]
    fn test_failing_command_is_an_error() {
        let archiver = CommandArchiver::new("false".to_string());
        let err = archiver.archive(Path::new("/srv/ds1"), "abc").unwrap_err();
        assert!(matches!(err, Error::Command(_)));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let archiver = CommandArchiver::new("definitely-not-a-real-binary x".to_string());
        assert!(archiver.archive(Path::new("/srv/ds1"), "abc").is_err());
    }

    #[test]
    fn test_backup_writes_list_file() {
        // `cat ${file}` succeeds only if the list file exists and is readable.
        let backup = CommandBackup::new("cat ${file}".to_string());
        backup
            .backup(
                Path::new("/srv/ds1"),
                "abc",
                &[PathBuf::from("a.txt"), PathBuf::from("sub/b.txt")],
                true,
                "2024-03-01",
            )
            .unwrap();
    }
}
