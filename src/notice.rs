use crate::error::Result;
use crate::report::ScanReport;
use chrono::Utc;
use tracing::info;

/// Delivers the aggregated report of one orchestration run. The engine
/// calls this once per run and does not retry; delivery failures are the
/// caller's to log.
pub trait Notifier {
    fn notify(&self, report: &ScanReport) -> Result<()>;
}

/// Notifier that renders the report into the process log. An empty report
/// is skipped entirely.
pub struct LogNotifier {
    server_name: String,
}

impl LogNotifier {
    pub fn new(server_name: &str) -> Self {
        Self {
            server_name: server_name.to_string(),
        }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, report: &ScanReport) -> Result<()> {
        if report.is_empty() {
            return Ok(());
        }
        let title = format!(
            "Archive report {} {}",
            self.server_name,
            Utc::now().format("%a, %d %b %Y")
        );
        info!("{}\n{}", title.trim(), render_text(report));
        Ok(())
    }
}

/// Plain-text rendering of a report, sectioned like the mail body the
/// operators get: upcoming archives first, then completed ones, then
/// failures.
pub fn render_text(report: &ScanReport) -> String {
    let mut out = String::new();
    if !report.notices.is_empty() {
        out.push_str("Directories to be archived:\n");
        for notice in &report.notices {
            out.push_str(&format!(
                "  {} will be archived in {} days\n",
                notice.path, notice.days_before_archive
            ));
        }
    }
    if !report.archived.is_empty() {
        out.push_str("Directories archived today:\n");
        for folder in &report.archived {
            out.push_str(&format!("  {}\n", folder.path));
        }
    }
    if !report.errors.is_empty() {
        out.push_str("Errors:\n");
        for error in &report.errors {
            out.push_str(&format!("  folder: {} error: {}\n", error.path, error.message));
        }
    }
    out
}
