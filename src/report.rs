//! Run report: incidents, outcome tallies and the final summary.
//!
//! Every component records its warnings and errors here instead of aborting
//! the run. Only failures that make the whole run meaningless are returned as
//! errors from the pipeline; everything else ends up in the report.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{error, warn};

use crate::reconcile::DownloadOutcome;

const SIZE_UNITS: &[&str] = &["bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Formats a byte count with binary units, keeping at most three digits.
///
/// ```
/// use vimeo_mirror::report::human_size;
///
/// assert_eq!(human_size(500), "500 bytes");
/// assert_eq!(human_size(1536), "1.5 KB");
/// assert_eq!(human_size(10 * 1024 * 1024), "10 MB");
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn human_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    let mut unit = SIZE_UNITS[0];
    for (index, name) in SIZE_UNITS.iter().enumerate() {
        unit = name;
        if size < 1024.0 || index == SIZE_UNITS.len() - 1 {
            break;
        }
        size /= 1024.0;
    }
    let formatted = format!("{size:.1}");
    let formatted = if formatted.len() > 3 {
        format!("{size:.0}")
    } else {
        formatted
    };
    format!("{formatted} {unit}")
}

/// The component an incident came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operation {
    /// Logging into the site.
    Login,
    /// Loading and traversing pages.
    Crawl,
    /// Creating folder directories and markers.
    Folder,
    /// Reading a video page and its download links.
    Inspect,
    /// Changing per-video settings.
    Settings,
    /// Fetching files.
    Transfer,
    /// Content verification.
    Verify,
    /// Creating folder links.
    Link,
    /// The final local audit.
    Audit,
}

impl Operation {
    /// Label used in the summary.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Crawl => "Crawl",
            Self::Folder => "Folders",
            Self::Inspect => "Video pages",
            Self::Settings => "Settings",
            Self::Transfer => "Transfers",
            Self::Verify => "Verification",
            Self::Link => "Links",
            Self::Audit => "Audit",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How serious an incident is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Worth looking at; does not fail the run.
    Warning,
    /// Counted against the run.
    Error,
}

/// A warning or error recorded during the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incident {
    pub operation: Operation,
    pub severity: Severity,
    /// What the incident is about (URL, video id, path).
    pub subject: String,
    pub message: String,
}

/// Accumulates incidents and outcomes for one run.
#[derive(Debug, Default)]
pub struct RunReport {
    incidents: Vec<Incident>,
    outcomes: BTreeMap<DownloadOutcome, usize>,
}

impl RunReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records and logs an error.
    pub fn error(
        &mut self,
        operation: Operation,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        let incident = Incident {
            operation,
            severity: Severity::Error,
            subject: subject.into(),
            message: message.into(),
        };
        error!(operation = %operation, subject = %incident.subject, "{}", incident.message);
        self.incidents.push(incident);
    }

    /// Records and logs a warning.
    pub fn warning(
        &mut self,
        operation: Operation,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        let incident = Incident {
            operation,
            severity: Severity::Warning,
            subject: subject.into(),
            message: message.into(),
        };
        warn!(operation = %operation, subject = %incident.subject, "{}", incident.message);
        self.incidents.push(incident);
    }

    /// Tallies the outcome of one item.
    pub fn record_outcome(&mut self, outcome: DownloadOutcome) {
        *self.outcomes.entry(outcome).or_default() += 1;
    }

    /// All incidents in the order they were recorded.
    #[must_use]
    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    /// Number of recorded errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Number of recorded warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.incidents
            .iter()
            .filter(|incident| incident.severity == severity)
            .count()
    }

    /// How many items ended with `outcome`.
    #[must_use]
    pub fn outcome_count(&self, outcome: DownloadOutcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    /// Number of items that went through reconciliation.
    #[must_use]
    pub fn items_processed(&self) -> usize {
        self.outcomes.values().sum()
    }

    /// Incidents grouped by the operation that raised them.
    #[must_use]
    pub fn grouped(&self) -> BTreeMap<Operation, Vec<&Incident>> {
        let mut groups: BTreeMap<Operation, Vec<&Incident>> = BTreeMap::new();
        for incident in &self.incidents {
            groups.entry(incident.operation).or_default().push(incident);
        }
        groups
    }

    /// One-line summary of the run.
    #[must_use]
    pub fn summary_line(&self) -> String {
        let items = self.items_processed();
        let errors = self.error_count();
        let warnings = self.warning_count();
        let mut line = format!(
            "Processed {items} item{}, {errors} error{}",
            plural(items),
            plural(errors)
        );
        if warnings > 0 {
            line.push_str(&format!(", {warnings} warning{}", plural(warnings)));
        }
        let breakdown: Vec<String> = self
            .outcomes
            .iter()
            .map(|(outcome, count)| format!("{} {count}", outcome.label()))
            .collect();
        if !breakdown.is_empty() {
            line.push_str(&format!(" ({})", breakdown.join(", ")));
        }
        line
    }

    /// Multi-line listing of incidents grouped by operation, empty when clean.
    #[must_use]
    pub fn render_incidents(&self) -> String {
        let mut out = String::new();
        for (operation, incidents) in self.grouped() {
            out.push_str(&format!("{operation} ({}):\n", incidents.len()));
            for incident in incidents {
                let tag = match incident.severity {
                    Severity::Warning => "warning",
                    Severity::Error => "error",
                };
                out.push_str(&format!(
                    "  [{tag}] {}: {}\n",
                    incident.subject, incident.message
                ));
            }
        }
        out
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size_units() {
        assert_eq!(human_size(0), "0.0 bytes");
        assert_eq!(human_size(1023), "1023 bytes");
        assert_eq!(human_size(1024), "1.0 KB");
        assert_eq!(human_size(150 * 1024 * 1024), "150 MB");
        assert_eq!(human_size(u64::MAX), "16 EB");
    }

    #[test]
    fn test_incidents_are_grouped_by_operation() {
        let mut report = RunReport::new();
        report.error(Operation::Transfer, "123", "retries exhausted");
        report.warning(Operation::Audit, "a 1.mp4", "duplicate");
        report.error(Operation::Crawl, "https://vimeo.com/x", "page load failed");
        report.error(Operation::Transfer, "456", "size mismatch");

        let grouped = report.grouped();
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[&Operation::Transfer].len(), 2);
        assert_eq!(
            grouped.keys().copied().collect::<Vec<_>>(),
            vec![Operation::Crawl, Operation::Transfer, Operation::Audit]
        );
        assert_eq!(report.error_count(), 3);
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_summary_line_counts_items_and_errors() {
        let mut report = RunReport::new();
        report.record_outcome(DownloadOutcome::Fetched);
        report.record_outcome(DownloadOutcome::AlreadyComplete);
        report.record_outcome(DownloadOutcome::Fetched);
        report.error(Operation::Transfer, "1", "boom");

        let line = report.summary_line();
        assert!(line.starts_with("Processed 3 items, 1 error"), "{line}");
        assert!(line.contains("fetched 2"), "{line}");
        assert!(line.contains("already complete 1"), "{line}");
        assert_eq!(report.items_processed(), 3);
    }

    #[test]
    fn test_render_incidents_is_empty_for_clean_run() {
        let report = RunReport::new();
        assert!(report.render_incidents().is_empty());
        assert_eq!(report.summary_line(), "Processed 0 items, 0 errors");
    }
}
