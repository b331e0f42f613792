//! Exit code logic for the mirror process.
//!
//! Single responsibility: map the run summary to the process exit outcome.

use vimeo_mirror::RunSummary;

use crate::ProcessExit;

/// Determines the exit outcome from the number of items that left a file in
/// the mirror, the number of reported errors and whether the run was cut short.
pub(crate) fn determine_exit_outcome(
    mirrored: usize,
    errors: usize,
    interrupted: bool,
) -> ProcessExit {
    if interrupted {
        ProcessExit::Failure
    } else if errors == 0 {
        ProcessExit::Success
    } else if mirrored > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

pub(crate) fn exit_for_summary(summary: &RunSummary) -> ProcessExit {
    let mirrored = summary
        .results
        .iter()
        .filter(|result| result.outcome.has_artifact())
        .count();
    determine_exit_outcome(mirrored, summary.report.error_count(), summary.interrupted)
}
