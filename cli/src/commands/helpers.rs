use serde::Serialize;

use mealsync_core::sync::{DateOutcome, SyncReport};

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// One line per date for the plain-text run summary.
pub(crate) fn report_line(report: &SyncReport) -> String {
    let status = match &report.outcome {
        DateOutcome::Updated => "updated".to_string(),
        DateOutcome::UpToDate => "up to date".to_string(),
        DateOutcome::Planned => "planned".to_string(),
        DateOutcome::Failed(reason) => format!("FAILED ({reason})"),
    };
    let mut line = format!(
        "{}  {status}: +{} added, {} deleted, {} product(s) created, {} reused",
        report.date,
        report.items_added,
        report.items_deleted,
        report.products_created,
        report.products_reused,
    );
    if report.meals_skipped > 0 {
        line.push_str(&format!(", {} unmapped", report.meals_skipped));
    }
    if report.meals_failed > 0 {
        line.push_str(&format!(", {} failed", report.meals_failed));
    }
    line
}
