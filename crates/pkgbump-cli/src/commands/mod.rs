pub mod update;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use pkgbump_core::{BuildStatus, CoreError, UpdateDecision};
use pkgbump_registry::PublishOutcome;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_USAGE: u8 = 1;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Machine-readable failure: category, message and exit status.
pub fn error_json(e: &CoreError) -> String {
    let value = serde_json::json!({
        "error": e.kind(),
        "message": e.to_string(),
        "exit_code": e.exit_code(),
    });
    json_pretty(&value).unwrap_or_else(|_| value.to_string())
}

pub fn error_label() -> String {
    Style::new().red().bold().apply_to("error:").to_string()
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish(pb: &ProgressBar, msg: String) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(msg);
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✗ {msg}"));
}

pub fn colorize_decision(decision: UpdateDecision) -> String {
    let text = decision.to_string();
    match decision {
        UpdateDecision::UpToDate => Style::new().green().apply_to(text).to_string(),
        UpdateDecision::ForcedUpdate => Style::new().yellow().apply_to(text).to_string(),
        UpdateDecision::VersionChanged => Style::new().cyan().bold().apply_to(text).to_string(),
    }
}

pub fn colorize_build(status: BuildStatus) -> String {
    match status {
        BuildStatus::Passed => Style::new().green().apply_to("passed").to_string(),
        BuildStatus::Skipped => Style::new().yellow().apply_to("skipped").to_string(),
        BuildStatus::NotRun => Style::new().dim().apply_to("not run").to_string(),
    }
}

pub fn colorize_publish(outcome: PublishOutcome) -> String {
    match outcome {
        PublishOutcome::Published => Style::new().green().bold().apply_to("published").to_string(),
        PublishOutcome::Committed => Style::new()
            .cyan()
            .apply_to("committed (dry run, not pushed)")
            .to_string(),
        PublishOutcome::NoChanges => Style::new().dim().apply_to("no changes").to_string(),
        PublishOutcome::ManualPublish => Style::new().yellow().apply_to("manual").to_string(),
    }
}
