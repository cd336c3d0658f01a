//! Terminal output helpers

use careline_core::error::Error as CoreError;
use careline_proximity::{MonitorPhase, ProximitySnapshot};
use owo_colors::OwoColorize;
use std::time::Duration;

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print an error, as a JSON report on stdout when `json` is set
    pub fn report(err: &CoreError, json: bool) {
        if !json {
            Self::error(&err.to_string());
            return;
        }
        match error_report_json(err) {
            Ok(body) => println!("{body}"),
            Err(_) => Self::error(&err.to_string()),
        }
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }

    /// Print one line per snapshot, phase colored by urgency
    pub fn snapshot(index: usize, snapshot: &ProximitySnapshot) {
        let phase = format!("{:<9}", snapshot.phase.to_string());
        let phase = match snapshot.phase {
            MonitorPhase::Alerted => phase.green().bold().to_string(),
            MonitorPhase::Tracking => phase.cyan().to_string(),
            MonitorPhase::Resolving => phase.yellow().to_string(),
            MonitorPhase::Idle | MonitorPhase::Stopped => phase.dimmed().to_string(),
        };
        println!(
            "{} {} {}",
            format!("[{index}]").dimmed(),
            phase,
            describe_snapshot(snapshot)
        );
    }
}

/// Plain-text summary of a snapshot
pub fn describe_snapshot(snapshot: &ProximitySnapshot) -> String {
    let distance = snapshot.distance_formatted.as_deref().unwrap_or("-");
    let position = if snapshot.is_within_threshold { "inside" } else { "outside" };
    let mut line = format!("distance {distance} ({position})");
    if snapshot.has_alerted {
        line.push_str(", alerted");
    }
    line
}

/// Pretty JSON form of an error report
pub fn error_report_json(err: &CoreError) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&err.to_report())
}

/// Format a duration for display
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}
