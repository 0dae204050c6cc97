//! Result records printed to stdout

use std::time::Duration;

use libtwtdust::{ActionOutcome, DispatchObserver, OutcomeStatus, Target};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("Invalid format '{}'. Valid options: text, json", other)),
        }
    }
}

/// Prints one record per target as the dispatcher reports it
pub struct Reporter {
    format: OutputFormat,
}

impl Reporter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn target(&self, target: &Target) {
        match self.format {
            OutputFormat::Text => println!(
                "{}\t{}\t{}\t@{}",
                target.id,
                target.permalink(),
                target.created_at.to_rfc3339(),
                target.author
            ),
            OutputFormat::Json => println!(
                "{}",
                json!({
                    "id": target.id,
                    "url": target.permalink(),
                    "created_at": target.created_at.to_rfc3339(),
                    "author": target.author,
                    "favorite_count": target.favorite_count,
                    "text": target.text,
                })
            ),
        }
    }

    /// Trailing count after a list of records
    pub fn count(&self, label: &str, count: usize) {
        match self.format {
            OutputFormat::Text => println!("{} number: {}", label, count),
            OutputFormat::Json => println!("{}", json!({ "label": label, "count": count })),
        }
    }
}

impl Reporter {
    /// One text line per outcome: the target's id, permalink, creation time
    /// and author, then what happened to it
    fn outcome_line(outcome: &ActionOutcome) -> String {
        let reference = outcome
            .target_permalink()
            .unwrap_or_else(|| "-".to_string());
        let created_at = outcome
            .target_created_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        let author = outcome
            .target_author
            .as_deref()
            .map(|a| format!("@{}", a))
            .unwrap_or_else(|| "-".to_string());
        let code = |code: &Option<u32>| code.map(|c| format!("[{}] ", c)).unwrap_or_default();

        let detail = match &outcome.status {
            OutcomeStatus::Success { created } => format!("ok\t{}", created.permalink()),
            OutcomeStatus::Skipped { code: c, message } => {
                format!("skipped\t{}{}", code(c), message)
            }
            OutcomeStatus::Failed {
                kind,
                code: c,
                message,
            } => format!("failed\t{:?}\t{}{}", kind, code(c), message),
        };

        format!(
            "{} {}\t{}\t{}\t{}\t{}",
            outcome.action, outcome.target_id, reference, created_at, author, detail
        )
    }
}

impl DispatchObserver for Reporter {
    fn on_outcome(&self, outcome: &ActionOutcome) {
        match self.format {
            OutputFormat::Text => println!("{}", Self::outcome_line(outcome)),
            OutputFormat::Json => {
                if let Ok(line) = serde_json::to_string(outcome) {
                    println!("{}", line);
                }
            }
        }
    }

    fn on_pause(&self, delay: Duration) {
        tracing::info!("Sleeping {}s", delay.as_secs());
    }
}
