use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Structured log events for the story pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    RunStarted {
        run_id: String,
        request: String,
        threshold: u8,
    },
    DraftStarted {
        run_id: String,
    },
    DraftCompleted {
        run_id: String,
        words: usize,
        duration_secs: f64,
    },
    JudgeStarted {
        run_id: String,
    },
    JudgeCompleted {
        run_id: String,
        scores: String,
        min_score: u8,
        issues: usize,
        ready: bool,
        verdict: String,
    },
    RevisionStarted {
        run_id: String,
        instructions_preview: String,
    },
    RevisionCompleted {
        run_id: String,
        words: usize,
        duration_secs: f64,
    },
    RunCompleted {
        run_id: String,
        revised: bool,
        duration_secs: f64,
    },
    RunFailed {
        run_id: String,
        stage: String,
        error: String,
    },
    RunCancelled {
        run_id: String,
        stage: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }

    pub fn run_id(&self) -> &str {
        match self {
            LogEvent::RunStarted { run_id, .. }
            | LogEvent::DraftStarted { run_id }
            | LogEvent::DraftCompleted { run_id, .. }
            | LogEvent::JudgeStarted { run_id }
            | LogEvent::JudgeCompleted { run_id, .. }
            | LogEvent::RevisionStarted { run_id, .. }
            | LogEvent::RevisionCompleted { run_id, .. }
            | LogEvent::RunCompleted { run_id, .. }
            | LogEvent::RunFailed { run_id, .. }
            | LogEvent::RunCancelled { run_id, .. } => run_id,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for pipeline events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    console: bool,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            console: true,
            file_writer: None,
        }
    }

    /// Logger that drops every event
    pub fn silent() -> Self {
        Self {
            format: LogFormat::Compact,
            console: false,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            console: true,
            file_writer: Some(Mutex::new(file)),
        })
    }

    /// Keep the file sink but stop writing to the console
    pub fn without_console(mut self) -> Self {
        self.console = false;
        self
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        if !self.console {
            return;
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::RunStarted {
                request, threshold, ..
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "bedtime".bold().bright_white(),
                    " ".repeat(60) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Request:".dimmed(),
                    Self::truncate_with_padding(request, 57, 67).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Threshold:".dimmed(),
                    Self::truncate_with_padding(&threshold.to_string(), 55, 65).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::DraftStarted { .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_cyan(),
                    "STORYTELLER".bright_cyan().bold()
                );
            }
            LogEvent::DraftCompleted {
                words,
                duration_secs,
                ..
            }
            | LogEvent::RevisionCompleted {
                words,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} words ({:.1}s)",
                    "✓".bright_green(),
                    words,
                    duration_secs
                );
                let _ = writeln!(stderr);
            }
            LogEvent::JudgeStarted { .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_magenta(),
                    "JUDGE".bright_magenta().bold()
                );
            }
            LogEvent::JudgeCompleted {
                scores,
                ready,
                verdict,
                ..
            } => {
                let _ = writeln!(stderr, "    {} {}", "│".dimmed(), scores.dimmed());
                let styled = if *ready {
                    format!("✓ Verdict: {}", verdict).bright_green().to_string()
                } else {
                    format!("→ Verdict: {}", verdict).bright_yellow().to_string()
                };
                let _ = writeln!(stderr, "    {}", styled);
                let _ = writeln!(stderr);
            }
            LogEvent::RevisionStarted {
                instructions_preview,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_cyan(),
                    "REVISION".bright_cyan().bold()
                );
                let _ = writeln!(
                    stderr,
                    "    {} {}",
                    "│".dimmed(),
                    instructions_preview.dimmed()
                );
            }
            LogEvent::RunCompleted { .. } => {
                // Final story and verdict are printed by the binary
            }
            LogEvent::RunFailed { stage, error, .. } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Failed while {}: {}",
                    "✗".bright_red(),
                    stage.to_lowercase(),
                    error.bright_red()
                );
            }
            LogEvent::RunCancelled { stage, .. } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Cancelled while {}",
                    "⚠".bright_yellow(),
                    stage.to_lowercase()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let run = short_id(event.run_id());
        let msg = match event {
            LogEvent::RunStarted { threshold, .. } => {
                format!("[{}] {} run:start threshold={}", timestamp, run, threshold)
            }
            LogEvent::DraftStarted { .. } => format!("[{}] {} draft:start", timestamp, run),
            LogEvent::DraftCompleted {
                words,
                duration_secs,
                ..
            } => format!(
                "[{}] {} draft:done {}w {:.1}s",
                timestamp, run, words, duration_secs
            ),
            LogEvent::JudgeStarted { .. } => format!("[{}] {} judge:start", timestamp, run),
            LogEvent::JudgeCompleted {
                min_score,
                issues,
                verdict,
                ..
            } => format!(
                "[{}] {} judge:done min={} issues={} {}",
                timestamp, run, min_score, issues, verdict
            ),
            LogEvent::RevisionStarted { .. } => {
                format!("[{}] {} revise:start", timestamp, run)
            }
            LogEvent::RevisionCompleted {
                words,
                duration_secs,
                ..
            } => format!(
                "[{}] {} revise:done {}w {:.1}s",
                timestamp, run, words, duration_secs
            ),
            LogEvent::RunCompleted {
                revised,
                duration_secs,
                ..
            } => format!(
                "[{}] {} run:done revised={} {:.1}s",
                timestamp, run, revised, duration_secs
            ),
            LogEvent::RunFailed { stage, error, .. } => {
                format!("[{}] {} run:failed:{} {}", timestamp, run, stage, error)
            }
            LogEvent::RunCancelled { stage, .. } => {
                format!("[{}] {} run:cancelled:{}", timestamp, run, stage)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = if s.chars().count() > max_len {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{}...", head)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1);
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}

fn short_id(run_id: &str) -> &str {
    run_id.get(..8).unwrap_or(run_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_writes_timestamped_json_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("bedtime.jsonl");
        let logger = Logger::with_file(LogFormat::Json, &path)
            .unwrap()
            .without_console();

        logger.log(&LogEvent::DraftStarted {
            run_id: "run-1".into(),
        });
        logger.log(&LogEvent::RunCompleted {
            run_id: "run-1".into(),
            revised: true,
            duration_secs: 1.25,
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "draft_started");
        assert_eq!(lines[1]["event"], "run_completed");
        assert_eq!(lines[1]["revised"], true);
        assert!(lines[1]["timestamp"].is_string());
    }

    #[test]
    fn test_truncate_with_padding_counts_chars() {
        let padded = Logger::truncate_with_padding("héllo", 10, 12);
        assert_eq!(padded, "héllo      │");

        let cut = Logger::truncate_with_padding("a very long request indeed", 10, 12);
        assert!(cut.starts_with("a very ..."));
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }
}
