// ABOUTME: Output formatting for CLI feedback around phase runs.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with per-step progress
    Normal,
    /// Minimal output for CI (phase results only)
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
///
/// A phase is announced with [`Output::phase`], which also starts the
/// timer reported by the closing `done`/`failed` event.
pub struct Output {
    mode: OutputMode,
    phase: Option<&'static str>,
    started: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            phase: None,
            started: None,
        }
    }

    /// Announce the phase about to run and start its timer.
    pub fn phase(&mut self, name: &'static str, host: &str) {
        self.phase = Some(name);
        self.started = Some(Instant::now());
        if self.mode == OutputMode::Normal {
            println!("--> {name} on {host}");
        }
    }

    fn elapsed_secs(&self) -> Option<f64> {
        self.started.map(|t| t.elapsed().as_secs_f64())
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("    {message}");
        }
    }

    /// Report the current phase as finished.
    pub fn done(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                if let Some(elapsed) = self.elapsed_secs() {
                    println!("{message} ({elapsed:.1}s)");
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => println!("{message}"),
            OutputMode::Json => self.emit("done", message),
        }
    }

    /// Report a non-fatal condition.
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Warning: {message}"),
            OutputMode::Json => self.emit("warning", message),
        }
    }

    /// Report the current phase as failed.
    pub fn failed(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => eprintln!("Error: {message}"),
            OutputMode::Json => self.emit("failed", message),
        }
    }

    fn emit(&self, event: &str, message: &str) {
        let event = JsonEvent {
            event,
            phase: self.phase,
            message,
            duration_secs: self.elapsed_secs(),
        };
        if let Ok(json) = serde_json::to_string(&event) {
            println!("{json}");
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phase: Option<&'a str>,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
