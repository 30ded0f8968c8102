//! Audit trail of a protection run.
//!
//! Every entry is forwarded to the `log` facade as it is recorded and kept in
//! memory so the whole run can be written out as one JSON document at the end.

use std::panic::Location;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Log target used for forwarded audit entries.
pub const AUDIT_TARGET: &str = "shroud::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    fn level(self) -> log::Level {
        match self {
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

/// A single recorded entry.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub severity: Severity,
    pub message: String,
    /// `file:line` of the code that recorded the entry.
    pub location: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
}

#[derive(Serialize)]
struct AuditDocument<'a> {
    tool: &'static str,
    version: &'static str,
    entries: &'a [AuditEntry],
}

/// In-memory audit trail.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    #[track_caller]
    pub fn info(&mut self, message: impl Into<String>) {
        self.record(Severity::Info, message.into(), Location::caller());
    }

    #[track_caller]
    pub fn warn(&mut self, message: impl Into<String>) {
        self.record(Severity::Warning, message.into(), Location::caller());
    }

    #[track_caller]
    pub fn error(&mut self, message: impl Into<String>) {
        self.record(Severity::Error, message.into(), Location::caller());
    }

    fn record(&mut self, severity: Severity, message: String, location: &Location<'_>) {
        let location = format!("{}:{}", location.file(), location.line());
        log::log!(target: AUDIT_TARGET, severity.level(), "{message} ({location})");
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or_default();
        self.entries.push(AuditEntry {
            severity,
            message,
            location,
            timestamp_ms,
        });
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Number of entries with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.severity == severity)
            .count()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The audit trail as a pretty-printed JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&AuditDocument {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            entries: &self.entries,
        })
    }

    /// Write the trail to `path`, replacing any previous document.
    ///
    /// Failures are logged and otherwise ignored. Returns whether the
    /// document was written.
    pub fn flush(&self, path: &Path) -> bool {
        let json = match self.to_json() {
            Ok(json) => json,
            Err(e) => {
                log::error!("Failed to serialize audit log: {e}");
                return false;
            }
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = std::fs::create_dir_all(parent) {
                log::error!("Failed to create {}: {e}", parent.display());
                return false;
            }
        }
        match std::fs::write(path, json) {
            Ok(()) => {
                log::info!(
                    "Audit log with {} entries written to {}",
                    self.entries.len(),
                    path.display()
                );
                true
            }
            Err(e) => {
                log::error!("Failed to write audit log {}: {e}", path.display());
                false
            }
        }
    }
}

/// Install `env_logger` with an `info` default filter.
///
/// Calling this twice keeps the first logger.
pub fn install_logger() {
    let result =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init();
    if let Err(e) = result {
        log::debug!("logger already installed: {e}");
    }
}
