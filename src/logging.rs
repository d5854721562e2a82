//! Structured logging for scrape runs.
//!
//! Every message carries a level, a category (`scrape`, `cookies`, `scroll`,
//! ...) and optional JSON auxiliary data. Records below the configured
//! [`Verbosity`] are dropped; the rest go to a caller-supplied callback when
//! one is attached, or to the `log` facade under the `pagescrape::<category>`
//! target otherwise.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Verbosity;

/// Receives every record that passes the verbosity filter.
pub type LogCallback = Arc<dyn Fn(&ScrapeLogRecord) + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Info,
    Debug,
}

impl LogLevel {
    /// Errors always pass; info needs `Medium`, debug needs `Detailed`.
    pub fn admitted_by(self, verbosity: Verbosity) -> bool {
        match self {
            LogLevel::Error => true,
            LogLevel::Info => verbosity != Verbosity::Minimal,
            LogLevel::Debug => verbosity == Verbosity::Detailed,
        }
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScrapeLogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auxiliary: Option<Value>,
}

impl ScrapeLogRecord {
    fn to_facade(&self) {
        let target = format!("pagescrape::{}", self.category);
        let level = log::Level::from(self.level);
        match self.auxiliary.as_ref().filter(|aux| !aux.is_null()) {
            Some(aux) => log::log!(target: target.as_str(), level, "{} {aux}", self.message),
            None => log::log!(target: target.as_str(), level, "{}", self.message),
        }
    }
}

#[derive(Clone, Default)]
enum Sink {
    #[default]
    Facade,
    Callback(LogCallback),
}

#[derive(Clone, Default)]
pub struct ScrapeLogger {
    verbosity: Verbosity,
    sink: Sink,
}

impl fmt::Debug for ScrapeLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapeLogger")
            .field("verbosity", &self.verbosity)
            .field("callback", &matches!(self.sink, Sink::Callback(_)))
            .finish()
    }
}

impl ScrapeLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            sink: Sink::Facade,
        }
    }

    /// Route records to `callback` instead of the `log` facade.
    pub fn with_callback(mut self, callback: LogCallback) -> Self {
        self.sink = Sink::Callback(callback);
        self
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level.admitted_by(self.verbosity)
    }

    pub fn error(&self, message: impl Into<String>, category: &str, auxiliary: Option<Value>) {
        self.emit(LogLevel::Error, message, category, auxiliary);
    }

    pub fn info(&self, message: impl Into<String>, category: &str, auxiliary: Option<Value>) {
        self.emit(LogLevel::Info, message, category, auxiliary);
    }

    pub fn debug(&self, message: impl Into<String>, category: &str, auxiliary: Option<Value>) {
        self.emit(LogLevel::Debug, message, category, auxiliary);
    }

    fn emit(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        category: &str,
        auxiliary: Option<Value>,
    ) {
        if !self.enabled(level) {
            return;
        }

        let record = ScrapeLogRecord {
            timestamp: Utc::now(),
            level,
            category: category.to_string(),
            message: message.into(),
            auxiliary,
        };

        match &self.sink {
            Sink::Facade => record.to_facade(),
            Sink::Callback(callback) => callback(&record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn capturing_logger(verbosity: Verbosity) -> (ScrapeLogger, Arc<Mutex<Vec<ScrapeLogRecord>>>) {
        let records = Arc::new(Mutex::new(Vec::new()));
        let capture = Arc::clone(&records);
        let logger = ScrapeLogger::new(verbosity).with_callback(Arc::new(move |record| {
            capture.lock().unwrap().push(record.clone());
        }));
        (logger, records)
    }

    #[test]
    fn verbosity_gates_levels() {
        let minimal = ScrapeLogger::new(Verbosity::Minimal);
        assert!(minimal.enabled(LogLevel::Error));
        assert!(!minimal.enabled(LogLevel::Info));
        assert!(!minimal.enabled(LogLevel::Debug));

        let medium = ScrapeLogger::default();
        assert!(medium.enabled(LogLevel::Info));
        assert!(!medium.enabled(LogLevel::Debug));
    }

    #[test]
    fn callback_receives_category_and_auxiliary() {
        let (logger, records) = capturing_logger(Verbosity::Detailed);

        logger.debug(
            "height changed",
            "scroll",
            Some(serde_json::json!({ "from": 100, "to": 300 })),
        );

        let values = records.lock().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].message, "height changed");
        assert_eq!(values[0].category, "scroll");
        assert_eq!(values[0].level, LogLevel::Debug);
        assert_eq!(
            values[0].auxiliary.as_ref().unwrap(),
            &serde_json::json!({ "from": 100, "to": 300 })
        );
    }

    #[test]
    fn errors_pass_minimal_verbosity() {
        let (logger, records) = capturing_logger(Verbosity::Minimal);
        logger.info("skipped", "scrape", None);
        logger.error("kept", "scrape", None);

        let values = records.lock().unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].message, "kept");
    }

    #[test]
    fn record_serializes_without_empty_auxiliary() {
        let (logger, records) = capturing_logger(Verbosity::Medium);
        logger.info("scrape finished", "scrape", None);

        let json = serde_json::to_value(&records.lock().unwrap()[0]).unwrap();
        assert_eq!(json["level"], "info");
        assert_eq!(json["category"], "scrape");
        assert!(json.get("auxiliary").is_none());
    }
}
