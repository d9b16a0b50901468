// Copyright 2025 Cowboy AI, LLC.

//! Deprecation warnings
//!
//! A [`Deprecator`] formats deprecation notices, drops repeats, and hands
//! the rest to a [`WarningSink`]. The default sink logs through `tracing`.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::config::DeprecationConfig;

const WARNING_PREFIX: &str = "Deprecation warning: ";

/// What is being deprecated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deprecation {
    /// A free-form notice
    Message(String),
    /// An API being replaced by another
    Replacement {
        /// The API going away
        prev: String,
        /// The API to use instead
        next: String,
        /// Where to read more
        url: Option<String>,
    },
}

impl Deprecation {
    /// A replacement notice
    pub fn replacement(prev: impl Into<String>, next: impl Into<String>) -> Self {
        Deprecation::Replacement {
            prev: prev.into(),
            next: next.into(),
            url: None,
        }
    }

    /// A replacement notice pointing at documentation
    pub fn replacement_with_url(
        prev: impl Into<String>,
        next: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Deprecation::Replacement {
            prev: prev.into(),
            next: next.into(),
            url: Some(url.into()),
        }
    }
}

impl fmt::Display for Deprecation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deprecation::Message(message) => f.write_str(message),
            Deprecation::Replacement { prev, next, url } => {
                write!(
                    f,
                    "{prev} is going to be removed in the future. Please use {next} instead."
                )?;
                if let Some(url) = url {
                    write!(f, " See: {url}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<&str> for Deprecation {
    fn from(message: &str) -> Self {
        Deprecation::Message(message.to_string())
    }
}

impl From<String> for Deprecation {
    fn from(message: String) -> Self {
        Deprecation::Message(message)
    }
}

/// Destination for formatted warnings
#[cfg_attr(test, mockall::automock)]
pub trait WarningSink {
    /// Emit one warning line
    fn warn(&self, message: &str);
}

/// Sink that logs warnings at `WARN` level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl WarningSink for TracingSink {
    fn warn(&self, message: &str) {
        warn!(target: "metal::deprecate", "{message}");
    }
}

/// A warning that has been emitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeprecationRecord {
    /// The formatted notice, without the prefix
    pub message: String,
    /// When the notice was first emitted
    pub first_seen: DateTime<Utc>,
    /// How many times it was requested
    pub occurrences: u64,
}

/// Emits deprecation warnings, at most once per message by default
pub struct Deprecator {
    config: DeprecationConfig,
    sink: Box<dyn WarningSink>,
    seen: IndexMap<String, DeprecationRecord>,
}

impl Deprecator {
    /// Create a deprecator logging through `tracing`
    pub fn new(config: DeprecationConfig) -> Self {
        Self::with_sink(config, Box::new(TracingSink))
    }

    /// Create a deprecator with a custom sink
    pub fn with_sink(config: DeprecationConfig, sink: Box<dyn WarningSink>) -> Self {
        Self {
            config,
            sink,
            seen: IndexMap::new(),
        }
    }

    /// Warn about `deprecation` unless `test` is `Some(true)`
    ///
    /// Returns true when a warning was emitted.
    pub fn deprecate(&mut self, deprecation: impl Into<Deprecation>, test: Option<bool>) -> bool {
        if test == Some(true) || !self.config.enabled {
            return false;
        }
        let message = deprecation.into().to_string();

        if let Some(record) = self.seen.get_mut(&message) {
            record.occurrences += 1;
            if self.config.deduplicate {
                return false;
            }
        } else {
            self.seen.insert(
                message.clone(),
                DeprecationRecord {
                    message: message.clone(),
                    first_seen: Utc::now(),
                    occurrences: 1,
                },
            );
        }

        self.sink.warn(&format!("{WARNING_PREFIX}{message}"));
        true
    }

    /// Warnings emitted so far, in first-seen order
    pub fn history(&self) -> impl Iterator<Item = &DeprecationRecord> {
        self.seen.values()
    }

    /// Forget every emitted warning
    pub fn reset(&mut self) {
        self.seen.clear();
    }

    /// The active configuration
    pub fn config(&self) -> DeprecationConfig {
        self.config
    }
}

impl Default for Deprecator {
    fn default() -> Self {
        Self::new(DeprecationConfig::default())
    }
}

impl fmt::Debug for Deprecator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deprecator")
            .field("config", &self.config)
            .field("seen", &self.seen.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use test_case::test_case;

    fn expecting(message: &'static str, times: usize) -> Box<MockWarningSink> {
        let mut sink = MockWarningSink::new();
        sink.expect_warn()
            .with(eq(message))
            .times(times)
            .return_const(());
        Box::new(sink)
    }

    #[test]
    fn test_message_is_prefixed() {
        let mut deprecator = Deprecator::with_sink(
            DeprecationConfig::default(),
            expecting("Deprecation warning: Foo", 1),
        );
        assert!(deprecator.deprecate("Foo", None));
    }

    #[test]
    fn test_replacement_is_formatted() {
        let mut deprecator = Deprecator::with_sink(
            DeprecationConfig::default(),
            expecting(
                "Deprecation warning: Foo is going to be removed in the future. Please use Bar instead.",
                1,
            ),
        );
        assert!(deprecator.deprecate(Deprecation::replacement("Foo", "Bar"), None));
    }

    #[test]
    fn test_replacement_with_url_links_docs() {
        let notice = Deprecation::replacement_with_url("Foo", "Bar", "http://example.com/bar");
        assert_eq!(
            notice.to_string(),
            "Foo is going to be removed in the future. Please use Bar instead. See: http://example.com/bar"
        );
    }

    #[test_case(Some(true), false ; "passing test suppresses")]
    #[test_case(Some(false), true ; "failing test warns")]
    #[test_case(None, true ; "no test warns")]
    fn test_test_argument(test: Option<bool>, warned: bool) {
        let mut deprecator = Deprecator::with_sink(
            DeprecationConfig::default(),
            expecting("Deprecation warning: Foo", usize::from(warned)),
        );
        assert_eq!(deprecator.deprecate("Foo", test), warned);
    }

    #[test]
    fn test_repeats_are_dropped() {
        let mut deprecator = Deprecator::with_sink(
            DeprecationConfig::default(),
            expecting("Deprecation warning: Foo", 1),
        );
        assert!(deprecator.deprecate("Foo", None));
        assert!(!deprecator.deprecate("Foo", None));
        let history: Vec<_> = deprecator.history().collect();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].occurrences, 2);
    }

    #[test]
    fn test_reset_allows_warning_again() {
        let mut deprecator = Deprecator::with_sink(
            DeprecationConfig::default(),
            expecting("Deprecation warning: Foo", 2),
        );
        deprecator.deprecate("Foo", None);
        deprecator.reset();
        assert_eq!(deprecator.history().count(), 0);
        assert!(deprecator.deprecate("Foo", None));
    }

    #[test]
    fn test_without_deduplication_every_call_warns() {
        let config = DeprecationConfig {
            deduplicate: false,
            ..DeprecationConfig::default()
        };
        let mut deprecator = Deprecator::with_sink(config, expecting("Deprecation warning: Foo", 3));
        for _ in 0..3 {
            assert!(deprecator.deprecate("Foo", None));
        }
        assert_eq!(deprecator.history().count(), 1);
    }

    #[test]
    fn test_disabled_emits_nothing() {
        let config = DeprecationConfig {
            enabled: false,
            ..DeprecationConfig::default()
        };
        let mut deprecator = Deprecator::with_sink(config, expecting("Deprecation warning: Foo", 0));
        assert!(!deprecator.deprecate("Foo", None));
        assert_eq!(deprecator.history().count(), 0);
    }
}
