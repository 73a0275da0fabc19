//! PII redaction for context maps
//!
//! Redaction is a pure transform: it returns a structurally identical copy
//! of a context map with sensitive leaves replaced by [`REDACTED`]. Stored
//! entries are never touched.
//!
//! Two rules apply:
//!
//! - **Key rule**: a property whose name matches a sensitive pattern
//!   (case-insensitive search) is replaced whatever its value type.
//! - **Value rule**: a string that *entirely* matches a detector (JWT,
//!   e-mail, phone number, card number) is replaced. A detector matching
//!   only part of a string leaves it alone.
//!
//! Nesting is followed to [`MAX_DEPTH`] levels; a map or array deeper than
//! that becomes [`MAX_DEPTH_MARKER`]. Leaves at the cap are still checked.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use swipe_diag_core::{ContextMap, ContextValue, LogEntry};

use crate::error::RedactionError;

/// Replacement for sensitive values
pub const REDACTED: &str = "[REDACTED]";
/// Replacement for values nested deeper than [`MAX_DEPTH`]
pub const MAX_DEPTH_MARKER: &str = "[MAX_DEPTH_EXCEEDED]";
/// Deepest nesting level that is still visited
pub const MAX_DEPTH: usize = 10;

/// Property name patterns, searched case-insensitively
pub const DEFAULT_KEY_PATTERNS: &[&str] = &[
    "password",
    "secret",
    "token",
    "auth",
    "api[_-]?key",
    "credential",
    "bearer",
    "authorization",
    "session",
    "cookie",
    "private",
];

/// Whole-value detectors
pub const DEFAULT_VALUE_PATTERNS: &[&str] = &[
    // JWT
    r"eyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]*",
    // E-mail
    r"[^\s@]+@[^\s@]+\.[^\s@]+",
    // Phone, loose international
    r"\+?[\d\s\-()]{10,}",
    // Card number, four groups of four
    r"\d{4}[\s-]?\d{4}[\s-]?\d{4}[\s-]?\d{4}",
];

static DEFAULT_RULES: LazyLock<Redactor> = LazyLock::new(|| Redactor {
    key_patterns: DEFAULT_KEY_PATTERNS
        .iter()
        .filter_map(|p| key_regex(p).ok())
        .collect(),
    value_patterns: DEFAULT_VALUE_PATTERNS
        .iter()
        .filter_map(|p| value_regex(p).ok())
        .collect(),
});

fn key_regex(pattern: &str) -> Result<Regex, RedactionError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| RedactionError {
            pattern: pattern.to_string(),
            source,
        })
}

/// Anchor a detector so it only matches the whole string
fn value_regex(pattern: &str) -> Result<Regex, RedactionError> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|source| RedactionError {
        pattern: pattern.to_string(),
        source,
    })
}

/// Compiled redaction rules
#[derive(Debug, Clone)]
pub struct Redactor {
    key_patterns: Vec<Regex>,
    value_patterns: Vec<Regex>,
}

impl Default for Redactor {
    fn default() -> Self {
        Self::default_rules().clone()
    }
}

impl Redactor {
    /// The built-in rule set, compiled once per process
    pub fn default_rules() -> &'static Redactor {
        &DEFAULT_RULES
    }

    /// Rules from explicit pattern lists only
    pub fn new<K, V>(
        key_patterns: impl IntoIterator<Item = K>,
        value_patterns: impl IntoIterator<Item = V>,
    ) -> Result<Self, RedactionError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Ok(Self {
            key_patterns: key_patterns
                .into_iter()
                .map(|p| key_regex(p.as_ref()))
                .collect::<Result<_, _>>()?,
            value_patterns: value_patterns
                .into_iter()
                .map(|p| value_regex(p.as_ref()))
                .collect::<Result<_, _>>()?,
        })
    }

    /// The default rules extended with extra patterns
    ///
    /// The shared default instance is left as it was.
    pub fn with_additional<K, V>(
        key_patterns: impl IntoIterator<Item = K>,
        value_patterns: impl IntoIterator<Item = V>,
    ) -> Result<Self, RedactionError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let extra = Self::new(key_patterns, value_patterns)?;
        let mut redactor = Self::default_rules().clone();
        redactor.key_patterns.extend(extra.key_patterns);
        redactor.value_patterns.extend(extra.value_patterns);
        Ok(redactor)
    }

    pub fn is_sensitive_key(&self, key: &str) -> bool {
        self.key_patterns.iter().any(|p| p.is_match(key))
    }

    pub fn is_sensitive_value(&self, value: &str) -> bool {
        self.value_patterns.iter().any(|p| p.is_match(value))
    }

    /// Redacted copy of a context map
    pub fn redact(&self, context: &ContextMap) -> ContextMap {
        self.redact_map(context, 0)
    }

    /// Redacted copy of a single value
    pub fn redact_value(&self, value: &ContextValue) -> ContextValue {
        self.visit(value, 0)
    }

    /// Copy of an entry with its context redacted
    pub fn redact_entry(&self, entry: &LogEntry) -> LogEntry {
        LogEntry {
            context: self.redact(&entry.context),
            ..entry.clone()
        }
    }

    fn redact_map(&self, map: &ContextMap, depth: usize) -> ContextMap {
        map.iter()
            .map(|(key, value)| {
                let redacted = if self.is_sensitive_key(key) {
                    ContextValue::String(REDACTED.to_string())
                } else {
                    self.visit(value, depth + 1)
                };
                (key.clone(), redacted)
            })
            .collect()
    }

    fn visit(&self, value: &ContextValue, depth: usize) -> ContextValue {
        match value {
            ContextValue::String(s) if self.is_sensitive_value(s) => {
                ContextValue::String(REDACTED.to_string())
            }
            ContextValue::Map(_) | ContextValue::Array(_) if depth > MAX_DEPTH => {
                ContextValue::String(MAX_DEPTH_MARKER.to_string())
            }
            ContextValue::Map(map) => ContextValue::Map(self.redact_map(map, depth)),
            ContextValue::Array(items) => {
                ContextValue::Array(items.iter().map(|v| self.visit(v, depth + 1)).collect())
            }
            other => other.clone(),
        }
    }
}

/// Redact with the default rules
pub fn redact(context: &ContextMap) -> ContextMap {
    Redactor::default_rules().redact(context)
}
