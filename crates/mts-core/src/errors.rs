//! Error type shared by the sweep crates.
//!
//! Every failure carries an [`ErrorInfo`] with a stable `code`, so callers
//! (and tests) match on codes rather than on message text.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload shared by all [`SweepError`] families.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable snake_case code, e.g. `missing_required_field`.
    pub code: String,
    pub message: String,
    /// Offending field, path, identifier and so on.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates an error with a stable machine readable `code` and a human message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Attaches a `key=value` pair; pairs render in insertion order.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets the remediation hint printed after the context.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        let mut sep = " (";
        for (key, value) in &self.context {
            write!(f, "{sep}{key}={value}")?;
            sep = ", ";
        }
        if !self.context.is_empty() {
            f.write_str(")")?;
        }
        match &self.hint {
            Some(hint) => write!(f, "; hint: {hint}"),
            None => Ok(()),
        }
    }
}

/// Failure raised while loading, validating or running a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail", rename_all = "lowercase")]
pub enum SweepError {
    /// Loading or normalizing the specification.
    #[error("spec error {0}")]
    Spec(ErrorInfo),
    /// A combination that cannot become a run configuration.
    #[error("config error {0}")]
    Config(ErrorInfo),
    #[error("io error {0}")]
    Io(ErrorInfo),
    /// Spawning or waiting on the benchmark process.
    #[error("launch error {0}")]
    Launch(ErrorInfo),
    #[error("serde error {0}")]
    Serde(ErrorInfo),
}

impl SweepError {
    /// Structured payload shared by every family.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            Self::Spec(info)
            | Self::Config(info)
            | Self::Io(info)
            | Self::Launch(info)
            | Self::Serde(info) => info,
        }
    }

    /// Shorthand for `self.info().code`.
    pub fn code(&self) -> &str {
        &self.info().code
    }
}
