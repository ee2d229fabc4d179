//! Error types for the script engine.
//!
//! Each concern gets its own `thiserror` enum; [`ScriptError`] is the only
//! one a caller of [`ScriptEngine::eval`](crate::ScriptEngine::eval) sees.

use std::io;
use thiserror::Error;

/// Failure of a script execution, as reported to the host.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// `eval` was called without a script context.
    #[error("No script context specified")]
    MissingContext,

    /// The script context carries no bindings.
    #[error("No bindings specified in the script context")]
    MissingBindings,

    /// The script called `stop()`; the message is the tagged console text.
    #[error("{0}")]
    Stopped(String),

    /// The runtime failed to evaluate the script and produced no result.
    #[error("{0}")]
    Evaluation(String),

    /// Reading the script source failed.
    #[error("Unable to read script: {0}")]
    Io(#[from] io::Error),

    /// The interpreter could not be started.
    #[error(transparent)]
    Init(#[from] InitError),
}

/// A value that has no representation on the other side of the bridge.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// R integers are 32 bit and reserve `i32::MIN` for `NA`.
    #[error("integer {0} does not fit in an R integer")]
    IntegerOutOfRange(i64),

    /// The R value has no host equivalent.
    #[error("unsupported R type '{0}'")]
    Unsupported(String),

    /// R list names cannot be empty; an empty name reads back as the
    /// element's position.
    #[error("map keys must not be empty")]
    EmptyKey,

    /// A named list was required.
    #[error("expected a named list, found R type '{0}'")]
    NotAMap(String),

    /// Conversion of a nested entry failed.
    #[error("entry '{key}': {source}")]
    Entry {
        key: String,
        #[source]
        source: Box<ConversionError>,
    },
}

impl ConversionError {
    pub(crate) fn in_entry(self, key: impl Into<String>) -> Self {
        ConversionError::Entry {
            key: key.into(),
            source: Box::new(self),
        }
    }
}

/// Failure reported by the native runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// The native layer rejected the call (bad name, allocation, …).
    #[error("native runtime error: {0}")]
    Native(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

/// The interpreter could not be created.
#[derive(Debug, Error)]
pub enum InitError {
    /// No backend is compiled in.
    #[error("no R runtime available: {0}")]
    NotAvailable(String),

    /// `R_HOME` is unset and `R RHOME` did not answer.
    #[error("unable to locate the R installation (set R_HOME)")]
    RHomeNotFound,

    /// The runtime was located but refused to start.
    #[error("unable to start the R runtime: {0}")]
    Startup(String),
}

/// Invalid configuration value; the default is used instead.
#[derive(Debug, Error)]
#[error("invalid value '{value}' for {key}")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
}

/// Render an error and its `source()` chain, one cause per line.
pub fn report(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut cause = err.source();
    while let Some(c) = cause {
        out.push_str("\n  caused by: ");
        out.push_str(&c.to_string());
        cause = c.source();
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_message_is_verbatim() {
        let e = ScriptError::Stopped("Error: bad input\n".into());
        assert_eq!(e.to_string(), "Error: bad input\n");
    }

    #[test]
    fn entry_error_names_the_key() {
        let e = ConversionError::IntegerOutOfRange(1 << 40).in_entry("big");
        assert_eq!(e.to_string(), "entry 'big': integer 1099511627776 does not fit in an R integer");
    }

    #[test]
    fn report_walks_source_chain() {
        let e = RuntimeError::from(ConversionError::Unsupported("closure".into()).in_entry("f"));
        let text = report(&e);
        assert!(text.starts_with("entry 'f'"));
        assert!(text.contains("caused by: unsupported R type 'closure'"));
    }
}
