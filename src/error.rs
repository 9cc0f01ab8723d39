//! Error types shared by discovery, resolution and installer orchestration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the locator core.
#[derive(Debug, Error)]
pub enum DccError {
    /// A descriptor is missing a field the requested operation needs.
    #[error("{dcc}: descriptor field `{field}` must be set before this operation")]
    Configuration { dcc: String, field: &'static str },

    /// The registry has no key at `path`, or the key has no value named `value`.
    #[error("registry entry not found: {}", describe_entry(.path, .value.as_deref()))]
    NotFound { path: String, value: Option<String> },

    /// The registry backend failed for a reason other than a missing entry.
    #[error("registry query failed at {path}: {message}")]
    Provider { path: String, message: String },

    /// Spawning or waiting on a child process failed at the OS level.
    #[error("failed to run {}: {source}", .program.display())]
    ProcessInvocation {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write report: {0}")]
    Report(#[source] io::Error),

    /// The run was cancelled before all invocations were attempted.
    #[error("operation cancelled")]
    Cancelled,
}

impl DccError {
    pub fn not_found_key(path: impl Into<String>) -> Self {
        DccError::NotFound {
            path: path.into(),
            value: None,
        }
    }

    pub fn not_found_value(path: impl Into<String>, value: impl Into<String>) -> Self {
        DccError::NotFound {
            path: path.into(),
            value: Some(value.into()),
        }
    }

    /// True for errors the bulk operations may tolerate in lenient mode.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DccError::NotFound { .. })
    }
}

fn describe_entry(path: &str, value: Option<&str>) -> String {
    match value {
        Some(value) => format!("{path} (value `{value}`)"),
        None => path.to_string(),
    }
}

pub type Result<T> = std::result::Result<T, DccError>;
