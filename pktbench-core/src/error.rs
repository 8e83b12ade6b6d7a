//! Error types for pktbench

use std::time::Duration;
use thiserror::Error;

/// Result type alias for pktbench operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pktbench
///
/// A frame that does not match an expectation is not an error; matching
/// reports a boolean and a diff. The variants here cover the cases where an
/// operation cannot produce a result at all.
#[derive(Error, Debug)]
pub enum Error {
    /// Merge between two layers of different kinds
    #[error("cannot merge {found} into {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A field could not be computed or rendered to the wire
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A buffer ended before a layer's header did
    #[error("{layer} header truncated: need {needed} bytes, have {available}")]
    Truncated {
        layer: &'static str,
        needed: usize,
        available: usize,
    },

    /// A header was long enough but its contents are inconsistent
    #[error("Malformed packet: {0}")]
    Malformed(String),

    /// Capture error
    #[error("Packet capture error: {0}")]
    Capture(String),

    /// Frame injection error
    #[error("Packet injection error: {0}")]
    Injection(String),

    /// Interface not found
    #[error("Interface '{0}' not found")]
    InterfaceNotFound(String),

    /// No matching frame arrived in time
    #[error("no matching frame after {waited:?}{}", render_diffs(.diffs, .omitted))]
    Timeout {
        waited: Duration,
        /// Diffs of the most recent frames that were captured and rejected
        diffs: Vec<String>,
        /// Rejected frames older than those in `diffs`
        omitted: usize,
    },

    /// Invalid parameter error
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },
}

fn render_diffs(diffs: &[String], omitted: &usize) -> String {
    let omitted = *omitted;
    if diffs.is_empty() && omitted == 0 {
        return String::new();
    }
    let mut out = format!("; {} frame(s) rejected", diffs.len() + omitted);
    if omitted > 0 {
        out.push_str(&format!(", last {} shown", diffs.len()));
    }
    out.push(':');
    for diff in diffs {
        out.push('\n');
        out.push_str(diff.trim_end());
    }
    out
}

impl Error {
    /// Create a serialization error with a custom message
    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Error::Serialization(msg.into())
    }

    /// Create a malformed-packet error with a custom message
    pub fn malformed<S: Into<String>>(msg: S) -> Self {
        Error::Malformed(msg.into())
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        Error::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a receive timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}
