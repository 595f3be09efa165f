//! Error types for history decoding and pump sessions.
//!
//! All errors implement `std::error::Error` and carry enough context to report
//! a failed command or a malformed history page without re-running it.
//!
//! ## Error Categories
//!
//! - **Framing Errors**: a history page ended inside a record
//! - **Date Errors**: bit extraction succeeded but the calendar rejected the tuple
//! - **Transport Errors**: acknowledgment and communication failures on the link
//! - **Download Errors**: every download attempt for a command failed
//! - **Configuration Errors**: unreadable or invalid session configuration
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use pumplink::{PumpError, TransportError};
//!
//! let error = PumpError::from(TransportError::comm("no response from stick"));
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::history::DateTuple;

/// Result type alias for pump operations.
pub type Result<T, E = PumpError> = std::result::Result<T, E>;

/// Failures reported by a [`Transport`](crate::transport::Transport).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportError {
    /// Negative or timed-out acknowledgment while downloading.
    #[error("acknowledgment error: {reason}")]
    Ack { reason: String },

    /// The device did not complete the exchange.
    #[error("device communication error: {reason}")]
    Comm { reason: String },
}

impl TransportError {
    pub fn ack(reason: impl Into<String>) -> Self {
        TransportError::Ack { reason: reason.into() }
    }

    pub fn comm(reason: impl Into<String>) -> Self {
        TransportError::Comm { reason: reason.into() }
    }

    pub fn is_ack(&self) -> bool {
        matches!(self, TransportError::Ack { .. })
    }
}

/// Calendar construction failed for an extracted date tuple.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("not a date: {tuple}")]
pub struct NotADate {
    pub tuple: DateTuple,
}

/// Every failure collected while downloading one command's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadCauses(pub Vec<TransportError>);

impl fmt::Display for DownloadCauses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cause) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "attempt {}: {}", i + 1, cause)?;
        }
        Ok(())
    }
}

/// Main error type for pump operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum PumpError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("download failed after {attempts} attempts: {causes}")]
    DownloadExhausted { attempts: usize, causes: DownloadCauses },

    /// A date that failed calendar checks, raised through `?` by callers.
    ///
    /// Page walks never produce it: they keep the tuple on the record instead.
    ///
    /// ```rust
    /// use pumplink::PumpError;
    /// use pumplink::history::parse_date;
    ///
    /// fn stamp(bytes: &[u8; 5]) -> pumplink::Result<String> {
    ///     Ok(parse_date(bytes)?.to_string())
    /// }
    ///
    /// assert!(matches!(stamp(&[0x00; 5]), Err(PumpError::MalformedDate(_))));
    /// ```
    #[error(transparent)]
    MalformedDate(#[from] NotADate),

    #[error("record {opcode:#04x} truncated: expected {expected} bytes, got {available}")]
    TruncatedRecord { opcode: u8, expected: usize, available: usize },

    #[error("record {opcode:#04x} declares {declared} head bytes but {supplied} were supplied")]
    OversizedHead { opcode: u8, declared: usize, supplied: usize },

    #[error("signal strength never reached {threshold} (best {best}) after {polls} polls")]
    WeakSignal { threshold: i32, best: i32, polls: u32 },

    #[error("Parse error in {context}: {details}")]
    Parse { context: String, details: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Configuration file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PumpError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            PumpError::Transport(_) => true,
            PumpError::WeakSignal { .. } => true,
            PumpError::DownloadExhausted { .. } => false,
            PumpError::MalformedDate(_) => false,
            PumpError::TruncatedRecord { .. } => false,
            PumpError::OversizedHead { .. } => false,
            PumpError::Parse { .. } => false,
            PumpError::Config { .. } => false,
            PumpError::File { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            PumpError::Transport(TransportError::Ack { .. }) => vec![
                "Move the radio stick closer to the pump",
                "Retry the download",
            ],
            PumpError::Transport(_) => vec![
                "Check the stick is plugged in and the port is open",
                "Verify the pump serial number",
                "Reopen the transport",
            ],
            PumpError::DownloadExhausted { .. } => vec![
                "Re-run the command from the start",
                "Check signal strength before retrying",
                "Reopen the transport",
            ],
            PumpError::MalformedDate(_) => vec![
                "Keep the raw tuple from the record",
                "Compare with the vendor export for this record",
            ],
            PumpError::TruncatedRecord { .. } => vec![
                "Download the full history page",
                "Check the page was not cut short by the transport",
            ],
            PumpError::OversizedHead { .. } => vec!["Pass only the opcode and head bytes to the framer"],
            PumpError::WeakSignal { .. } => vec![
                "Move the radio stick closer to the pump",
                "Raise signal_poll_limit in the session configuration",
            ],
            PumpError::Parse { .. } => vec![
                "Verify the response came from the expected command",
                "Check the pump model is supported",
            ],
            PumpError::Config { .. } => vec!["Check configuration values against the documented defaults"],
            PumpError::File { .. } => vec![
                "Check file exists and is readable",
                "Check file permissions",
            ],
        }
    }

    /// Helper constructor for parse errors.
    pub fn parse_error(context: impl Into<String>, details: impl Into<String>) -> Self {
        PumpError::Parse { context: context.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(reason: impl Into<String>) -> Self {
        PumpError::Config { reason: reason.into() }
    }

    /// Helper constructor for an exhausted download.
    pub fn download_exhausted(causes: Vec<TransportError>) -> Self {
        PumpError::DownloadExhausted { attempts: causes.len(), causes: DownloadCauses(causes) }
    }

    /// Underlying causes when every download attempt failed.
    pub fn download_causes(&self) -> Option<&[TransportError]> {
        match self {
            PumpError::DownloadExhausted { causes, .. } => Some(&causes.0),
            _ => None,
        }
    }
}
