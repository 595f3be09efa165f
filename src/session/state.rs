//! Session states and execution reports.

use serde::Serialize;
use std::fmt;

/// Where a session is in the transmit, settle and download cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Transmitting { attempt: u32 },
    TransmitOk,
    TransmitRetry { attempt: u32 },
    Settling,
    Downloading { attempt: u32 },
    DownloadRetry { attempt: u32 },
    Complete,
    Failed,
}

impl SessionState {
    /// Whether the cycle has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::TransmitOk | SessionState::Complete | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::Transmitting { attempt } => write!(f, "transmitting (attempt {})", attempt),
            SessionState::TransmitOk => f.write_str("transmit ok"),
            SessionState::TransmitRetry { attempt } => write!(f, "transmit retry after attempt {}", attempt),
            SessionState::Settling => f.write_str("settling"),
            SessionState::Downloading { attempt } => write!(f, "downloading (attempt {})", attempt),
            SessionState::DownloadRetry { attempt } => write!(f, "download retry after attempt {}", attempt),
            SessionState::Complete => f.write_str("complete"),
            SessionState::Failed => f.write_str("failed"),
        }
    }
}

/// What one `execute` call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub transmit_attempts: u32,
    pub download_attempts: u32,
    /// Every state entered, in order, starting from [`SessionState::Idle`].
    pub states: Vec<SessionState>,
}

impl ExecutionReport {
    pub fn final_state(&self) -> SessionState {
        self.states.last().copied().unwrap_or(SessionState::Idle)
    }

    /// The command was transmitted and, if required, its response downloaded.
    pub fn succeeded(&self) -> bool {
        matches!(self.final_state(), SessionState::TransmitOk | SessionState::Complete)
    }

    pub fn entered(&self, state: SessionState) -> bool {
        self.states.contains(&state)
    }
}
