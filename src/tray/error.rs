// tray/error.rs - Tray Error Types

/// Errors surfaced by the tray controller and its backends
#[derive(Debug, thiserror::Error)]
pub enum TrayError {
    /// The native tray subsystem could not start. The host may continue
    /// without a tray or call `start` again.
    #[error("tray backend error: {0}")]
    Backend(String),

    /// An operation was called in a state where it can never succeed.
    #[error("invalid tray state: {0}")]
    InvalidState(&'static str),
}

impl TrayError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend(err.to_string())
    }
}

pub type TrayResult<T> = Result<T, TrayError>;
