//! Error types for the relay
//!
//! Defines application-level errors and channel submission errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Only bind and configuration failures are fatal to the process;
/// everything else ends a single session.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal for the session, or the process if binding)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration values are inconsistent
    #[error("Invalid config: {0}")]
    Config(String),

    /// Channel send error (internal channel broken)
    #[error("Channel send error")]
    ChannelSend,
}

/// Message send errors
///
/// Occurs when submitting to a channel actor or member outbox that has gone away.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

impl From<SendError> for AppError {
    fn from(_: SendError) -> Self {
        AppError::ChannelSend
    }
}
