//! Relay configuration
//!
//! Every value has a default, so an empty JSON object (or no config file
//! at all) yields the stock relay: channels `oop` and `bananas`, auto-join
//! to `oop`, and the single `weestack` → `peestack` rename.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listen address; port 0 picks an ephemeral port
    pub bind: SocketAddr,
    /// Channels created at startup, in advertisement order
    pub channels: Vec<String>,
    /// Channel every session is joined to after the name line
    pub default_channel: String,
    /// Exact-match display name substitutions
    pub name_rewrites: HashMap<String, String>,
    /// Capacity of each channel actor's command queue
    pub command_buffer: usize,
    /// Capacity of each member's outbox
    pub outbox_capacity: usize,
    /// Longest accepted request line; longer lines end the session
    pub max_line_length: usize,
    /// Remove a session from its channel when it disconnects
    pub leave_on_disconnect: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 0)),
            channels: vec!["oop".to_string(), "bananas".to_string()],
            default_channel: "oop".to_string(),
            name_rewrites: HashMap::from([("weestack".to_string(), "peestack".to_string())]),
            command_buffer: 256,
            outbox_capacity: 64,
            max_line_length: crate::session::MAX_LINE_LENGTH,
            leave_on_disconnect: false,
        }
    }
}

impl Config {
    /// Load and validate a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON config document
    pub fn from_json(text: &str) -> Result<Self, AppError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values are usable.
    ///
    /// A `default_channel` missing from `channels` is allowed; the
    /// auto-join is then skipped.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.channels.is_empty() {
            return Err(AppError::Config("at least one channel is required".into()));
        }

        for (i, name) in self.channels.iter().enumerate() {
            if name.is_empty() {
                return Err(AppError::Config("channel names must not be empty".into()));
            }
            // Such a name could never be addressed by a tell.
            if name.contains('\'') {
                return Err(AppError::Config(format!(
                    "channel name {:?} contains an apostrophe",
                    name
                )));
            }
            if self.channels[..i].contains(name) {
                return Err(AppError::Config(format!("duplicate channel {:?}", name)));
            }
        }

        if self.command_buffer == 0 || self.outbox_capacity == 0 {
            return Err(AppError::Config("queue capacities must be positive".into()));
        }

        if self.max_line_length == 0 {
            return Err(AppError::Config("max_line_length must be positive".into()));
        }

        Ok(())
    }

    /// Apply the rewrite table to a requested display name
    pub fn display_name(&self, requested: &str) -> String {
        self.name_rewrites
            .get(requested)
            .cloned()
            .unwrap_or_else(|| requested.to_string())
    }
}
