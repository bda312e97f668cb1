//! Basic type definitions for the relay
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based unique session identifier

use uuid::Uuid;

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4. Used to correlate log lines and to address
/// a member when it leaves a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
