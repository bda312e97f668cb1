//! Member handle definition
//!
//! What a channel actor holds for each member: enough to address and
//! write to the session, never the session itself.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Connected client as seen by a channel
///
/// The session handler keeps ownership of the connection; this only carries
/// the outbox that its writer task drains.
#[derive(Debug, Clone)]
pub struct Client {
    /// Unique identifier for this session
    pub id: ClientId,
    /// Display name (already rewritten)
    pub name: String,
    /// Channel → session outbox
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a new client handle with the given ID, name and outbox
    pub fn new(id: ClientId, name: impl Into<String>, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            name: name.into(),
            sender,
        }
    }

    /// Queue a message for this client
    ///
    /// Returns an error if the outbox is closed (session writer has ended).
    pub async fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}
