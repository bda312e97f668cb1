//! Channel actor implementation
//!
//! One actor per channel owns that channel's membership list and processes
//! commands strictly one at a time. Handlers never touch the list; they
//! submit [`ChannelCommand`]s through a [`ChannelHandle`].

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Commands sent from session handlers to a channel actor
#[derive(Debug)]
pub enum ChannelCommand {
    /// Add a member, announcing it to everyone already present
    Join { client: Client },
    /// Broadcast a message to every member, sender included
    Send { sender: String, body: String },
    /// Remove a member without notifying anyone
    Leave { client_id: ClientId },
    /// Snapshot of member names in join order
    Members { reply: oneshot::Sender<Vec<String>> },
}

/// The per-channel actor
pub struct ChannelActor {
    /// Channel name, fixed for the life of the process
    name: String,
    /// Members in join order
    members: Vec<Client>,
    /// Command receiver channel
    receiver: mpsc::Receiver<ChannelCommand>,
}

impl ChannelActor {
    /// Create a new actor for `name` reading from `receiver`
    pub fn new(name: impl Into<String>, receiver: mpsc::Receiver<ChannelCommand>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            receiver,
        }
    }

    /// Spawn an actor task for `name` and return its handle
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(name: impl Into<String>, capacity: usize) -> ChannelHandle {
        let name = name.into();
        let (sender, receiver) = mpsc::channel(capacity);
        tokio::spawn(ChannelActor::new(name.clone(), receiver).run());
        ChannelHandle { name, sender }
    }

    /// Run the actor event loop
    ///
    /// Processes commands until every handle has been dropped.
    pub async fn run(mut self) {
        debug!("Channel {} started", self.name);

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        debug!("Channel {} shutting down", self.name);
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: ChannelCommand) {
        match cmd {
            ChannelCommand::Join { client } => {
                self.handle_join(client).await;
            }
            ChannelCommand::Send { sender, body } => {
                self.handle_send(sender, body).await;
            }
            ChannelCommand::Leave { client_id } => {
                self.handle_leave(client_id);
            }
            ChannelCommand::Members { reply } => {
                let names = self.members.iter().map(|c| c.name.clone()).collect();
                let _ = reply.send(names);
            }
        }
    }

    /// Announce the newcomer to existing members, then append it
    async fn handle_join(&mut self, client: Client) {
        info!("User {} connected to channel {}", client.name, self.name);

        let notice = ServerMessage::Join {
            name: client.name.clone(),
        };
        self.deliver(&notice).await;

        self.members.push(client);
        debug!("Channel {} has {} members", self.name, self.members.len());
    }

    /// Fan a message out to every current member
    async fn handle_send(&mut self, sender: String, body: String) {
        let msg = ServerMessage::Broadcast {
            sender,
            channel: self.name.clone(),
            body,
        };
        self.deliver(&msg).await;
    }

    fn handle_leave(&mut self, client_id: ClientId) {
        let before = self.members.len();
        self.members.retain(|c| c.id != client_id);
        if self.members.len() < before {
            info!("Client {} left channel {}", client_id, self.name);
        }
    }

    /// Best-effort delivery in membership order
    ///
    /// A closed outbox is logged and skipped; the member stays in the list.
    async fn deliver(&self, msg: &ServerMessage) {
        for member in &self.members {
            debug!("Sending to {}", member.name);
            if member.send(msg.clone()).await.is_err() {
                warn!(
                    "Delivery to {} ({}) on channel {} failed",
                    member.name, member.id, self.name
                );
            }
        }
    }
}

/// Cloneable handle for submitting commands to one channel actor
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    name: String,
    sender: mpsc::Sender<ChannelCommand>,
}

impl ChannelHandle {
    /// Name of the channel this handle addresses
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Submit a join request; resolves once the actor queue accepts it
    pub async fn join(&self, client: Client) -> Result<(), SendError> {
        self.submit(ChannelCommand::Join { client }).await
    }

    /// Submit a broadcast on behalf of `sender`
    pub async fn send(
        &self,
        sender: impl Into<String>,
        body: impl Into<String>,
    ) -> Result<(), SendError> {
        self.submit(ChannelCommand::Send {
            sender: sender.into(),
            body: body.into(),
        })
        .await
    }

    /// Submit a leave request for `client_id`
    pub async fn leave(&self, client_id: ClientId) -> Result<(), SendError> {
        self.submit(ChannelCommand::Leave { client_id }).await
    }

    /// Ask the actor for its member names in join order
    ///
    /// Because the actor is serialized, the answer also reflects every
    /// command submitted through this handle before the call.
    pub async fn members(&self) -> Result<Vec<String>, SendError> {
        let (reply, rx) = oneshot::channel();
        self.submit(ChannelCommand::Members { reply }).await?;
        rx.await.map_err(|_| SendError::ChannelClosed)
    }

    async fn submit(&self, cmd: ChannelCommand) -> Result<(), SendError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| SendError::ChannelClosed)
    }
}
