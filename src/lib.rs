//! Multi-channel TCP Broadcast Relay Library
//!
//! Clients connect over TCP, send a display name, are auto-joined to a
//! default channel, and broadcast lines with `tell '<channel>'<body>`.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - Each `ChannelActor` owns one channel's member list and handles
//!   joins and broadcasts one at a time
//! - The `Registry` maps names to actor handles and is immutable after startup
//! - Each connection has a `handler` task plus a writer task draining
//!   that member's outbox
//! - No locks needed - all membership access goes through message passing
//!
//! # Example
//! ```ignore
//! use channel_relay::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = Server::bind(Config::default()).await.unwrap();
//!     println!("Running at port: {}", server.local_addr().unwrap().port());
//!     server.run().await;
//! }
//! ```

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use channel::{ChannelActor, ChannelCommand, ChannelHandle};
pub use client::Client;
pub use config::Config;
pub use error::{AppError, SendError};
pub use handler::{handle_connection, handle_session};
pub use message::{ClientRequest, ServerMessage};
pub use registry::Registry;
pub use server::Server;
pub use types::ClientId;
