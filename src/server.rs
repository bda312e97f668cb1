//! TCP accept loop
//!
//! Binds the listener, builds the channel registry, and spawns one
//! session handler per accepted connection.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Config;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::registry::Registry;

/// A bound relay, ready to accept connections
pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
    config: Arc<Config>,
}

impl Server {
    /// Bind `config.bind` and start every configured channel actor
    pub async fn bind(config: Config) -> Result<Self, AppError> {
        config.validate()?;

        let listener = TcpListener::bind(config.bind).await?;
        let registry = Registry::new(config.channels.iter().cloned(), config.command_buffer);

        Ok(Self {
            listener,
            registry: Arc::new(registry),
            config: Arc::new(config),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared channel registry
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Accept connections forever
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let registry = Arc::clone(&self.registry);
                    let config = Arc::clone(&self.config);

                    // Spawn handler task for each connection
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, registry, config).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}
