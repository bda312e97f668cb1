//! Session handler
//!
//! Per-connection control flow: read the display name, advertise the
//! channels, auto-join the default channel, then turn `tell` lines into
//! channel broadcasts until the connection ends.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::config::Config;
use crate::error::AppError;
use crate::message::{ClientRequest, ServerMessage};
use crate::registry::Registry;
use crate::session::{self, SessionReader, SessionWriter};
use crate::types::ClientId;

/// Handle a new TCP connection
pub async fn handle_connection(
    stream: TcpStream,
    registry: Arc<Registry>,
    config: Arc<Config>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    debug!("New TCP connection from {}", peer_addr);

    let (reader, writer) = session::split(stream, config.max_line_length);
    handle_session(reader, writer, registry, config).await
}

/// Drive one session over an already split stream
///
/// Returns `Ok(())` when the peer closes the stream and an error when a
/// read or the initial advertisement fails. Either way, everything the
/// channel accepted from this session before the read side ended is
/// still written out before the write side is closed.
pub async fn handle_session<R, W>(
    mut reader: SessionReader<R>,
    mut writer: SessionWriter<W>,
    registry: Arc<Registry>,
    config: Arc<Config>,
) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let client_id = ClientId::new();

    let Some(requested) = reader.read_line().await? else {
        debug!("Client {} closed before sending a name", client_id);
        return Ok(());
    };
    let name = config.display_name(&requested);
    info!("Client {} connected as '{}'", client_id, name);

    let channels = ServerMessage::Channels(registry.names().to_vec());
    writer.write_line(&channels.to_string()).await?;

    // Channel -> session messages flow through the outbox
    let (outbox_tx, outbox_rx) = mpsc::channel(config.outbox_capacity);
    let (closing_tx, closing_rx) = oneshot::channel();
    let write_task = tokio::spawn(drain_outbox(writer, outbox_rx, closing_rx, client_id));

    let home = registry.get(&config.default_channel);
    match home {
        Some(channel) => {
            channel
                .join(Client::new(client_id, name.clone(), outbox_tx))
                .await?;
        }
        None => warn!(
            "Default channel '{}' is not registered, {} joins nothing",
            config.default_channel, client_id
        ),
    }

    let result = read_requests(&mut reader, &registry, &name, client_id).await;

    if let Some(channel) = home {
        if config.leave_on_disconnect {
            if let Err(e) = channel.leave(client_id).await {
                warn!("Leave for {} on channel {} failed: {}", client_id, channel.name(), e);
            }
        }
        // Once this answers, every send we submitted is in our outbox
        if let Err(e) = channel.members().await {
            warn!("Channel {} did not answer for {}: {}", channel.name(), client_id, e);
        }
    }

    let _ = closing_tx.send(());
    if let Err(e) = write_task.await {
        warn!("Write task for {} failed: {}", client_id, e);
    }

    info!("Client {} ('{}') disconnected", client_id, name);
    result
}

/// Read loop: forward every well-formed `tell` to its channel
async fn read_requests<R>(
    reader: &mut SessionReader<R>,
    registry: &Registry,
    name: &str,
    client_id: ClientId,
) -> Result<(), AppError>
where
    R: AsyncRead + Unpin,
{
    while let Some(line) = reader.read_line().await? {
        let Some(ClientRequest::Tell { channel, body }) = ClientRequest::parse(&line) else {
            debug!("Ignoring line from {}: {:?}", client_id, line);
            continue;
        };

        debug!("channel: {} msg: {}", channel, body);

        match registry.get(&channel) {
            Some(handle) => handle.send(name, body).await?,
            None => debug!("Dropping tell to unknown channel '{}'", channel),
        }
    }

    Ok(())
}

/// Writer task: flush each queued message to the peer as one line
///
/// Runs until the outbox closes, a write fails, or `closing` fires. On
/// `closing`, whatever is already queued is written before the write side
/// is shut down.
async fn drain_outbox<W>(
    mut writer: SessionWriter<W>,
    mut outbox: mpsc::Receiver<ServerMessage>,
    mut closing: oneshot::Receiver<()>,
    client_id: ClientId,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            msg = outbox.recv() => match msg {
                Some(msg) => {
                    if !forward(&mut writer, &msg, client_id).await {
                        return;
                    }
                }
                None => break,
            },
            _ = &mut closing => break,
        }
    }

    // Flush what was queued before we were told to close
    while let Ok(msg) = outbox.try_recv() {
        if !forward(&mut writer, &msg, client_id).await {
            return;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("Shutdown for {} failed: {}", client_id, e);
    }
    debug!("Write task ended for {}", client_id);
}

async fn forward<W>(writer: &mut SessionWriter<W>, msg: &ServerMessage, client_id: ClientId) -> bool
where
    W: AsyncWrite + Unpin,
{
    match writer.write_line(&msg.to_string()).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Write to {} failed: {}", client_id, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{duplex, split, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf};
    use tokio::task::JoinHandle;
    use tokio::time::timeout;

    use super::*;

    struct Peer {
        reader: SessionReader<ReadHalf<DuplexStream>>,
        writer: WriteHalf<DuplexStream>,
        task: JoinHandle<Result<(), AppError>>,
    }

    impl Peer {
        async fn send(&mut self, line: &str) {
            self.writer.write_all(line.as_bytes()).await.unwrap();
            self.writer.write_all(b"\n").await.unwrap();
        }

        async fn expect(&mut self) -> String {
            timeout(Duration::from_secs(1), self.reader.read_line())
                .await
                .expect("timed out waiting for a line")
                .unwrap()
                .expect("stream closed")
        }

        /// Half-close the client side and wait for the handler to finish
        async fn close(mut self) -> Result<(), AppError> {
            self.writer.shutdown().await.unwrap();
            self.task.await.unwrap()
        }
    }

    fn connect(registry: &Arc<Registry>, config: &Arc<Config>) -> Peer {
        let (client, server) = duplex(1024);
        let (server_read, server_write) = split(server);
        let task = tokio::spawn(handle_session(
            SessionReader::with_max_length(server_read, config.max_line_length),
            SessionWriter::new(server_write),
            registry.clone(),
            config.clone(),
        ));
        let (client_read, client_write) = split(client);
        Peer {
            reader: SessionReader::new(client_read),
            writer: client_write,
            task,
        }
    }

    fn setup(config: Config) -> (Arc<Registry>, Arc<Config>) {
        let registry = Registry::new(config.channels.clone(), config.command_buffer);
        (Arc::new(registry), Arc::new(config))
    }

    #[tokio::test]
    async fn test_advertises_channels_and_rewrites_name() {
        let (registry, config) = setup(Config::default());
        let mut peer = connect(&registry, &config);

        peer.send("weestack").await;
        assert_eq!(peer.expect().await, "channels: 'oop' 'bananas' ");

        peer.send("tell 'oop'hi").await;
        assert_eq!(peer.expect().await, "'peestack'@'oop'hi");
    }

    #[tokio::test]
    async fn test_ignored_and_unknown_requests() {
        let (registry, config) = setup(Config::default());
        let mut peer = connect(&registry, &config);

        peer.send("alice").await;
        peer.expect().await;

        peer.send("hello everyone").await;
        peer.send("tell oop").await;
        peer.send("tell 'oop").await;
        peer.send("tell 'nowhere'lost").await;
        peer.send("tell 'oop'msg'with'quotes").await;

        assert_eq!(peer.expect().await, "'alice'@'oop'msg'with'quotes");
    }

    #[tokio::test]
    async fn test_tell_to_channel_not_joined() {
        let (registry, config) = setup(Config::default());
        let mut peer = connect(&registry, &config);

        peer.send("alice").await;
        peer.expect().await;

        // Nobody is in bananas, so nothing comes back
        peer.send("tell 'bananas'anyone?").await;
        peer.send("tell 'oop'here").await;
        assert_eq!(peer.expect().await, "'alice'@'oop'here");
    }

    #[tokio::test]
    async fn test_disconnect_keeps_membership_by_default() {
        let (registry, config) = setup(Config::default());
        let mut peer = connect(&registry, &config);
        peer.send("alice").await;
        peer.expect().await;

        peer.close().await.unwrap();

        let oop = registry.get("oop").unwrap();
        assert_eq!(oop.members().await.unwrap(), vec!["alice"]);
    }

    #[tokio::test]
    async fn test_leave_on_disconnect() {
        let (registry, config) = setup(Config {
            leave_on_disconnect: true,
            ..Config::default()
        });
        let mut peer = connect(&registry, &config);
        peer.send("alice").await;
        peer.expect().await;

        peer.close().await.unwrap();

        let oop = registry.get("oop").unwrap();
        assert!(oop.members().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_default_channel() {
        let (registry, config) = setup(Config {
            default_channel: "nowhere".into(),
            ..Config::default()
        });
        let mut peer = connect(&registry, &config);
        peer.send("alice").await;
        assert_eq!(peer.expect().await, "channels: 'oop' 'bananas' ");

        peer.close().await.unwrap();
        assert!(registry.get("oop").unwrap().members().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_half_close_still_delivers_own_broadcast() {
        let (registry, config) = setup(Config::default());
        let mut peer = connect(&registry, &config);

        peer.send("alice").await;
        peer.send("tell 'oop'hi").await;
        peer.writer.shutdown().await.unwrap();

        assert_eq!(peer.expect().await, "channels: 'oop' 'bananas' ");
        assert_eq!(peer.expect().await, "'alice'@'oop'hi");
        assert_eq!(peer.reader.read_line().await.unwrap(), None);
        peer.task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_non_utf8_name_still_joins() {
        let (registry, config) = setup(Config::default());
        let mut peer = connect(&registry, &config);

        peer.writer.write_all(b"caf\xe9\n").await.unwrap();
        assert_eq!(peer.expect().await, "channels: 'oop' 'bananas' ");

        peer.send("tell 'oop'bonjour").await;
        assert_eq!(peer.expect().await, "'caf\u{FFFD}'@'oop'bonjour");

        let oop = registry.get("oop").unwrap();
        assert_eq!(oop.members().await.unwrap(), vec!["caf\u{FFFD}"]);
    }

    #[tokio::test]
    async fn test_overlong_line_ends_session() {
        let (registry, config) = setup(Config {
            max_line_length: 16,
            ..Config::default()
        });
        let mut peer = connect(&registry, &config);
        peer.send("alice").await;
        peer.expect().await;

        peer.send("tell 'oop'this body is far too long").await;

        let result = peer.task.await.unwrap();
        assert!(matches!(result, Err(AppError::Io(_))));
    }

    #[tokio::test]
    async fn test_close_before_name() {
        let (registry, config) = setup(Config::default());
        let peer = connect(&registry, &config);

        peer.close().await.unwrap();
        assert!(registry.get("oop").unwrap().members().await.unwrap().is_empty());
    }
}
