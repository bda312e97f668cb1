//! Line protocol definitions
//!
//! Newline-delimited text in both directions. Client requests are
//! tokenized into [`ClientRequest`]; server lines are rendered from
//! [`ServerMessage`] via `Display` (without the trailing newline, which
//! the session writer adds).

use std::fmt;

/// Prefix that marks a broadcast request
const TELL_PREFIX: &str = "tell ";

/// Delimiter between the command word, channel name and body
const QUOTE: &str = "'";

/// Client → Server request
///
/// The first line of a connection is the display name and is not parsed
/// through here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    /// `tell '<channel>'<body>`: broadcast `body` to `channel`
    Tell { channel: String, body: String },
}

impl ClientRequest {
    /// Tokenize one request line.
    ///
    /// The line is split on `'`: the first segment is the command word, the
    /// second the channel name, and everything after it (rejoined with `'`)
    /// the body. Returns `None` for lines that are not a well-formed `tell`.
    pub fn parse(line: &str) -> Option<Self> {
        if !line.starts_with(TELL_PREFIX) {
            return None;
        }

        let mut segments = line.split(QUOTE);
        let _command = segments.next()?;
        let channel = segments.next()?;
        let body: Vec<&str> = segments.collect();
        if body.is_empty() {
            return None;
        }

        Some(ClientRequest::Tell {
            channel: channel.to_string(),
            body: body.join(QUOTE),
        })
    }
}

/// Server → Client line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Advertisement of every registered channel, sent once after the name
    Channels(Vec<String>),
    /// Another member joined the channel
    Join { name: String },
    /// A member broadcast to a channel
    Broadcast {
        sender: String,
        channel: String,
        body: String,
    },
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Channels(names) => {
                write!(f, "channels: ")?;
                for name in names {
                    write!(f, "'{}' ", name)?;
                }
                Ok(())
            }
            ServerMessage::Join { name } => write!(f, "join {}", name),
            ServerMessage::Broadcast {
                sender,
                channel,
                body,
            } => write!(f, "'{}'@'{}'{}", sender, channel, body),
        }
    }
}
