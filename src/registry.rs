//! Channel registry
//!
//! Maps channel names to actor handles. Built once during startup and
//! never mutated afterwards, so it is shared as `Arc<Registry>` without
//! any locking.

use std::collections::HashMap;

use tracing::info;

use crate::channel::{ChannelActor, ChannelHandle};

/// Immutable name → channel actor map
#[derive(Debug)]
pub struct Registry {
    /// Channel names in registration order
    names: Vec<String>,
    channels: HashMap<String, ChannelHandle>,
}

impl Registry {
    /// Spawn one actor per name, each with a queue of `capacity` commands
    ///
    /// Must be called from within a tokio runtime. Later duplicates of a
    /// name are ignored.
    pub fn new<I, S>(names: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self {
            names: Vec::new(),
            channels: HashMap::new(),
        };

        for name in names {
            let name = name.into();
            if registry.channels.contains_key(&name) {
                continue;
            }
            let handle = ChannelActor::spawn(name.clone(), capacity);
            registry.channels.insert(name.clone(), handle);
            registry.names.push(name);
        }

        info!("Registered channels: {:?}", registry.names);
        registry
    }

    /// Look up a channel by name
    pub fn get(&self, name: &str) -> Option<&ChannelHandle> {
        self.channels.get(name)
    }

    /// Channel names in registration order
    pub fn names(&self) -> &[String] {
        &self.names
    }
}
