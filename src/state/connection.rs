//! Connection bindings.
//!
//! Maps a volatile [`ConnectionId`] to the durable (game code, player name)
//! pair it currently speaks for, and keeps the reverse index used as each
//! game's broadcast channel.

use std::collections::{BTreeSet, HashMap};

use super::player::ConnectionId;

/// What a connection is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionBinding {
    pub connection: ConnectionId,

    /// Game the connection belongs to
    pub game_code: String,

    /// Seat the connection speaks for
    pub player_name: String,
}

impl ConnectionBinding {
    pub fn new(connection: ConnectionId, game_code: String, player_name: String) -> Self {
        Self {
            connection,
            game_code,
            player_name,
        }
    }

    /// Check if this binding targets `game_code`.
    pub fn is_for_game(&self, game_code: &str) -> bool {
        self.game_code.eq_ignore_ascii_case(game_code)
    }
}

/// Connection manager - tracks every bound connection.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    /// Bindings by connection
    bindings: HashMap<ConnectionId, ConnectionBinding>,

    /// Game code to bound connections
    channels: HashMap<String, BTreeSet<ConnectionId>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a connection, replacing whatever it was bound to before.
    ///
    /// Returns the replaced binding.
    pub fn bind(&mut self, binding: ConnectionBinding) -> Option<ConnectionBinding> {
        let previous = self.unbind(binding.connection);
        self.channels
            .entry(binding.game_code.clone())
            .or_default()
            .insert(binding.connection);
        self.bindings.insert(binding.connection, binding);
        previous
    }

    /// Drop a connection's binding.
    pub fn unbind(&mut self, connection: ConnectionId) -> Option<ConnectionBinding> {
        let binding = self.bindings.remove(&connection)?;
        if let Some(channel) = self.channels.get_mut(&binding.game_code) {
            channel.remove(&connection);
            if channel.is_empty() {
                self.channels.remove(&binding.game_code);
            }
        }
        Some(binding)
    }

    /// Get a connection's binding.
    pub fn get(&self, connection: ConnectionId) -> Option<&ConnectionBinding> {
        self.bindings.get(&connection)
    }

    pub fn is_bound(&self, connection: ConnectionId) -> bool {
        self.bindings.contains_key(&connection)
    }

    /// Connections bound to a game, in ascending order.
    pub fn channel(&self, game_code: &str) -> Vec<ConnectionId> {
        self.channels
            .get(game_code)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop every binding of a game.
    pub fn remove_channel(&mut self, game_code: &str) -> Vec<ConnectionBinding> {
        let Some(members) = self.channels.remove(game_code) else {
            return Vec::new();
        };
        members
            .into_iter()
            .filter_map(|conn| self.bindings.remove(&conn))
            .collect()
    }

    /// Count bound connections.
    pub fn count(&self) -> usize {
        self.bindings.len()
    }

    /// Count games with at least one bound connection.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
