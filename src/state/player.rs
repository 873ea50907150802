//! Players and connection handles.
//!
//! A [`Player`] is one seat in a game. Its `name` is the durable key that
//! survives reconnects; its `connection` is whatever transport handle is
//! currently attached to the seat and changes every time the player comes
//! back.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport-assigned handle for one live connection.
///
/// Handles are volatile: a player who drops and comes back gets a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One seat in a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Display name, unique within a game
    pub name: String,

    /// Connection currently attached to this seat
    pub connection: Option<ConnectionId>,

    /// Whether the seat has a live connection
    pub connected: bool,

    /// Points won across all rounds
    pub score: u32,
}

impl Player {
    /// Create a connected player with no points.
    pub fn new(name: impl Into<String>, connection: ConnectionId) -> Self {
        Self {
            name: name.into(),
            connection: Some(connection),
            connected: true,
            score: 0,
        }
    }

    /// Attach a new connection and mark the seat live.
    ///
    /// Score and roster position are untouched.
    pub fn rebind(&mut self, connection: ConnectionId) {
        self.connection = Some(connection);
        self.connected = true;
    }

    /// Detach the connection, keeping the seat for a later reconnect.
    pub fn disconnect(&mut self) {
        self.connection = None;
        self.connected = false;
    }

    /// Whether `connection` is the one attached to this seat.
    pub fn is_bound_to(&self, connection: ConnectionId) -> bool {
        self.connected && self.connection == Some(connection)
    }

    pub fn award_point(&mut self) {
        self.score += 1;
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "connected": self.connected,
            "score": self.score
        })
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.connected { "connected" } else { "disconnected" };
        write!(f, "{} ({}, {} pts)", self.name, status, self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player() {
        let player = Player::new("Alice", ConnectionId(1));
        assert!(player.connected);
        assert_eq!(player.score, 0);
        assert!(player.is_bound_to(ConnectionId(1)));
        assert!(!player.is_bound_to(ConnectionId(2)));
    }

    #[test]
    fn test_disconnect_rebind() {
        let mut player = Player::new("Alice", ConnectionId(1));
        player.award_point();

        player.disconnect();
        assert!(!player.connected);
        assert_eq!(player.connection, None);
        assert!(!player.is_bound_to(ConnectionId(1)));

        player.rebind(ConnectionId(7));
        assert!(player.connected);
        assert!(player.is_bound_to(ConnectionId(7)));
        assert_eq!(player.score, 1);
    }

    #[test]
    fn test_to_json_hides_connection() {
        let player = Player::new("Bob", ConnectionId(3));
        let json = player.to_json();
        assert_eq!(json["name"], "Bob");
        assert_eq!(json["connected"], true);
        assert_eq!(json["score"], 0);
        assert!(json.get("connection").is_none());
    }

    #[test]
    fn test_display() {
        let mut player = Player::new("Bob", ConnectionId(3));
        player.disconnect();
        assert_eq!(format!("{}", player), "Bob (disconnected, 0 pts)");
        assert_eq!(format!("{}", ConnectionId(3)), "conn-3");
    }
}
