//! Game registry.
//!
//! Process-wide map from game code to [`GameSession`]. Owned by the
//! composition root and handed to whoever processes events; there is no
//! global instance.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rand::Rng;

use super::game::GameSession;
use super::player::ConnectionId;
use crate::config::GameConfig;

/// Characters used in game codes.
const CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random game code.
pub fn generate_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}

/// Game registry - tracks all live sessions.
#[derive(Debug)]
pub struct GameRegistry {
    /// Sessions by lowercase code
    games: HashMap<String, GameSession>,

    code_length: usize,

    max_incorrect_guesses: usize,
}

impl GameRegistry {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            games: HashMap::new(),
            code_length: config.code_length,
            max_incorrect_guesses: config.max_incorrect_guesses,
        }
    }

    /// Create a session under a fresh code with `creator_name` as its only player.
    pub fn create(&mut self, creator_name: &str, connection: ConnectionId) -> &mut GameSession {
        let code = self.unused_code();
        let max_incorrect_guesses = self.max_incorrect_guesses;
        self.games
            .entry(code.clone())
            .or_insert_with(|| {
                GameSession::new(code, creator_name, connection, max_incorrect_guesses)
            })
    }

    fn unused_code(&self) -> String {
        loop {
            let code = generate_code(self.code_length);
            if !self.games.contains_key(&code) {
                return code;
            }
        }
    }

    /// Get a session by code (case-insensitive).
    pub fn get(&self, code: &str) -> Option<&GameSession> {
        self.games.get(&normalize_code(code))
    }

    /// Get a mutable session by code (case-insensitive).
    pub fn get_mut(&mut self, code: &str) -> Option<&mut GameSession> {
        self.games.get_mut(&normalize_code(code))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.games.contains_key(&normalize_code(code))
    }

    /// Remove a session.
    pub fn remove(&mut self, code: &str) -> Option<GameSession> {
        self.games.remove(&normalize_code(code))
    }

    /// Remove sessions nobody has been connected to for `max_idle`.
    pub fn cleanup_abandoned(&mut self, now: DateTime<Utc>, max_idle: chrono::Duration) -> Vec<String> {
        let abandoned: Vec<String> = self
            .games
            .iter()
            .filter(|(_, g)| g.is_abandoned(now, max_idle))
            .map(|(code, _)| code.clone())
            .collect();

        for code in &abandoned {
            self.games.remove(code);
        }

        abandoned
    }

    /// Count sessions.
    pub fn count(&self) -> usize {
        self.games.len()
    }

}

/// Canonical form of a user-supplied code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// Canonical form of a user-supplied player name.
///
/// Names stay case-sensitive; only surrounding whitespace is dropped.
pub fn normalize_name(name: &str) -> &str {
    name.trim()
}
