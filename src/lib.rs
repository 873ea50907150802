//! Hangman State Library
//!
//! This crate provides state management for multiplayer Hangman games.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Game Sessions** - One word-setter, any number of guessers taking turns,
//!   a mistake budget and per-round scoring. Every rule is enforced here.
//!
//! - **Connection Management** - Binds volatile connection handles to
//!   (game, player name) seats so players can drop and come back.
//!
//! - **Registry** - Short random codes mapped to live sessions, with eviction
//!   of sessions everyone has left.
//!
//! - **Protocol and Delivery** - JSON event contracts, per-recipient
//!   snapshots and a single-task event loop.
//!
//! # Design Principles
//!
//! 1. **State machines validate before writing** - A rejected event leaves the
//!    session exactly as it was.
//!
//! 2. **Names are identity** - Connections come and go; the player name is the
//!    stable key within a game.
//!
//! 3. **No networking** - Transports feed events in and drain outbound queues;
//!    this crate never touches a socket.
//!
//! 4. **Serialization-ready** - Snapshots are JSON values ready to send.
//!
//! # Example
//!
//! ```rust
//! use hangman_state::{AppState, ClientEvent, ConnectionId, ServerEvent};
//!
//! let mut app = AppState::default();
//! let alice = ConnectionId(1);
//! let bob = ConnectionId(2);
//!
//! let replies = app.apply(alice, ClientEvent::CreateGame {
//!     player_name: "Alice".to_string(),
//! });
//! let code = match &replies[0].event {
//!     ServerEvent::GameCreated { game_code } => game_code.clone(),
//!     _ => unreachable!(),
//! };
//!
//! app.apply(bob, ClientEvent::JoinGame {
//!     game_code: code.clone(),
//!     player_name: "Bob".to_string(),
//! });
//! app.apply(alice, ClientEvent::SetWord {
//!     game_code: code.clone(),
//!     word: "rust".to_string(),
//! });
//!
//! let game = app.games.get(&code).unwrap();
//! assert_eq!(game.masked_word(), "_ _ _ _");
//! assert!(game.is_turn_holder("Bob"));
//! ```

pub mod config;
pub mod state;

#[cfg(test)]
mod test_support;

pub use config::{ConfigError, GameConfig};
// Re-export everything from state module at crate root
pub use state::*;
