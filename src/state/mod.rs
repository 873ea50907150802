//! State management module for Hangman.
//!
//! - `player` - Seats and connection handles
//! - `turn` - Turn scheduling and pointer repair
//! - `game` - Game session state machine
//! - `connection` - Connection bindings and broadcast channels
//! - `registry` - Game code to session map
//! - `protocol` - Inbound/outbound event contracts
//! - `broadcast` - Delivery of outbound messages
//! - `worker` - Single-task event loop
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                             AppState                              │
//! │                                                                   │
//! │  ┌───────────────────┐  ┌──────────────────┐  ┌───────────────┐   │
//! │  │ ConnectionManager │  │   GameRegistry   │  │  GameConfig   │   │
//! │  │                   │  │                  │  │               │   │
//! │  │ connection →      │  │ code →           │  │ budget,       │   │
//! │  │   (code, name)    │  │   GameSession    │  │ code length,  │   │
//! │  │                   │  │                  │  │ idle eviction │   │
//! │  │ code →            │  │                  │  │               │   │
//! │  │   connections     │  │                  │  │               │   │
//! │  └───────────────────┘  └──────────────────┘  └───────────────┘   │
//! │                                                                   │
//! │  apply(connection, ClientEvent) ──▶ Vec<Outbound> ──▶ Gateway     │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are applied one at a time to completion. A rejected event leaves
//! every session untouched; only "game not found", "reconnect failed" and
//! "name taken" are reported back, everything else is dropped silently.

pub mod broadcast;
pub mod connection;
pub mod game;
pub mod player;
pub mod protocol;
pub mod registry;
pub mod turn;
pub mod worker;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

pub use broadcast::{ConnectionSender, Gateway, Outbound};
pub use connection::{ConnectionBinding, ConnectionManager};
pub use game::{
    Departure, GameError, GameSession, GuessOutcome, JoinOutcome, Phase, RoundWinner, PLACEHOLDER,
};
pub use player::{ConnectionId, Player};
pub use protocol::{ClientEvent, ServerEvent};
pub use registry::{normalize_name, GameRegistry};

use crate::config::GameConfig;

/// Combined application state.
///
/// The composition root: owns the registry and the connection bindings and
/// turns client events into outbound messages.
#[derive(Debug)]
pub struct AppState {
    pub config: GameConfig,
    pub games: GameRegistry,
    pub connections: ConnectionManager,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

impl AppState {
    pub fn new(config: GameConfig) -> Self {
        Self {
            games: GameRegistry::new(&config),
            connections: ConnectionManager::new(),
            config,
        }
    }

    /// Apply one client event.
    pub fn apply(&mut self, connection: ConnectionId, event: ClientEvent) -> Vec<Outbound> {
        let name = event.name();
        match self.dispatch(connection, event) {
            Ok(outbound) => outbound,
            Err(err) => self.reject(connection, name, err),
        }
    }

    fn dispatch(
        &mut self,
        connection: ConnectionId,
        event: ClientEvent,
    ) -> Result<Vec<Outbound>, GameError> {
        match event {
            ClientEvent::CreateGame { player_name } => self.create_game(connection, &player_name),
            ClientEvent::JoinGame {
                game_code,
                player_name,
            } => self.join_game(connection, &game_code, &player_name),
            ClientEvent::ReconnectGame {
                game_code,
                player_name,
            } => self.reconnect_game(connection, &game_code, &player_name),
            ClientEvent::SetWord { game_code, word } => {
                let (code, ()) = self.act(connection, &game_code, |game, actor| {
                    game.set_word(actor, &word)
                })?;
                info!(game = %code, "Word set");
                Ok(self.broadcast(&code))
            }
            ClientEvent::MakeGuess { game_code, letter } => {
                let (code, outcome) = self.act(connection, &game_code, |game, actor| {
                    game.guess(actor, &letter)
                })?;
                match outcome {
                    GuessOutcome::Solved => info!(game = %code, "Word guessed, round over"),
                    GuessOutcome::Hanged => info!(game = %code, "Mistake budget spent, round over"),
                    GuessOutcome::Hit | GuessOutcome::Miss => {
                        debug!(game = %code, ?outcome, "Guess applied")
                    }
                }
                Ok(self.broadcast(&code))
            }
            ClientEvent::StartNextRound { game_code } => {
                let (code, ()) =
                    self.act(connection, &game_code, |game, actor| game.start_next_round(actor))?;
                info!(game = %code, "Next round started");
                Ok(self.broadcast(&code))
            }
            ClientEvent::StopGame { game_code } => self.stop_game(connection, &game_code),
            ClientEvent::LeaveGame {
                game_code,
                player_name,
            } => self.leave_game(connection, &game_code, &player_name),
        }
    }

    /// Turn a failed event into the reply the caller is owed, if any.
    fn reject(&self, connection: ConnectionId, event: &str, err: GameError) -> Vec<Outbound> {
        let reply = match &err {
            GameError::NotFound(_) => Some(ServerEvent::GameNotFound),
            GameError::ReconnectFailed(_) => Some(ServerEvent::ReconnectFailed),
            GameError::NameTaken(_) => Some(ServerEvent::NameTaken),
            _ => None,
        };
        debug!(%connection, event, error = %err, "Event rejected");
        reply
            .map(|event| vec![Outbound::new(connection, event)])
            .unwrap_or_default()
    }

    /// Resolve the caller's seat in `game_code` and run `action` on the session.
    fn act<T>(
        &mut self,
        connection: ConnectionId,
        game_code: &str,
        action: impl FnOnce(&mut GameSession, &str) -> Result<T, GameError>,
    ) -> Result<(String, T), GameError> {
        let game = self
            .games
            .get_mut(game_code)
            .ok_or_else(|| GameError::NotFound(game_code.to_string()))?;
        let binding = self
            .connections
            .get(connection)
            .filter(|b| b.is_for_game(&game.code))
            .ok_or(GameError::NotBound)?;

        let result = action(game, &binding.player_name)?;
        Ok((game.code.clone(), result))
    }

    /// One tailored snapshot per connection bound to the game.
    fn broadcast(&self, code: &str) -> Vec<Outbound> {
        let Some(game) = self.games.get(code) else {
            return Vec::new();
        };

        self.connections
            .channel(&game.code)
            .into_iter()
            .filter_map(|conn| {
                let binding = self.connections.get(conn)?;
                let snapshot = game.to_json(Some(&binding.player_name));
                Some(Outbound::new(conn, ServerEvent::GameUpdate(snapshot)))
            })
            .collect()
    }

    fn create_game(
        &mut self,
        connection: ConnectionId,
        player_name: &str,
    ) -> Result<Vec<Outbound>, GameError> {
        let player_name = normalize_name(player_name);
        if player_name.is_empty() {
            return Err(GameError::InvalidInput("player name must not be empty"));
        }

        let mut outbound = self.disconnect(connection);

        let code = self.games.create(player_name, connection).code.clone();
        self.connections.bind(ConnectionBinding::new(
            connection,
            code.clone(),
            player_name.to_string(),
        ));
        info!(game = %code, player = %player_name, "Game created");

        outbound.push(Outbound::new(
            connection,
            ServerEvent::GameCreated {
                game_code: code.clone(),
            },
        ));
        outbound.extend(self.broadcast(&code));
        Ok(outbound)
    }

    fn join_game(
        &mut self,
        connection: ConnectionId,
        game_code: &str,
        player_name: &str,
    ) -> Result<Vec<Outbound>, GameError> {
        let player_name = normalize_name(player_name);
        if player_name.is_empty() {
            return Err(GameError::InvalidInput("player name must not be empty"));
        }

        // Validate before touching the caller's current binding.
        let game = self
            .games
            .get(game_code)
            .ok_or_else(|| GameError::NotFound(game_code.to_string()))?;
        if game.phase().is_terminal() {
            return Err(GameError::InvalidPhase(game.phase()));
        }
        if game
            .player(player_name)
            .is_some_and(|p| p.connected && !p.is_bound_to(connection))
        {
            return Err(GameError::NameTaken(player_name.to_string()));
        }

        let mut outbound = self.disconnect(connection);

        let game = self
            .games
            .get_mut(game_code)
            .ok_or_else(|| GameError::NotFound(game_code.to_string()))?;
        let outcome = game.join(player_name, connection)?;
        let code = game.code.clone();

        self.connections.bind(ConnectionBinding::new(
            connection,
            code.clone(),
            player_name.to_string(),
        ));
        info!(game = %code, player = %player_name, ?outcome, "Player joined");

        outbound.extend(self.broadcast(&code));
        Ok(outbound)
    }

    fn reconnect_game(
        &mut self,
        connection: ConnectionId,
        game_code: &str,
        player_name: &str,
    ) -> Result<Vec<Outbound>, GameError> {
        let player_name = normalize_name(player_name);
        let known = self
            .games
            .get(game_code)
            .is_some_and(|game| game.player(player_name).is_some());
        if !known {
            return Err(GameError::ReconnectFailed(player_name.to_string()));
        }

        let mut outbound = self.disconnect(connection);

        let game = self
            .games
            .get_mut(game_code)
            .ok_or_else(|| GameError::ReconnectFailed(player_name.to_string()))?;
        let replaced = game.reconnect(player_name, connection)?;
        let code = game.code.clone();

        if let Some(stale) = replaced {
            self.connections.unbind(stale);
        }
        self.connections.bind(ConnectionBinding::new(
            connection,
            code.clone(),
            player_name.to_string(),
        ));
        info!(game = %code, player = %player_name, %connection, "Player reconnected");

        outbound.extend(self.broadcast(&code));
        Ok(outbound)
    }

    fn stop_game(
        &mut self,
        connection: ConnectionId,
        game_code: &str,
    ) -> Result<Vec<Outbound>, GameError> {
        let (code, ()) = self.act(connection, game_code, |game, actor| game.stop(actor))?;

        // Final scores go out before the session is torn down.
        let outbound = self.broadcast(&code);
        self.games.remove(&code);
        self.connections.remove_channel(&code);
        info!(game = %code, "Game stopped");
        Ok(outbound)
    }

    fn leave_game(
        &mut self,
        connection: ConnectionId,
        game_code: &str,
        player_name: &str,
    ) -> Result<Vec<Outbound>, GameError> {
        let player_name = normalize_name(player_name);
        let (code, departure) = self.act(connection, game_code, |game, actor| {
            if actor != player_name {
                return Err(GameError::Unauthorized);
            }
            game.remove_player(actor)
        })?;

        self.connections.unbind(connection);
        info!(game = %code, player = %player_name, "Player left");

        match departure {
            Departure::Left => Ok(self.broadcast(&code)),
            Departure::Emptied => {
                self.games.remove(&code);
                self.connections.remove_channel(&code);
                info!(game = %code, "Last player left, game destroyed");
                Ok(Vec::new())
            }
        }
    }

    /// Handle a dropped connection.
    ///
    /// The seat is kept for a later reconnect; a turn-holder hands the turn
    /// off immediately.
    pub fn disconnect(&mut self, connection: ConnectionId) -> Vec<Outbound> {
        let Some(binding) = self.connections.unbind(connection) else {
            return Vec::new();
        };
        let Some(game) = self.games.get_mut(&binding.game_code) else {
            return Vec::new();
        };

        let holds_seat = game
            .player(&binding.player_name)
            .is_some_and(|p| p.is_bound_to(connection));
        if !holds_seat || game.disconnect(&binding.player_name).is_err() {
            return Vec::new();
        }

        info!(game = %binding.game_code, player = %binding.player_name, "Player disconnected");
        self.broadcast(&binding.game_code)
    }

    /// Evict sessions nobody has been connected to for the configured time.
    pub fn cleanup(&mut self, now: DateTime<Utc>) -> CleanupResult {
        let Some(secs) = self.config.abandoned_after_secs else {
            return CleanupResult::default();
        };
        let Ok(max_idle) = chrono::Duration::from_std(std::time::Duration::from_secs(secs)) else {
            return CleanupResult::default();
        };

        let abandoned_games = self.games.cleanup_abandoned(now, max_idle);
        let released_connections = abandoned_games
            .iter()
            .flat_map(|code| self.connections.remove_channel(code))
            .map(|binding| binding.connection)
            .collect();

        for code in &abandoned_games {
            info!(game = %code, "Abandoned game evicted");
        }

        CleanupResult {
            abandoned_games,
            released_connections,
        }
    }
}

/// Result of cleanup operation.
#[derive(Debug, Default)]
pub struct CleanupResult {
    pub abandoned_games: Vec<String>,
    pub released_connections: Vec<ConnectionId>,
}

impl CleanupResult {
    pub fn is_empty(&self) -> bool {
        self.abandoned_games.is_empty() && self.released_connections.is_empty()
    }
}
