//! Game session state.
//!
//! A [`GameSession`] owns one game's roster, secret word, guesses and role
//! pointers, and is the only place they are mutated.
//!
//! # Phases
//!
//! ```text
//! ┌──────────────┐  set_word   ┌──────────┐  revealed / budget spent  ┌───────────┐
//! │ AwaitingWord │────────────▶│ Guessing │──────────────────────────▶│ RoundOver │
//! └──────────────┘             └──────────┘                           └─────┬─────┘
//!        ▲                                                                  │
//!        └──────────────────────── start_next_round ◀───────────────────────┘
//!
//!  any non-terminal phase ──stop──▶ Finished
//! ```
//!
//! Every mutating method validates fully before its first write, so a
//! rejected call leaves the session exactly as it was.

use std::fmt;

use chrono::{DateTime, Utc};

use super::player::{ConnectionId, Player};
use super::turn::{first_guesser, index_after_removal, next_turn};

/// Placeholder for unrevealed letters in the masked word.
pub const PLACEHOLDER: char = '_';

/// Game state machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for the word-setter to pick a word
    #[default]
    AwaitingWord,
    /// Word set, guessers take turns
    Guessing,
    /// Word revealed or mistake budget spent
    RoundOver,
    /// Stopped by the creator
    Finished,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingWord => "awaitingWord",
            Self::Guessing => "guessing",
            Self::RoundOver => "roundOver",
            Self::Finished => "finished",
        }
    }

    /// Check if game is terminal (cannot change).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who took the point for a finished round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundWinner {
    Guessers,
    WordSetter,
}

impl RoundWinner {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Guessers => "guessers",
            Self::WordSetter => "wordSetter",
        }
    }
}

/// Result of an accepted guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessOutcome {
    /// Letter is in the word, round continues
    Hit,
    /// Letter is not in the word, round continues
    Miss,
    /// Last hidden letter found
    Solved,
    /// Mistake budget spent
    Hanged,
}

/// Result of a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// A new seat was appended to the roster
    Joined,
    /// The name belonged to a disconnected seat, which was taken back
    Rejoined,
}

/// Result of removing a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Others remain in the game
    Left,
    /// The roster is now empty and the session must be destroyed
    Emptied,
}

/// Game session state.
#[derive(Debug, Clone)]
pub struct GameSession {
    /// Public game code
    pub code: String,

    /// Seats in turn order
    roster: Vec<Player>,

    /// Seat holding stop/next-round authority
    creator: usize,

    /// Seat supplying this round's word
    word_setter: usize,

    /// Seat allowed to guess next
    current_turn: Option<usize>,

    secret_word: Option<String>,

    correct_letters: Vec<char>,

    incorrect_letters: Vec<char>,

    /// Current round (1-indexed)
    pub round: u32,

    phase: Phase,

    round_winner: Option<RoundWinner>,

    /// Wrong letters allowed before the word-setter wins
    pub max_incorrect_guesses: usize,

    /// When the game was created
    pub created_at: DateTime<Utc>,

    /// Last accepted mutation
    pub last_activity: DateTime<Utc>,
}

impl GameSession {
    /// Create a new game with its creator as the only player and word-setter.
    pub fn new(
        code: String,
        creator_name: impl Into<String>,
        connection: ConnectionId,
        max_incorrect_guesses: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            code,
            roster: vec![Player::new(creator_name, connection)],
            creator: 0,
            word_setter: 0,
            current_turn: None,
            secret_word: None,
            correct_letters: Vec::new(),
            incorrect_letters: Vec::new(),
            round: 1,
            phase: Phase::AwaitingWord,
            round_winner: None,
            max_incorrect_guesses,
            created_at: now,
            last_activity: now,
        }
    }

    // Accessors

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn roster(&self) -> &[Player] {
        &self.roster
    }

    pub fn creator_index(&self) -> usize {
        self.creator
    }

    pub fn word_setter_index(&self) -> usize {
        self.word_setter
    }

    pub fn current_turn_index(&self) -> Option<usize> {
        self.current_turn
    }

    pub fn secret_word(&self) -> Option<&str> {
        self.secret_word.as_deref()
    }

    pub fn correct_letters(&self) -> &[char] {
        &self.correct_letters
    }

    pub fn incorrect_letters(&self) -> &[char] {
        &self.incorrect_letters
    }

    pub fn round_winner(&self) -> Option<RoundWinner> {
        self.round_winner
    }

    /// Get a player by name.
    pub fn player(&self, name: &str) -> Option<&Player> {
        self.roster.iter().find(|p| p.name == name)
    }

    /// Roster position of a player.
    pub fn player_index(&self, name: &str) -> Option<usize> {
        self.roster.iter().position(|p| p.name == name)
    }

    pub fn player_count(&self) -> usize {
        self.roster.len()
    }

    pub fn connected_count(&self) -> usize {
        self.roster.iter().filter(|p| p.connected).count()
    }

    pub fn is_creator(&self, name: &str) -> bool {
        self.player_index(name) == Some(self.creator)
    }

    pub fn is_word_setter(&self, name: &str) -> bool {
        self.player_index(name) == Some(self.word_setter)
    }

    pub fn is_turn_holder(&self, name: &str) -> bool {
        self.current_turn.is_some() && self.player_index(name) == self.current_turn
    }

    /// Secret word with unrevealed letters replaced by [`PLACEHOLDER`],
    /// one space between characters. Empty while no word is set.
    pub fn masked_word(&self) -> String {
        let Some(word) = &self.secret_word else {
            return String::new();
        };

        let masked: Vec<String> = word
            .chars()
            .map(|c| {
                if !c.is_alphabetic() || self.correct_letters.contains(&c) {
                    c.to_string()
                } else {
                    PLACEHOLDER.to_string()
                }
            })
            .collect();
        masked.join(" ")
    }

    fn is_word_revealed(&self) -> bool {
        self.secret_word.as_ref().is_some_and(|word| {
            word.chars()
                .filter(|c| c.is_alphabetic())
                .all(|c| self.correct_letters.contains(&c))
        })
    }

    fn require_player(&self, name: &str) -> Result<usize, GameError> {
        self.player_index(name)
            .ok_or_else(|| GameError::UnknownPlayer(name.to_string()))
    }

    fn require_phase(&self, expected: Phase) -> Result<(), GameError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(GameError::InvalidPhase(self.phase))
        }
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    // Membership

    /// Add a player, or take back a disconnected seat with the same name.
    pub fn join(&mut self, name: &str, connection: ConnectionId) -> Result<JoinOutcome, GameError> {
        if self.phase.is_terminal() {
            return Err(GameError::InvalidPhase(self.phase));
        }
        if name.trim().is_empty() {
            return Err(GameError::InvalidInput("player name must not be empty"));
        }

        let outcome = match self.player_index(name) {
            Some(idx) if self.roster[idx].connected => {
                return Err(GameError::NameTaken(name.to_string()));
            }
            Some(idx) => {
                self.roster[idx].rebind(connection);
                JoinOutcome::Rejoined
            }
            None => {
                self.roster.push(Player::new(name, connection));
                JoinOutcome::Joined
            }
        };

        self.resume_stalled_turn();
        self.touch();
        Ok(outcome)
    }

    /// Attach a new connection to an existing seat.
    ///
    /// Returns the connection previously attached to the seat, if it differs,
    /// so the caller can drop its binding.
    pub fn reconnect(
        &mut self,
        name: &str,
        connection: ConnectionId,
    ) -> Result<Option<ConnectionId>, GameError> {
        let idx = self
            .player_index(name)
            .ok_or_else(|| GameError::ReconnectFailed(name.to_string()))?;

        let previous = self.roster[idx]
            .connection
            .filter(|&old| old != connection);
        self.roster[idx].rebind(connection);

        self.resume_stalled_turn();
        self.touch();
        Ok(previous)
    }

    /// Mark a seat disconnected. A turn-holder hands the turn off at once.
    pub fn disconnect(&mut self, name: &str) -> Result<(), GameError> {
        let idx = self.require_player(name)?;
        self.roster[idx].disconnect();

        if self.phase == Phase::Guessing && self.current_turn == Some(idx) {
            self.current_turn = Some(next_turn(&self.roster, idx, self.word_setter));
        }

        self.touch();
        Ok(())
    }

    /// Remove a seat entirely and repair every role pointer.
    pub fn remove_player(&mut self, name: &str) -> Result<Departure, GameError> {
        let removed = self.require_player(name)?;
        self.roster.remove(removed);

        let len = self.roster.len();
        if len == 0 {
            return Ok(Departure::Emptied);
        }

        let setter_left = removed == self.word_setter;
        self.creator = index_after_removal(self.creator, removed, len);
        self.word_setter = index_after_removal(self.word_setter, removed, len);
        self.current_turn = self
            .current_turn
            .map(|turn| index_after_removal(turn, removed, len));

        if setter_left && self.phase == Phase::Guessing {
            // Nobody left who may see the word; void the round.
            self.clear_round();
            self.phase = Phase::AwaitingWord;
        } else if setter_left && self.phase == Phase::RoundOver {
            // start_next_round advances one slot, which must land on the
            // departed setter's successor.
            self.word_setter = (removed + len - 1) % len;
        }
        self.revalidate_turn();

        self.touch();
        Ok(Departure::Left)
    }

    /// Re-establish the turn invariants after the roster changed.
    fn revalidate_turn(&mut self) {
        match self.phase {
            Phase::AwaitingWord => {
                self.current_turn = first_guesser(&self.roster, self.word_setter);
            }
            Phase::Guessing => {
                if self.roster.len() < 2 {
                    self.current_turn = None;
                    return;
                }
                match self.current_turn {
                    Some(turn) if turn == self.word_setter || !self.roster[turn].connected => {
                        let next = next_turn(&self.roster, turn, self.word_setter);
                        self.current_turn = if next == self.word_setter {
                            first_guesser(&self.roster, self.word_setter)
                        } else {
                            Some(next)
                        };
                    }
                    Some(_) => {}
                    None => self.current_turn = first_guesser(&self.roster, self.word_setter),
                }
            }
            Phase::RoundOver | Phase::Finished => {
                if self.roster.len() < 2 {
                    self.current_turn = None;
                }
            }
        }
    }

    /// Give a stalled round a turn-holder once someone is around to guess.
    fn resume_stalled_turn(&mut self) {
        match (self.phase, self.current_turn) {
            (Phase::AwaitingWord | Phase::Guessing, None) => {
                self.current_turn = first_guesser(&self.roster, self.word_setter);
            }
            (Phase::Guessing, Some(turn)) if !self.roster[turn].connected => {
                self.current_turn = Some(next_turn(&self.roster, turn, self.word_setter));
            }
            _ => {}
        }
    }

    // Round flow

    /// Store the secret word and hand the first turn out.
    pub fn set_word(&mut self, actor: &str, word: &str) -> Result<(), GameError> {
        let idx = self.require_player(actor)?;
        self.require_phase(Phase::AwaitingWord)?;
        if idx != self.word_setter {
            return Err(GameError::Unauthorized);
        }

        let word = word.trim().to_lowercase();
        if word.is_empty() {
            return Err(GameError::InvalidInput("word must not be empty"));
        }
        if !word.chars().any(char::is_alphabetic) {
            return Err(GameError::InvalidInput("word must contain a letter"));
        }

        self.secret_word = Some(word);
        self.phase = Phase::Guessing;
        self.current_turn = first_guesser(&self.roster, self.word_setter);
        self.touch();
        Ok(())
    }

    /// Apply the turn-holder's guess.
    pub fn guess(&mut self, actor: &str, letter: &str) -> Result<GuessOutcome, GameError> {
        let idx = self.require_player(actor)?;
        self.require_phase(Phase::Guessing)?;
        if self.current_turn != Some(idx) {
            return Err(GameError::Unauthorized);
        }

        let letter = parse_letter(letter)?;
        if self.correct_letters.contains(&letter) || self.incorrect_letters.contains(&letter) {
            return Err(GameError::InvalidInput("letter already guessed"));
        }
        let Some(word) = &self.secret_word else {
            return Err(GameError::InvalidPhase(self.phase));
        };

        let hit = word.contains(letter);
        if hit {
            self.correct_letters.push(letter);
        } else {
            self.incorrect_letters.push(letter);
        }

        let outcome = if self.is_word_revealed() {
            self.roster[idx].award_point();
            self.finish_round(RoundWinner::Guessers);
            GuessOutcome::Solved
        } else if self.incorrect_letters.len() >= self.max_incorrect_guesses {
            self.roster[self.word_setter].award_point();
            self.finish_round(RoundWinner::WordSetter);
            GuessOutcome::Hanged
        } else {
            self.current_turn = Some(next_turn(&self.roster, idx, self.word_setter));
            if hit {
                GuessOutcome::Hit
            } else {
                GuessOutcome::Miss
            }
        };

        self.touch();
        Ok(outcome)
    }

    fn finish_round(&mut self, winner: RoundWinner) {
        self.phase = Phase::RoundOver;
        self.round_winner = Some(winner);
    }

    fn clear_round(&mut self) {
        self.secret_word = None;
        self.correct_letters.clear();
        self.incorrect_letters.clear();
        self.round_winner = None;
    }

    /// Rotate the word-setter role and open the next round.
    pub fn start_next_round(&mut self, actor: &str) -> Result<(), GameError> {
        let idx = self.require_player(actor)?;
        self.require_phase(Phase::RoundOver)?;
        if idx != self.creator {
            return Err(GameError::Unauthorized);
        }

        self.clear_round();
        self.word_setter = (self.word_setter + 1) % self.roster.len();
        self.current_turn = first_guesser(&self.roster, self.word_setter);
        self.round += 1;
        self.phase = Phase::AwaitingWord;
        self.touch();
        Ok(())
    }

    /// End the game for good. Scores are frozen.
    pub fn stop(&mut self, actor: &str) -> Result<(), GameError> {
        let idx = self.require_player(actor)?;
        if self.phase.is_terminal() {
            return Err(GameError::InvalidPhase(self.phase));
        }
        if idx != self.creator {
            return Err(GameError::Unauthorized);
        }

        self.phase = Phase::Finished;
        self.touch();
        Ok(())
    }

    /// Nobody is connected and nothing has happened for `max_idle`.
    pub fn is_abandoned(&self, now: DateTime<Utc>, max_idle: chrono::Duration) -> bool {
        self.connected_count() == 0 && now - self.last_activity >= max_idle
    }

    /// Full-state snapshot as seen by `viewer`.
    ///
    /// The secret word is included only for the word-setter, or for everyone
    /// once the round is over.
    pub fn to_json(&self, viewer: Option<&str>) -> serde_json::Value {
        let players: Vec<serde_json::Value> = self.roster.iter().map(|p| p.to_json()).collect();

        let revealed = matches!(self.phase, Phase::RoundOver | Phase::Finished)
            || viewer.is_some_and(|name| self.is_word_setter(name));
        let secret_word = if revealed { self.secret_word.as_deref() } else { None };

        let viewer_json = viewer
            .filter(|name| self.player_index(name).is_some())
            .map(|name| {
                serde_json::json!({
                    "name": name,
                    "isCreator": self.is_creator(name),
                    "isWordSetter": self.is_word_setter(name),
                    "isMyTurn": self.phase == Phase::Guessing && self.is_turn_holder(name)
                })
            });

        serde_json::json!({
            "gameCode": self.code,
            "phase": self.phase.as_str(),
            "round": self.round,
            "players": players,
            "creatorIndex": self.creator,
            "wordSetterIndex": self.word_setter,
            "currentTurnIndex": self.current_turn,
            "maskedWord": self.masked_word(),
            "secretWord": secret_word,
            "correctLetters": self.correct_letters.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            "incorrectLetters": self.incorrect_letters.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            "maxIncorrectGuesses": self.max_incorrect_guesses,
            "roundWinner": self.round_winner.map(|w| w.as_str()),
            "viewer": viewer_json
        })
    }
}

/// Normalize a guess to a single lowercase letter.
fn parse_letter(raw: &str) -> Result<char, GameError> {
    let mut chars = raw.trim().chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return Err(GameError::InvalidInput("guess must be a single letter"));
    };
    if !c.is_alphabetic() {
        return Err(GameError::InvalidInput("guess must be a letter"));
    }

    let mut lower = c.to_lowercase();
    match (lower.next(), lower.next()) {
        (Some(l), None) => Ok(l),
        _ => Ok(c),
    }
}

/// Game errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("game {0} not found")]
    NotFound(String),

    #[error("no player named {0} in this game")]
    UnknownPlayer(String),

    #[error("player is not allowed to do this")]
    Unauthorized,

    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("not allowed while the game is in phase {0}")]
    InvalidPhase(Phase),

    #[error("name {0} is already used by a connected player")]
    NameTaken(String),

    #[error("cannot reconnect {0}")]
    ReconnectFailed(String),

    #[error("connection is not bound to this game")]
    NotBound,
}
