//! Event loop.
//!
//! All game state lives on one task. Transports push [`Inbound`] messages
//! into its inbox; each one is applied to completion before the next is
//! read, so no event ever observes another half-applied.
//!
//! When abandonment eviction is enabled the loop also sweeps the registry
//! every `cleanup_interval_secs`.
//!
//! ```text
//!  socket tasks ──Inbound──▶ mpsc inbox ──▶ run() ──▶ AppState::apply
//!                                              │
//!                                              ▼
//!  socket tasks ◀──String── per-connection ◀── Gateway::deliver
//! ```

use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info};

use super::broadcast::{ConnectionSender, Gateway};
use super::player::ConnectionId;
use super::protocol::ClientEvent;
use super::AppState;
use crate::config::GameConfig;

/// Messages from transports to the event loop.
#[derive(Debug)]
pub enum Inbound {
    /// A connection opened; `sender` is its outbound queue
    Connected {
        connection: ConnectionId,
        sender: ConnectionSender,
    },
    /// Raw JSON text received on a connection
    Message {
        connection: ConnectionId,
        text: String,
    },
    /// An already decoded event
    Event {
        connection: ConnectionId,
        event: ClientEvent,
    },
    /// The connection closed
    Disconnected { connection: ConnectionId },
    /// Evict abandoned sessions now
    Cleanup,
}

/// Handle for feeding the event loop.
pub type Inbox = mpsc::UnboundedSender<Inbound>;

/// Start the event loop on its own task.
///
/// The task ends once every [`Inbox`] clone is dropped and hands the final
/// state back.
pub fn spawn(state: AppState) -> (Inbox, JoinHandle<AppState>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run(state, rx, Gateway::new()));
    (tx, handle)
}

/// Process inbound messages until the inbox closes.
pub async fn run(
    mut state: AppState,
    mut inbox: mpsc::UnboundedReceiver<Inbound>,
    mut gateway: Gateway,
) -> AppState {
    info!("Game event loop started");
    let mut sweep = cleanup_timer(&state.config);

    loop {
        tokio::select! {
            message = inbox.recv() => match message {
                Some(message) => handle(&mut state, &mut gateway, message),
                None => break,
            },
            _ = next_sweep(&mut sweep) => handle(&mut state, &mut gateway, Inbound::Cleanup),
        }
    }

    info!(games = state.games.count(), "Game event loop stopped");
    state
}

/// Sweep timer, or `None` when eviction is disabled.
fn cleanup_timer(config: &GameConfig) -> Option<Interval> {
    if config.abandoned_after_secs.is_none() {
        return None;
    }
    let period = Duration::from_secs(config.cleanup_interval_secs.max(1));
    let mut timer = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(timer)
}

async fn next_sweep(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn handle(state: &mut AppState, gateway: &mut Gateway, message: Inbound) {
    match message {
        Inbound::Connected { connection, sender } => {
            debug!(%connection, "Connection opened");
            gateway.register(connection, sender);
        }
        Inbound::Message { connection, text } => match ClientEvent::from_json(&text) {
            Ok(event) => {
                gateway.deliver(state.apply(connection, event));
            }
            Err(err) => {
                debug!(%connection, error = %err, "Ignoring malformed message");
            }
        },
        Inbound::Event { connection, event } => {
            gateway.deliver(state.apply(connection, event));
        }
        Inbound::Disconnected { connection } => {
            debug!(%connection, "Connection closed");
            gateway.unregister(connection);
            gateway.deliver(state.disconnect(connection));
        }
        Inbound::Cleanup => {
            let result = state.cleanup(Utc::now());
            if !result.is_empty() {
                info!(
                    games = result.abandoned_games.len(),
                    connections = result.released_connections.len(),
                    "Cleanup evicted abandoned games"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::protocol::ServerEvent;
    use crate::test_support::init_logging;

    fn connect(inbox: &Inbox, id: u64) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        inbox
            .send(Inbound::Connected {
                connection: ConnectionId(id),
                sender: tx,
            })
            .unwrap();
        rx
    }

    fn send(inbox: &Inbox, id: u64, text: &str) {
        inbox
            .send(Inbound::Message {
                connection: ConnectionId(id),
                text: text.to_string(),
            })
            .unwrap();
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<String>) -> serde_json::Value {
        let text = rx.recv().await.expect("queue closed");
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_create_and_join_over_queues() {
        init_logging();
        let (inbox, handle) = spawn(AppState::default());
        let mut alice = connect(&inbox, 1);
        let mut bob = connect(&inbox, 2);

        send(&inbox, 1, r#"{"event":"createGame","data":{"playerName":"Alice"}}"#);
        let created = next_event(&mut alice).await;
        assert_eq!(created["event"], "gameCreated");
        let code = created["data"]["gameCode"].as_str().unwrap().to_string();

        let update = next_event(&mut alice).await;
        assert_eq!(update["event"], "gameUpdate");
        assert_eq!(update["data"]["players"][0]["name"], "Alice");

        send(
            &inbox,
            2,
            &format!(r#"{{"event":"joinGame","data":{{"gameCode":"{}","playerName":"Bob"}}}}"#, code),
        );
        let for_alice = next_event(&mut alice).await;
        let for_bob = next_event(&mut bob).await;
        assert_eq!(for_alice["data"]["viewer"]["name"], "Alice");
        assert_eq!(for_bob["data"]["viewer"]["name"], "Bob");
        assert_eq!(for_bob["data"]["players"][1]["name"], "Bob");

        drop(inbox);
        let state = handle.await.unwrap();
        assert_eq!(state.games.count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_message_ignored() {
        let (inbox, handle) = spawn(AppState::default());
        let mut alice = connect(&inbox, 1);

        send(&inbox, 1, "not json");
        send(&inbox, 1, r#"{"event":"joinGame","data":{"gameCode":"nope1","playerName":"Alice"}}"#);

        let reply = next_event(&mut alice).await;
        assert_eq!(reply, serde_json::json!({"event": "gameNotFound"}));

        drop(inbox);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_broadcasts_to_others() {
        let (inbox, handle) = spawn(AppState::default());
        let mut alice = connect(&inbox, 1);
        let _bob = connect(&inbox, 2);

        inbox
            .send(Inbound::Event {
                connection: ConnectionId(1),
                event: ClientEvent::CreateGame {
                    player_name: "Alice".to_string(),
                },
            })
            .unwrap();
        let created = next_event(&mut alice).await;
        let code = created["data"]["gameCode"].as_str().unwrap().to_string();
        next_event(&mut alice).await;

        inbox
            .send(Inbound::Event {
                connection: ConnectionId(2),
                event: ClientEvent::JoinGame {
                    game_code: code,
                    player_name: "Bob".to_string(),
                },
            })
            .unwrap();
        next_event(&mut alice).await;

        inbox
            .send(Inbound::Disconnected {
                connection: ConnectionId(2),
            })
            .unwrap();
        let update = next_event(&mut alice).await;
        assert_eq!(update["data"]["players"][1]["connected"], false);

        drop(inbox);
        let state = handle.await.unwrap();
        assert!(!state.connections.is_bound(ConnectionId(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_evicts_abandoned_games() {
        let config = GameConfig {
            abandoned_after_secs: Some(0),
            cleanup_interval_secs: 30,
            ..GameConfig::default()
        };
        let (inbox, handle) = spawn(AppState::new(config));

        inbox
            .send(Inbound::Event {
                connection: ConnectionId(1),
                event: ClientEvent::CreateGame {
                    player_name: "Alice".to_string(),
                },
            })
            .unwrap();
        inbox
            .send(Inbound::Disconnected {
                connection: ConnectionId(1),
            })
            .unwrap();

        tokio::time::sleep(Duration::from_secs(45)).await;

        drop(inbox);
        let state = handle.await.unwrap();
        assert_eq!(state.games.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sweep_when_eviction_disabled() {
        let config = GameConfig {
            abandoned_after_secs: None,
            cleanup_interval_secs: 1,
            ..GameConfig::default()
        };
        assert!(cleanup_timer(&config).is_none());

        let (inbox, handle) = spawn(AppState::new(config));
        inbox
            .send(Inbound::Event {
                connection: ConnectionId(1),
                event: ClientEvent::CreateGame {
                    player_name: "Alice".to_string(),
                },
            })
            .unwrap();
        inbox
            .send(Inbound::Disconnected {
                connection: ConnectionId(1),
            })
            .unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;

        drop(inbox);
        let state = handle.await.unwrap();
        assert_eq!(state.games.count(), 1);
    }

    #[test]
    fn test_handle_directly() {
        let mut state = AppState::default();
        let mut gateway = Gateway::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle(
            &mut state,
            &mut gateway,
            Inbound::Connected {
                connection: ConnectionId(7),
                sender: tx,
            },
        );
        handle(
            &mut state,
            &mut gateway,
            Inbound::Event {
                connection: ConnectionId(7),
                event: ClientEvent::ReconnectGame {
                    game_code: "abcde".to_string(),
                    player_name: "Ghost".to_string(),
                },
            },
        );
        handle(&mut state, &mut gateway, Inbound::Cleanup);

        let reply: ServerEvent = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(reply, ServerEvent::ReconnectFailed);
        assert!(rx.try_recv().is_err());
    }
}
