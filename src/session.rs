//! Game sessions.
//!
//! Each session is one tokio task that owns a [`Game`]. Player commands and
//! timer expiries arrive on the same mailbox and are applied one at a time,
//! so the game itself never needs locking. Events are published on a
//! broadcast channel after every command.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::board::{Board, Direction, Position};
use crate::config::GameConfig;
use crate::game::{ActionError, Envelope, Game, GameEvent, GamePhase};
use crate::player::PlayerId;
use crate::timer::{Scheduler, TimerToken};

const MAILBOX_CAPACITY: usize = 256;
const EVENT_CAPACITY: usize = 4096;

/// Errors seen by a session client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("session is closed")]
    Closed,

    #[error("no session with id {0}")]
    UnknownSession(u64),
}

/// An inbound player action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerAction {
    Leave,
    SelectStartingPoint(Position),
    BuyUpgrade(Option<String>),
    ChooseCard { card: String, register: usize },
    ChooseAdminRegister(usize),
    PlayQueuedCard(String),
    ResolveDamagePick(Vec<String>),
    ChooseRebootDirection(Direction),
}

/// Public view of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub figure: &'static str,
    pub energy: u32,
    pub checkpoints: u8,
    pub position: Option<Position>,
    pub facing: Option<Direction>,
}

/// Point-in-time view of a session's game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub phase: GamePhase,
    pub started: bool,
    pub round: u32,
    pub register: usize,
    pub current: Option<PlayerId>,
    pub winner: Option<PlayerId>,
    pub players: Vec<PlayerSummary>,
}

impl Snapshot {
    pub fn of(game: &Game) -> Self {
        let players = game
            .players()
            .iter()
            .map(|p| {
                let robot = game.board().robot(p.robot.id);
                PlayerSummary {
                    id: p.id,
                    name: p.name.clone(),
                    figure: p.robot.name,
                    energy: p.energy,
                    checkpoints: p.checkpoints,
                    position: robot.map(|r| r.position),
                    facing: robot.map(|r| r.facing),
                }
            })
            .collect();
        Snapshot {
            phase: game.phase(),
            started: game.is_started(),
            round: game.round(),
            register: game.register(),
            current: game.current_player(),
            winner: game.winner(),
            players,
        }
    }
}

enum SessionCommand {
    Join {
        name: String,
        reply: oneshot::Sender<Result<PlayerId, ActionError>>,
    },
    Start {
        reply: oneshot::Sender<Result<(), ActionError>>,
    },
    Act {
        player: PlayerId,
        action: PlayerAction,
        reply: oneshot::Sender<Result<(), ActionError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
    Timer(TimerToken),
    Shutdown,
}

/// Waits with tokio timers and posts expiries back to the session mailbox.
///
/// Holds only a weak sender, so a session whose handles are all gone shuts
/// down even with a timer pending.
pub struct TokioScheduler {
    mailbox: mpsc::WeakSender<SessionCommand>,
    pending: Option<(TimerToken, JoinHandle<()>)>,
}

impl Scheduler for TokioScheduler {
    fn schedule(&mut self, token: TimerToken, delay: Duration) {
        let mailbox = self.mailbox.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = mailbox.upgrade() {
                let _ = tx.send(SessionCommand::Timer(token)).await;
            }
        });
        if let Some((_, old)) = self.pending.replace((token, task)) {
            old.abort();
        }
    }

    fn cancel(&mut self, token: TimerToken) {
        if matches!(self.pending, Some((t, _)) if t == token) {
            if let Some((_, task)) = self.pending.take() {
                task.abort();
            }
        }
    }
}

/// One player's view of a session's events.
pub struct PlayerFeed {
    player: PlayerId,
    rx: broadcast::Receiver<Envelope>,
}

impl PlayerFeed {
    pub fn player(&self) -> PlayerId {
        self.player
    }

    /// Waits for the next event this player may see.
    pub async fn recv(&mut self) -> Result<GameEvent, broadcast::error::RecvError> {
        loop {
            let envelope = self.rx.recv().await?;
            if envelope.audience.includes(self.player) {
                return Ok(envelope.event);
            }
        }
    }
}

/// Cloneable client side of a session.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<Envelope>,
}

impl SessionHandle {
    /// Receives every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.events.subscribe()
    }

    /// Receives the events addressed to `player` from now on.
    pub fn subscribe_player(&self, player: PlayerId) -> PlayerFeed {
        PlayerFeed {
            player,
            rx: self.events.subscribe(),
        }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    pub async fn join(&self, name: &str) -> Result<PlayerId, SessionError> {
        let name = name.to_string();
        Ok(self.request(|reply| SessionCommand::Join { name, reply }).await??)
    }

    pub async fn start(&self) -> Result<(), SessionError> {
        Ok(self.request(|reply| SessionCommand::Start { reply }).await??)
    }

    pub async fn act(&self, player: PlayerId, action: PlayerAction) -> Result<(), SessionError> {
        Ok(self
            .request(|reply| SessionCommand::Act {
                player,
                action,
                reply,
            })
            .await??)
    }

    pub async fn snapshot(&self) -> Result<Snapshot, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// Stops the session task. Pending requests fail with `Closed`.
    pub async fn shutdown(&self) {
        let _ = self.tx.send(SessionCommand::Shutdown).await;
    }
}

/// The task side of a session.
pub struct Session {
    game: Game,
    rx: mpsc::Receiver<SessionCommand>,
    events: broadcast::Sender<Envelope>,
}

impl Session {
    /// Spawns a session for a new game on `board` with the base card effects.
    pub fn spawn(board: Board, config: GameConfig) -> SessionHandle {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let scheduler = TokioScheduler {
            mailbox: tx.downgrade(),
            pending: None,
        };
        let game = Game::with_standard_effects(board, config, Box::new(scheduler));
        let session = Session {
            game,
            rx,
            events: events.clone(),
        };
        tokio::spawn(session.run());
        SessionHandle { tx, events }
    }

    async fn run(mut self) {
        while let Some(cmd) = self.rx.recv().await {
            match cmd {
                SessionCommand::Join { name, reply } => {
                    let result = self.game.join(&name);
                    self.publish();
                    let _ = reply.send(result);
                }
                SessionCommand::Start { reply } => {
                    let result = self.game.start_game();
                    self.publish();
                    let _ = reply.send(result);
                }
                SessionCommand::Act {
                    player,
                    action,
                    reply,
                } => {
                    debug!(%player, ?action, "player action");
                    let result = self.apply(player, action);
                    if let Err(e) = &result {
                        debug!(%player, error = %e, "action rejected");
                    }
                    self.publish();
                    let _ = reply.send(result);
                }
                SessionCommand::Snapshot { reply } => {
                    let _ = reply.send(Snapshot::of(&self.game));
                }
                SessionCommand::Timer(token) => {
                    self.game.on_timer(token);
                    self.publish();
                }
                SessionCommand::Shutdown => break,
            }
        }
        info!(round = self.game.round(), winner = ?self.game.winner(), "session closed");
    }

    fn apply(&mut self, player: PlayerId, action: PlayerAction) -> Result<(), ActionError> {
        let game = &mut self.game;
        match action {
            PlayerAction::Leave => game.leave(player),
            PlayerAction::SelectStartingPoint(pos) => game.select_starting_point(player, pos),
            PlayerAction::BuyUpgrade(card) => game.buy_upgrade(player, card.as_deref()),
            PlayerAction::ChooseCard { card, register } => {
                game.choose_card_for_register(player, &card, register)
            }
            PlayerAction::ChooseAdminRegister(register) => {
                game.choose_admin_privilege_register(player, register)
            }
            PlayerAction::PlayQueuedCard(card) => game.play_queued_card(player, &card),
            PlayerAction::ResolveDamagePick(piles) => game.resolve_damage_pick(player, &piles),
            PlayerAction::ChooseRebootDirection(dir) => game.choose_reboot_direction(player, dir),
        }
    }

    fn publish(&mut self) {
        for envelope in self.game.drain_events() {
            // No subscribers is fine; events are fire-and-forget.
            let _ = self.events.send(envelope);
        }
    }
}

/// Identifies a session within a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

/// Owns the running sessions of a server.
#[derive(Default)]
pub struct SessionManager {
    sessions: HashMap<SessionId, SessionHandle>,
    next_id: u64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, board: Board, config: GameConfig) -> (SessionId, SessionHandle) {
        self.next_id += 1;
        let id = SessionId(self.next_id);
        let handle = Session::spawn(board, config);
        self.sessions.insert(id, handle.clone());
        info!(session = id.0, "session created");
        (id, handle)
    }

    pub fn get(&self, id: SessionId) -> Result<SessionHandle, SessionError> {
        self.sessions
            .get(&id)
            .cloned()
            .ok_or(SessionError::UnknownSession(id.0))
    }

    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Stops and forgets a session.
    pub async fn close(&mut self, id: SessionId) -> Result<(), SessionError> {
        let handle = self
            .sessions
            .remove(&id)
            .ok_or(SessionError::UnknownSession(id.0))?;
        handle.shutdown().await;
        Ok(())
    }
}
