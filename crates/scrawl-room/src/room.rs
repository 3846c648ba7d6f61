//! Room actor: one Tokio task per room that owns its [`Game`].
//!
//! The outside world talks to a room only through its [`RoomHandle`]. The
//! actor serializes every join, leave, action, and timer firing for the
//! room, so no two handlers ever see its state at the same time.

use std::collections::HashMap;
use std::sync::Arc;

use scrawl_protocol::{PlayerId, Recipient, RoomCode, RoomSnapshot, ServerEvent};
use tokio::sync::{mpsc, oneshot};

use crate::game::{Game, Outbox, Player};
use crate::{GameConfig, RoomError, WordPool};

/// Channel for delivering events to one player's connection.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// What the room reports back after a player leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    pub username: String,
    /// The room is now empty and its actor has stopped.
    pub now_empty: bool,
}

/// Game actions a member can send to their room.
#[derive(Debug, Clone)]
pub(crate) enum RoomAction {
    StartGame,
    SelectWord(String),
    Chat(String),
    AssignHost(PlayerId),
}

/// Commands sent to a room actor through its channel.
///
/// Variants with a `reply` are request/response: the caller waits on the
/// oneshot for the outcome.
pub(crate) enum RoomCommand {
    Join {
        player: Player,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<LeaveOutcome, RoomError>>,
    },
    Action {
        sender: PlayerId,
        action: RoomAction,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    /// Canvas frames are fire-and-forget.
    Drawing { sender: PlayerId, image_data: String },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone; the registry holds one per room and the gateway clones
/// it to talk to a room without holding the registry lock.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl std::fmt::Debug for RoomCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Join { .. } => "Join",
            Self::Leave { .. } => "Leave",
            Self::Action { .. } => "Action",
            Self::Drawing { .. } => "Drawing",
            Self::Snapshot { .. } => "Snapshot",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

impl RoomHandle {
    pub(crate) fn new(code: RoomCode, sender: mpsc::Sender<RoomCommand>) -> Self {
        Self { code, sender }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// `true` if both handles reach the same actor. A code can be reused
    /// after its room closes; the actor behind it cannot.
    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Adds a player. Their events flow through `sender` from now on,
    /// starting with `room-joined`.
    pub async fn join(&self, player: Player, sender: PlayerSender) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Join {
            player,
            sender,
            reply,
        })
        .await?
    }

    /// Removes a player.
    pub async fn leave(&self, player_id: PlayerId) -> Result<LeaveOutcome, RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await?
    }

    async fn act(&self, sender: PlayerId, action: RoomAction) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Action {
            sender,
            action,
            reply,
        })
        .await?
    }

    pub async fn start_game(&self, sender: PlayerId) -> Result<(), RoomError> {
        self.act(sender, RoomAction::StartGame).await
    }

    pub async fn select_word(&self, sender: PlayerId, word: String) -> Result<(), RoomError> {
        self.act(sender, RoomAction::SelectWord(word)).await
    }

    pub async fn chat(&self, sender: PlayerId, message: String) -> Result<(), RoomError> {
        self.act(sender, RoomAction::Chat(message)).await
    }

    pub async fn assign_host(&self, sender: PlayerId, new_host: PlayerId) -> Result<(), RoomError> {
        self.act(sender, RoomAction::AssignHost(new_host)).await
    }

    /// Forwards a canvas frame (fire-and-forget).
    pub async fn relay_drawing(&self, sender: PlayerId, image_data: String) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Drawing { sender, image_data })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Current lobby-level view of the room.
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { reply }).await
    }

    /// Tells the room to stop. Its timers die with it.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Shutdown)
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

/// The internal actor state. Runs inside a Tokio task.
struct RoomActor {
    game: Game,
    /// Per-player outbound channels, one per member.
    senders: HashMap<PlayerId, PlayerSender>,
    receiver: mpsc::Receiver<RoomCommand>,
}

enum Flow {
    Continue,
    Stop,
}

impl RoomActor {
    /// Serves commands and timer firings until shutdown or the room empties.
    async fn run(mut self) {
        tracing::info!(room = %self.game.code(), "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if let Flow::Stop = self.handle(cmd) {
                        break;
                    }
                }
                fired = self.game.next_timer() => {
                    tracing::trace!(
                        room = %self.game.code(),
                        kind = %fired.kind,
                        generation = fired.generation,
                        "timer fired"
                    );
                    let events = self.game.on_timer(fired);
                    self.dispatch(events);
                }
            }
        }

        tracing::info!(room = %self.game.code(), "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) -> Flow {
        match cmd {
            RoomCommand::Join {
                player,
                sender,
                reply,
            } => {
                let id = player.id;
                let result = self.game.add_player(player).map(|events| {
                    self.senders.insert(id, sender);
                    self.dispatch(events);
                });
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => match self.game.remove_player(player_id) {
                Ok(departure) => {
                    self.senders.remove(&player_id);
                    self.dispatch(departure.events);
                    let now_empty = departure.now_empty;
                    let _ = reply.send(Ok(LeaveOutcome {
                        username: departure.player.username,
                        now_empty,
                    }));
                    if now_empty {
                        tracing::info!(room = %self.game.code(), "room empty");
                        return Flow::Stop;
                    }
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            RoomCommand::Action {
                sender,
                action,
                reply,
            } => {
                let result = self.apply(sender, action).map(|events| self.dispatch(events));
                if let Err(e) = &result {
                    tracing::debug!(room = %self.game.code(), %sender, error = %e, "action rejected");
                }
                let _ = reply.send(result);
            }
            RoomCommand::Drawing { sender, image_data } => {
                let events = self.game.relay_drawing(sender, image_data);
                self.dispatch(events);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.game.snapshot());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room = %self.game.code(), "room shutting down");
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn apply(&mut self, sender: PlayerId, action: RoomAction) -> Result<Outbox, RoomError> {
        match action {
            RoomAction::StartGame => self.game.start_game(sender),
            RoomAction::SelectWord(word) => self.game.select_word(sender, &word),
            RoomAction::Chat(message) => self.game.submit_chat(sender, &message),
            RoomAction::AssignHost(new_host) => self.game.assign_host(sender, new_host),
        }
    }

    /// Delivers events to the right members, in order.
    fn dispatch(&self, events: Outbox) {
        for (recipient, event) in events {
            match recipient {
                Recipient::All => {
                    for sender in self.senders.values() {
                        let _ = sender.send(event.clone());
                    }
                }
                Recipient::Player(pid) => self.send_to(pid, event),
                Recipient::AllExcept(excluded) => {
                    for (pid, sender) in &self.senders {
                        if *pid != excluded {
                            let _ = sender.send(event.clone());
                        }
                    }
                }
            }
        }
    }

    /// Sends to one member. Dropped silently if their connection is gone.
    fn send_to(&self, player_id: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(event);
        }
    }
}

/// Opens a room with `host` in it and spawns its actor.
///
/// The host receives `room-created` and the first `room-state` through
/// `host_sender` before this returns.
pub(crate) fn spawn_room(
    code: RoomCode,
    host: Player,
    host_sender: PlayerSender,
    config: GameConfig,
    words: Arc<WordPool>,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let host_id = host.id;
    let (game, events) = Game::open(code.clone(), host, config, words);

    let actor = RoomActor {
        game,
        senders: HashMap::from([(host_id, host_sender)]),
        receiver: rx,
    };
    actor.dispatch(events);

    tokio::spawn(actor.run());

    RoomHandle::new(code, tx)
}
