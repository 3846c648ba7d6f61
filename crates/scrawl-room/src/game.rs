//! The turn-based game state machine for one room.
//!
//! [`Game`] is plain synchronous state. Every operation returns the events
//! it produced as `(Recipient, ServerEvent)` pairs and leaves delivery to
//! the room actor, so the whole game can be driven from unit tests without
//! sockets or tasks.
//!
//! Timers live in the game's [`TurnScheduler`]. Arming and cancelling
//! happen here, next to the phase changes they belong to; the actor only
//! awaits [`Game::next_timer`] and feeds the result back through
//! [`Game::on_timer`].

use std::sync::Arc;

use scrawl_protocol::{
    ChatMessage, PlayerId, PlayerView, Recipient, RoomCode, RoomSnapshot, ServerEvent,
};
use scrawl_scheduler::{TimerFired, TimerKind, TurnScheduler};
use tracing::{debug, info, warn};

use crate::ids::generate_message_id;
use crate::{GameConfig, GamePhase, RoomError, WordPool};

/// Events produced by one operation, in send order.
pub type Outbox = Vec<(Recipient, ServerEvent)>;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A room member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub username: String,
    pub score: u32,
    pub is_drawing: bool,
    pub has_guessed_correctly: bool,
}

impl Player {
    pub fn new(id: PlayerId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            score: 0,
            is_drawing: false,
            has_guessed_correctly: false,
        }
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            id: self.id,
            username: self.username.clone(),
            score: self.score,
            is_drawing: self.is_drawing,
            has_guessed_correctly: self.has_guessed_correctly,
        }
    }
}

/// What [`Game::remove_player`] did.
#[derive(Debug)]
pub struct Departure {
    pub player: Player,
    pub events: Outbox,
    /// The room has no members left and should be torn down.
    pub now_empty: bool,
}

// ---------------------------------------------------------------------------
// Game
// ---------------------------------------------------------------------------

/// Everything a room knows: members, chat log, and the running game.
#[derive(Debug)]
pub struct Game {
    code: RoomCode,
    config: GameConfig,
    words: Arc<WordPool>,

    /// Join order. Drawer rotation walks this list.
    players: Vec<Player>,
    messages: Vec<ChatMessage>,
    host_id: PlayerId,

    phase: GamePhase,
    current_round: u32,
    /// Index into `players` of the current drawer. `None` outside a game,
    /// and briefly after the drawer at index 0 leaves (the next drawer is
    /// then whoever sits at index 0).
    drawer_index: Option<usize>,
    current_word: Option<String>,
    offered_words: Vec<String>,
    time_left: u32,

    timers: TurnScheduler,
}

impl Game {
    /// Opens a room with `host` as its only member.
    ///
    /// Returns the `room-created` reply for the host followed by the first
    /// `room-state` broadcast.
    pub fn open(
        code: RoomCode,
        host: Player,
        config: GameConfig,
        words: Arc<WordPool>,
    ) -> (Self, Outbox) {
        let host_id = host.id;
        let game = Self {
            code,
            time_left: config.drawing_secs,
            config,
            words,
            players: vec![host],
            messages: Vec::new(),
            host_id,
            phase: GamePhase::Lobby,
            current_round: 0,
            drawer_index: None,
            current_word: None,
            offered_words: Vec::new(),
            timers: TurnScheduler::new(),
        };
        info!(room = %game.code, host = %host_id, "room opened");

        let events = vec![
            (
                Recipient::Player(host_id),
                ServerEvent::RoomCreated {
                    room_id: game.code.clone(),
                    player_id: host_id,
                    host_id,
                },
            ),
            (Recipient::All, game.room_state()),
        ];
        (game, events)
    }

    // ---- Accessors ----

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// `true` from `start-game` until `game-over`.
    pub fn game_active(&self) -> bool {
        self.phase.is_active()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.player(id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn host_id(&self) -> PlayerId {
        self.host_id
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn current_word(&self) -> Option<&str> {
        self.current_word.as_deref()
    }

    /// Words offered to the drawer during [`GamePhase::Selecting`].
    pub fn offered_words(&self) -> &[String] {
        &self.offered_words
    }

    pub fn drawer(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_drawing)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn timers(&self) -> &TurnScheduler {
        &self.timers
    }

    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.code.clone(),
            players: self.player_views(),
            game_active: self.game_active(),
            current_round: self.current_round,
            total_rounds: self.config.total_rounds,
            host_id: self.host_id,
        }
    }

    fn room_state(&self) -> ServerEvent {
        ServerEvent::RoomState(self.snapshot())
    }

    fn player_views(&self) -> Vec<PlayerView> {
        self.players.iter().map(Player::view).collect()
    }

    fn index_of(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    fn require_member(&self, id: PlayerId) -> Result<usize, RoomError> {
        self.index_of(id)
            .ok_or_else(|| RoomError::NotInRoom(id, self.code.clone()))
    }

    // ---- Membership ----

    /// Adds a player. Rejected while a game is running.
    pub fn add_player(&mut self, player: Player) -> Result<Outbox, RoomError> {
        if !self.phase.is_joinable() {
            return Err(RoomError::GameAlreadyStarted(self.code.clone()));
        }
        if self.contains(player.id) {
            return Err(RoomError::InvalidAction(
                "You are already in this room".into(),
            ));
        }

        let id = player.id;
        let view = player.view();
        self.players.push(player);
        info!(room = %self.code, player = %id, players = self.players.len(), "player joined");

        Ok(vec![
            (
                Recipient::Player(id),
                ServerEvent::RoomJoined {
                    room_id: self.code.clone(),
                    players: self.player_views(),
                    player_id: id,
                    host_id: self.host_id,
                },
            ),
            (Recipient::AllExcept(id), ServerEvent::PlayerJoined { player: view }),
            (Recipient::All, self.room_state()),
        ])
    }

    /// Removes a player, handing off the host role and the drawer role as
    /// needed.
    ///
    /// When the last member leaves, no events are produced and every timer
    /// is cancelled; the caller tears the room down.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Departure, RoomError> {
        let index = self.require_member(id)?;
        let player = self.players.remove(index);
        info!(room = %self.code, player = %id, players = self.players.len(), "player left");

        if self.players.is_empty() {
            self.timers.cancel_all();
            return Ok(Departure {
                player,
                events: Vec::new(),
                now_empty: true,
            });
        }

        let mut events = vec![(
            Recipient::All,
            ServerEvent::PlayerLeft {
                player_id: id,
                username: player.username.clone(),
            },
        )];

        if self.host_id == id {
            self.host_id = self.players[0].id;
            info!(room = %self.code, host = %self.host_id, "host reassigned");
            events.push((
                Recipient::All,
                ServerEvent::HostChanged {
                    new_host_id: self.host_id,
                },
            ));
        }

        // Keep the drawer index pointing at the same seat.
        if let Some(drawer) = self.drawer_index {
            if index < drawer {
                self.drawer_index = Some(drawer - 1);
            } else if index == drawer {
                // The next drawer is whoever slid into the vacated seat.
                self.drawer_index = index.checked_sub(1);
            }
        }

        if self.phase.is_active() && player.is_drawing {
            info!(room = %self.code, player = %id, "drawer left, advancing turn");
            events.extend(self.advance_turn());
        } else if self.phase == GamePhase::Drawing
            && self.players.iter().any(|p| !p.is_drawing)
            && self.everyone_guessed()
        {
            events.extend(self.end_turn());
        }

        events.push((Recipient::All, self.room_state()));
        Ok(Departure {
            player,
            events,
            now_empty: false,
        })
    }

    /// Hands the host role to another member. Only the host may do this.
    pub fn assign_host(
        &mut self,
        requester: PlayerId,
        new_host: PlayerId,
    ) -> Result<Outbox, RoomError> {
        self.require_member(requester)?;
        if requester != self.host_id {
            return Err(RoomError::InvalidAction(
                "Only the host can assign a new host".into(),
            ));
        }
        if !self.contains(new_host) {
            return Err(RoomError::InvalidAction(
                "That player is not in this room".into(),
            ));
        }

        self.host_id = new_host;
        info!(room = %self.code, host = %new_host, "host assigned");
        Ok(vec![
            (Recipient::All, ServerEvent::HostChanged { new_host_id: new_host }),
            (Recipient::All, self.room_state()),
        ])
    }

    // ---- Turn flow ----

    /// Starts a game: round 1, first player in join order draws.
    ///
    /// Any member may start a game. Scores are reset; the chat log is kept.
    pub fn start_game(&mut self, requester: PlayerId) -> Result<Outbox, RoomError> {
        self.require_member(requester)?;
        if self.phase.is_active() {
            return Err(RoomError::GameAlreadyStarted(self.code.clone()));
        }

        self.timers.cancel_all();
        for player in &mut self.players {
            player.score = 0;
            player.is_drawing = false;
            player.has_guessed_correctly = false;
        }
        self.current_round = 1;
        self.drawer_index = Some(0);
        self.players[0].is_drawing = true;
        info!(
            room = %self.code,
            players = self.players.len(),
            rounds = self.config.total_rounds,
            "game started"
        );

        let mut events = vec![(
            Recipient::All,
            ServerEvent::GameStarted {
                current_round: self.current_round,
                total_rounds: self.config.total_rounds,
                current_drawer: self.players[0].username.clone(),
                players: self.player_views(),
            },
        )];
        events.extend(self.begin_selection());
        Ok(events)
    }

    /// The drawer picks one of the offered words.
    pub fn select_word(&mut self, sender: PlayerId, word: &str) -> Result<Outbox, RoomError> {
        self.require_member(sender)?;
        if self.phase != GamePhase::Selecting {
            return Err(RoomError::InvalidAction(
                "No word is being chosen right now".into(),
            ));
        }
        if self.drawer().map(|d| d.id) != Some(sender) {
            return Err(RoomError::InvalidAction(
                "Only the drawer can choose the word".into(),
            ));
        }

        let word = word.trim();
        let chosen = self
            .offered_words
            .iter()
            .find(|w| w.eq_ignore_ascii_case(word))
            .cloned()
            .ok_or_else(|| RoomError::InvalidAction("That word was not offered".into()))?;

        Ok(self.begin_drawing(chosen))
    }

    /// Relays a canvas frame from the drawer to everyone else.
    ///
    /// Frames from anyone but the current drawer are dropped.
    pub fn relay_drawing(&self, sender: PlayerId, image_data: String) -> Outbox {
        let is_drawer = self.phase.is_active() && self.drawer().is_some_and(|d| d.id == sender);
        if !is_drawer {
            debug!(room = %self.code, player = %sender, "dropping drawing from non-drawer");
            return Vec::new();
        }
        vec![(
            Recipient::AllExcept(sender),
            ServerEvent::DrawingUpdated { image_data },
        )]
    }

    /// Handles a chat line: either a correct guess or an ordinary message.
    ///
    /// During [`GamePhase::Drawing`] a line matching the word (trimmed,
    /// case-insensitive) is never broadcast. It scores for a guesser who has
    /// not guessed yet and is swallowed for everyone else.
    pub fn submit_chat(&mut self, sender: PlayerId, text: &str) -> Result<Outbox, RoomError> {
        let index = self.require_member(sender)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        if self.phase == GamePhase::Drawing && self.is_the_word(text) {
            let player = &self.players[index];
            if player.is_drawing || player.has_guessed_correctly {
                debug!(room = %self.code, player = %sender, "withholding repeat of the word");
                return Ok(Vec::new());
            }
            return Ok(self.score_guess(index));
        }

        let player = &self.players[index];
        let message = ChatMessage {
            id: generate_message_id(),
            player_id: player.id,
            username: player.username.clone(),
            message: text.to_string(),
            is_system: false,
        };
        self.messages.push(message.clone());
        Ok(vec![(Recipient::All, ServerEvent::NewMessage(message))])
    }

    fn is_the_word(&self, text: &str) -> bool {
        self.current_word
            .as_deref()
            .is_some_and(|word| text.trim().to_lowercase() == word.to_lowercase())
    }

    fn score_guess(&mut self, index: usize) -> Outbox {
        let points = self.time_left.saturating_mul(self.config.points_per_second);
        let player = &mut self.players[index];
        player.score = player.score.saturating_add(points);
        player.has_guessed_correctly = true;
        info!(
            room = %self.code,
            player = %player.id,
            points,
            total = player.score,
            "correct guess"
        );

        let word = self.current_word.clone().unwrap_or_default();
        let mut events = vec![
            (
                Recipient::All,
                ServerEvent::PlayerGuessed {
                    player_id: player.id,
                    username: player.username.clone(),
                    score: player.score,
                },
            ),
            (Recipient::Player(player.id), ServerEvent::CorrectGuess { word }),
        ];
        if self.everyone_guessed() {
            events.extend(self.end_turn());
        }
        events
    }

    fn everyone_guessed(&self) -> bool {
        self.players
            .iter()
            .all(|p| p.is_drawing || p.has_guessed_correctly)
    }

    // ---- Timers ----

    /// Waits for the next armed timer. Cancel-safe.
    pub async fn next_timer(&mut self) -> TimerFired {
        self.timers.next_fired().await
    }

    /// Applies a timer firing. Stale firings (the phase has moved on) are
    /// ignored.
    pub fn on_timer(&mut self, fired: TimerFired) -> Outbox {
        match fired.kind {
            TimerKind::WordSelection => self.on_selection_timeout(),
            TimerKind::Round => self.on_round_tick(),
            TimerKind::Intermission => self.on_intermission_elapsed(),
        }
    }

    /// The drawer did not pick in time; pick one of the offered words.
    pub fn on_selection_timeout(&mut self) -> Outbox {
        if self.phase != GamePhase::Selecting {
            debug!(room = %self.code, phase = %self.phase, "stale selection timeout");
            return Vec::new();
        }

        let word = WordPool::pick(&self.offered_words)
            .or_else(|| self.words.sample(1).pop());
        match word {
            Some(word) => {
                info!(room = %self.code, "drawer ran out of time, word picked automatically");
                self.begin_drawing(word)
            }
            None => {
                warn!(room = %self.code, "no words available, skipping turn");
                self.advance_turn()
            }
        }
    }

    /// One second of the drawing countdown.
    pub fn on_round_tick(&mut self) -> Outbox {
        if self.phase != GamePhase::Drawing {
            self.timers.cancel(TimerKind::Round);
            return Vec::new();
        }

        self.time_left = self.time_left.saturating_sub(1);
        let mut events = vec![(
            Recipient::All,
            ServerEvent::TimeUpdate {
                time_left: self.time_left,
            },
        )];
        if self.time_left == 0 {
            events.extend(self.end_turn());
        }
        events
    }

    /// The pause after a turn is over; move on to the next drawer.
    pub fn on_intermission_elapsed(&mut self) -> Outbox {
        if self.phase != GamePhase::TurnEnded {
            debug!(room = %self.code, phase = %self.phase, "stale intermission");
            return Vec::new();
        }
        self.advance_turn()
    }

    // ---- Transitions ----

    fn begin_selection(&mut self) -> Outbox {
        self.phase = GamePhase::Selecting;
        self.current_word = None;
        self.time_left = self.config.drawing_secs;
        self.offered_words = self.words.sample(self.config.word_choices);
        self.timers
            .arm_once(TimerKind::WordSelection, self.config.selection_timeout());

        match self.drawer() {
            Some(drawer) => vec![(
                Recipient::Player(drawer.id),
                ServerEvent::SelectWord {
                    words: self.offered_words.clone(),
                },
            )],
            None => Vec::new(),
        }
    }

    fn begin_drawing(&mut self, word: String) -> Outbox {
        self.timers.cancel(TimerKind::WordSelection);
        let Some(drawer) = self.drawer().map(|d| d.id) else {
            warn!(room = %self.code, "no drawer when drawing should begin");
            return Vec::new();
        };

        self.phase = GamePhase::Drawing;
        self.time_left = self.config.drawing_secs;
        self.offered_words.clear();
        for player in &mut self.players {
            if !player.is_drawing {
                player.has_guessed_correctly = false;
            }
        }
        let word_length = word.chars().count();
        self.current_word = Some(word.clone());
        self.timers
            .arm_periodic(TimerKind::Round, self.config.round_tick());
        info!(room = %self.code, drawer = %drawer, word_length, "drawing started");

        vec![
            (
                Recipient::AllExcept(drawer),
                ServerEvent::DrawingStarted {
                    drawer,
                    word_length,
                    time_left: self.time_left,
                },
            ),
            (Recipient::Player(drawer), ServerEvent::YourTurn { word }),
        ]
    }

    fn end_turn(&mut self) -> Outbox {
        self.timers.cancel(TimerKind::Round);
        self.phase = GamePhase::TurnEnded;
        self.timers
            .arm_once(TimerKind::Intermission, self.config.intermission());

        let word = self.current_word.clone().unwrap_or_default();
        info!(room = %self.code, round = self.current_round, "turn ended");
        vec![(Recipient::All, ServerEvent::TurnEnded { word })]
    }

    /// Moves the drawer role to the next player, wrapping into a new round
    /// or finishing the game after the last round.
    pub fn advance_turn(&mut self) -> Outbox {
        self.timers.cancel(TimerKind::WordSelection);
        self.timers.cancel(TimerKind::Round);
        self.timers.cancel(TimerKind::Intermission);

        for player in &mut self.players {
            player.is_drawing = false;
        }
        if self.players.is_empty() {
            return Vec::new();
        }

        let mut next = self.drawer_index.map_or(0, |i| i + 1);
        if next >= self.players.len() {
            next = 0;
            self.current_round += 1;
        }

        if self.current_round > self.config.total_rounds {
            return self.finish_game();
        }

        self.drawer_index = Some(next);
        for player in &mut self.players {
            player.has_guessed_correctly = false;
        }
        self.players[next].is_drawing = true;
        info!(
            room = %self.code,
            round = self.current_round,
            drawer = %self.players[next].id,
            "next turn"
        );

        let mut events = vec![(
            Recipient::All,
            ServerEvent::NextTurn {
                current_round: self.current_round,
                total_rounds: self.config.total_rounds,
                current_drawer: self.players[next].username.clone(),
            },
        )];
        events.extend(self.begin_selection());
        events
    }

    fn finish_game(&mut self) -> Outbox {
        self.timers.cancel_all();
        self.phase = GamePhase::GameOver;
        self.drawer_index = None;
        self.current_word = None;
        self.offered_words.clear();

        let mut standings = self.player_views();
        // Stable: equal scores keep join order.
        standings.sort_by(|a, b| b.score.cmp(&a.score));
        info!(
            room = %self.code,
            winner = standings.first().map(|p| p.username.as_str()).unwrap_or_default(),
            "game over"
        );
        vec![(Recipient::All, ServerEvent::GameOver { players: standings })]
    }
}

// =========================================================================
// Tests
// =========================================================================
