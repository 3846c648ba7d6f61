//! Core protocol types for Scrawl's wire format.
//!
//! Every frame on the wire is a JSON object of the form
//! `{"event": "<kebab-case name>", "data": { ...camelCase fields... }}`.
//! Inbound frames decode into [`ClientAction`], outbound frames are encoded
//! from [`ServerEvent`].

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// One player exists per live connection, so the gateway derives this from
/// the connection id. `#[serde(transparent)]` makes `PlayerId(42)` travel as
/// a plain `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The short code that identifies a room, e.g. `"3FA9C1"`.
///
/// Codes are case-insensitive for humans typing them into a lobby form, so
/// every construction path (including deserialization) trims and
/// upper-cases the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Creates a normalized room code.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RoomCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive an event?
// ---------------------------------------------------------------------------

/// Specifies who inside a room should receive a server event.
///
/// The game state machine returns `(Recipient, ServerEvent)` pairs and the
/// room actor resolves them against its member list. Rust enums carry data
/// per variant, so "everyone but the drawer" is just `AllExcept(drawer)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every player in the room.
    All,
    /// One specific player.
    Player(PlayerId),
    /// Everyone EXCEPT the specified player.
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// Shared payload structs
// ---------------------------------------------------------------------------

/// A player as clients see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: PlayerId,
    pub username: String,
    pub score: u32,
    pub is_drawing: bool,
    pub has_guessed_correctly: bool,
}

/// One entry in a room's chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Random hex id, unique per message.
    pub id: String,
    pub player_id: PlayerId,
    pub username: String,
    pub message: String,
    /// `true` for server-generated notices.
    pub is_system: bool,
}

/// Lobby-level view of a room, sent as `room-state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub room_id: RoomCode,
    pub players: Vec<PlayerView>,
    pub game_active: bool,
    pub current_round: u32,
    pub total_rounds: u32,
    pub host_id: PlayerId,
}

// ---------------------------------------------------------------------------
// ClientAction: inbound
// ---------------------------------------------------------------------------

/// Everything a client can ask the server to do.
///
/// `tag = "event", content = "data"` produces adjacently tagged JSON:
///   `{ "event": "join-room", "data": { "roomId": "ABC123", "username": "ann" } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientAction {
    CreateRoom { username: String },
    JoinRoom { room_id: RoomCode, username: String },
    RequestRoomState { room_id: RoomCode },
    AssignHost { room_id: RoomCode, player_id: PlayerId },
    StartGame { room_id: RoomCode },
    WordSelected { room_id: RoomCode, word: String },
    /// `image_data` is an opaque canvas frame (a data URL in practice).
    /// The server relays it verbatim and never looks inside.
    DrawingUpdate { room_id: RoomCode, image_data: String },
    ChatMessage { room_id: RoomCode, message: String },
}

impl ClientAction {
    /// The room this action targets, if it names one.
    pub fn room_code(&self) -> Option<&RoomCode> {
        match self {
            Self::CreateRoom { .. } => None,
            Self::JoinRoom { room_id, .. }
            | Self::RequestRoomState { room_id }
            | Self::AssignHost { room_id, .. }
            | Self::StartGame { room_id }
            | Self::WordSelected { room_id, .. }
            | Self::DrawingUpdate { room_id, .. }
            | Self::ChatMessage { room_id, .. } => Some(room_id),
        }
    }

    /// The wire name of this action, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create-room",
            Self::JoinRoom { .. } => "join-room",
            Self::RequestRoomState { .. } => "request-room-state",
            Self::AssignHost { .. } => "assign-host",
            Self::StartGame { .. } => "start-game",
            Self::WordSelected { .. } => "word-selected",
            Self::DrawingUpdate { .. } => "drawing-update",
            Self::ChatMessage { .. } => "chat-message",
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent: outbound
// ---------------------------------------------------------------------------

/// Everything the server can tell a client.
///
/// Some events are private by construction (`select-word`, `your-turn`,
/// `correct-guess`): the state machine only ever addresses them to a single
/// player. No broadcast event carries the secret word while a turn is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    RoomCreated {
        room_id: RoomCode,
        player_id: PlayerId,
        host_id: PlayerId,
    },
    RoomJoined {
        room_id: RoomCode,
        players: Vec<PlayerView>,
        player_id: PlayerId,
        host_id: PlayerId,
    },
    RoomState(RoomSnapshot),
    PlayerJoined {
        player: PlayerView,
    },
    PlayerLeft {
        player_id: PlayerId,
        username: String,
    },
    HostChanged {
        new_host_id: PlayerId,
    },
    GameStarted {
        current_round: u32,
        total_rounds: u32,
        current_drawer: String,
        players: Vec<PlayerView>,
    },
    SelectWord {
        words: Vec<String>,
    },
    DrawingStarted {
        drawer: PlayerId,
        word_length: usize,
        time_left: u32,
    },
    YourTurn {
        word: String,
    },
    DrawingUpdated {
        image_data: String,
    },
    TimeUpdate {
        time_left: u32,
    },
    TurnEnded {
        word: String,
    },
    NextTurn {
        current_round: u32,
        total_rounds: u32,
        current_drawer: String,
    },
    PlayerGuessed {
        player_id: PlayerId,
        username: String,
        /// The guesser's new total, not the points just awarded.
        score: u32,
    },
    CorrectGuess {
        word: String,
    },
    NewMessage(ChatMessage),
    GameOver {
        /// Final standings, highest score first.
        players: Vec<PlayerView>,
    },
    Error {
        message: String,
    },
}

impl ServerEvent {
    /// Shorthand for an `error` event.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
