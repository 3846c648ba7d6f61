//! Error types for the room layer.

use scrawl_protocol::{PlayerId, RoomCode};

/// Errors that can occur during room operations.
///
/// Everything except [`Unavailable`](Self::Unavailable) is caused by a
/// client and is reported back to that client only. The `Display` text is
/// what the client sees in its `error` event.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No room has this code.
    #[error("Room not found")]
    RoomNotFound(RoomCode),

    /// The room is mid-game and not accepting joins or restarts.
    #[error("Game already started")]
    GameAlreadyStarted(RoomCode),

    /// The player is not a member of this room.
    #[error("You are not in this room")]
    NotInRoom(PlayerId, RoomCode),

    /// The action is not allowed right now, e.g. picking a word that was
    /// not offered or reassigning host without being host.
    #[error("{0}")]
    InvalidAction(String),

    /// The room's actor stopped (it emptied out while the command was in
    /// flight).
    #[error("Room not found")]
    Unavailable(RoomCode),
}
