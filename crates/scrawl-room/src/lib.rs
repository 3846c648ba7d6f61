//! Rooms and the drawing game for Scrawl.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! members, chat log, game state, and turn timers.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates rooms, finds them by code, drops empty ones
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`Game`]: the synchronous turn state machine inside each actor
//! - [`GamePhase`]: where a game is in its turn cycle
//! - [`GameConfig`]: rounds, timers, scoring, and word list
//! - [`WordPool`]: the words drawers choose from

mod config;
mod error;
mod game;
mod ids;
mod registry;
mod room;
mod words;

pub use config::{GameConfig, GamePhase};
pub use error::RoomError;
pub use game::{Departure, Game, Outbox, Player};
pub use ids::{generate_message_id, generate_room_code, ROOM_CODE_LEN};
pub use registry::RoomRegistry;
pub use room::{LeaveOutcome, PlayerSender, RoomHandle};
pub use words::WordPool;
