//! Wire protocol for Scrawl.
//!
//! This crate defines the "language" that browsers and the game server
//! speak:
//!
//! - **Types** ([`ClientAction`], [`ServerEvent`], [`PlayerId`],
//!   [`RoomCode`], [`Recipient`], etc.): the structures that travel on the
//!   wire, plus addressing for room-scoped delivery.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those structures are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! ```text
//! Transport (frames) → Protocol (ClientAction / ServerEvent) → Room actor
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ChatMessage, ClientAction, PlayerId, PlayerView, Recipient, RoomCode,
    RoomSnapshot, ServerEvent,
};
