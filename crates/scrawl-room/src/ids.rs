//! Random identifiers: room codes and chat message ids.

use rand::Rng;
use scrawl_protocol::RoomCode;

/// Length of a room code in characters.
pub const ROOM_CODE_LEN: usize = 6;

/// Generates a short room code: 6 uppercase hex characters (24 bits).
///
/// Collisions are possible; the registry regenerates on a clash.
pub fn generate_room_code() -> RoomCode {
    let bytes: [u8; ROOM_CODE_LEN / 2] = rand::rng().random();
    RoomCode::new(hex(&bytes))
}

/// Generates a 16-character hex id for a chat message.
pub fn generate_message_id() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    hex(&bytes)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
