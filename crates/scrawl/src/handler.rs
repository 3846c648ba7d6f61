//! Per-connection handler: decode actions, route them to rooms, and write
//! room events back to the socket.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbound channel. The
//! flow is:
//!   1. Assign a `PlayerId` and spawn the writer
//!   2. Loop: receive frames → decode `ClientAction` → dispatch, pinging
//!      the peer on every heartbeat tick
//!   3. On close, error, or a peer that stopped answering pings: leave the
//!      current room

use std::sync::Arc;

use scrawl_protocol::{ClientAction, Codec, PlayerId, RoomCode, ServerEvent};
use scrawl_room::{Player, PlayerSender, RoomError, RoomHandle};
use scrawl_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::server::ServerState;
use crate::ScrawlError;

/// The one room a connection belongs to, if any.
///
/// Doubles as a drop guard: whatever room is still recorded when the
/// handler exits (including by panic) is left. Since `Drop` is synchronous,
/// the leave runs in a fire-and-forget task.
struct Membership<C: Codec> {
    player_id: PlayerId,
    room: Option<RoomCode>,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Membership<C> {
    /// Leaves the current room, if any.
    async fn leave(&mut self) {
        if let Some(code) = self.room.take() {
            self.leave_room(code).await;
        }
    }

    /// Records `code` as the current room, then leaves the previous one.
    ///
    /// Called only once the new room has accepted the player, so a failed
    /// create or join never costs them their seat.
    async fn switch_to(&mut self, code: RoomCode) {
        if let Some(previous) = self.room.replace(code) {
            self.leave_room(previous).await;
        }
    }

    async fn leave_room(&self, code: RoomCode) {
        if let Err(e) = self.state.rooms.remove_player(&code, self.player_id).await {
            tracing::debug!(player_id = %self.player_id, room = %code, error = %e, "leave failed");
        }
    }
}

impl<C: Codec> Drop for Membership<C> {
    fn drop(&mut self) {
        let Some(code) = self.room.take() else { return };
        let player_id = self.player_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Err(e) = state.rooms.remove_player(&code, player_id).await {
                tracing::debug!(%player_id, room = %code, error = %e, "disconnect cleanup failed");
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), ScrawlError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let player_id = PlayerId(conn_id.into_inner());
    tracing::debug!(%conn_id, %player_id, "handling new connection");

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_events(Arc::clone(&conn), Arc::clone(&state), rx));

    let mut membership = Membership {
        player_id,
        room: None,
        state: Arc::clone(&state),
    };

    let mut heartbeat = tokio::time::interval(state.ping_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    heartbeat.reset();

    loop {
        let received = tokio::select! {
            received = conn.recv() => received,
            _ = heartbeat.tick() => {
                if conn.idle_for() >= state.ping_timeout {
                    tracing::info!(%player_id, "no reply to pings, closing");
                    break;
                }
                if let Err(e) = conn.ping().await {
                    tracing::debug!(%player_id, error = %e, "ping failed");
                    break;
                }
                continue;
            }
        };
        let data = match received {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
        };

        let action: ClientAction = match state.codec.decode(&data) {
            Ok(action) => action,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode action");
                let _ = tx.send(ServerEvent::error("Invalid message"));
                continue;
            }
        };

        tracing::debug!(
            %player_id,
            action = action.name(),
            room = action.room_code().map(RoomCode::as_str).unwrap_or("-"),
            "action received"
        );
        if let Err(e) = handle_action(&state, &mut membership, &tx, action).await {
            tracing::debug!(%player_id, error = %e, "action failed");
            let _ = tx.send(ServerEvent::error(e.to_string()));
        }
    }

    membership.leave().await;
    writer.abort();
    let _ = conn.close().await;
    Ok(())
}

/// Encodes and writes events until the channel closes or the socket fails.
async fn write_events<C: Codec>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    mut rx: mpsc::UnboundedReceiver<ServerEvent>,
) {
    while let Some(event) = rx.recv().await {
        let bytes = match state.codec.encode(&event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(conn_id = %conn.id(), error = %e, "failed to encode event");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(conn_id = %conn.id(), error = %e, "send failed, stopping writer");
            break;
        }
    }
}

/// Routes one decoded action. Errors are reported to this connection only.
async fn handle_action<C: Codec>(
    state: &ServerState<C>,
    membership: &mut Membership<C>,
    tx: &PlayerSender,
    action: ClientAction,
) -> Result<(), RoomError> {
    let player_id = membership.player_id;

    match action {
        ClientAction::CreateRoom { username } => {
            let username = require_username(&username)?;
            let code = state
                .rooms
                .create_room(Player::new(player_id, username), tx.clone())
                .await;
            membership.switch_to(code).await;
        }

        ClientAction::JoinRoom { room_id, username } => {
            if membership.room.as_ref() == Some(&room_id) {
                return Err(RoomError::InvalidAction(
                    "You are already in this room".into(),
                ));
            }
            let username = require_username(&username)?;
            state
                .rooms
                .join_room(&room_id, Player::new(player_id, username), tx.clone())
                .await?;
            membership.switch_to(room_id).await;
        }

        ClientAction::RequestRoomState { room_id } => {
            let snapshot = room(state, &room_id).await?.snapshot().await?;
            let _ = tx.send(ServerEvent::RoomState(snapshot));
        }

        ClientAction::AssignHost { room_id, player_id: new_host } => {
            room(state, &room_id).await?.assign_host(player_id, new_host).await?;
        }

        ClientAction::StartGame { room_id } => {
            room(state, &room_id).await?.start_game(player_id).await?;
        }

        ClientAction::WordSelected { room_id, word } => {
            room(state, &room_id).await?.select_word(player_id, word).await?;
        }

        ClientAction::DrawingUpdate { room_id, image_data } => {
            room(state, &room_id).await?.relay_drawing(player_id, image_data).await?;
        }

        ClientAction::ChatMessage { room_id, message } => {
            room(state, &room_id).await?.chat(player_id, message).await?;
        }
    }

    Ok(())
}

async fn room<C: Codec>(state: &ServerState<C>, code: &RoomCode) -> Result<RoomHandle, RoomError> {
    state.rooms.handle(code).await
}

fn require_username(username: &str) -> Result<String, RoomError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(RoomError::InvalidAction("Username is required".into()));
    }
    Ok(username.to_string())
}
