//! End-to-end tests: a real server on a random port, driven by WebSocket
//! clients speaking the JSON wire format.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use scrawl::prelude::*;
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

const WAIT: Duration = Duration::from_secs(5);

/// Starts a server on a random port and returns the address.
async fn start_server(builder: ScrawlServerBuilder) -> String {
    let server = builder
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

async fn start_default() -> String {
    start_server(ScrawlServerBuilder::new()).await
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send(ws: &mut ClientWs, action: ClientAction) {
    let text = serde_json::to_string(&action).expect("encode");
    ws.send(Message::text(text)).await.expect("send");
}

/// Next server event, skipping control frames.
async fn next_event(ws: &mut ClientWs) -> ServerEvent {
    loop {
        let msg = tokio::time::timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for an event")
            .expect("stream ended")
            .expect("recv");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("decode");
        }
    }
}

/// Receives events until one matches, discarding the rest.
async fn wait_for(ws: &mut ClientWs, pred: impl Fn(&ServerEvent) -> bool) -> ServerEvent {
    loop {
        let event = next_event(ws).await;
        if pred(&event) {
            return event;
        }
    }
}

/// Creates a room and returns `(code, host id)`.
async fn create_room(ws: &mut ClientWs, username: &str) -> (RoomCode, PlayerId) {
    send(ws, ClientAction::CreateRoom { username: username.into() }).await;
    match wait_for(ws, |e| matches!(e, ServerEvent::RoomCreated { .. } | ServerEvent::Error { .. })).await {
        ServerEvent::RoomCreated { room_id, player_id, .. } => (room_id, player_id),
        other => panic!("expected room-created, got {other:?}"),
    }
}

/// Joins a room and returns the joiner's id.
async fn join_room(ws: &mut ClientWs, code: &RoomCode, username: &str) -> PlayerId {
    send(
        ws,
        ClientAction::JoinRoom {
            room_id: code.clone(),
            username: username.into(),
        },
    )
    .await;
    match wait_for(ws, |e| matches!(e, ServerEvent::RoomJoined { .. } | ServerEvent::Error { .. })).await {
        ServerEvent::RoomJoined { player_id, .. } => player_id,
        other => panic!("expected room-joined, got {other:?}"),
    }
}

fn error_message(event: ServerEvent) -> String {
    match event {
        ServerEvent::Error { message } => message,
        other => panic!("expected error, got {other:?}"),
    }
}

// =========================================================================
// Lobby
// =========================================================================

#[tokio::test]
async fn test_create_room() {
    let addr = start_default().await;
    let mut ws = connect(&addr).await;

    let (code, host) = create_room(&mut ws, "ann").await;
    assert_eq!(code.as_str().len(), 6);

    match next_event(&mut ws).await {
        ServerEvent::RoomState(snapshot) => {
            assert_eq!(snapshot.room_id, code);
            assert_eq!(snapshot.host_id, host);
            assert!(!snapshot.game_active);
            assert_eq!(snapshot.total_rounds, 3);
            assert_eq!(snapshot.players.len(), 1);
            assert_eq!(snapshot.players[0].username, "ann");
        }
        other => panic!("expected room-state, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_unknown_room() {
    let addr = start_default().await;
    let mut ws = connect(&addr).await;

    send(
        &mut ws,
        ClientAction::JoinRoom {
            room_id: RoomCode::new("NOPE00"),
            username: "bob".into(),
        },
    )
    .await;
    assert_eq!(error_message(next_event(&mut ws).await), "Room not found");
}

#[tokio::test]
async fn test_garbage_frame_gets_error_and_connection_survives() {
    let addr = start_default().await;
    let mut ws = connect(&addr).await;

    ws.send(Message::text("{not json")).await.unwrap();
    assert_eq!(error_message(next_event(&mut ws).await), "Invalid message");

    ws.send(Message::text(r#"{"event":"fly","data":{}}"#)).await.unwrap();
    assert_eq!(error_message(next_event(&mut ws).await), "Invalid message");

    create_room(&mut ws, "ann").await;
}

#[tokio::test]
async fn test_blank_username_is_rejected() {
    let addr = start_default().await;
    let mut ws = connect(&addr).await;

    send(&mut ws, ClientAction::CreateRoom { username: "   ".into() }).await;
    assert_eq!(error_message(next_event(&mut ws).await), "Username is required");
}

#[tokio::test]
async fn test_join_notifies_room() {
    let addr = start_default().await;
    let mut host = connect(&addr).await;
    let mut guest = connect(&addr).await;

    let (code, _) = create_room(&mut host, "ann").await;
    let lower = RoomCode::new(code.as_str().to_lowercase());
    let guest_id = join_room(&mut guest, &lower, "bob").await;

    match wait_for(&mut host, |e| matches!(e, ServerEvent::PlayerJoined { .. })).await {
        ServerEvent::PlayerJoined { player } => {
            assert_eq!(player.id, guest_id);
            assert_eq!(player.username, "bob");
            assert_eq!(player.score, 0);
        }
        _ => unreachable!(),
    }
    match wait_for(&mut host, |e| matches!(e, ServerEvent::RoomState(_))).await {
        ServerEvent::RoomState(snapshot) => assert_eq!(snapshot.players.len(), 2),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_request_room_state_goes_to_requester_only() {
    let addr = start_default().await;
    let mut host = connect(&addr).await;
    let mut guest = connect(&addr).await;

    let (code, _) = create_room(&mut host, "ann").await;
    join_room(&mut guest, &code, "bob").await;
    wait_for(&mut guest, |e| matches!(e, ServerEvent::RoomState(_))).await;
    wait_for(&mut host, |e| matches!(e, ServerEvent::RoomState(s) if s.players.len() == 2)).await;

    send(&mut guest, ClientAction::RequestRoomState { room_id: code.clone() }).await;
    match next_event(&mut guest).await {
        ServerEvent::RoomState(snapshot) => assert_eq!(snapshot.players.len(), 2),
        other => panic!("expected room-state, got {other:?}"),
    }

    // The host hears nothing more; prove it with a round-trip of its own.
    send(&mut host, ClientAction::RequestRoomState { room_id: RoomCode::new("NOPE00") }).await;
    assert_eq!(error_message(next_event(&mut host).await), "Room not found");
}

#[tokio::test]
async fn test_assign_host() {
    let addr = start_default().await;
    let mut host = connect(&addr).await;
    let mut guest = connect(&addr).await;

    let (code, _) = create_room(&mut host, "ann").await;
    let guest_id = join_room(&mut guest, &code, "bob").await;

    // Only the host may hand the role over.
    send(&mut guest, ClientAction::AssignHost { room_id: code.clone(), player_id: guest_id }).await;
    assert_eq!(
        error_message(wait_for(&mut guest, |e| matches!(e, ServerEvent::Error { .. })).await),
        "Only the host can assign a new host"
    );

    send(&mut host, ClientAction::AssignHost { room_id: code.clone(), player_id: guest_id }).await;
    assert_eq!(
        wait_for(&mut guest, |e| matches!(e, ServerEvent::HostChanged { .. })).await,
        ServerEvent::HostChanged { new_host_id: guest_id }
    );
}

// =========================================================================
// Game flow
// =========================================================================

#[tokio::test]
async fn test_turn_with_correct_guess() {
    let addr = start_default().await;
    let mut drawer = connect(&addr).await;
    let mut guesser = connect(&addr).await;

    let (code, drawer_id) = create_room(&mut drawer, "ann").await;
    let guesser_id = join_room(&mut guesser, &code, "bob").await;

    send(&mut guesser, ClientAction::StartGame { room_id: code.clone() }).await;

    match wait_for(&mut guesser, |e| matches!(e, ServerEvent::GameStarted { .. })).await {
        ServerEvent::GameStarted { current_round, total_rounds, current_drawer, players } => {
            assert_eq!(current_round, 1);
            assert_eq!(total_rounds, 3);
            assert_eq!(current_drawer, "ann");
            assert_eq!(players.len(), 2);
        }
        _ => unreachable!(),
    }
    let words = match wait_for(&mut drawer, |e| matches!(e, ServerEvent::SelectWord { .. })).await {
        ServerEvent::SelectWord { words } => words,
        _ => unreachable!(),
    };
    assert_eq!(words.len(), 3);

    // Joining mid-game is refused.
    let mut late = connect(&addr).await;
    send(&mut late, ClientAction::JoinRoom { room_id: code.clone(), username: "cy".into() }).await;
    assert_eq!(error_message(next_event(&mut late).await), "Game already started");

    let word = words[0].clone();
    send(&mut drawer, ClientAction::WordSelected { room_id: code.clone(), word: word.clone() }).await;

    assert_eq!(
        wait_for(&mut drawer, |e| matches!(e, ServerEvent::YourTurn { .. })).await,
        ServerEvent::YourTurn { word: word.clone() }
    );
    match wait_for(&mut guesser, |e| matches!(e, ServerEvent::DrawingStarted { .. })).await {
        ServerEvent::DrawingStarted { drawer, word_length, time_left } => {
            assert_eq!(drawer, drawer_id);
            assert_eq!(word_length, word.chars().count());
            assert!(time_left <= 60);
        }
        _ => unreachable!(),
    }

    // Canvas frames flow from drawer to guesser.
    send(
        &mut drawer,
        ClientAction::DrawingUpdate { room_id: code.clone(), image_data: "data:image/png;base64,AA".into() },
    )
    .await;
    assert_eq!(
        wait_for(&mut guesser, |e| matches!(e, ServerEvent::DrawingUpdated { .. })).await,
        ServerEvent::DrawingUpdated { image_data: "data:image/png;base64,AA".into() }
    );

    // A wrong guess is ordinary chat.
    send(&mut guesser, ClientAction::ChatMessage { room_id: code.clone(), message: "a house?".into() }).await;
    match wait_for(&mut drawer, |e| matches!(e, ServerEvent::NewMessage(_))).await {
        ServerEvent::NewMessage(msg) => {
            assert_eq!(msg.message, "a house?");
            assert_eq!(msg.player_id, guesser_id);
        }
        _ => unreachable!(),
    }

    send(
        &mut guesser,
        ClientAction::ChatMessage { room_id: code.clone(), message: format!(" {} ", word.to_uppercase()) },
    )
    .await;
    assert_eq!(
        wait_for(&mut guesser, |e| matches!(e, ServerEvent::CorrectGuess { .. })).await,
        ServerEvent::CorrectGuess { word: word.clone() }
    );
    let guessed = wait_for(&mut drawer, |e| {
        matches!(e, ServerEvent::PlayerGuessed { .. } | ServerEvent::NewMessage(_))
    })
    .await;
    match guessed {
        ServerEvent::PlayerGuessed { player_id, score, .. } => {
            assert_eq!(player_id, guesser_id);
            assert!(score > 0 && score <= 600);
            assert_eq!(score % 10, 0);
        }
        other => panic!("the word must not be broadcast as chat: {other:?}"),
    }
    assert_eq!(
        wait_for(&mut drawer, |e| matches!(e, ServerEvent::TurnEnded { .. })).await,
        ServerEvent::TurnEnded { word }
    );
}

#[tokio::test]
async fn test_word_is_picked_when_drawer_stalls() {
    let addr = start_server(ScrawlServerBuilder::new().game_config(GameConfig {
        selection_secs: 1,
        ..GameConfig::default()
    }))
    .await;
    let mut drawer = connect(&addr).await;

    let (code, _) = create_room(&mut drawer, "ann").await;
    send(&mut drawer, ClientAction::StartGame { room_id: code.clone() }).await;

    let words = match wait_for(&mut drawer, |e| matches!(e, ServerEvent::SelectWord { .. })).await {
        ServerEvent::SelectWord { words } => words,
        _ => unreachable!(),
    };
    match wait_for(&mut drawer, |e| matches!(e, ServerEvent::YourTurn { .. })).await {
        ServerEvent::YourTurn { word } => assert!(words.contains(&word)),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_not_a_member_errors() {
    let addr = start_default().await;
    let mut host = connect(&addr).await;
    let mut stranger = connect(&addr).await;

    let (code, _) = create_room(&mut host, "ann").await;
    send(&mut stranger, ClientAction::StartGame { room_id: code.clone() }).await;
    assert_eq!(error_message(next_event(&mut stranger).await), "You are not in this room");
}

// =========================================================================
// Leaving
// =========================================================================

#[tokio::test]
async fn test_disconnect_hands_over_host() {
    let addr = start_default().await;
    let mut host = connect(&addr).await;
    let mut guest = connect(&addr).await;

    let (code, host_id) = create_room(&mut host, "ann").await;
    let guest_id = join_room(&mut guest, &code, "bob").await;

    host.close(None).await.unwrap();

    assert_eq!(
        wait_for(&mut guest, |e| matches!(e, ServerEvent::PlayerLeft { .. })).await,
        ServerEvent::PlayerLeft { player_id: host_id, username: "ann".into() }
    );
    assert_eq!(
        next_event(&mut guest).await,
        ServerEvent::HostChanged { new_host_id: guest_id }
    );
}

#[tokio::test]
async fn test_creating_a_room_leaves_the_previous_one() {
    let addr = start_default().await;
    let mut host = connect(&addr).await;
    let mut guest = connect(&addr).await;

    let (code, _) = create_room(&mut host, "ann").await;
    let guest_id = join_room(&mut guest, &code, "bob").await;

    let (other, _) = create_room(&mut guest, "bob").await;
    assert_ne!(other, code);

    match wait_for(&mut host, |e| matches!(e, ServerEvent::PlayerLeft { .. })).await {
        ServerEvent::PlayerLeft { player_id, .. } => assert_eq!(player_id, guest_id),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_last_player_leaving_destroys_room() {
    let addr = start_default().await;
    let mut host = connect(&addr).await;
    let (code, _) = create_room(&mut host, "ann").await;
    host.close(None).await.unwrap();

    // Cleanup runs on the server side asynchronously.
    let mut ws = connect(&addr).await;
    let mut gone = false;
    for _ in 0..50 {
        send(&mut ws, ClientAction::RequestRoomState { room_id: code.clone() }).await;
        match next_event(&mut ws).await {
            ServerEvent::Error { message } if message == "Room not found" => {
                gone = true;
                break;
            }
            _ => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    assert!(gone, "room should be destroyed once empty");
}

/// Keeps a client socket alive for `period`, optionally pinging the
/// server, and returns the events that arrived meanwhile.
///
/// Reading is what lets tungstenite answer the server's pings.
async fn stay_connected(ws: &mut ClientWs, period: Duration, send_pings: bool) -> Vec<ServerEvent> {
    let deadline = tokio::time::Instant::now() + period;
    let mut events = Vec::new();
    while tokio::time::Instant::now() < deadline {
        if send_pings {
            ws.send(Message::Ping(Vec::new().into())).await.expect("ping");
        }
        if let Ok(next) = tokio::time::timeout(Duration::from_millis(100), ws.next()).await {
            match next.expect("stream ended").expect("recv") {
                Message::Text(text) => events.push(serde_json::from_str(text.as_str()).expect("decode")),
                Message::Close(_) => panic!("server closed a live connection"),
                _ => {}
            }
        }
    }
    events
}

fn heartbeat_server() -> ScrawlServerBuilder {
    ScrawlServerBuilder::new().heartbeat(Duration::from_millis(100), Duration::from_millis(400))
}

#[tokio::test]
async fn test_quiet_player_with_live_socket_stays_in_room() {
    let addr = start_server(heartbeat_server()).await;
    let mut host = connect(&addr).await;
    let (code, _) = create_room(&mut host, "ann").await;
    let mut guest = connect(&addr).await;
    let guest_id = join_room(&mut guest, &code, "bob").await;

    // Neither sends an action for three ping timeouts.
    let (host_events, _) = tokio::join!(
        stay_connected(&mut host, Duration::from_millis(1200), false),
        stay_connected(&mut guest, Duration::from_millis(1200), true),
    );
    assert!(
        !host_events
            .iter()
            .any(|e| matches!(e, ServerEvent::PlayerLeft { player_id, .. } if *player_id == guest_id)),
        "a quiet guest must not be removed"
    );

    send(
        &mut host,
        ClientAction::ChatMessage {
            room_id: code.clone(),
            message: "still there?".into(),
        },
    )
    .await;
    match wait_for(&mut guest, |e| matches!(e, ServerEvent::NewMessage(_))).await {
        ServerEvent::NewMessage(msg) => assert_eq!(msg.message, "still there?"),
        _ => unreachable!(),
    }

    send(&mut host, ClientAction::RequestRoomState { room_id: code }).await;
    match wait_for(&mut host, |e| matches!(e, ServerEvent::RoomState(_))).await {
        ServerEvent::RoomState(snapshot) => assert_eq!(snapshot.players.len(), 2),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_unresponsive_connection_is_dropped() {
    let addr = start_server(heartbeat_server()).await;
    let mut host = connect(&addr).await;
    let (code, _) = create_room(&mut host, "ann").await;
    // The guest never reads again, so it never answers a ping.
    let mut guest = connect(&addr).await;
    let guest_id = join_room(&mut guest, &code, "bob").await;

    let event = wait_for(&mut host, |e| matches!(e, ServerEvent::PlayerLeft { .. })).await;
    assert_eq!(
        event,
        ServerEvent::PlayerLeft {
            player_id: guest_id,
            username: "bob".into(),
        }
    );
}

#[tokio::test]
async fn test_failed_join_keeps_current_room() {
    let addr = start_default().await;
    let mut host = connect(&addr).await;
    let (code, _) = create_room(&mut host, "ann").await;
    let mut guest = connect(&addr).await;
    join_room(&mut guest, &code, "bob").await;

    send(
        &mut guest,
        ClientAction::JoinRoom {
            room_id: RoomCode::new("ZZZZZZ"),
            username: "bob".into(),
        },
    )
    .await;
    let err = wait_for(&mut guest, |e| matches!(e, ServerEvent::Error { .. })).await;
    assert_eq!(error_message(err), "Room not found");

    send(&mut guest, ClientAction::RequestRoomState { room_id: code }).await;
    match wait_for(&mut guest, |e| matches!(e, ServerEvent::RoomState(_))).await {
        ServerEvent::RoomState(snapshot) => {
            assert_eq!(snapshot.players.len(), 2);
            assert!(snapshot.players.iter().any(|p| p.username == "bob"));
        }
        _ => unreachable!(),
    }
}
