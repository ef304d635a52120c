//! Integration tests for the server over real TCP on an ephemeral port.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use meeple_core::{
    protocol::messages::{
        ClientRequest, DisconnectReason, GameEvent, ServerMessage, SessionEvent, UiEvent,
        PROTOCOL_VERSION,
    },
    read_frame, write_frame, ClientId, Game,
};
use meeple_server::{start_server, GameHub, ServerConfig, ServerHandle};
use tokio::net::TcpStream;
use tokio_test::assert_ok;

const WAIT: Duration = Duration::from_secs(5);

async fn serve(game: Game) -> ServerHandle {
    let config = ServerConfig {
        bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        handshake_timeout: Duration::from_millis(500),
    };
    assert_ok!(start_server(&config, GameHub::new(game)).await)
}

async fn recv(stream: &mut TcpStream) -> ServerMessage {
    let frame = tokio::time::timeout(WAIT, read_frame::<_, ServerMessage>(stream)).await;
    assert_ok!(assert_ok!(frame))
}

async fn send(stream: &mut TcpStream, request: ClientRequest) {
    assert_ok!(write_frame(stream, &request).await);
}

async fn join(addr: SocketAddr, nickname: &str) -> (TcpStream, ClientId, Game) {
    let mut stream = assert_ok!(TcpStream::connect(addr).await);
    send(
        &mut stream,
        ClientRequest::Hello {
            protocol_version: PROTOCOL_VERSION,
            nickname: nickname.to_string(),
        },
    )
    .await;
    match recv(&mut stream).await {
        ServerMessage::Welcome { client_id, game } => (stream, client_id, game),
        other => panic!("expected Welcome, got {other:?}"),
    }
}

fn event(message: ServerMessage) -> SessionEvent {
    match message {
        ServerMessage::Event(e) => e,
        other => panic!("expected an event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_welcome_carries_current_game() {
    // Arrange
    let game = Game::new(3, 10);
    let game_id = game.id;
    let server = serve(game).await;

    // Act
    let (_stream, _, welcomed) = join(server.local_addr(), "ada").await;

    // Assert
    assert_eq!(welcomed.id, game_id);
    assert_eq!(welcomed.slots.len(), 3);
    assert_ok!(server.stop().await);
}

#[tokio::test]
async fn test_wrong_protocol_version_is_rejected() {
    let server = serve(Game::default()).await;
    let mut stream = assert_ok!(TcpStream::connect(server.local_addr()).await);

    send(
        &mut stream,
        ClientRequest::Hello {
            protocol_version: PROTOCOL_VERSION + 1,
            nickname: "future".to_string(),
        },
    )
    .await;

    assert!(matches!(recv(&mut stream).await, ServerMessage::Rejected { .. }));
    assert_ok!(server.stop().await);
}

#[tokio::test]
async fn test_slot_changes_reach_every_client_in_order() {
    // Arrange
    let server = serve(Game::new(4, 10)).await;
    let (mut alice, alice_id, _) = join(server.local_addr(), "alice").await;
    let (mut bob, _, _) = join(server.local_addr(), "bob").await;

    // Act
    send(&mut alice, ClientRequest::TakeSlot { number: 0, nickname: "alice".into() }).await;
    send(&mut alice, ClientRequest::SetSlotAi { number: 3 }).await;

    // Assert – bob observes both changes, in the order alice made them.
    for expected in [0u8, 3] {
        match event(recv(&mut bob).await) {
            SessionEvent::Game(GameEvent::SlotChanged(slot)) => {
                assert_eq!(slot.number, expected);
                assert_eq!(slot.owner, Some(alice_id));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_ok!(server.stop().await);
}

#[tokio::test]
async fn test_start_game_offers_actions_to_first_player_only() {
    // Arrange
    let server = serve(Game::new(2, 10)).await;
    let (mut alice, _, _) = join(server.local_addr(), "alice").await;
    let (mut bob, _, _) = join(server.local_addr(), "bob").await;
    send(&mut alice, ClientRequest::TakeSlot { number: 0, nickname: "alice".into() }).await;
    send(&mut bob, ClientRequest::TakeSlot { number: 1, nickname: "bob".into() }).await;
    for stream in [&mut alice, &mut bob] {
        recv(stream).await;
        recv(stream).await;
    }

    // Act
    send(&mut bob, ClientRequest::StartGame).await;

    // Assert
    assert!(matches!(event(recv(&mut alice).await), SessionEvent::Game(GameEvent::GameStarted(_))));
    assert!(matches!(
        event(recv(&mut alice).await),
        SessionEvent::Game(GameEvent::PlayerActivated { player: 0, turn: 1 })
    ));
    assert!(matches!(
        event(recv(&mut alice).await),
        SessionEvent::Ui(UiEvent::ActionsOffered { player: 0, .. })
    ));

    assert!(matches!(event(recv(&mut bob).await), SessionEvent::Game(GameEvent::GameStarted(_))));
    assert!(matches!(
        event(recv(&mut bob).await),
        SessionEvent::Game(GameEvent::PlayerActivated { player: 0, .. })
    ));
    // Bob's next frame is the pong, not an action offer.
    send(&mut bob, ClientRequest::Ping(9)).await;
    assert_eq!(recv(&mut bob).await, ServerMessage::Pong(9));

    assert_ok!(server.stop().await);
}

#[tokio::test]
async fn test_disconnect_detaches_seat_for_others() {
    let server = serve(Game::new(2, 10)).await;
    let (mut alice, _, _) = join(server.local_addr(), "alice").await;
    let (mut bob, _, _) = join(server.local_addr(), "bob").await;
    send(&mut alice, ClientRequest::TakeSlot { number: 0, nickname: "alice".into() }).await;
    recv(&mut bob).await;

    send(&mut alice, ClientRequest::Goodbye).await;
    drop(alice);

    match event(recv(&mut bob).await) {
        SessionEvent::Game(GameEvent::SlotChanged(slot)) => {
            assert_eq!(slot.number, 0);
            assert!(slot.owner.is_none());
            assert_eq!(slot.nickname.as_deref(), Some("alice"));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_ok!(server.stop().await);
}

#[tokio::test]
async fn test_stop_notifies_connected_clients() {
    let server = serve(Game::default()).await;
    let (mut stream, _, _) = join(server.local_addr(), "ada").await;

    assert_ok!(server.stop().await);

    assert_eq!(
        recv(&mut stream).await,
        ServerMessage::Disconnect {
            reason: DisconnectReason::ServerShutdown
        }
    );
}

#[tokio::test]
async fn test_silent_connection_is_dropped_after_handshake_timeout() {
    let server = serve(Game::default()).await;
    let mut stream = assert_ok!(TcpStream::connect(server.local_addr()).await);

    let result = tokio::time::timeout(WAIT, read_frame::<_, ServerMessage>(&mut stream)).await;

    assert!(assert_ok!(result).is_err());
    assert_ok!(server.stop().await);
}

#[tokio::test]
async fn test_stop_completes_when_peer_stops_reading() {
    // Arrange: a client floods the server with chat it never reads back, so
    // the server's writes to it stall once the socket buffers fill up.
    let server = serve(Game::default()).await;
    let (mut stream, _, _) = join(server.local_addr(), "ada").await;
    let text = "x".repeat(256 * 1024);
    let flood = async {
        for _ in 0..200 {
            send(&mut stream, ClientRequest::Chat { text: text.clone() }).await;
        }
    };
    assert_ok!(tokio::time::timeout(WAIT, flood).await);
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Act
    let stopped = tokio::time::timeout(WAIT, server.stop()).await;

    // Assert
    assert_ok!(assert_ok!(stopped));
}
