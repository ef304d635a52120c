//! Integration tests for meeple-core through its public API.
//!
//! These exercise the pieces together the way the server and client use
//! them: a game is driven through setup and a few turns, its events are
//! framed across an in-memory duplex stream, and the result is saved and
//! reloaded in both snapshot encodings.

use meeple_core::{
    protocol::messages::{GameEvent, ServerMessage, SessionEvent},
    read_frame,
    snapshot::SNAPSHOT_EXTENSION,
    write_frame, FrameError, Game, Phase, Snapshot, SnapshotEncoding, TurnOutcome,
};
use uuid::Uuid;

fn played_game() -> Game {
    let mut game = Game::new(5, 10);
    game.claim_slot(0, Uuid::new_v4(), "ada").unwrap();
    game.claim_slot(1, Uuid::new_v4(), "grace").unwrap();
    game.seat_ai(4, Uuid::new_v4()).unwrap();
    game.start().unwrap();
    for points in [3, 0, 8] {
        let active = game.active_player.unwrap();
        game.add_points(active, points);
        assert!(matches!(game.advance_turn().unwrap(), TurnOutcome::Next(_)));
    }
    game
}

#[tokio::test]
async fn test_events_cross_a_duplex_stream_in_order() {
    // Arrange
    let (mut client, mut server) = tokio::io::duplex(64);
    let events: Vec<ServerMessage> = (0..50u8)
        .map(|i| {
            ServerMessage::Event(SessionEvent::Game(GameEvent::ScoreChanged {
                player: i % 3,
                points: u32::from(i),
            }))
        })
        .collect();
    let expected = events.clone();

    // Act – the writer runs concurrently with the reader; the small duplex
    // buffer forces many partial writes.
    let writer = tokio::spawn(async move {
        for e in &events {
            write_frame(&mut server, e).await.unwrap();
        }
    });
    let mut received = Vec::new();
    for _ in 0..expected.len() {
        received.push(read_frame::<_, ServerMessage>(&mut client).await.unwrap());
    }
    writer.await.unwrap();

    // Assert
    assert_eq!(received, expected);
    assert!(matches!(
        read_frame::<_, ServerMessage>(&mut client).await,
        Err(FrameError::Closed)
    ));
}

#[test]
fn test_snapshot_preserves_players_and_scores_in_both_encodings() {
    let dir = std::env::temp_dir().join(format!("meeple_core_it_{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let game = played_game();
    let client_id = Uuid::new_v4();

    for (name, encoding) in [("zipped", SnapshotEncoding::Gzip), ("plain", SnapshotEncoding::Plain)] {
        let written = Snapshot::new(game.clone(), client_id)
            .save(&dir.join(name), encoding)
            .unwrap();
        let loaded = Snapshot::load(&written).unwrap();

        assert!(written.to_string_lossy().ends_with(SNAPSHOT_EXTENSION));
        assert_eq!(loaded.client_id, client_id);
        assert_eq!(loaded.game, game);
        assert_eq!(loaded.game.phase, Phase::Running);
        assert_eq!(loaded.game.players.len(), 3);
    }

    std::fs::remove_dir_all(&dir).ok();
}
