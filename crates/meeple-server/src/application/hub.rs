//! GameHub: the server's authoritative game and its connected clients.
//!
//! The hub is a plain state machine.  It never touches sockets: every
//! operation returns the messages to send and who should receive them, and
//! the listener delivers them.  This keeps ordering decisions in one place
//! and makes the request handling fully testable.

use std::collections::HashMap;

use meeple_core::{
    protocol::messages::{ClientRequest, GameEvent, ServerMessage, SessionEvent, UiEvent},
    ClientId, Game, GameError, Phase, Snapshot, TurnOutcome,
};
use tracing::{debug, info};
use uuid::Uuid;

/// Actions offered to whoever controls the active seat.
const TURN_ACTIONS: &[&str] = &["place-tile", "place-follower", "end-turn"];

/// Who receives an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipient {
    One(ClientId),
    All,
}

/// A message addressed by the hub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: Recipient,
    pub message: ServerMessage,
}

impl Outbound {
    fn one(client: ClientId, message: impl Into<ServerMessage>) -> Self {
        Self {
            to: Recipient::One(client),
            message: message.into(),
        }
    }

    fn all(event: impl Into<SessionEvent>) -> Self {
        Self {
            to: Recipient::All,
            message: ServerMessage::Event(event.into()),
        }
    }

    fn warning(client: ClientId, err: GameError) -> Self {
        Self::one(
            client,
            SessionEvent::Ui(UiEvent::Warning {
                text: err.to_string(),
            }),
        )
    }
}

/// Runtime info about a connected client.
#[derive(Debug, Clone)]
struct ConnectedClient {
    nickname: String,
}

/// The game hub.
pub struct GameHub {
    game: Game,
    clients: HashMap<ClientId, ConnectedClient>,
}

impl GameHub {
    /// Creates a hub serving `game`.
    pub fn new(game: Game) -> Self {
        Self {
            game,
            clients: HashMap::new(),
        }
    }

    /// Creates a hub serving a saved game.  Seat owners are cleared so the
    /// seats can be reclaimed by nickname; AI seats go to whoever reclaims
    /// a seat first.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut game = snapshot.game;
        game.detach_all();
        info!(
            "serving saved game {} (turn {}, {} players)",
            game.id,
            game.turn,
            game.players.len()
        );
        Self::new(game)
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Admits a new connection and returns its identity and `Welcome`.
    pub fn register(&mut self, nickname: &str) -> (ClientId, ServerMessage) {
        let client_id = Uuid::new_v4();
        self.clients.insert(
            client_id,
            ConnectedClient {
                nickname: nickname.to_string(),
            },
        );
        info!("client {client_id} ({nickname}) joined");
        let welcome = ServerMessage::Welcome {
            client_id,
            game: self.game.clone(),
        };
        (client_id, welcome)
    }

    /// Forgets a connection.  Its seats stay occupied but lose their owner.
    pub fn unregister(&mut self, client: ClientId) -> Vec<Outbound> {
        if self.clients.remove(&client).is_none() {
            return Vec::new();
        }
        info!("client {client} left");
        self.game
            .detach_client(client)
            .into_iter()
            .map(|slot| Outbound::all(GameEvent::SlotChanged(slot)))
            .collect()
    }

    /// Applies one request from `client`.
    pub fn handle(&mut self, client: ClientId, request: ClientRequest) -> Vec<Outbound> {
        if !self.clients.contains_key(&client) {
            debug!("ignoring request from unknown client {client}");
            return Vec::new();
        }
        debug!("client {client}: {request:?}");

        let result = match request {
            ClientRequest::Hello { .. } => Ok(vec![Outbound::one(
                client,
                SessionEvent::Ui(UiEvent::Warning {
                    text: "already connected".to_string(),
                }),
            )]),
            ClientRequest::TakeSlot { number, nickname } => self.take_slot(client, number, &nickname),
            ClientRequest::SetSlotAi { number } => self
                .game
                .seat_ai(number, client)
                .map(|slot| vec![Outbound::all(GameEvent::SlotChanged(slot.clone()))]),
            ClientRequest::LeaveSlot { number } => self
                .game
                .release_slot(number, client)
                .map(|slot| vec![Outbound::all(GameEvent::SlotChanged(slot.clone()))]),
            ClientRequest::StartGame => self.start_game(),
            ClientRequest::EndTurn { points } => self.end_turn(client, points),
            ClientRequest::DiscardTile { tile } => self.discard_tile(client, tile),
            ClientRequest::Chat { text } => {
                let nickname = self.clients[&client].nickname.clone();
                Ok(vec![Outbound::all(UiEvent::Chat { nickname, text })])
            }
            ClientRequest::Ping(token) => Ok(vec![Outbound::one(client, ServerMessage::Pong(token))]),
            ClientRequest::Goodbye => Ok(Vec::new()),
        };

        result.unwrap_or_else(|err| {
            debug!("rejected request from {client}: {err}");
            vec![Outbound::warning(client, err)]
        })
    }

    /// Seats `client`, handing it any AI seat that lost its controller.  A
    /// reclaimed seat whose turn it is gets its actions again.
    fn take_slot(
        &mut self,
        client: ClientId,
        number: u8,
        nickname: &str,
    ) -> Result<Vec<Outbound>, GameError> {
        let claimed = self.game.claim_slot(number, client, nickname)?.clone();
        let mut out = vec![Outbound::all(GameEvent::SlotChanged(claimed))];
        let adopted = self.game.adopt_orphaned_ai(client);
        if !adopted.is_empty() {
            info!("client {client} now controls {} AI seats", adopted.len());
        }
        out.extend(
            adopted
                .into_iter()
                .map(|slot| Outbound::all(GameEvent::SlotChanged(slot))),
        );
        if self.game.phase == Phase::Running && self.game.is_turn_of(client) {
            out.extend(self.offer_actions());
        }
        Ok(out)
    }

    fn start_game(&mut self) -> Result<Vec<Outbound>, GameError> {
        let first = self.game.start()?;
        info!("game {} started with {} players", self.game.id, self.game.players.len());
        let mut out = vec![
            Outbound::all(GameEvent::GameStarted(self.game.clone())),
            Outbound::all(GameEvent::PlayerActivated {
                player: first,
                turn: self.game.turn,
            }),
        ];
        out.extend(self.offer_actions());
        Ok(out)
    }

    fn end_turn(&mut self, client: ClientId, points: u32) -> Result<Vec<Outbound>, GameError> {
        self.require_turn_of(client)?;
        let mut out = Vec::new();
        if points > 0 {
            if let Some(active) = self.game.active_player {
                if let Some(total) = self.game.add_points(active, points) {
                    out.push(Outbound::all(GameEvent::ScoreChanged {
                        player: active,
                        points: total,
                    }));
                }
            }
        }
        match self.game.advance_turn()? {
            TurnOutcome::Next(player) => {
                out.push(Outbound::all(GameEvent::PlayerActivated {
                    player,
                    turn: self.game.turn,
                }));
                out.extend(self.offer_actions());
            }
            TurnOutcome::Finished => {
                info!("game {} finished after {} turns", self.game.id, self.game.turn);
                out.push(Outbound::all(GameEvent::GameOver {
                    ranking: self.game.ranking(),
                }));
            }
        }
        Ok(out)
    }

    fn discard_tile(&mut self, client: ClientId, tile: String) -> Result<Vec<Outbound>, GameError> {
        self.require_turn_of(client)?;
        self.game.discarded.push(tile.clone());
        Ok(vec![Outbound::all(GameEvent::TileDiscarded { tile })])
    }

    fn require_turn_of(&self, client: ClientId) -> Result<(), GameError> {
        if self.game.is_turn_of(client) {
            Ok(())
        } else {
            Err(GameError::NotActivePlayer)
        }
    }

    /// Prompts the controller of the active seat, if it is connected.
    fn offer_actions(&self) -> Option<Outbound> {
        let active = self.game.active_player()?;
        let owner = active.slot.owner.filter(|o| self.clients.contains_key(o))?;
        Some(Outbound::one(
            owner,
            SessionEvent::Ui(UiEvent::ActionsOffered {
                player: active.index,
                actions: TURN_ACTIONS.iter().map(|a| a.to_string()).collect(),
            }),
        ))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
