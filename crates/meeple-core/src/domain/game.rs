//! The game handle: seats, players, phase, and turn order.
//!
//! The server owns the authoritative [`Game`].  It mutates it through the
//! methods below and broadcasts the resulting events; clients replay those
//! events onto their own copy.  Scoring and tile placement rules are not
//! modelled here: points arrive already computed.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Identifies one client connection.  Assigned by the server on handshake.
pub type ClientId = Uuid;

/// Number of seats in a freshly created game.
pub const DEFAULT_SLOT_COUNT: usize = 6;

/// Number of turns after which a freshly created game ends.
pub const DEFAULT_TURN_LIMIT: u32 = 72;

/// Errors raised by game state transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("slot {0} does not exist")]
    SlotOutOfRange(u8),
    #[error("slot {0} is already taken")]
    SlotTaken(u8),
    #[error("slot {0} is not owned by the requesting client")]
    NotSlotOwner(u8),
    #[error("operation requires phase {expected:?}, game is in {actual:?}")]
    WrongPhase { expected: Phase, actual: Phase },
    #[error("no occupied slots; cannot start the game")]
    NoPlayers,
    #[error("requesting client is not the active player")]
    NotActivePlayer,
}

/// What kind of participant sits in a slot.
///
/// A *remote* participant is a [`SlotType::Player`] slot whose
/// [`PlayerSlot::owner`] is some other connection; it is distinguished from a
/// local one by comparing owners, not by a separate kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotType {
    /// A human seated at some client.
    Player,
    /// A computer-controlled participant driven by the hosting client.
    Ai,
    /// Nobody sits here.
    Open,
}

/// A seat in the game.  Its ordinal `number` fixes turn order and colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSlot {
    pub number: u8,
    pub slot_type: SlotType,
    pub nickname: Option<String>,
    /// The connection that controls this seat, if any.
    pub owner: Option<ClientId>,
}

impl PlayerSlot {
    /// Creates an empty seat.
    pub fn open(number: u8) -> Self {
        Self {
            number,
            slot_type: SlotType::Open,
            nickname: None,
            owner: None,
        }
    }

    /// Returns `true` when a human or AI occupies the seat.
    pub fn is_occupied(&self) -> bool {
        self.slot_type != SlotType::Open
    }

    /// Returns `true` when `client` controls this seat.
    pub fn is_owned_by(&self, client: ClientId) -> bool {
        self.owner == Some(client)
    }
}

/// A participant of a running game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Position in [`Game::players`]; also the turn order.
    pub index: u8,
    pub nickname: String,
    pub slot: PlayerSlot,
    pub points: u32,
}

/// Lifecycle phase of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Seats are being taken; the game has not started.
    Setup,
    Running,
    /// Terminal.  No further turns are played.
    GameOver,
}

/// One line of the final standings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ranking {
    pub player: u8,
    pub nickname: String,
    pub points: u32,
}

/// Result of [`Game::advance_turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The player at this index is now active.
    Next(u8),
    /// The turn limit was reached and the game is over.
    Finished,
}

/// The game handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    pub id: Uuid,
    pub slots: Vec<PlayerSlot>,
    pub players: Vec<Player>,
    pub phase: Phase,
    pub turn: u32,
    /// `0` means unlimited.
    pub turn_limit: u32,
    /// Index into `players` of whose turn it is.
    pub active_player: Option<u8>,
    pub discarded: Vec<String>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new(DEFAULT_SLOT_COUNT, DEFAULT_TURN_LIMIT)
    }
}

impl Game {
    /// Creates a game in [`Phase::Setup`] with `slot_count` open seats.
    pub fn new(slot_count: usize, turn_limit: u32) -> Self {
        let slot_count = slot_count.min(usize::from(u8::MAX));
        Self {
            id: Uuid::new_v4(),
            slots: (0..slot_count as u8).map(PlayerSlot::open).collect(),
            players: Vec::new(),
            phase: Phase::Setup,
            turn: 0,
            turn_limit,
            active_player: None,
            discarded: Vec::new(),
        }
    }

    pub fn slot(&self, number: u8) -> Option<&PlayerSlot> {
        self.slots.get(usize::from(number))
    }

    pub fn player(&self, index: u8) -> Option<&Player> {
        self.players.get(usize::from(index))
    }

    /// The player whose turn it is, if the game is running.
    pub fn active_player(&self) -> Option<&Player> {
        self.active_player.and_then(|i| self.player(i))
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Replaces the seat with the same number and mirrors it onto the
    /// matching player, if any.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::SlotOutOfRange`] for an unknown seat number.
    pub fn update_slot(&mut self, slot: PlayerSlot) -> Result<(), GameError> {
        let number = slot.number;
        let target = self
            .slots
            .get_mut(usize::from(number))
            .ok_or(GameError::SlotOutOfRange(number))?;
        *target = slot.clone();
        for player in self.players.iter_mut().filter(|p| p.slot.number == number) {
            player.slot = slot.clone();
        }
        Ok(())
    }

    /// Seats `client` in slot `number` as a human player.
    ///
    /// An open seat can always be taken.  A human seat with no owner (for
    /// example after loading a snapshot) can be reclaimed by a client using
    /// the same nickname.
    ///
    /// # Errors
    ///
    /// [`GameError::SlotOutOfRange`] or [`GameError::SlotTaken`].
    pub fn claim_slot(
        &mut self,
        number: u8,
        client: ClientId,
        nickname: &str,
    ) -> Result<&PlayerSlot, GameError> {
        let slot = self.slot(number).ok_or(GameError::SlotOutOfRange(number))?;
        let claimable = match slot.slot_type {
            SlotType::Open => self.phase == Phase::Setup,
            SlotType::Player => {
                slot.owner.is_none() && slot.nickname.as_deref() == Some(nickname)
            }
            SlotType::Ai => false,
        };
        if !claimable {
            return Err(GameError::SlotTaken(number));
        }
        let claimed = PlayerSlot {
            number,
            slot_type: SlotType::Player,
            nickname: Some(nickname.to_string()),
            owner: Some(client),
        };
        self.update_slot(claimed)?;
        Ok(&self.slots[usize::from(number)])
    }

    /// Puts an AI in slot `number`, controlled by `client`.
    ///
    /// # Errors
    ///
    /// Seat must exist, be open, and the game must still be in setup.
    pub fn seat_ai(&mut self, number: u8, client: ClientId) -> Result<&PlayerSlot, GameError> {
        self.require_phase(Phase::Setup)?;
        let slot = self.slot(number).ok_or(GameError::SlotOutOfRange(number))?;
        if slot.is_occupied() {
            return Err(GameError::SlotTaken(number));
        }
        self.update_slot(PlayerSlot {
            number,
            slot_type: SlotType::Ai,
            nickname: Some(format!("AI {}", number + 1)),
            owner: Some(client),
        })?;
        Ok(&self.slots[usize::from(number)])
    }

    /// Empties seat `number`.  Only its owner may do so, and only in setup.
    ///
    /// # Errors
    ///
    /// [`GameError::WrongPhase`], [`GameError::SlotOutOfRange`] or
    /// [`GameError::NotSlotOwner`].
    pub fn release_slot(&mut self, number: u8, client: ClientId) -> Result<&PlayerSlot, GameError> {
        self.require_phase(Phase::Setup)?;
        let slot = self.slot(number).ok_or(GameError::SlotOutOfRange(number))?;
        if !slot.is_owned_by(client) {
            return Err(GameError::NotSlotOwner(number));
        }
        self.update_slot(PlayerSlot::open(number))?;
        Ok(&self.slots[usize::from(number)])
    }

    /// Drops `client`'s ownership of every seat, keeping the seats occupied.
    /// Returns the seats that changed.
    pub fn detach_client(&mut self, client: ClientId) -> Vec<PlayerSlot> {
        let detached: Vec<PlayerSlot> = self
            .slots
            .iter()
            .filter(|s| s.is_owned_by(client))
            .map(|s| PlayerSlot {
                owner: None,
                ..s.clone()
            })
            .collect();
        for slot in &detached {
            // Seat numbers come from our own slot list.
            let _ = self.update_slot(slot.clone());
        }
        detached
    }

    /// Gives every AI seat that has lost its controller to `client`.
    /// Returns the seats that changed.
    pub fn adopt_orphaned_ai(&mut self, client: ClientId) -> Vec<PlayerSlot> {
        let adopted: Vec<PlayerSlot> = self
            .slots
            .iter()
            .filter(|s| s.slot_type == SlotType::Ai && s.owner.is_none())
            .map(|s| PlayerSlot {
                owner: Some(client),
                ..s.clone()
            })
            .collect();
        for slot in &adopted {
            let _ = self.update_slot(slot.clone());
        }
        adopted
    }

    /// Clears every seat owner.  Used when a saved game is served again,
    /// since none of the original connections exist any more.
    pub fn detach_all(&mut self) {
        let owners: Vec<ClientId> = self.slots.iter().filter_map(|s| s.owner).collect();
        for owner in owners {
            self.detach_client(owner);
        }
    }

    /// Moves from setup to running: every occupied seat becomes a player in
    /// seat order and the first one is activated.
    ///
    /// # Errors
    ///
    /// [`GameError::WrongPhase`] outside setup, [`GameError::NoPlayers`] when
    /// every seat is open.
    pub fn start(&mut self) -> Result<u8, GameError> {
        self.require_phase(Phase::Setup)?;
        let players: Vec<Player> = self
            .slots
            .iter()
            .filter(|s| s.is_occupied())
            .enumerate()
            .map(|(i, slot)| Player {
                index: i as u8,
                nickname: slot
                    .nickname
                    .clone()
                    .unwrap_or_else(|| format!("Player {}", slot.number + 1)),
                slot: slot.clone(),
                points: 0,
            })
            .collect();
        if players.is_empty() {
            return Err(GameError::NoPlayers);
        }
        self.players = players;
        self.phase = Phase::Running;
        self.turn = 1;
        self.active_player = Some(0);
        Ok(0)
    }

    /// Ends the active player's turn.
    ///
    /// # Errors
    ///
    /// [`GameError::WrongPhase`] unless running.
    pub fn advance_turn(&mut self) -> Result<TurnOutcome, GameError> {
        self.require_phase(Phase::Running)?;
        if self.turn_limit != 0 && self.turn >= self.turn_limit {
            self.phase = Phase::GameOver;
            self.active_player = None;
            return Ok(TurnOutcome::Finished);
        }
        let count = self.players.len() as u8;
        let next = self.active_player.map_or(0, |i| (i + 1) % count.max(1));
        self.turn += 1;
        self.active_player = Some(next);
        Ok(TurnOutcome::Next(next))
    }

    /// Returns `true` when `client` controls the active player's seat.
    pub fn is_turn_of(&self, client: ClientId) -> bool {
        self.active_player()
            .is_some_and(|p| p.slot.is_owned_by(client))
    }

    /// Adds points to a player and returns the new total.
    pub fn add_points(&mut self, index: u8, points: u32) -> Option<u32> {
        let player = self.players.get_mut(usize::from(index))?;
        player.points = player.points.saturating_add(points);
        Some(player.points)
    }

    /// Final standings, highest score first; ties keep turn order.
    pub fn ranking(&self) -> Vec<Ranking> {
        let mut ranking: Vec<Ranking> = self
            .players
            .iter()
            .map(|p| Ranking {
                player: p.index,
                nickname: p.nickname.clone(),
                points: p.points,
            })
            .collect();
        ranking.sort_by(|a, b| b.points.cmp(&a.points));
        ranking
    }

    fn require_phase(&self, expected: Phase) -> Result<(), GameError> {
        if self.phase != expected {
            return Err(GameError::WrongPhase {
                expected,
                actual: self.phase,
            });
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn two_player_game() -> (Game, ClientId, ClientId) {
        let mut game = Game::new(4, 3);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        game.claim_slot(0, alice, "alice").unwrap();
        game.claim_slot(2, bob, "bob").unwrap();
        (game, alice, bob)
    }

    #[test]
    fn test_new_game_has_open_slots_in_setup() {
        let game = Game::new(5, 10);
        assert_eq!(game.slots.len(), 5);
        assert!(game.slots.iter().all(|s| s.slot_type == SlotType::Open));
        assert_eq!(game.phase, Phase::Setup);
        assert!(game.active_player().is_none());
    }

    #[test]
    fn test_claim_slot_marks_owner() {
        let (game, alice, _) = two_player_game();
        let slot = game.slot(0).unwrap();
        assert_eq!(slot.slot_type, SlotType::Player);
        assert!(slot.is_owned_by(alice));
    }

    #[test]
    fn test_claim_slot_rejects_taken_seat() {
        let (mut game, _, _) = two_player_game();
        let result = game.claim_slot(0, Uuid::new_v4(), "mallory");
        assert_eq!(result.unwrap_err(), GameError::SlotTaken(0));
    }

    #[test]
    fn test_claim_slot_out_of_range() {
        let mut game = Game::new(2, 0);
        assert_eq!(
            game.claim_slot(9, Uuid::new_v4(), "x").unwrap_err(),
            GameError::SlotOutOfRange(9)
        );
    }

    #[test]
    fn test_detached_seat_can_be_reclaimed_by_same_nickname() {
        // Arrange
        let (mut game, alice, _) = two_player_game();
        game.start().unwrap();
        game.detach_all();
        let new_alice = Uuid::new_v4();

        // Act
        let taken_by_other = game.claim_slot(0, Uuid::new_v4(), "bob").map(|_| ());
        let reclaimed = game.claim_slot(0, new_alice, "alice");

        // Assert
        assert_eq!(taken_by_other.unwrap_err(), GameError::SlotTaken(0));
        assert!(reclaimed.unwrap().is_owned_by(new_alice));
        assert!(game.player(0).unwrap().slot.is_owned_by(new_alice));
        assert!(!game.player(0).unwrap().slot.is_owned_by(alice));
    }

    #[test]
    fn test_orphaned_ai_seat_is_adopted_with_its_player() {
        // Arrange
        let (mut game, _, bob) = two_player_game();
        game.seat_ai(3, bob).unwrap();
        game.start().unwrap();
        game.detach_all();
        let new_bob = Uuid::new_v4();

        // Act
        let adopted = game.adopt_orphaned_ai(new_bob);

        // Assert
        assert_eq!(adopted.len(), 1);
        assert_eq!(adopted[0].number, 3);
        assert!(game.slot(3).unwrap().is_owned_by(new_bob));
        assert!(game.player(2).unwrap().slot.is_owned_by(new_bob));
        assert!(game.slot(0).unwrap().owner.is_none());
        assert!(game.adopt_orphaned_ai(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn test_start_builds_players_in_seat_order() {
        let (mut game, _, bob) = two_player_game();
        game.seat_ai(3, bob).unwrap();

        let first = game.start().unwrap();

        assert_eq!(first, 0);
        assert_eq!(game.players.len(), 3);
        assert_eq!(game.players[1].slot.number, 2);
        assert_eq!(game.players[2].slot.slot_type, SlotType::Ai);
        assert_eq!(game.phase, Phase::Running);
    }

    #[test]
    fn test_start_without_players_fails() {
        let mut game = Game::new(3, 0);
        assert_eq!(game.start().unwrap_err(), GameError::NoPlayers);
    }

    #[test]
    fn test_advance_turn_wraps_and_finishes_at_limit() {
        let (mut game, _, _) = two_player_game();
        game.start().unwrap();

        assert_eq!(game.advance_turn().unwrap(), TurnOutcome::Next(1));
        assert_eq!(game.advance_turn().unwrap(), TurnOutcome::Next(0));
        assert_eq!(game.advance_turn().unwrap(), TurnOutcome::Finished);
        assert!(game.is_over());
        assert!(game.active_player().is_none());
    }

    #[test]
    fn test_release_slot_requires_owner() {
        let (mut game, alice, bob) = two_player_game();
        assert_eq!(
            game.release_slot(0, bob).unwrap_err(),
            GameError::NotSlotOwner(0)
        );
        assert_eq!(game.release_slot(0, alice).unwrap().slot_type, SlotType::Open);
    }

    #[test]
    fn test_is_turn_of_follows_active_player() {
        let (mut game, alice, bob) = two_player_game();
        game.start().unwrap();
        assert!(game.is_turn_of(alice));
        game.advance_turn().unwrap();
        assert!(game.is_turn_of(bob));
    }

    #[test]
    fn test_ranking_orders_by_points() {
        let (mut game, _, _) = two_player_game();
        game.start().unwrap();
        game.add_points(1, 12);
        game.add_points(0, 3);

        let ranking = game.ranking();

        assert_eq!(ranking[0].nickname, "bob");
        assert_eq!(ranking[0].points, 12);
        assert_eq!(ranking[1].nickname, "alice");
    }
}
