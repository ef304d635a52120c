//! SessionController: the client's session lifecycle and its view of the game.
//!
//! # State machine
//!
//! ```text
//!            create_game / load_game / join_game
//! Closed ──────────────────────────────────────► Connecting ──► InGame
//!   ▲                                               │              │
//!   └──────── connection failure ◄──────────────────┘              │
//!   └──────── close_game ◄─────────────────────────────────────────┘
//! ```
//!
//! `close_game` is the only way back to `Closed` and may be called in any
//! state.
//!
//! # Threading
//!
//! The controller is not shared.  It lives inside the UI task and every
//! method runs there, so the cached active player and the game view need no
//! locks.  Network tasks reach it only through queued `UiTask`s, which carry
//! the *epoch* of the connection that produced them.  Each connect and each
//! close starts a new epoch, so anything still queued from an older
//! connection is ignored.

use std::path::{Path, PathBuf};

use meeple_core::{
    domain::game::{DEFAULT_SLOT_COUNT, DEFAULT_TURN_LIMIT},
    protocol::messages::{ClientRequest, GameEvent, SessionEvent, UiEvent},
    ClientId, Game, Phase, Player, PlayerPalette, Rgb, SlotType, Snapshot, SnapshotEncoding,
    DEFAULT_PORT,
};
use tracing::{debug, error, info, warn};

use super::ports::{
    Connection, GameHost, HostSeed, ServerConnection, SessionError, SessionTransport,
};
use super::presentation::{CloseConfirmation, Presentation};

/// Address a hosting session uses to reach its own embedded server.
pub const LOCALHOST: &str = "127.0.0.1";

/// Lifecycle state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Connecting,
    InGame,
}

/// Result of a user-initiated transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Completed,
    /// The user declined to close the running game; nothing changed.
    Declined,
    /// The error was reported and the session is closed.
    Failed,
}

/// Settings the controller reads.  Built from the configuration file at
/// startup and never changed afterwards.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub nickname: String,
    pub confirm_game_close: bool,
    pub play_beep: bool,
    /// Port an embedded server binds; `0` picks a free one.
    pub server_port: u16,
    pub save_encoding: SnapshotEncoding,
    pub palette: PlayerPalette,
    /// Seats in a newly created game.
    pub slot_count: usize,
    pub turn_limit: u32,
}

impl SessionSettings {
    pub fn new(nickname: impl Into<String>, palette: PlayerPalette) -> Self {
        Self {
            nickname: nickname.into(),
            confirm_game_close: true,
            play_beep: true,
            server_port: DEFAULT_PORT,
            save_encoding: SnapshotEncoding::default(),
            palette,
            slot_count: DEFAULT_SLOT_COUNT,
            turn_limit: DEFAULT_TURN_LIMIT,
        }
    }
}

/// The session controller.
pub struct SessionController {
    settings: SessionSettings,
    presentation: Box<dyn Presentation>,
    transport: Box<dyn SessionTransport>,
    state: SessionState,
    epoch: u64,
    game: Option<Game>,
    /// Copy of the game's active player, refreshed by pushed events.
    active_player: Option<Player>,
    server: Option<Box<dyn ServerConnection>>,
    embedded: Option<Box<dyn GameHost>>,
}

impl SessionController {
    pub fn new(
        settings: SessionSettings,
        presentation: Box<dyn Presentation>,
        transport: Box<dyn SessionTransport>,
    ) -> Self {
        Self {
            settings,
            presentation,
            transport,
            state: SessionState::Closed,
            epoch: 0,
            game: None,
            active_player: None,
            server: None,
            embedded: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Epoch of the current connection.  Events tagged with any other
    /// epoch are ignored.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn game(&self) -> Option<&Game> {
        self.game.as_ref()
    }

    pub fn active_player(&self) -> Option<&Player> {
        self.active_player.as_ref()
    }

    pub fn is_hosting(&self) -> bool {
        self.embedded.is_some()
    }

    /// Port of the embedded server while hosting.
    pub fn hosted_port(&self) -> Option<u16> {
        self.embedded.as_ref().map(|host| host.local_port())
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.server.as_ref().map(|s| s.client_id())
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Hosts a new game: starts an embedded server and connects to it.
    pub async fn create_game(&mut self) -> TransitionOutcome {
        if !self.close_game(false).await {
            return TransitionOutcome::Declined;
        }
        let seed = HostSeed::Blank {
            slots: self.settings.slot_count,
            turn_limit: self.settings.turn_limit,
        };
        self.host_and_connect(seed).await
    }

    /// Hosts a saved game read from `path`.
    pub async fn load_game(&mut self, path: &Path) -> TransitionOutcome {
        if !self.close_game(false).await {
            return TransitionOutcome::Declined;
        }
        let snapshot = match Snapshot::load(path) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.report(&SessionError::from(e));
                return TransitionOutcome::Failed;
            }
        };
        info!(
            "loaded game {} saved by {} from {}",
            snapshot.game.id,
            snapshot.client_id,
            path.display()
        );
        self.host_and_connect(HostSeed::Saved(snapshot)).await
    }

    /// Joins a game hosted elsewhere.
    pub async fn join_game(&mut self, host: &str, port: u16) -> TransitionOutcome {
        if !self.close_game(false).await {
            return TransitionOutcome::Declined;
        }
        self.connect(host, port).await
    }

    /// Closes the running game, if the user agrees, and shows the connect
    /// panel.  Returns `false` when declined.
    pub async fn show_connect_panel(&mut self) -> bool {
        if !self.close_game(false).await {
            return false;
        }
        self.presentation.show_connect_panel();
        true
    }

    /// Connects to `host:port` and makes the connection the session's
    /// server.  Does not ask to close a running game; callers do that.
    ///
    /// On failure the error is reported once and the session is closed.
    pub async fn connect(&mut self, host: &str, port: u16) -> TransitionOutcome {
        self.epoch += 1;
        self.state = SessionState::Connecting;
        info!("connecting to {host}:{port}");

        let connected = self
            .transport
            .connect(host, port, &self.settings.nickname, self.epoch)
            .await;
        match connected {
            Ok(connection) => {
                self.attach(connection);
                TransitionOutcome::Completed
            }
            Err(e) => {
                self.fail(e).await;
                TransitionOutcome::Failed
            }
        }
    }

    /// Ends the current session.
    ///
    /// Unless `force` is set, asks first when configured to and a game is
    /// still in progress; returns `false` if the user declines, leaving
    /// everything as it was.  Otherwise tears down the connection and any
    /// embedded server and returns `true`.  Closing a closed session is a
    /// no-op that returns `true`.
    pub async fn close_game(&mut self, force: bool) -> bool {
        if !force && self.settings.confirm_game_close && self.game_in_progress() {
            let confirmation = if self.is_hosting() {
                CloseConfirmation::Hosting
            } else {
                CloseConfirmation::Leaving
            };
            if !self.presentation.confirm_close(confirmation) {
                debug!("close declined");
                return false;
            }
        }

        if let Some(server) = self.server.take() {
            server.send(ClientRequest::Goodbye);
        }
        if let Some(mut host) = self.embedded.take() {
            host.stop().await;
        }
        if self.state != SessionState::Closed {
            info!("session closed");
        }
        self.epoch += 1;
        self.state = SessionState::Closed;
        self.game = None;
        self.active_player = None;

        self.presentation.set_game_running(false);
        self.presentation.close_game_view();
        self.presentation.set_discarded_enabled(false);
        true
    }

    /// Saves the current game to `path` (the snapshot extension is added if
    /// missing).  Returns the path written, or `None` after reporting the
    /// failure.
    pub fn save_game(&mut self, path: &Path) -> Option<PathBuf> {
        let saved = match (&self.game, &self.server) {
            (Some(game), Some(server)) => Snapshot::new(game.clone(), server.client_id())
                .save(path, self.settings.save_encoding)
                .map_err(SessionError::from),
            _ => Err(SessionError::NoGame),
        };
        match saved {
            Ok(written) => {
                info!("game saved to {}", written.display());
                Some(written)
            }
            Err(e) => {
                self.report(&e);
                None
            }
        }
    }

    /// Closes the session as the user asked.  Returns `true` when the
    /// process should exit.
    pub async fn quit(&mut self) -> bool {
        self.close_game(false).await
    }

    /// Whether the participant whose turn it is sits at this client.
    pub fn is_session_player_active(&self) -> bool {
        let Some(active) = &self.active_player else {
            return false;
        };
        if active.slot.slot_type != SlotType::Player {
            return false;
        }
        self.server
            .as_ref()
            .is_some_and(|server| server.is_local_player(active))
    }

    // ── Player colours ────────────────────────────────────────────────────────

    pub fn player_color(&self, slot: u8) -> Rgb {
        self.settings.palette.color_for(slot)
    }

    pub fn second_tunnel_color(&self, slot: u8) -> Rgb {
        self.settings.palette.second_color_for(slot)
    }

    pub fn active_player_color(&self) -> Option<Rgb> {
        self.active_player
            .as_ref()
            .map(|p| self.player_color(p.slot.number))
    }

    // ── Outbound requests ─────────────────────────────────────────────────────

    pub fn take_slot(&mut self, number: u8) {
        let nickname = self.settings.nickname.clone();
        self.request(ClientRequest::TakeSlot { number, nickname });
    }

    pub fn set_slot_ai(&mut self, number: u8) {
        self.request(ClientRequest::SetSlotAi { number });
    }

    pub fn leave_slot(&mut self, number: u8) {
        self.request(ClientRequest::LeaveSlot { number });
    }

    pub fn start_game(&mut self) {
        self.request(ClientRequest::StartGame);
    }

    pub fn end_turn(&mut self, points: u32) {
        self.presentation.clear_actions();
        self.request(ClientRequest::EndTurn { points });
    }

    pub fn discard_tile(&mut self, tile: impl Into<String>) {
        self.request(ClientRequest::DiscardTile { tile: tile.into() });
    }

    pub fn chat(&mut self, text: impl Into<String>) {
        self.request(ClientRequest::Chat { text: text.into() });
    }

    fn request(&mut self, request: ClientRequest) {
        match &self.server {
            Some(server) => server.send(request),
            None => warn!("not connected; dropping {request:?}"),
        }
    }

    // ── Pushed events ─────────────────────────────────────────────────────────

    /// Applies one event pushed by the server.
    pub fn handle_event(&mut self, epoch: u64, event: SessionEvent) {
        if epoch != self.epoch || self.state != SessionState::InGame {
            debug!(
                "ignoring stale {} event from epoch {epoch} (current {})",
                event.kind(),
                self.epoch
            );
            return;
        }
        match event {
            SessionEvent::Game(event) => self.apply_game_event(event),
            SessionEvent::Ui(event) => self.apply_ui_event(event),
        }
    }

    /// The connection of `epoch` ended without the session closing it.
    pub async fn handle_connection_lost(&mut self, epoch: u64, reason: &str) {
        if epoch != self.epoch || self.state == SessionState::Closed {
            debug!("ignoring loss of stale connection from epoch {epoch}");
            return;
        }
        self.fail(SessionError::ConnectionLost(reason.to_string()))
            .await;
    }

    fn apply_game_event(&mut self, event: GameEvent) {
        let Some(game) = self.game.as_mut() else {
            return;
        };
        match event {
            GameEvent::SlotChanged(slot) => {
                if let Err(e) = game.update_slot(slot.clone()) {
                    warn!("ignoring slot update: {e}");
                    return;
                }
                if let Some(active) = self
                    .active_player
                    .as_mut()
                    .filter(|p| p.slot.number == slot.number)
                {
                    active.slot = slot.clone();
                }
                self.presentation.update_slot(&slot);
            }
            GameEvent::GameStarted(started) => {
                info!("game {} started", started.id);
                self.active_player = None;
                self.presentation.show_game(&started);
                self.presentation.set_discarded_enabled(true);
                *game = started;
            }
            GameEvent::PlayerActivated { player, turn } => {
                game.active_player = Some(player);
                game.turn = turn;
                self.active_player = game.player(player).cloned();
                self.presentation.clear_actions();
                if let Some(active) = &self.active_player {
                    self.presentation.show_active_player(active, turn);
                }
                if self.is_session_player_active() {
                    self.beep();
                }
            }
            GameEvent::ScoreChanged { player, points } => {
                if let Some(p) = game.players.get_mut(usize::from(player)) {
                    p.points = points;
                }
                if let Some(active) = self.active_player.as_mut().filter(|p| p.index == player) {
                    active.points = points;
                }
                self.presentation.show_score(player, points);
            }
            GameEvent::TileDiscarded { tile } => {
                game.discarded.push(tile.clone());
                self.presentation.show_discarded_tile(&tile);
            }
            GameEvent::GameOver { ranking } => {
                info!("game {} over", game.id);
                game.phase = Phase::GameOver;
                game.active_player = None;
                self.active_player = None;
                self.presentation.clear_actions();
                self.presentation.show_game_over(&ranking);
            }
        }
    }

    fn apply_ui_event(&mut self, event: UiEvent) {
        match event {
            UiEvent::ActionsOffered { player, actions } => {
                let ours = self.active_player.as_ref().is_some_and(|p| p.index == player)
                    && self.is_session_player_active();
                if ours {
                    self.presentation.show_actions(player, &actions);
                } else {
                    debug!("actions for player {player} are not ours");
                }
            }
            UiEvent::Warning { text } => {
                warn!("server warning: {text}");
                self.presentation.show_warning(&text);
            }
            UiEvent::Chat { nickname, text } => self.presentation.show_chat(&nickname, &text),
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    async fn host_and_connect(&mut self, seed: HostSeed) -> TransitionOutcome {
        self.state = SessionState::Connecting;
        match self.transport.host(seed, self.settings.server_port).await {
            Ok(host) => {
                let port = host.local_port();
                self.embedded = Some(host);
                self.connect(LOCALHOST, port).await
            }
            Err(e) => {
                self.fail(e).await;
                TransitionOutcome::Failed
            }
        }
    }

    fn attach(&mut self, connection: Connection) {
        let Connection { server, game } = connection;
        info!("joined game {} as client {}", game.id, server.client_id());

        self.active_player = game.active_player().cloned();
        self.server = Some(server);
        self.state = SessionState::InGame;

        self.presentation.set_game_running(true);
        match game.phase {
            Phase::Setup => self
                .presentation
                .show_create_game_panel(self.embedded.is_some(), &game),
            Phase::Running | Phase::GameOver => {
                self.presentation.show_game(&game);
                self.presentation.set_discarded_enabled(true);
            }
        }

        // Seats of a saved game wait for players with the same nickname.
        let reclaim: Vec<u8> = game
            .slots
            .iter()
            .filter(|s| {
                s.slot_type == SlotType::Player
                    && s.owner.is_none()
                    && s.nickname.as_deref() == Some(self.settings.nickname.as_str())
            })
            .map(|s| s.number)
            .collect();
        self.game = Some(game);
        for number in reclaim {
            self.take_slot(number);
        }
    }

    fn game_in_progress(&self) -> bool {
        self.game.as_ref().is_some_and(|g| !g.is_over())
    }

    async fn fail(&mut self, err: SessionError) {
        self.report(&err);
        self.close_game(true).await;
    }

    fn report(&mut self, err: &SessionError) {
        error!("{err}");
        self.presentation.show_error(&err.to_string());
    }

    fn beep(&mut self) {
        if self.settings.play_beep {
            self.presentation.beep();
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
