//! A presentation that records every call, for tests.
//!
//! Clones share one log, so a test keeps a clone while the controller owns
//! the boxed original.

use std::sync::{Arc, Mutex};

use meeple_core::{Game, Player, PlayerSlot, Ranking};

use crate::application::presentation::{CloseConfirmation, Presentation};

/// One recorded [`Presentation`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationCall {
    CreateGamePanel { hosting: bool, game: Game },
    ConnectPanel,
    Game(Game),
    ClearActions,
    GameRunning(bool),
    DiscardedEnabled(bool),
    Error(String),
    ConfirmClose(CloseConfirmation),
    CloseGameView,
    SlotUpdated(PlayerSlot),
    ActivePlayer { player: Player, turn: u32 },
    Score { player: u8, points: u32 },
    Actions { player: u8, actions: Vec<String> },
    DiscardedTile(String),
    Warning(String),
    Chat { nickname: String, text: String },
    Beep,
    GameOver(Vec<Ranking>),
}

#[derive(Debug, Clone)]
pub struct RecordingPresentation {
    calls: Arc<Mutex<Vec<PresentationCall>>>,
    confirm: Arc<Mutex<bool>>,
}

impl Default for RecordingPresentation {
    fn default() -> Self {
        Self::new(true)
    }
}

impl RecordingPresentation {
    /// `confirm` is the answer to every close confirmation.
    pub fn new(confirm: bool) -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            confirm: Arc::new(Mutex::new(confirm)),
        }
    }

    pub fn set_confirm(&self, confirm: bool) {
        if let Ok(mut answer) = self.confirm.lock() {
            *answer = confirm;
        }
    }

    /// Every call so far, oldest first.
    pub fn calls(&self) -> Vec<PresentationCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Calls matching `pred`.
    pub fn calls_where(&self, pred: impl Fn(&PresentationCall) -> bool) -> Vec<PresentationCall> {
        self.calls().into_iter().filter(|c| pred(c)).collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PresentationCall::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.clear();
        }
    }

    fn record(&self, call: PresentationCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

impl Presentation for RecordingPresentation {
    fn show_create_game_panel(&mut self, hosting: bool, game: &Game) {
        self.record(PresentationCall::CreateGamePanel {
            hosting,
            game: game.clone(),
        });
    }

    fn show_connect_panel(&mut self) {
        self.record(PresentationCall::ConnectPanel);
    }

    fn show_game(&mut self, game: &Game) {
        self.record(PresentationCall::Game(game.clone()));
    }

    fn clear_actions(&mut self) {
        self.record(PresentationCall::ClearActions);
    }

    fn set_game_running(&mut self, running: bool) {
        self.record(PresentationCall::GameRunning(running));
    }

    fn set_discarded_enabled(&mut self, enabled: bool) {
        self.record(PresentationCall::DiscardedEnabled(enabled));
    }

    fn show_error(&mut self, message: &str) {
        self.record(PresentationCall::Error(message.to_string()));
    }

    fn confirm_close(&mut self, confirmation: CloseConfirmation) -> bool {
        self.record(PresentationCall::ConfirmClose(confirmation));
        self.confirm.lock().map(|answer| *answer).unwrap_or(false)
    }

    fn close_game_view(&mut self) {
        self.record(PresentationCall::CloseGameView);
    }

    fn update_slot(&mut self, slot: &PlayerSlot) {
        self.record(PresentationCall::SlotUpdated(slot.clone()));
    }

    fn show_active_player(&mut self, player: &Player, turn: u32) {
        self.record(PresentationCall::ActivePlayer {
            player: player.clone(),
            turn,
        });
    }

    fn show_score(&mut self, player: u8, points: u32) {
        self.record(PresentationCall::Score { player, points });
    }

    fn show_actions(&mut self, player: u8, actions: &[String]) {
        self.record(PresentationCall::Actions {
            player,
            actions: actions.to_vec(),
        });
    }

    fn show_discarded_tile(&mut self, tile: &str) {
        self.record(PresentationCall::DiscardedTile(tile.to_string()));
    }

    fn show_warning(&mut self, text: &str) {
        self.record(PresentationCall::Warning(text.to_string()));
    }

    fn show_chat(&mut self, nickname: &str, text: &str) {
        self.record(PresentationCall::Chat {
            nickname: nickname.to_string(),
            text: text.to_string(),
        });
    }

    fn beep(&mut self) {
        self.record(PresentationCall::Beep);
    }

    fn show_game_over(&mut self, ranking: &[Ranking]) {
        self.record(PresentationCall::GameOver(ranking.to_vec()));
    }
}
