//! The presentation interface used by the session controller.
//!
//! Every method is called from the UI context only.  Implementations own
//! their panels, dialogs and sounds; the controller only decides *when* to
//! call them.

use meeple_core::{Game, Player, PlayerSlot, Ranking};

/// Which close-confirmation question to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseConfirmation {
    /// This session runs the server; closing drops everyone.
    Hosting,
    /// This session joined someone else's game.
    Leaving,
}

impl CloseConfirmation {
    pub fn message(self) -> &'static str {
        match self {
            CloseConfirmation::Hosting => {
                "Game is running. Do you really want to quit game and also disconnect all other players?"
            }
            CloseConfirmation::Leaving => "Game is running. Do you really want to leave it?",
        }
    }
}

/// Everything the controller shows to the user.
#[cfg_attr(test, mockall::automock)]
pub trait Presentation: Send {
    /// Seat selection for a game in setup.  `hosting` allows editing seats
    /// other than one's own.
    fn show_create_game_panel(&mut self, hosting: bool, game: &Game);
    fn show_connect_panel(&mut self);
    fn show_game(&mut self, game: &Game);
    fn clear_actions(&mut self);
    fn set_game_running(&mut self, running: bool);
    fn set_discarded_enabled(&mut self, enabled: bool);
    fn show_error(&mut self, message: &str);
    /// Returns `true` when the user agrees to close.
    fn confirm_close(&mut self, confirmation: CloseConfirmation) -> bool;
    /// Closes the game view and any auxiliary dialogs.
    fn close_game_view(&mut self);
    fn update_slot(&mut self, slot: &PlayerSlot);
    fn show_active_player(&mut self, player: &Player, turn: u32);
    fn show_score(&mut self, player: u8, points: u32);
    fn show_actions(&mut self, player: u8, actions: &[String]);
    fn show_discarded_tile(&mut self, tile: &str);
    fn show_warning(&mut self, text: &str);
    fn show_chat(&mut self, nickname: &str, text: &str);
    fn beep(&mut self);
    fn show_game_over(&mut self, ranking: &[Ranking]);
}
