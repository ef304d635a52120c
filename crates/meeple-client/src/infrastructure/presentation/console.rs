//! Headless presentation that prints to a line-oriented writer.

use std::io::{self, Write};

use meeple_core::{Game, Phase, Player, PlayerSlot, Ranking, SlotType};
use tracing::{debug, error, info, warn};

use crate::application::presentation::{CloseConfirmation, Presentation};

/// Prints what a graphical client would show.
///
/// Close confirmations are not interactive: stdin carries commands, so the
/// answer is fixed when the presentation is built.
pub struct ConsolePresentation<W: Write + Send = io::Stdout> {
    out: W,
    assume_yes: bool,
}

impl ConsolePresentation<io::Stdout> {
    pub fn stdout(assume_yes: bool) -> Self {
        Self::new(io::stdout(), assume_yes)
    }
}

impl<W: Write + Send> ConsolePresentation<W> {
    pub fn new(out: W, assume_yes: bool) -> Self {
        Self { out, assume_yes }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            debug!("console write failed: {e}");
        }
    }
}

fn describe_slot(slot: &PlayerSlot) -> String {
    let who = slot.nickname.as_deref().unwrap_or("-");
    match slot.slot_type {
        SlotType::Open => format!("  [{}] open", slot.number),
        SlotType::Ai => format!("  [{}] {who} (AI)", slot.number),
        SlotType::Player if slot.owner.is_none() => format!("  [{}] {who} (away)", slot.number),
        SlotType::Player => format!("  [{}] {who}", slot.number),
    }
}

impl<W: Write + Send> Presentation for ConsolePresentation<W> {
    fn show_create_game_panel(&mut self, hosting: bool, game: &Game) {
        let role = if hosting { "hosting" } else { "joined" };
        self.line(&format!("game {} ({role}), seats:", game.id));
        for slot in &game.slots {
            self.line(&describe_slot(slot));
        }
    }

    fn show_connect_panel(&mut self) {
        self.line("join a game with: join <host> [port]");
    }

    fn show_game(&mut self, game: &Game) {
        let phase = match game.phase {
            Phase::Setup => "setup",
            Phase::Running => "running",
            Phase::GameOver => "over",
        };
        self.line(&format!("game {} {phase}, turn {}", game.id, game.turn));
        for player in &game.players {
            self.line(&format!("  {} {}: {} points", player.index, player.nickname, player.points));
        }
    }

    fn clear_actions(&mut self) {
        debug!("actions cleared");
    }

    fn set_game_running(&mut self, running: bool) {
        debug!("game running: {running}");
    }

    fn set_discarded_enabled(&mut self, enabled: bool) {
        debug!("discarded tiles view enabled: {enabled}");
    }

    fn show_error(&mut self, message: &str) {
        error!("{message}");
        self.line(&format!("error: {message}"));
    }

    fn confirm_close(&mut self, confirmation: CloseConfirmation) -> bool {
        let answer = if self.assume_yes { "yes" } else { "no" };
        info!("{} -> {answer}", confirmation.message());
        self.line(&format!("{} [{answer}]", confirmation.message()));
        if !self.assume_yes {
            self.line("use 'close!' or 'quit!' to close it anyway");
        }
        self.assume_yes
    }

    fn close_game_view(&mut self) {
        debug!("game view closed");
    }

    fn update_slot(&mut self, slot: &PlayerSlot) {
        self.line(&describe_slot(slot));
    }

    fn show_active_player(&mut self, player: &Player, turn: u32) {
        self.line(&format!("turn {turn}: {} to play", player.nickname));
    }

    fn show_score(&mut self, player: u8, points: u32) {
        self.line(&format!("player {player} now has {points} points"));
    }

    fn show_actions(&mut self, _player: u8, actions: &[String]) {
        self.line(&format!("your turn: {}", actions.join(", ")));
    }

    fn show_discarded_tile(&mut self, tile: &str) {
        self.line(&format!("discarded {tile}"));
    }

    fn show_warning(&mut self, text: &str) {
        warn!("{text}");
        self.line(&format!("warning: {text}"));
    }

    fn show_chat(&mut self, nickname: &str, text: &str) {
        self.line(&format!("<{nickname}> {text}"));
    }

    fn beep(&mut self) {
        // BEL
        let _ = self.out.write_all(b"\x07");
        let _ = self.out.flush();
    }

    fn show_game_over(&mut self, ranking: &[Ranking]) {
        self.line("game over");
        for (place, rank) in ranking.iter().enumerate() {
            self.line(&format!("  {}. {} {}", place + 1, rank.nickname, rank.points));
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
