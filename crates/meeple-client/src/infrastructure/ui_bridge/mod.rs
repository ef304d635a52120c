//! The UI task queue.
//!
//! Every change to session state happens on one task, the *UI task*, which
//! owns the [`SessionController`].  Work reaches it as [`UiTask`]s on a FIFO
//! channel:
//!
//! ```text
//! network reader ──EventMarshaller──┐
//! network reader ──EventMarshaller──┼──► UiQueue ──► run_ui_loop ──► SessionController
//! stdin / menus  ──UiQueue::submit──┘
//! ```
//!
//! Submitting never blocks and never runs the work inline, so a network task
//! cannot stall on the UI or observe half-applied state.  Tasks from one
//! producer run in the order they were queued.
//!
//! # Epochs
//!
//! Each connection gets an [`EventMarshaller`] stamped with the session epoch
//! current when the connection was opened.  Once the session closes or
//! reconnects, the controller's epoch moves on and whatever the old
//! connection still had queued is discarded when it is applied.

use std::ops::ControlFlow;
use std::path::PathBuf;

use meeple_core::SessionEvent;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::application::session::SessionController;

// ── Tasks ─────────────────────────────────────────────────────────────────────

/// A user action, queued from a menu, a key binding or the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    CreateGame,
    LoadGame(PathBuf),
    JoinGame { host: String, port: u16 },
    ShowConnectPanel,
    /// Closes the session; `force` skips the confirmation.
    CloseGame { force: bool },
    SaveGame(PathBuf),
    TakeSlot(u8),
    SetSlotAi(u8),
    LeaveSlot(u8),
    StartGame,
    EndTurn { points: u32 },
    DiscardTile(String),
    Chat(String),
    /// Closes the session after confirmation and exits the UI task.
    Quit,
    /// Closes the session without asking and exits the UI task.
    Shutdown,
}

/// A unit of work for the UI task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiTask {
    /// An event pushed by the server on the connection of `epoch`.
    Event { epoch: u64, event: SessionEvent },
    /// The connection of `epoch` ended on its own.
    ConnectionLost { epoch: u64, reason: String },
    Command(UiCommand),
}

// ── Queue ─────────────────────────────────────────────────────────────────────

/// Producer side of the UI task queue.
#[derive(Debug, Clone)]
pub struct UiQueue {
    tx: mpsc::UnboundedSender<UiTask>,
}

impl UiQueue {
    /// Creates the queue and the receiver [`run_ui_loop`] drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiTask>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queues a user command.  Returns `false` once the UI task has exited.
    pub fn submit(&self, command: UiCommand) -> bool {
        self.tx.send(UiTask::Command(command)).is_ok()
    }

    /// Returns a marshaller that tags everything it queues with `epoch`.
    pub fn marshaller(&self, epoch: u64) -> EventMarshaller {
        EventMarshaller {
            epoch,
            tx: self.tx.clone(),
        }
    }
}

/// Hands events from one connection's network task to the UI task.
#[derive(Debug, Clone)]
pub struct EventMarshaller {
    epoch: u64,
    tx: mpsc::UnboundedSender<UiTask>,
}

impl EventMarshaller {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Queues `event`; returns immediately.
    pub fn dispatch(&self, event: SessionEvent) {
        let task = UiTask::Event {
            epoch: self.epoch,
            event,
        };
        if self.tx.send(task).is_err() {
            debug!("UI task gone; dropping event");
        }
    }

    /// Reports that the connection ended without the session asking for it.
    pub fn connection_lost(&self, reason: impl Into<String>) {
        let task = UiTask::ConnectionLost {
            epoch: self.epoch,
            reason: reason.into(),
        };
        if self.tx.send(task).is_err() {
            debug!("UI task gone; dropping connection loss");
        }
    }
}

// ── UI task ───────────────────────────────────────────────────────────────────

/// Applies queued tasks to `controller` one at a time until a confirmed
/// [`UiCommand::Quit`], a [`UiCommand::Shutdown`], or until every producer
/// is gone.  Returns the controller so callers can inspect or reuse it.
pub async fn run_ui_loop(
    mut controller: SessionController,
    mut rx: mpsc::UnboundedReceiver<UiTask>,
) -> SessionController {
    while let Some(task) = rx.recv().await {
        match task {
            UiTask::Event { epoch, event } => controller.handle_event(epoch, event),
            UiTask::ConnectionLost { epoch, reason } => {
                controller.handle_connection_lost(epoch, &reason).await;
            }
            UiTask::Command(command) => {
                if apply_command(&mut controller, command).await.is_break() {
                    return controller;
                }
            }
        }
    }
    debug!("UI queue closed");
    controller
}

/// Runs one command.  Breaks when the UI task should exit.
async fn apply_command(controller: &mut SessionController, command: UiCommand) -> ControlFlow<()> {
    debug!("command {command:?}");
    match command {
        UiCommand::CreateGame => {
            controller.create_game().await;
        }
        UiCommand::LoadGame(path) => {
            controller.load_game(&path).await;
        }
        UiCommand::JoinGame { host, port } => {
            controller.join_game(&host, port).await;
        }
        UiCommand::ShowConnectPanel => {
            controller.show_connect_panel().await;
        }
        UiCommand::CloseGame { force } => {
            controller.close_game(force).await;
        }
        UiCommand::SaveGame(path) => {
            controller.save_game(&path);
        }
        UiCommand::TakeSlot(number) => controller.take_slot(number),
        UiCommand::SetSlotAi(number) => controller.set_slot_ai(number),
        UiCommand::LeaveSlot(number) => controller.leave_slot(number),
        UiCommand::StartGame => controller.start_game(),
        UiCommand::EndTurn { points } => controller.end_turn(points),
        UiCommand::DiscardTile(tile) => controller.discard_tile(tile),
        UiCommand::Chat(text) => controller.chat(text),
        UiCommand::Quit => {
            if controller.quit().await {
                info!("quit");
                return ControlFlow::Break(());
            }
        }
        UiCommand::Shutdown => {
            controller.close_game(true).await;
            info!("shut down");
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use meeple_core::{
        ClientId, ClientRequest, Game, GameEvent, Player, PlayerPalette, PlayerSlot, SlotType,
        UiEvent,
    };
    use tokio::task::JoinHandle;
    use uuid::Uuid;

    use crate::application::ports::{
        Connection, GameHost, HostSeed, ServerConnection, SessionError, SessionTransport,
    };
    use crate::application::presentation::CloseConfirmation;
    use crate::application::session::{SessionSettings, SessionState};
    use crate::infrastructure::presentation::{PresentationCall, RecordingPresentation};

    const WAIT: Duration = Duration::from_secs(5);

    // ── Test doubles ──────────────────────────────────────────────────────────

    struct IdleHost;

    #[async_trait]
    impl GameHost for IdleHost {
        fn local_port(&self) -> u16 {
            4242
        }

        async fn stop(&mut self) {}
    }

    struct MutedConnection(ClientId);

    impl ServerConnection for MutedConnection {
        fn client_id(&self) -> ClientId {
            self.0
        }

        fn is_local_player(&self, player: &Player) -> bool {
            player.slot.is_owned_by(self.0)
        }

        fn send(&self, _request: ClientRequest) {}
    }

    /// Hands the marshaller of every new connection to the test, which then
    /// plays the server's part.
    struct QueueTransport {
        queue: UiQueue,
        marshallers: mpsc::UnboundedSender<EventMarshaller>,
    }

    #[async_trait]
    impl SessionTransport for QueueTransport {
        async fn host(&self, _seed: HostSeed, _port: u16) -> Result<Box<dyn GameHost>, SessionError> {
            Ok(Box::new(IdleHost))
        }

        async fn connect(
            &self,
            _host: &str,
            _port: u16,
            _nickname: &str,
            epoch: u64,
        ) -> Result<Connection, SessionError> {
            let _ = self.marshallers.send(self.queue.marshaller(epoch));
            Ok(Connection {
                server: Box::new(MutedConnection(Uuid::new_v4())),
                game: Game::new(4, 10),
            })
        }
    }

    /// A UI task running on its own tokio task.
    struct RunningLoop {
        queue: UiQueue,
        marshallers: mpsc::UnboundedReceiver<EventMarshaller>,
        view: RecordingPresentation,
        ui: JoinHandle<SessionController>,
    }

    impl RunningLoop {
        fn start(confirm: bool) -> Self {
            let (queue, rx) = UiQueue::new();
            let (marshaller_tx, marshallers) = mpsc::unbounded_channel();
            let view = RecordingPresentation::new(confirm);
            let palette = PlayerPalette::from_names(["red", "green", "blue"]).unwrap();
            let transport = QueueTransport {
                queue: queue.clone(),
                marshallers: marshaller_tx,
            };
            let controller = SessionController::new(
                SessionSettings::new("ada", palette),
                Box::new(view.clone()),
                Box::new(transport),
            );
            let ui = tokio::spawn(run_ui_loop(controller, rx));
            Self {
                queue,
                marshallers,
                view,
                ui,
            }
        }

        /// Queues `CreateGame` and returns the marshaller of the connection
        /// it opens.
        async fn create_game(&mut self) -> EventMarshaller {
            assert!(self.queue.submit(UiCommand::CreateGame));
            let opened = tokio::time::timeout(WAIT, self.marshallers.recv()).await;
            opened.unwrap().unwrap()
        }

        /// Waits for the UI task to exit and returns its controller.
        async fn exited(self) -> SessionController {
            let joined = tokio::time::timeout(WAIT, self.ui).await;
            joined.unwrap().unwrap()
        }
    }

    fn ai_slot(number: u8) -> PlayerSlot {
        PlayerSlot {
            number,
            slot_type: SlotType::Ai,
            nickname: Some(format!("AI {}", number + 1)),
            owner: None,
        }
    }

    fn ai_seat(number: u8) -> SessionEvent {
        GameEvent::SlotChanged(ai_slot(number)).into()
    }

    fn updated_seats(view: &RecordingPresentation) -> Vec<u8> {
        view.calls()
            .into_iter()
            .filter_map(|call| match call {
                PresentationCall::SlotUpdated(slot) => Some(slot.number),
                _ => None,
            })
            .collect()
    }

    /// Index of the last `wanted` call.  Closing a closed session repaints
    /// the view too, so earlier copies may exist.
    fn last_position(view: &RecordingPresentation, wanted: &PresentationCall) -> usize {
        view.calls().iter().rposition(|call| call == wanted).unwrap()
    }

    fn confirmations(view: &RecordingPresentation) -> usize {
        view.calls()
            .iter()
            .filter(|call| matches!(call, PresentationCall::ConfirmClose(_)))
            .count()
    }

    // ── Queue ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_marshaller_tags_events_with_its_epoch() {
        // Arrange
        let (queue, mut rx) = UiQueue::new();
        let marshaller = queue.marshaller(7);

        // Act
        marshaller.dispatch(GameEvent::TileDiscarded { tile: "CITY".into() }.into());
        marshaller.connection_lost("eof");

        // Assert
        assert_eq!(
            rx.try_recv().unwrap(),
            UiTask::Event {
                epoch: 7,
                event: GameEvent::TileDiscarded { tile: "CITY".into() }.into(),
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            UiTask::ConnectionLost {
                epoch: 7,
                reason: "eof".into()
            }
        );
    }

    #[test]
    fn test_queue_preserves_submission_order_across_producers() {
        let (queue, mut rx) = UiQueue::new();
        let marshaller = queue.marshaller(1);

        marshaller.dispatch(UiEvent::Warning { text: "a".into() }.into());
        assert!(queue.submit(UiCommand::StartGame));
        marshaller.dispatch(UiEvent::Warning { text: "b".into() }.into());

        let kinds: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|task| match task {
                UiTask::Event { event, .. } => event.kind().to_string(),
                UiTask::Command(command) => format!("{command:?}"),
                UiTask::ConnectionLost { .. } => "lost".to_string(),
            })
            .collect();
        assert_eq!(kinds, vec!["warning", "StartGame", "warning"]);
    }

    #[test]
    fn test_dispatch_after_receiver_dropped_does_not_panic() {
        let (queue, rx) = UiQueue::new();
        let marshaller = queue.marshaller(3);
        drop(rx);

        marshaller.dispatch(UiEvent::Chat { nickname: "x".into(), text: "y".into() }.into());
        marshaller.connection_lost("gone");

        assert!(!queue.submit(UiCommand::Quit));
    }

    // ── UI task ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_ui_loop_applies_events_in_queue_order() {
        // Arrange
        let mut ui = RunningLoop::start(true);
        let marshaller = ui.create_game().await;

        // Act
        for seat in [2, 0, 3, 1] {
            marshaller.dispatch(ai_seat(seat));
        }
        assert!(ui.queue.submit(UiCommand::Quit));
        let view = ui.view.clone();
        let controller = ui.exited().await;

        // Assert
        assert_eq!(updated_seats(&view), vec![2, 0, 3, 1]);
        let confirm = PresentationCall::ConfirmClose(CloseConfirmation::Hosting);
        let last_update = PresentationCall::SlotUpdated(ai_slot(1));
        assert!(last_position(&view, &last_update) < last_position(&view, &confirm));
        assert_eq!(controller.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_ui_loop_keeps_running_after_declined_quit() {
        // Arrange
        let mut ui = RunningLoop::start(false);
        let marshaller = ui.create_game().await;

        // Act
        assert!(ui.queue.submit(UiCommand::Quit));
        marshaller.dispatch(ai_seat(1));
        assert!(ui.queue.submit(UiCommand::Shutdown));
        let view = ui.view.clone();
        let controller = ui.exited().await;

        // Assert: the seat update queued after the declined quit was applied.
        assert_eq!(confirmations(&view), 1);
        assert_eq!(updated_seats(&view), vec![1]);
        let confirm = PresentationCall::ConfirmClose(CloseConfirmation::Hosting);
        let update = PresentationCall::SlotUpdated(ai_slot(1));
        assert!(last_position(&view, &confirm) < last_position(&view, &update));
        let closed = PresentationCall::CloseGameView;
        assert!(last_position(&view, &update) < last_position(&view, &closed));
        assert_eq!(controller.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_ui_loop_shutdown_closes_without_asking_and_exits() {
        // Arrange
        let mut ui = RunningLoop::start(false);
        let marshaller = ui.create_game().await;
        let epoch = marshaller.epoch();

        // Act
        assert!(ui.queue.submit(UiCommand::Shutdown));
        let view = ui.view.clone();
        let queue = ui.queue.clone();
        let controller = ui.exited().await;

        // Assert
        assert_eq!(confirmations(&view), 0);
        assert!(
            last_position(&view, &PresentationCall::GameRunning(true))
                < last_position(&view, &PresentationCall::GameRunning(false))
        );
        assert_eq!(controller.state(), SessionState::Closed);
        assert!(controller.epoch() > epoch);
        // The loop dropped its receiver on exit.
        assert!(!queue.submit(UiCommand::StartGame));
    }

    #[tokio::test]
    async fn test_ui_loop_forced_close_skips_confirmation_and_continues() {
        // Arrange
        let mut ui = RunningLoop::start(false);
        ui.create_game().await;

        // Act
        assert!(ui.queue.submit(UiCommand::CloseGame { force: true }));
        let reopened = ui.create_game().await;
        reopened.dispatch(ai_seat(3));
        assert!(ui.queue.submit(UiCommand::Shutdown));
        let view = ui.view.clone();
        ui.exited().await;

        // Assert
        assert_eq!(confirmations(&view), 0);
        assert_eq!(updated_seats(&view), vec![3]);
    }

    #[tokio::test]
    async fn test_ui_loop_ignores_stale_events_interleaved_with_commands() {
        // Arrange: the second game replaces the first after a confirmed close.
        let mut ui = RunningLoop::start(true);
        let old = ui.create_game().await;
        let current = ui.create_game().await;
        assert!(current.epoch() > old.epoch());

        // Act
        old.dispatch(ai_seat(0));
        assert!(ui.queue.submit(UiCommand::Chat("hello".into())));
        current.dispatch(ai_seat(1));
        old.connection_lost("connection reset");
        assert!(ui.queue.submit(UiCommand::TakeSlot(2)));
        old.dispatch(ai_seat(2));
        current.dispatch(UiEvent::Warning { text: "still here".into() }.into());
        assert!(ui.queue.submit(UiCommand::Shutdown));
        let view = ui.view.clone();
        ui.exited().await;

        // Assert
        assert_eq!(updated_seats(&view), vec![1]);
        assert!(view.errors().is_empty());
        assert!(view
            .calls()
            .contains(&PresentationCall::Warning("still here".into())));
    }
}
