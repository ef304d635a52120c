//! Meeple client entry point.
//!
//! A headless client driven by lines on stdin.  It loads the configuration,
//! builds the session controller, starts the UI task, and turns every line
//! typed into a queued [`UiCommand`].
//!
//! ```text
//! meeple-client --host                 # host a new game
//! meeple-client --join 10.0.0.7:37447  # join someone else's
//! meeple-client --load friday.msav     # host a saved game
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config / session_settings   -- fatal on bad colours or locale
//!  └─ run_ui_loop(SessionController)   -- the UI task
//!  └─ stdin reader                     -- parse_command -> UiQueue::submit
//!  └─ Ctrl-C                           -- UiCommand::Shutdown
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use meeple_client::application::session::SessionController;
use meeple_client::infrastructure::{
    presentation::ConsolePresentation,
    storage::config::{load_config, load_config_from, ClientConfig},
    transport::NetworkTransport,
    ui_bridge::{run_ui_loop, UiCommand, UiQueue},
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Meeple client.
#[derive(Debug, Parser)]
#[command(name = "meeple-client", about = "Hosts or joins a Meeple game", version)]
struct Cli {
    /// Configuration file; the platform config directory when omitted.
    #[arg(long, env = "MEEPLE_CONFIG")]
    config: Option<PathBuf>,

    /// Nickname, overriding the configuration.
    #[arg(long)]
    nickname: Option<String>,

    /// Port for hosting and joining, overriding the configuration.
    #[arg(long)]
    port: Option<u16>,

    /// Host a new game on start.
    #[arg(long, conflicts_with_all = ["join", "load"])]
    host: bool,

    /// Join `host[:port]` on start.
    #[arg(long, conflicts_with = "load")]
    join: Option<String>,

    /// Host a saved game on start.
    #[arg(long)]
    load: Option<PathBuf>,

    /// Answer "yes" when asked to close a running game.
    #[arg(long, short = 'y')]
    yes: bool,
}

impl Cli {
    fn load_config(&self) -> anyhow::Result<ClientConfig> {
        let config = match &self.config {
            Some(path) => load_config_from(path)
                .with_context(|| format!("cannot load configuration {}", path.display()))?,
            None => load_config().context("cannot load configuration")?,
        };
        Ok(config)
    }

    /// The command to run once the UI task is up, if any.
    fn initial_command(&self, default_port: u16) -> anyhow::Result<Option<UiCommand>> {
        if self.host {
            return Ok(Some(UiCommand::CreateGame));
        }
        if let Some(path) = &self.load {
            return Ok(Some(UiCommand::LoadGame(path.clone())));
        }
        match &self.join {
            Some(target) => {
                let (host, port) = split_host_port(target, default_port)
                    .with_context(|| format!("invalid address '{target}'"))?;
                Ok(Some(UiCommand::JoinGame { host, port }))
            }
            None => Ok(None),
        }
    }
}

fn split_host_port(target: &str, default_port: u16) -> anyhow::Result<(String, u16)> {
    match target.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => Ok((host.to_string(), port.parse()?)),
        Some(_) => anyhow::bail!("missing host"),
        None => Ok((target.to_string(), default_port)),
    }
}

// ── Console commands ──────────────────────────────────────────────────────────

const HELP: &str = "\
commands:
  host                  host a new game
  load <file>           host a saved game
  join <host> [port]    join a game
  connect               show the connect panel
  save <file>           save the running game
  close                 close the running game
  close!                close it without asking
  take <seat>           sit in a seat
  ai <seat>             put an AI in a seat
  leave <seat>          leave a seat
  start                 start the game
  end [points]          end your turn
  discard <tile>        discard a tile
  say <text>            chat
  quit                  close and exit
  quit!                 close without asking and exit";

/// Parses one console line.  `Ok(None)` for a blank line.
fn parse_command(line: &str, default_port: u16) -> Result<Option<UiCommand>, String> {
    let line = line.trim();
    let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let rest = rest.trim();
    let seat = || rest.parse::<u8>().map_err(|_| format!("'{rest}' is not a seat number"));
    let needs = |what: &str| {
        if rest.is_empty() {
            Err(format!("{word} needs {what}"))
        } else {
            Ok(rest.to_string())
        }
    };

    let command = match word {
        "" => return Ok(None),
        "host" => UiCommand::CreateGame,
        "load" => UiCommand::LoadGame(PathBuf::from(needs("a file")?)),
        "join" => {
            let mut parts = rest.split_whitespace();
            let host = parts.next().ok_or("join needs a host")?.to_string();
            let port = match parts.next() {
                Some(p) => p.parse().map_err(|_| format!("'{p}' is not a port"))?,
                None => default_port,
            };
            UiCommand::JoinGame { host, port }
        }
        "connect" => UiCommand::ShowConnectPanel,
        "save" => UiCommand::SaveGame(PathBuf::from(needs("a file")?)),
        "close" => UiCommand::CloseGame { force: false },
        "close!" => UiCommand::CloseGame { force: true },
        "take" => UiCommand::TakeSlot(seat()?),
        "ai" => UiCommand::SetSlotAi(seat()?),
        "leave" => UiCommand::LeaveSlot(seat()?),
        "start" => UiCommand::StartGame,
        "end" => {
            let points = if rest.is_empty() {
                0
            } else {
                rest.parse().map_err(|_| format!("'{rest}' is not a number of points"))?
            };
            UiCommand::EndTurn { points }
        }
        "discard" => UiCommand::DiscardTile(needs("a tile")?),
        "say" => UiCommand::Chat(needs("some text")?),
        "quit" | "exit" => UiCommand::Quit,
        "quit!" | "exit!" => UiCommand::Shutdown,
        other => return Err(format!("unknown command '{other}'")),
    };
    Ok(Some(command))
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    // RUST_LOG wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.ui.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut settings = config
        .session_settings()
        .context("invalid configuration")?;
    if let Some(nickname) = &cli.nickname {
        settings.nickname = nickname.clone();
    }
    if let Some(port) = cli.port {
        settings.server_port = port;
    }
    let default_port = settings.server_port;
    info!("Meeple client starting as {}", settings.nickname);

    let (queue, rx) = UiQueue::new();
    let mut transport = NetworkTransport::new(queue.clone());
    transport.connect_timeout = config.connect_timeout();
    let controller = SessionController::new(
        settings,
        Box::new(ConsolePresentation::stdout(cli.yes)),
        Box::new(transport),
    );
    let mut ui = tokio::spawn(run_ui_loop(controller, rx));

    if let Some(command) = cli.initial_command(default_port)? {
        queue.submit(command);
    }

    // ── stdin reader ──────────────────────────────────────────────────────────
    let stdin_queue = queue.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim() == "help" => println!("{HELP}"),
                Ok(Some(line)) => match parse_command(&line, default_port) {
                    Ok(Some(command)) => {
                        if !stdin_queue.submit(command) {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(message) => println!("{message}; type 'help' for commands"),
                },
                Ok(None) => {
                    stdin_queue.submit(UiCommand::Shutdown);
                    break;
                }
                Err(e) => {
                    warn!("cannot read stdin: {e}");
                    stdin_queue.submit(UiCommand::Shutdown);
                    break;
                }
            }
        }
    });

    tokio::select! {
        joined = &mut ui => {
            joined.context("UI task failed")?;
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("failed to listen for Ctrl+C signal: {e}");
            }
            info!("shutdown signal received");
            queue.submit(UiCommand::Shutdown);
            ui.await.context("UI task failed")?;
        }
    }

    info!("Meeple client exiting");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_maps_console_words() {
        assert_eq!(parse_command("host", 1), Ok(Some(UiCommand::CreateGame)));
        assert_eq!(parse_command("  take 2 ", 1), Ok(Some(UiCommand::TakeSlot(2))));
        assert_eq!(parse_command("end", 1), Ok(Some(UiCommand::EndTurn { points: 0 })));
        assert_eq!(parse_command("end 7", 1), Ok(Some(UiCommand::EndTurn { points: 7 })));
        assert_eq!(
            parse_command("say hello there", 1),
            Ok(Some(UiCommand::Chat("hello there".into())))
        );
        assert_eq!(parse_command("", 1), Ok(None));
    }

    #[test]
    fn test_parse_bang_forces_close_and_quit() {
        assert_eq!(
            parse_command("close", 1),
            Ok(Some(UiCommand::CloseGame { force: false }))
        );
        assert_eq!(
            parse_command("close!", 1),
            Ok(Some(UiCommand::CloseGame { force: true }))
        );
        assert_eq!(parse_command("quit", 1), Ok(Some(UiCommand::Quit)));
        assert_eq!(parse_command(" quit! ", 1), Ok(Some(UiCommand::Shutdown)));
    }

    #[test]
    fn test_parse_join_uses_default_port_when_omitted() {
        assert_eq!(
            parse_command("join example.org", 37447),
            Ok(Some(UiCommand::JoinGame {
                host: "example.org".into(),
                port: 37447
            }))
        );
        assert_eq!(
            parse_command("join 10.0.0.7 4000", 37447),
            Ok(Some(UiCommand::JoinGame {
                host: "10.0.0.7".into(),
                port: 4000
            }))
        );
    }

    #[test]
    fn test_parse_command_rejects_bad_input() {
        assert!(parse_command("take x", 1).is_err());
        assert!(parse_command("save", 1).is_err());
        assert!(parse_command("join", 1).is_err());
        assert!(parse_command("dance", 1).is_err());
    }

    #[test]
    fn test_cli_initial_command() {
        let host = Cli::parse_from(["meeple-client", "--host"]);
        let join = Cli::parse_from(["meeple-client", "--join", "10.0.0.7:4000"]);
        let idle = Cli::parse_from(["meeple-client"]);

        assert_eq!(host.initial_command(1).unwrap(), Some(UiCommand::CreateGame));
        assert_eq!(
            join.initial_command(1).unwrap(),
            Some(UiCommand::JoinGame {
                host: "10.0.0.7".into(),
                port: 4000
            })
        );
        assert_eq!(idle.initial_command(1).unwrap(), None);
    }

    #[test]
    fn test_cli_rejects_host_with_join() {
        let parsed = Cli::try_parse_from(["meeple-client", "--host", "--join", "a:1"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_split_host_port() {
        assert_eq!(split_host_port("a.b:9", 1).unwrap(), ("a.b".to_string(), 9));
        assert_eq!(split_host_port("a.b", 1).unwrap(), ("a.b".to_string(), 1));
        assert!(split_host_port(":9", 1).is_err());
        assert!(split_host_port("a.b:x", 1).is_err());
    }
}
