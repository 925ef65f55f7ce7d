use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use overlay_proto::{ClientCommand, LayerKind, LayerPatch, Transition};
use tokio::sync::mpsc;

use crate::config::{EditorConfig, OverlayConfig, Role, TransportConfig};
use crate::error::ClientError;
use crate::headless::{LogMediaHost, LogSurface};
use crate::http::{SceneApi, SceneSource};
use crate::moderator::ModeratorSession;
use crate::overlay::OverlaySession;
use crate::transport::{Transport, TransportEvent};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REPLY_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Parser)]
#[command(
    name = "overlay-client",
    about = "Headless overlay subscriber and moderator command line for overlay-live",
    version
)]
pub struct Cli {
    /// Base URL of the authority.
    #[arg(long, global = true, default_value = "http://127.0.0.1:13337")]
    pub server: String,

    /// Reconnect delay after the stream drops, in milliseconds.
    #[arg(long, global = true, default_value_t = 1_000)]
    pub backoff_ms: u64,

    /// Document poll period while the stream is down, in milliseconds.
    #[arg(long, global = true, default_value_t = 5_000)]
    pub poll_ms: u64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Follow the scene and log what an overlay would render and play.
    Overlay(OverlayArgs),

    /// Issue one moderator action.
    Moderator {
        #[command(subcommand)]
        action: ModeratorAction,
    },
}

#[derive(Debug, Args)]
pub struct OverlayArgs {
    /// Origin for relative media URLs; defaults to the server URL.
    #[arg(long)]
    pub origin: Option<String>,

    /// Countdown refresh period, in milliseconds.
    #[arg(long, default_value_t = 200)]
    pub tick_ms: u64,
}

#[derive(Debug, Subcommand)]
pub enum ModeratorAction {
    /// Add a text layer.
    #[command(name = "add-text")]
    AddText {
        text: String,
        #[arg(long)]
        x: Option<i32>,
        #[arg(long)]
        y: Option<i32>,
    },
    /// Remove a layer.
    Remove { id: String },
    /// Remove every layer.
    Clear,
    /// Raise a layer above all others.
    Front { id: String },
    Undo,
    Redo,
    /// Store the current scene under a name.
    #[command(name = "preset-save")]
    PresetSave { name: String },
    /// Replace the scene with a stored preset.
    #[command(name = "preset-load")]
    PresetLoad {
        name: String,
        #[arg(long, default_value_t = 250)]
        fade_ms: u32,
    },
    /// Drag a layer by a pixel offset through the editor and save it.
    Move {
        id: String,
        #[arg(allow_hyphen_values = true)]
        dx: i32,
        #[arg(allow_hyphen_values = true)]
        dy: i32,
        /// Snap to the coarse grid.
        #[arg(long)]
        coarse: bool,
    },
}

impl ModeratorAction {
    /// The streamed command for this action; `None` for editor-driven ones.
    fn command(&self) -> Option<ClientCommand> {
        let command = match self {
            ModeratorAction::AddText { text, x, y } => ClientCommand::Add {
                item: LayerPatch {
                    kind: Some(LayerKind::Text),
                    content: Some(text.clone()),
                    x: *x,
                    y: *y,
                    ..LayerPatch::default()
                },
            },
            ModeratorAction::Remove { id } => ClientCommand::Remove { id: id.clone() },
            ModeratorAction::Clear => ClientCommand::Clear,
            ModeratorAction::Front { id } => ClientCommand::BringToFront { id: id.clone() },
            ModeratorAction::Undo => ClientCommand::HistoryUndo,
            ModeratorAction::Redo => ClientCommand::HistoryRedo,
            ModeratorAction::PresetSave { name } => ClientCommand::PresetSave { name: name.clone() },
            ModeratorAction::PresetLoad { name, fade_ms } => ClientCommand::PresetLoad {
                name: name.clone(),
                transition: Some(Transition::fade(*fade_ms)),
            },
            ModeratorAction::Move { .. } => return None,
        };
        Some(command)
    }
}

impl Cli {
    fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            reconnect_backoff: Duration::from_millis(self.backoff_ms),
            poll_interval: Duration::from_millis(self.poll_ms),
            ..TransportConfig::new(self.server.clone())
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let transport = cli.transport_config();
    match cli.command {
        Commands::Overlay(args) => run_overlay(transport, args).await,
        Commands::Moderator { action } => match action.command() {
            Some(command) => send_command(transport, command).await,
            None => run_editor_action(transport, action).await,
        },
    }
}

async fn run_overlay(transport_config: TransportConfig, args: OverlayArgs) -> anyhow::Result<()> {
    let config = OverlayConfig {
        tick: Duration::from_millis(args.tick_ms),
        origin: Some(args.origin.unwrap_or_else(|| transport_config.server.clone())),
    };
    let api = Arc::new(SceneApi::new(&transport_config));
    let transport = Transport::spawn(transport_config, Role::Overlay, api);
    let session = OverlaySession::new(&config, LogSurface::default(), LogMediaHost);

    // No input device: autoplay is never unlocked by a gesture.
    let (_interaction_tx, interactions) = mpsc::channel(1);

    tokio::select! {
        () = session.run(transport, config.tick, interactions) => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }
    Ok(())
}

async fn wait_connected(transport: &mut Transport) -> Result<u64, ClientError> {
    loop {
        match transport.recv().await {
            Some(TransportEvent::Connected { epoch }) => return Ok(epoch),
            Some(_) => {}
            None => return Err(ClientError::Closed),
        }
    }
}

async fn send_command(config: TransportConfig, command: ClientCommand) -> anyhow::Result<()> {
    let server = config.server.clone();
    let api = Arc::new(SceneApi::new(&config));
    let mut transport = Transport::spawn(config, Role::Moderator, api);

    tokio::time::timeout(CONNECT_TIMEOUT, wait_connected(&mut transport))
        .await
        .with_context(|| format!("{server} did not accept a moderator connection"))??;

    let kind = command.tag();
    transport.commands.send(command);
    tracing::info!(command = kind, "Command sent");

    let window = tokio::time::sleep(REPLY_WINDOW);
    tokio::pin!(window);
    loop {
        tokio::select! {
            event = transport.recv() => match event {
                Some(TransportEvent::Message { message, .. }) => {
                    tracing::info!(kind = message.tag(), "Authority broadcast");
                }
                Some(_) => {}
                None => break,
            },
            () = &mut window => break,
        }
    }
    Ok(())
}

async fn run_editor_action(config: TransportConfig, action: ModeratorAction) -> anyhow::Result<()> {
    let ModeratorAction::Move { id, dx, dy, coarse } = action else {
        anyhow::bail!("not an editor action");
    };

    let api = Arc::new(SceneApi::new(&config));
    let doc = api.fetch().await.context("failed to read the scene")?;
    let session = ModeratorSession::new(&EditorConfig::default(), api);
    session.load(doc);

    let mut found = false;
    session.edit(|editor| {
        found = editor.begin_move(&id, (0, 0));
        None
    });
    anyhow::ensure!(found, "no layer with id {id}");

    session.edit(|editor| editor.pointer_move((dx, dy), coarse));
    session.edit(overlay_core::EditorState::pointer_up);
    session.flush().await;

    let (x, y, version) = session.read(|editor| {
        let layer = editor.layer(&id);
        (
            layer.map_or(0, |l| l.x),
            layer.map_or(0, |l| l.y),
            editor.version(),
        )
    });
    tracing::info!(id, x, y, version, "Layer moved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_moderator_add_text() {
        let cli = Cli::try_parse_from([
            "overlay-client",
            "moderator",
            "--server",
            "http://localhost:9000",
            "add-text",
            "Hello",
            "--x",
            "50",
        ])
        .unwrap();

        assert_eq!(cli.server, "http://localhost:9000");
        let Commands::Moderator { action } = cli.command else {
            panic!("expected moderator");
        };
        assert_eq!(
            action.command(),
            Some(ClientCommand::Add {
                item: LayerPatch {
                    kind: Some(LayerKind::Text),
                    content: Some("Hello".into()),
                    x: Some(50),
                    ..LayerPatch::default()
                }
            })
        );
    }

    #[test]
    fn test_preset_load_default_fade() {
        let cli =
            Cli::try_parse_from(["overlay-client", "moderator", "preset-load", "intro"]).unwrap();
        let Commands::Moderator { action } = cli.command else {
            panic!("expected moderator");
        };
        assert_eq!(
            action.command(),
            Some(ClientCommand::PresetLoad {
                name: "intro".into(),
                transition: Some(Transition::fade(250)),
            })
        );
    }

    #[test]
    fn test_move_accepts_negative_offsets() {
        let cli =
            Cli::try_parse_from(["overlay-client", "moderator", "move", "a", "-15", "4", "--coarse"])
                .unwrap();
        let Commands::Moderator { action } = cli.command else {
            panic!("expected moderator");
        };
        assert!(action.command().is_none());
        assert!(matches!(
            action,
            ModeratorAction::Move { dx: -15, dy: 4, coarse: true, .. }
        ));
    }
}
