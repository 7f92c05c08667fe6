//! Huddle binary.
//!
//! Terminal front-end for the session. The view is printed through the log;
//! commands are read from stdin.
//!
//! # Usage
//!
//! ```bash
//! HUDDLE_SERVER_URL=wss://media.example huddle
//! HUDDLE_SERVER_URL=wss://media.example huddle --identity-file /tmp/name --log-level debug
//! ```
//!
//! While the name dialog is open each line is a name; an empty line closes
//! the dialog when that is allowed. In the room: `edit`, `focus <tile>`,
//! `close`, `quit`.

use std::{io::BufRead, path::PathBuf};

use clap::Parser;
use huddle_client::{
    ClientConfig, FileIdentityStore, HttpTokenIssuer, LogTransport, SessionDriver, SessionHandle, SystemEnv,
};
use huddle_core::{SessionEvent, View};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Join the huddle room
#[derive(Parser, Debug)]
#[command(name = "huddle")]
#[command(about = "Join a single video-conference room")]
#[command(version)]
struct Args {
    /// Where the identity is stored (overrides HUDDLE_IDENTITY_FILE)
    #[arg(long)]
    identity_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut config = ClientConfig::from_env()?;
    if let Some(path) = args.identity_file {
        config.identity_file = path;
    }

    tracing::info!("Huddle starting");
    tracing::info!("Room {} on {}", config.session.room, config.session.server_url);
    tracing::debug!("Identity file {}", config.identity_file.display());

    let driver = SessionDriver::new(
        SystemEnv::new(),
        FileIdentityStore::new(&config.identity_file),
        config.session,
        HttpTokenIssuer::new(&config.token_endpoint)?,
        LogTransport::new(),
    );

    let handle = driver.handle();
    let views = driver.subscribe();

    tokio::spawn(render(views.clone()));
    // Plain thread: a pending tokio stdin read blocks runtime shutdown.
    let commands = handle.clone();
    std::thread::spawn(move || read_commands(&commands, &views));

    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.send(SessionEvent::Shutdown);
        }
    });

    driver.run().await?;

    tracing::info!("Huddle stopped");
    Ok(())
}

async fn render(mut views: watch::Receiver<View>) {
    loop {
        let view = views.borrow_and_update().clone();
        match view {
            View::Blank => {},
            View::IdentityEntry(dialog) => {
                let verb = if dialog.editing { "save" } else { "join" };
                tracing::info!("Enter your name to {} (current: {:?})", verb, dialog.draft);
            },
            View::Loading => tracing::info!("Loading..."),
            View::Room(room) => {
                tracing::info!(
                    "{} | {} participant(s) | audio: {} video: {}",
                    room.identity,
                    room.participant_count,
                    room.media_defaults.audio,
                    room.media_defaults.video
                );
                for (index, tile) in room.tiles.iter().enumerate() {
                    let source = if tile.is_placeholder() { "placeholder".to_string() } else { format!("{:?}", tile.source) };
                    tracing::info!("  [{}] {} ({})", index, tile.participant, source);
                }
                if let Some(focus) = &room.focus {
                    tracing::info!("  focused: {}", focus);
                }
            },
            View::Ended { reason } => {
                tracing::info!("Session ended: {}", reason);
                return;
            },
        }

        if views.changed().await.is_err() {
            return;
        }
    }
}

fn read_commands(handle: &SessionHandle, views: &watch::Receiver<View>) {
    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else {
            return;
        };
        let view = views.borrow().clone();
        let events = parse_command(line.trim(), &view);
        if events.iter().any(|event| !handle.send(event.clone())) {
            return;
        }
    }
}

fn parse_command(line: &str, view: &View) -> Vec<SessionEvent> {
    if let View::IdentityEntry(_) = view {
        if line.is_empty() {
            return vec![SessionEvent::DismissEntry];
        }
        return vec![SessionEvent::NameInput { value: line.to_string() }, SessionEvent::SubmitName];
    }

    match line.split_once(' ').unwrap_or((line, "")) {
        ("quit", _) => vec![SessionEvent::Shutdown],
        ("edit", _) => vec![SessionEvent::EditIdentity],
        ("close", _) => vec![SessionEvent::FocusDismissed],
        ("focus", index) => {
            let View::Room(room) = view else {
                return vec![];
            };
            match index.trim().parse::<usize>().ok().and_then(|i| room.tiles.get(i)) {
                Some(tile) => vec![SessionEvent::TileClicked { track: tile.track_ref() }],
                None => {
                    tracing::warn!("No tile {:?}", index);
                    vec![]
                },
            }
        },
        _ => {
            tracing::warn!("Unknown command {:?}", line);
            vec![]
        },
    }
}
