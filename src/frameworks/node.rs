// Framework bootstrap for an arena node: pick a relay, connect, run the session.

use std::io::{BufRead, Result};
use std::sync::Arc;
use tokio::sync::{Notify, mpsc, watch};
use tracing::{debug, info, warn};

use crate::domain::arena::HeadlessArena;
use crate::domain::errors::TransportError;
use crate::domain::identity::{Identity, candidate_names};
use crate::domain::messages::MovementState;
use crate::domain::ports::{InputSource, Presenter};
use crate::domain::tuning::TankTuning;
use crate::frameworks::config::{self, NodeConfig};
use crate::interface_adapters::clients::{DirectoryClient, TcpPing};
use crate::interface_adapters::transport::{TransportClient, TransportConfig};
use crate::use_cases::{
    AddressResolver, Role, SessionChannels, SessionCommand, SessionEnd, SessionSnapshot,
    SyncConfig, SyncEngine, session_task,
};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Headless presenter: camera and chat go to the log.
#[derive(Debug, Default)]
pub struct LogPresenter;

impl Presenter for LogPresenter {
    fn follow(&mut self, slot: usize, identity: &Identity) {
        info!(slot, %identity, "following local tank");
    }

    fn show_chat(&mut self, from: &Identity, text: &str) {
        info!(%from, %text, "chat");
    }
}

/// Headless input: the local tank stands still.
#[derive(Debug, Default)]
pub struct IdleInput;

impl InputSource for IdleInput {
    fn sample(&mut self) -> MovementState {
        MovementState::default()
    }
}

pub async fn run(config: NodeConfig) -> Result<()> {
    let (address, name) = select_relay(&config).await?;
    info!(%address, %name, server = config.is_server(), "connecting");

    let transport = TransportClient::connect(
        &address,
        name.clone(),
        TransportConfig {
            reconnect_min: config.reconnect_min,
            reconnect_max: config.reconnect_max,
            event_capacity: config::EVENT_CHANNEL_CAPACITY,
            command_capacity: config::OUTBOUND_CHANNEL_CAPACITY,
        },
    );
    let TransportClient {
        handle,
        events,
        task: transport_task,
    } = transport;

    let role = match &config.server_name {
        Some(server) => Role::Client {
            server: server.clone(),
        },
        None => Role::Server,
    };
    let engine = SyncEngine::new(
        SyncConfig {
            role,
            local: name,
            max_players: config.max_players,
            chat_recipient: config.chat_recipient.clone(),
            tuning: TankTuning::default(),
        },
        HeadlessArena::default(),
        LogPresenter,
        IdleInput,
    );

    // commands_tx/rx: stdin lines (chat, respawn) for the session.
    let (commands_tx, commands) = mpsc::channel(config::COMMAND_CHANNEL_CAPACITY);
    // snapshot_tx/rx: latest roster view after every tick.
    let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());
    let shutdown = Arc::new(Notify::new());

    let mut session = tokio::spawn(session_task(
        engine,
        handle.clone(),
        SessionChannels {
            events,
            commands,
            snapshot_tx,
            shutdown: shutdown.clone(),
        },
        config.tick_interval,
    ));
    spawn_line_reader(std::io::BufReader::new(std::io::stdin()), commands_tx)?;
    tokio::spawn(watch_roster(snapshot_rx));

    let end = tokio::select! {
        res = &mut session => res,
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received; shutting down");
            shutdown.notify_one();
            (&mut session).await
        }
    };

    handle.close().await;
    let _ = transport_task.await;

    match end {
        Ok(SessionEnd::Rejected { code }) => Err(std::io::Error::other(
            TransportError::HandshakeRejected { code },
        )),
        Ok(end) => {
            info!(?end, "node stopped");
            Ok(())
        }
        Err(e) => Err(std::io::Error::other(format!("session task failed: {e}"))),
    }
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let config = NodeConfig::from_env().map_err(|e| {
        tracing::error!(error = %e, "invalid configuration");
        std::io::Error::other(e)
    })?;

    run(config).await
}

// Configured relay wins; otherwise ask the directory for the nearest one.
async fn select_relay(config: &NodeConfig) -> Result<(String, Identity)> {
    if let Some(address) = &config.relay_addr {
        let name = candidate_names(&config.identity)
            .into_iter()
            .next()
            .unwrap_or_else(|| config.identity.clone());
        return Ok((address.clone(), name));
    }

    let directory = DirectoryClient::new(config.seed_rpc_url.clone(), config.rpc_timeout)
        .map_err(|e| std::io::Error::other(format!("failed to initialize directory client: {e}")))?;
    debug!(
        rpc_url = %directory.rpc_url(),
        rpc_timeout_ms = config.rpc_timeout.as_millis(),
        "directory client configured"
    );

    let resolver = AddressResolver::new(directory, TcpPing::new(config.ping_timeout));
    let resolved = resolver.resolve(&config.identity).await.map_err(|e| {
        tracing::error!(error = %e, "relay resolution failed");
        std::io::Error::other(e)
    })?;
    Ok((resolved.address, resolved.name))
}

/// Turns stdin lines into session commands: `/respawn <name>` or chat text.
pub fn parse_command(line: &str) -> Option<SessionCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.strip_prefix("/respawn") {
        Some(rest) if rest.is_empty() || rest.starts_with(' ') => {
            let target = rest.trim();
            if target.is_empty() {
                warn!("usage: /respawn <name>");
                return None;
            }
            Some(SessionCommand::Respawn(Identity::new(target)))
        }
        _ => Some(SessionCommand::Chat(line.to_string())),
    }
}

// Reads commands on a plain OS thread. A stdin read parked on the blocking pool
// would keep the runtime from shutting down until the next line arrives.
fn spawn_line_reader<R>(
    reader: R,
    commands_tx: mpsc::Sender<SessionCommand>,
) -> Result<std::thread::JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    std::thread::Builder::new()
        .name("stdin".into())
        .spawn(move || forward_lines(reader, &commands_tx))
}

fn forward_lines(reader: impl BufRead, commands_tx: &mpsc::Sender<SessionCommand>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "stdin read failed; no more commands");
                return;
            }
        };
        let Some(command) = parse_command(&line) else {
            continue;
        };
        if commands_tx.blocking_send(command).is_err() {
            return;
        }
    }
}

// Logs roster and connectivity changes as the session publishes them.
async fn watch_roster(mut snapshot_rx: watch::Receiver<SessionSnapshot>) {
    let mut last_roster = 0usize;
    let mut last_connected = false;
    while snapshot_rx.changed().await.is_ok() {
        let snapshot = snapshot_rx.borrow_and_update().clone();
        if snapshot.roster.len() != last_roster {
            info!(
                players = snapshot.roster.len(),
                local_slot = ?snapshot.local_slot,
                server = ?snapshot.server.as_ref().map(|s| s.as_str()),
                "roster changed"
            );
            last_roster = snapshot.roster.len();
        }
        if snapshot.connected != last_connected {
            info!(connected = snapshot.connected, tick = snapshot.tick, "relay link changed");
            last_connected = snapshot.connected;
        }
    }
}
