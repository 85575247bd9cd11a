// Session task: the single owner of the sync engine. Drains transport events and
// local commands once per tick, steps the simulation, hands frames to the sink.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{Notify, mpsc, watch};
use tracing::{debug, error, info};

use crate::domain::ports::{Arena, FrameSink, InputSource, Presenter};
use crate::use_cases::sync::{Outgoing, SyncEngine};
use crate::use_cases::throttle::should_log;
use crate::use_cases::types::{SessionCommand, SessionSnapshot, TransportEvent};

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Shutdown,
    /// The relay refused our identity.
    Rejected { code: i64 },
    /// The transport dropped its event channel.
    TransportClosed,
}

pub struct SessionChannels {
    pub events: mpsc::Receiver<TransportEvent>,
    pub commands: mpsc::Receiver<SessionCommand>,
    pub snapshot_tx: watch::Sender<SessionSnapshot>,
    pub shutdown: Arc<Notify>,
}

pub async fn session_task<A, P, I, S>(
    mut engine: SyncEngine<A, P, I>,
    sink: S,
    channels: SessionChannels,
    tick_interval: Duration,
) -> SessionEnd
where
    A: Arena,
    P: Presenter,
    I: InputSource,
    S: FrameSink,
{
    let SessionChannels {
        mut events,
        mut commands,
        snapshot_tx,
        shutdown,
    } = channels;

    let mut tick: u64 = 0;
    let mut connected = false;
    let mut last_drop_log: Option<Instant> = None;
    let dt = tick_interval.as_secs_f32();

    // Fixed-step loop; everything below runs on this task only.
    let mut interval = tokio::time::interval(tick_interval);

    info!(server = engine.is_server(), identity = %engine.local_identity(), "session started");

    let end = loop {
        tokio::select! {
            _ = shutdown.notified() => break SessionEnd::Shutdown,
            _ = interval.tick() => {}
        }

        let mut outgoing: Vec<Outgoing> = Vec::new();
        let mut stop = None;

        loop {
            let event = match events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    stop = Some(SessionEnd::TransportClosed);
                    break;
                }
            };
            match event {
                TransportEvent::Connected => {
                    connected = true;
                    outgoing.extend(engine.on_connected());
                }
                TransportEvent::Message { src, payload } => {
                    outgoing.extend(engine.on_frame(&src, &payload));
                }
                TransportEvent::Disconnected { reason } => {
                    if connected {
                        info!(%reason, "relay connection lost; waiting for reconnect");
                    }
                    connected = false;
                }
                TransportEvent::Rejected { code } => {
                    error!(code, "identity rejected by relay; ending session");
                    connected = false;
                    stop = Some(SessionEnd::Rejected { code });
                    break;
                }
            }
        }

        while let Ok(command) = commands.try_recv() {
            match command {
                SessionCommand::Chat(text) => outgoing.extend(engine.send_chat(&text)),
                SessionCommand::Respawn(identity) => {
                    engine.respawn(&identity);
                }
            }
        }

        if stop.is_none() {
            outgoing.extend(engine.tick(dt));
            tick += 1;
        }

        let mut dropped = 0usize;
        for Outgoing {
            destination,
            payload,
        } in outgoing
        {
            if !sink.send_frame(&destination, payload) {
                dropped += 1;
            }
        }
        if dropped > 0 && should_log(&mut last_drop_log) {
            debug!(dropped, connected, "outbound frames dropped");
        }

        snapshot_tx.send_replace(SessionSnapshot {
            tick,
            roster: engine.roster_identities(),
            local_slot: engine.local_slot(),
            server: engine.server_identity().cloned(),
            connected,
        });

        if let Some(end) = stop {
            break end;
        }
    };

    info!(?end, tick, "session stopped");
    end
}
