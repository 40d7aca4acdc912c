//! Per-session task: owns the session state, its ticker, and its outbound queues.
//!
//! All membership changes, commands, and ticks for one session are
//! serialized through a single request queue, so the state machine never
//! needs a lock and no two participants can observe contradictory control
//! state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use baton_core::config::Config;
use baton_core::error::{BatonError, Result};
use baton_core::names::{NameSource, RandomNames};
use baton_core::protocol::{Command, SessionSnapshot};
use baton_core::roster::ParticipantId;
use baton_core::session::{CommandOutcome, Session};

use crate::broadcast::{self, Outbound};

/// Knobs shared by every session the registry spawns.
#[derive(Clone)]
pub struct SessionSettings {
    pub tick_interval: Duration,
    pub name_attempts: usize,
    pub names: Arc<dyn NameSource>,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            name_attempts: config.name_attempts(),
            names: Arc::new(RandomNames),
        }
    }

    pub fn with_names(mut self, names: Arc<dyn NameSource>) -> Self {
        self.names = names;
        self
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

enum SessionRequest {
    Join {
        outbound: Outbound,
        reply: oneshot::Sender<ParticipantId>,
    },
    Leave {
        participant: ParticipantId,
    },
    Command {
        participant: ParticipantId,
        command: Command,
    },
    Snapshot {
        reply: oneshot::Sender<SessionSnapshot>,
    },
}

/// Cheap, cloneable handle to a running session task.
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    tx: mpsc::UnboundedSender<SessionRequest>,
}

impl SessionHandle {
    /// Start the task for a fresh, empty session. Must be called inside a tokio runtime.
    ///
    /// The task and its ticker run until every handle is dropped; the
    /// registry keeps one for the life of the process.
    pub fn spawn(id: String, settings: SessionSettings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(SessionTask::new(id.clone(), settings, rx).run());
        Self { id, tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Add a participant whose frames go to `outbound`. Returns its assigned identifier.
    ///
    /// The participant receives its own snapshot before the session-wide broadcast.
    pub async fn join(&self, outbound: Outbound) -> Result<ParticipantId> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionRequest::Join { outbound, reply })?;
        rx.await.map_err(|_| self.closed())
    }

    pub fn leave(&self, participant: &str) -> Result<()> {
        self.send(SessionRequest::Leave {
            participant: participant.to_string(),
        })
    }

    /// Queue a command. Commands from anyone but the controller are dropped by the task.
    pub fn command(&self, participant: &str, command: Command) -> Result<()> {
        self.send(SessionRequest::Command {
            participant: participant.to_string(),
            command,
        })
    }

    /// Session-wide state after every previously queued request has been applied.
    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionRequest::Snapshot { reply })?;
        rx.await.map_err(|_| self.closed())
    }

    fn send(&self, request: SessionRequest) -> Result<()> {
        self.tx.send(request).map_err(|_| self.closed())
    }

    fn closed(&self) -> BatonError {
        BatonError::SessionClosed(self.id.clone())
    }
}

struct SessionTask {
    session: Session,
    outbound: HashMap<ParticipantId, Outbound>,
    settings: SessionSettings,
    rx: mpsc::UnboundedReceiver<SessionRequest>,
}

impl SessionTask {
    fn new(id: String, settings: SessionSettings, rx: mpsc::UnboundedReceiver<SessionRequest>) -> Self {
        Self {
            session: Session::new(id),
            outbound: HashMap::new(),
            settings,
            rx,
        }
    }

    async fn run(mut self) {
        let period = self.settings.tick_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(session_id = %self.session.id(), ?period, "Session task started");

        loop {
            tokio::select! {
                request = self.rx.recv() => match request {
                    Some(request) => self.handle(request),
                    None => break,
                },
                _ = ticker.tick() => {
                    self.on_tick();
                }
            }
        }

        debug!(session_id = %self.session.id(), "Session task stopped");
    }

    fn handle(&mut self, request: SessionRequest) {
        match request {
            SessionRequest::Join { outbound, reply } => self.join(outbound, reply),
            SessionRequest::Leave { participant } => self.leave(&participant),
            SessionRequest::Command {
                participant,
                command,
            } => {
                let outcome = self
                    .session
                    .apply_command(&participant, command, Instant::now());
                crate::metrics::record_command(command.as_str(), outcome.accepted());
                if outcome == CommandOutcome::Applied {
                    self.broadcast();
                }
            }
            SessionRequest::Snapshot { reply } => {
                let _ = reply.send(self.session.snapshot(Instant::now()));
            }
        }
    }

    fn join(&mut self, outbound: Outbound, reply: oneshot::Sender<ParticipantId>) {
        let participant = self
            .session
            .allocate_participant_id(self.settings.names.as_ref(), self.settings.name_attempts);
        self.session.join(participant.clone());

        let snapshot = self.session.snapshot(Instant::now());
        broadcast::send_to(self.session.id(), &snapshot, &participant, &outbound);
        self.outbound.insert(participant.clone(), outbound);

        if reply.send(participant.clone()).is_err() {
            // The connection went away while waiting for its identifier
            warn!(session_id = %self.session.id(), %participant, "Joiner vanished before handshake completed");
            self.session.leave(&participant);
            self.outbound.remove(&participant);
            return;
        }

        crate::metrics::record_connect();
        self.broadcast();
    }

    fn leave(&mut self, participant: &str) {
        self.outbound.remove(participant);
        if self.session.leave(participant) {
            crate::metrics::record_disconnect();
            self.broadcast();
        } else {
            info!(session_id = %self.session.id(), participant, "Leave for unknown participant ignored");
        }
    }

    /// Periodic refresh. Empty sessions keep ticking but skip the work.
    fn on_tick(&self) -> usize {
        if self.outbound.is_empty() {
            trace!(session_id = %self.session.id(), "Tick skipped, no participants");
            return 0;
        }
        self.broadcast()
    }

    fn broadcast(&self) -> usize {
        let snapshot = self.session.snapshot(Instant::now());
        broadcast::fan_out(self.session.id(), &snapshot, &self.outbound)
    }
}
