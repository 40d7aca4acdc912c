//! Session state machine — roster, controller, timer, and turn rotation.
//!
//! A `Session` is plain data driven by one owner at a time; the gateway keeps
//! each one inside a dedicated task. Every operation that depends on time
//! takes an explicit `now`.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::clock::Clock;
use crate::history::{duration_ms, Lap, TurnHistory};
use crate::names::NameSource;
use crate::protocol::{Command, SessionSnapshot};
use crate::roster::{ParticipantId, Roster};

/// What happened to a command handed to [`Session::apply_command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// State changed.
    Applied,
    /// Sender holds control but the precondition did not hold (e.g. `start` while running).
    Unchanged,
    /// Sender is not the controller; dropped.
    NotController,
}

impl CommandOutcome {
    pub fn accepted(&self) -> bool {
        !matches!(self, Self::NotController)
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    roster: Roster,
    controller: Option<ParticipantId>,
    turns_completed: usize,
    clock: Clock,
    last_lap: Option<Lap>,
    history: TurnHistory,
}

impl Session {
    /// An empty session: nobody connected, timer stopped, counters zero.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            roster: Roster::new(),
            controller: None,
            turns_completed: 0,
            clock: Clock::new(),
            last_lap: None,
            history: TurnHistory::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn controller(&self) -> Option<&str> {
        self.controller.as_deref()
    }

    pub fn turns_completed(&self) -> usize {
        self.turns_completed
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        self.clock.elapsed(now)
    }

    pub fn history(&self) -> &TurnHistory {
        &self.history
    }

    pub fn last_lap(&self) -> Option<&Lap> {
        self.last_lap.as_ref()
    }

    /// Draw a name that nobody currently in the session is using.
    ///
    /// After `attempts` collisions a numeric suffix is appended until the
    /// name is free, so this always terminates.
    pub fn allocate_participant_id(&self, names: &dyn NameSource, attempts: usize) -> ParticipantId {
        for _ in 0..attempts.max(1) {
            let candidate = names.generate();
            if !self.roster.contains(&candidate) {
                return candidate;
            }
        }
        let base = names.generate();
        let mut n = self.roster.len() + 1;
        loop {
            let candidate = format!("{base}-{n}");
            if !self.roster.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Add a participant to the back of the roster.
    ///
    /// The first participant of an empty session takes control. Returns
    /// `false` if the identifier is already connected.
    pub fn join(&mut self, participant: ParticipantId) -> bool {
        if !self.roster.insert(participant.clone()) {
            return false;
        }
        if self.controller.is_none() {
            info!(session_id = %self.id, %participant, "Initial controller assigned");
            self.controller = Some(participant.clone());
        }
        info!(
            session_id = %self.id,
            %participant,
            clients = self.roster.len(),
            "Participant joined"
        );
        true
    }

    /// Remove a participant; if it held control, the front of the roster takes over.
    pub fn leave(&mut self, participant: &str) -> bool {
        if !self.roster.remove(participant) {
            return false;
        }
        if self.controller.as_deref() == Some(participant) {
            self.controller = self.roster.first().cloned();
            match &self.controller {
                Some(next) => {
                    info!(session_id = %self.id, from = %participant, to = %next, "Controller left, control handed to front of roster")
                }
                None => info!(session_id = %self.id, "Last participant left, no controller"),
            }
        }
        info!(
            session_id = %self.id,
            %participant,
            clients = self.roster.len(),
            "Participant left"
        );
        true
    }

    /// Apply a command from `sender`. Only the current controller is obeyed.
    pub fn apply_command(&mut self, sender: &str, command: Command, now: Instant) -> CommandOutcome {
        if self.controller.as_deref() != Some(sender) {
            debug!(
                session_id = %self.id,
                %sender,
                %command,
                controller = self.controller.as_deref().unwrap_or(""),
                "Ignoring command from non-controller"
            );
            return CommandOutcome::NotController;
        }

        debug!(session_id = %self.id, %sender, %command, "Applying command");
        let changed = match command {
            Command::Start => self.clock.start(now),
            Command::Pause => self.clock.pause(now),
            Command::Reset => {
                self.reset();
                true
            }
            Command::Advance => {
                self.advance(sender, now);
                true
            }
        };

        if changed {
            CommandOutcome::Applied
        } else {
            CommandOutcome::Unchanged
        }
    }

    fn reset(&mut self) {
        self.clock.reset();
        self.last_lap = None;
        self.history.clear();
        self.turns_completed = 0;
    }

    /// Close the controller's turn and hand control to the next in roster order.
    fn advance(&mut self, controller: &str, now: Instant) {
        let elapsed = self.clock.elapsed(now);
        let lap = Lap::new(controller, elapsed);
        self.history.push(lap.clone());
        self.last_lap = Some(lap);

        self.clock.restart(now);
        self.turns_completed += 1;

        if self.roster.len() > 1 {
            let next = self.roster.next_after(controller).cloned();
            if self.turns_completed >= self.roster.len() {
                self.clock.reset();
                self.last_lap = None;
                self.turns_completed = 0;
                info!(session_id = %self.id, "Rotation complete, timer stopped");
            }
            if let Some(next) = &next {
                info!(session_id = %self.id, from = %controller, to = %next, "Control passed");
            }
            self.controller = next;
        } else {
            // Nobody to hand off to: fresh turn for the same participant.
            self.last_lap = None;
            self.turns_completed = 0;
            debug!(session_id = %self.id, %controller, "Single participant, turn restarted");
        }
    }

    /// The session-wide part of an `update` frame, sampled at `now`.
    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            time: duration_ms(self.clock.elapsed(now)),
            lap_time: self.last_lap.as_ref().map_or(0, |l| l.time_ms),
            last_lap_client: self
                .last_lap
                .as_ref()
                .map(|l| l.client.clone())
                .unwrap_or_default(),
            lap_history: self.history.laps().to_vec(),
            active_client: self.controller.clone().unwrap_or_default(),
            clients: self.roster.to_vec(),
        }
    }
}
