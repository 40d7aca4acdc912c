//! Snapshot fan-out to every participant of a session.

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, trace};

use baton_core::protocol::SessionSnapshot;
use baton_core::roster::ParticipantId;

/// Frames a participant may have queued before newer snapshots are dropped.
///
/// Every snapshot supersedes the previous one, so a reader that falls this
/// far behind loses nothing it needs.
pub const OUTBOUND_CAPACITY: usize = 32;

/// Per-participant outbound queue, drained by the connection's writer task.
pub type Outbound = mpsc::Sender<String>;

/// A fresh outbound queue of [`OUTBOUND_CAPACITY`] frames.
pub fn outbound_channel() -> (Outbound, mpsc::Receiver<String>) {
    mpsc::channel(OUTBOUND_CAPACITY)
}

/// Send `snapshot` personalized for `participant`.
///
/// Never blocks. Returns false if the frame could not be built, the
/// recipient's queue is full, or the connection's writer has gone away;
/// none of these is escalated.
pub fn send_to(
    session_id: &str,
    snapshot: &SessionSnapshot,
    participant: &str,
    outbound: &Outbound,
) -> bool {
    let frame = match serde_json::to_string(&snapshot.personalize(participant)) {
        Ok(frame) => frame,
        Err(e) => {
            error!(%e, session_id, participant, "Failed to serialize snapshot");
            return false;
        }
    };

    match outbound.try_send(frame) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            debug!(session_id, participant, "Outbound queue full, dropping frame");
            crate::metrics::record_frame_dropped();
            false
        }
        Err(TrySendError::Closed(_)) => {
            debug!(session_id, participant, "Outbound channel closed, skipping");
            false
        }
    }
}

/// Deliver one personalized copy of `snapshot` to each participant.
///
/// Each delivery is independent: one failing recipient does not affect the
/// others and is not reported back. Returns how many frames were queued.
pub fn fan_out(
    session_id: &str,
    snapshot: &SessionSnapshot,
    outbound: &HashMap<ParticipantId, Outbound>,
) -> usize {
    let sent = outbound
        .iter()
        .filter(|(participant, tx)| send_to(session_id, snapshot, participant, tx))
        .count();
    trace!(session_id, sent, "Broadcast snapshot");
    crate::metrics::record_broadcast(sent);
    sent
}
