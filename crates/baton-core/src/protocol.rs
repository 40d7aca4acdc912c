//! Baton wire protocol.
//!
//! JSON-over-WebSocket. Clients send `command` frames; the server answers
//! with personalized `update` snapshots of the whole session.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BatonError, Result};
use crate::history::Lap;

/// Frame type carried by every client command.
pub const COMMAND_FRAME: &str = "command";

/// Frame type carried by every server snapshot.
pub const UPDATE_FRAME: &str = "update";

/// Client -> Server frame. Unknown fields are ignored, missing ones default to empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientFrame {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub command: String,
}

impl ClientFrame {
    pub fn new(command: Command) -> Self {
        Self {
            kind: COMMAND_FRAME.into(),
            command: command.as_str().into(),
        }
    }

    /// The command this frame carries, if it is a command frame with a known verb.
    pub fn command(&self) -> Option<Command> {
        if self.kind != COMMAND_FRAME {
            return None;
        }
        Command::parse(&self.command)
    }

    /// Decode raw frame text into the command it carries.
    ///
    /// Malformed JSON is `BatonError::Json`; a well-formed frame that is not
    /// a known command is `BatonError::Protocol`.
    pub fn decode_command(text: &str) -> Result<Command> {
        let frame: ClientFrame = serde_json::from_str(text)?;
        frame.command().ok_or_else(|| {
            BatonError::Protocol(format!(
                "not a command frame (type={:?}, command={:?})",
                frame.kind, frame.command
            ))
        })
    }
}

/// Mutating verbs a controller may issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Start,
    Pause,
    Reset,
    /// Close the current turn and hand control on. Sent as `"next"`.
    Advance,
}

impl Command {
    pub fn parse(verb: &str) -> Option<Self> {
        match verb {
            "start" => Some(Self::Start),
            "pause" => Some(Self::Pause),
            "reset" => Some(Self::Reset),
            "next" => Some(Self::Advance),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Reset => "reset",
            Self::Advance => "next",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session-wide state shared by every recipient of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Elapsed milliseconds of the current turn.
    pub time: u64,
    /// Duration of the last completed turn.
    pub lap_time: u64,
    /// Who completed the last turn, `""` if none.
    pub last_lap_client: String,
    pub lap_history: Vec<Lap>,
    /// Current controller, `""` when the session is empty.
    pub active_client: String,
    pub clients: Vec<String>,
}

impl SessionSnapshot {
    /// Borrow this snapshot as the frame sent to `your_id`.
    pub fn personalize<'a>(&'a self, your_id: &'a str) -> UpdateFrame<'a> {
        UpdateFrame {
            kind: UPDATE_FRAME,
            snapshot: self,
            your_id,
        }
    }
}

/// Server -> Client snapshot, serialized without copying the shared state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFrame<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(flatten)]
    pub snapshot: &'a SessionSnapshot,
    pub your_id: &'a str,
}

/// Owned, decodable form of [`UpdateFrame`] for clients and tests.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    pub your_id: String,
}

/// Body returned by the session creation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSessionResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}
