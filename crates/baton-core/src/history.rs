//! Append-only log of completed turns.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One closed turn, as sent in `lapHistory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    pub client: String,
    pub time_ms: u64,
}

impl Lap {
    pub fn new(client: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            client: client.into(),
            time_ms: duration_ms(elapsed),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TurnHistory {
    laps: Vec<Lap>,
}

impl TurnHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, lap: Lap) {
        self.laps.push(lap);
    }

    pub fn clear(&mut self) {
        self.laps.clear();
    }

    pub fn len(&self) -> usize {
        self.laps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.laps.is_empty()
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
