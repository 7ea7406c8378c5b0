//! Time range parsing and arithmetic

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A concrete query window in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Window start, epoch milliseconds
    pub from_ms: i64,
    /// Window end, epoch milliseconds
    pub to_ms: i64,
}

impl TimeRange {
    /// Window ending now with the given span in seconds
    pub fn last_seconds(seconds: i64) -> Self {
        let to_ms = Utc::now().timestamp_millis();
        Self {
            from_ms: to_ms - seconds * 1000,
            to_ms,
        }
    }

    /// Parse a human range like `"30m"`, `"12h"`, `"7d"` into a window
    /// ending now
    pub fn parse(range: &str) -> Result<Self> {
        let duration = humantime::parse_duration(range)
            .map_err(|e| Error::invalid_input(format!("unparseable time range '{range}': {e}")))?;
        Ok(Self::last_seconds(duration.as_secs() as i64))
    }

    /// Width of the window in milliseconds
    pub fn span_ms(&self) -> i64 {
        self.to_ms - self.from_ms
    }
}
