//! Events emitted by the scheduler

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use suncap_util::SessionId;

use crate::{CaptureRecord, CaptureWindow, EventType};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEndReason {
    /// The capture window closed
    WindowClosed,
    /// The manual capture limit was reached
    LimitReached,
    /// Manual stop
    Stopped,
    /// Discarded by a reschedule
    Rescheduled,
}

/// How the planner resolved the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanOutcome {
    /// Capture disabled or no window could be computed
    Idle,
    StartedNow,
    Scheduled,
    /// Today's window already elapsed
    Deferred,
}

/// Scheduler events, broadcast to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SchedulerEvent {
    SunDataRefreshed {
        date: NaiveDate,
        sunrise: DateTime<Utc>,
        sunset: DateTime<Utc>,
    },

    WindowPlanned {
        window: Option<CaptureWindow>,
        outcome: PlanOutcome,
    },

    SessionStarted {
        session_id: SessionId,
        date: NaiveDate,
        manual: bool,
        max_captures: Option<u32>,
    },

    CaptureCompleted {
        session_id: SessionId,
        capture_count: u32,
        record: CaptureRecord,
    },

    CaptureFailed {
        session_id: SessionId,
        error: String,
    },

    SessionEnded {
        session_id: SessionId,
        capture_count: u32,
        reason: SessionEndReason,
    },

    ArtifactBuilt {
        date: NaiveDate,
        event_type: EventType,
        path: PathBuf,
    },

    ArtifactFailed {
        date: NaiveDate,
        event_type: EventType,
        error: String,
    },
}
