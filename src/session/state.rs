//! Session state and time accounting
//!
//! One authoritative timeline per session. Display layers poll the
//! snapshot instead of keeping their own clocks; duplicated timers drift.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of the recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No recording in progress
    Idle,
    /// start() accepted, capture handshake in flight
    Starting,
    /// Currently recording
    Active,
    /// Recording is paused
    Paused,
    /// stop() accepted, finalizing
    Stopping,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Wall-clock and pause accounting for one session
///
/// `accumulated_pause` only changes at pause-entry and resume-entry
/// boundaries; elapsed time is derived, never stored.
#[derive(Debug, Clone)]
pub struct SessionTimeline {
    started_at: DateTime<Utc>,
    started: Instant,
    accumulated_pause: Duration,
    pause_started: Option<Instant>,
}

impl SessionTimeline {
    pub fn start() -> Self {
        Self::start_at(Utc::now(), Instant::now())
    }

    fn start_at(started_at: DateTime<Utc>, started: Instant) -> Self {
        Self {
            started_at,
            started,
            accumulated_pause: Duration::ZERO,
            pause_started: None,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_paused(&self) -> bool {
        self.pause_started.is_some()
    }

    pub fn pause(&mut self) -> bool {
        self.pause_at(Instant::now())
    }

    /// Enter a pause; false if already paused
    pub fn pause_at(&mut self, now: Instant) -> bool {
        if self.pause_started.is_some() {
            return false;
        }
        self.pause_started = Some(now);
        true
    }

    pub fn resume(&mut self) -> bool {
        self.resume_at(Instant::now())
    }

    /// Leave a pause, folding its span into the accumulated total;
    /// false if not paused
    pub fn resume_at(&mut self, now: Instant) -> bool {
        match self.pause_started.take() {
            Some(pause_started) => {
                self.accumulated_pause += now.saturating_duration_since(pause_started);
                true
            }
            None => false,
        }
    }

    pub fn accumulated_pause(&self) -> Duration {
        self.accumulated_pause_at(Instant::now())
    }

    /// Total paused time, including the still-open pause if any
    pub fn accumulated_pause_at(&self, now: Instant) -> Duration {
        let live = self
            .pause_started
            .map(|p| now.saturating_duration_since(p))
            .unwrap_or(Duration::ZERO);
        self.accumulated_pause + live
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    /// Active recording time: wall time minus every paused span
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started)
            .checked_sub(self.accumulated_pause_at(now))
            .unwrap_or(Duration::ZERO)
    }
}

/// Synchronous view of the session, safe to poll from any display layer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub state: SessionState,
    pub is_recording: bool,
    pub is_paused: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub accumulated_pause_ms: u64,
    pub elapsed_ms: u64,
}

impl StateSnapshot {
    pub fn idle() -> Self {
        Self {
            state: SessionState::Idle,
            is_recording: false,
            is_paused: false,
            started_at: None,
            accumulated_pause_ms: 0,
            elapsed_ms: 0,
        }
    }
}
