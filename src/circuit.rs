use serde::Serialize;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Breaker state, including the data each state carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open { until: Instant },
    HalfOpen { probe_in_flight: bool },
}

/// State without its payload, for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitStatus {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitStatus {
    fn to_u8(self) -> u8 {
        match self {
            CircuitStatus::Closed => 0,
            CircuitStatus::Open => 1,
            CircuitStatus::HalfOpen => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => CircuitStatus::Open,
            2 => CircuitStatus::HalfOpen,
            _ => CircuitStatus::Closed,
        }
    }
}

impl From<CircuitState> for CircuitStatus {
    fn from(state: CircuitState) -> Self {
        match state {
            CircuitState::Closed => CircuitStatus::Closed,
            CircuitState::Open { .. } => CircuitStatus::Open,
            CircuitState::HalfOpen { .. } => CircuitStatus::HalfOpen,
        }
    }
}

/// Read-only view of a breaker's state, shareable across threads.
#[derive(Debug, Clone, Default)]
pub struct CircuitStatusCell(Arc<AtomicU8>);

impl CircuitStatusCell {
    pub fn get(&self) -> CircuitStatus {
        CircuitStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, status: CircuitStatus) {
        self.0.store(status.to_u8(), Ordering::Release);
    }
}

/// What the breaker allows for the next batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Closed: send with the full retry policy.
    Normal,
    /// Half-open: this batch is the single probe; one attempt only.
    Probe,
    /// Fail fast without touching the network.
    Rejected,
}

/// Closed / open / half-open breaker guarding the transport.
///
/// One exhausted batch opens the circuit for `reset_interval`. The first
/// batch after expiry is let through as a probe; its outcome closes or
/// re-opens the circuit. The breaker is owned by the flush loop, so every
/// transition happens on one task.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: CircuitState,
    reset_interval: Duration,
    status: CircuitStatusCell,
}

impl CircuitBreaker {
    pub fn new(reset_interval: Duration) -> Self {
        Self {
            state: CircuitState::Closed,
            reset_interval,
            status: CircuitStatusCell::default(),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn reset_interval(&self) -> Duration {
        self.reset_interval
    }

    /// A handle that tracks this breaker's status from other threads.
    pub fn status_cell(&self) -> CircuitStatusCell {
        self.status.clone()
    }

    pub fn admit(&mut self) -> Admission {
        self.admit_at(Instant::now())
    }

    pub fn admit_at(&mut self, now: Instant) -> Admission {
        match self.state {
            CircuitState::Closed => Admission::Normal,
            CircuitState::Open { until } if now < until => Admission::Rejected,
            CircuitState::Open { .. } | CircuitState::HalfOpen { probe_in_flight: false } => {
                self.transition(CircuitState::HalfOpen {
                    probe_in_flight: true,
                });
                Admission::Probe
            }
            CircuitState::HalfOpen {
                probe_in_flight: true,
            } => Admission::Rejected,
        }
    }

    /// The collector was reachable.
    pub fn record_success(&mut self) {
        if self.state != CircuitState::Closed {
            info!("collector reachable again, closing circuit");
            self.transition(CircuitState::Closed);
        }
    }

    pub fn record_failure(&mut self) {
        self.record_failure_at(Instant::now());
    }

    /// Open (or re-open) the circuit with a fresh expiry.
    pub fn record_failure_at(&mut self, now: Instant) {
        if self.state == CircuitState::Closed {
            warn!(reset_in = ?self.reset_interval, "collector unavailable, opening circuit");
        }
        self.transition(CircuitState::Open {
            until: now + self.reset_interval,
        });
    }

    fn transition(&mut self, next: CircuitState) {
        self.state = next;
        self.status.set(next.into());
    }
}
