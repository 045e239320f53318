//! Per-node retry delay.
//!
//! A node that fails is excluded until `last failure + delay` has passed. The
//! delay doubles on every failure (up to the ceiling) and halves on every
//! success (down to the floor). There is no separate open/closed state: the
//! delay is the whole story.

use std::{
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::time::Instant;

/// Default delay floor.
pub const MIN_BACKOFF: Duration = Duration::from_millis(250);

/// Default delay ceiling.
pub const MAX_BACKOFF: Duration = Duration::from_millis(8_000);

#[derive(Debug)]
struct State {
    delay: Duration,
    last_failure: Option<Instant>,
}

/// Health of a single node.
#[derive(Debug)]
pub struct NodeHealth {
    min: Duration,
    max: Duration,
    state: Mutex<State>,
}

impl Default for NodeHealth {
    fn default() -> Self {
        Self::new(MIN_BACKOFF, MAX_BACKOFF)
    }
}

impl NodeHealth {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            state: Mutex::new(State {
                delay: min,
                last_failure: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current delay applied after a failure.
    pub fn delay(&self) -> Duration {
        self.state().delay
    }

    /// Time left before the node is eligible again.
    pub fn remaining(&self) -> Duration {
        let state = self.state();
        match state.last_failure {
            Some(last) => last
                .checked_add(state.delay)
                .map_or(Duration::MAX, |eligible| {
                    eligible.saturating_duration_since(Instant::now())
                }),
            None => Duration::ZERO,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn record_failure(&self) {
        let mut state = self.state();
        state.delay = state.delay.saturating_mul(2).min(self.max);
        state.last_failure = Some(Instant::now());
    }

    pub fn record_success(&self) {
        let mut state = self.state();
        state.delay = (state.delay / 2).max(self.min);
        state.last_failure = None;
    }

    /// Sleep until the node is eligible again.
    pub async fn wait_if_needed(&self) {
        let remaining = self.remaining();
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
    }
}
