//! Process-wide indexing state, threaded through as an explicit context
//! handle rather than kept in statics — callers (the CLI, a future daemon)
//! own a `GlobalState` and pass `&GlobalState` into every `Indexer` call.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::IndexError;

/// Cooperative cancellation for a running reindex. The collector checks this
/// after persisting each file; workers check it before starting the next
/// one in their shard. Rows already committed stay committed.
#[derive(Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

const REINDEX_COOLDOWN: Duration = Duration::from_secs(60);
const WRITE_WINDOW: Duration = Duration::from_secs(60);
const MAX_WRITES_PER_WINDOW: usize = 30;

pub struct GlobalState {
    last_reindex: Mutex<Option<Instant>>,
    write_timestamps: Mutex<VecDeque<Instant>>,
}

impl Default for GlobalState {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalState {
    pub fn new() -> Self {
        Self {
            last_reindex: Mutex::new(None),
            write_timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Claims the reindex slot for `now`, or returns the cooldown error if a
    /// reindex completed less than 60s ago. `force` callers still go through
    /// this — cooldown protects the backend, not the caller's intent.
    pub fn try_begin_reindex(&self, now: Instant) -> Result<(), IndexError> {
        let mut last = self.last_reindex.lock().unwrap();
        if let Some(prev) = *last {
            let elapsed = now.saturating_duration_since(prev);
            if elapsed < REINDEX_COOLDOWN {
                return Err(IndexError::ReindexCooldownActive {
                    retry_after_secs: (REINDEX_COOLDOWN - elapsed).as_secs(),
                });
            }
        }
        *last = Some(now);
        Ok(())
    }

    /// Records a single-file write against the rolling 60s/30-write budget.
    /// Returns `false` (without recording) when the budget is exhausted.
    pub fn try_record_write(&self, now: Instant) -> bool {
        let mut timestamps = self.write_timestamps.lock().unwrap();
        while let Some(&front) = timestamps.front() {
            if now.saturating_duration_since(front) > WRITE_WINDOW {
                timestamps.pop_front();
            } else {
                break;
            }
        }
        if timestamps.len() >= MAX_WRITES_PER_WINDOW {
            return false;
        }
        timestamps.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reindex_cooldown_blocks_immediate_second_call() {
        let state = GlobalState::new();
        let t0 = Instant::now();
        state.try_begin_reindex(t0).unwrap();
        let err = state.try_begin_reindex(t0 + Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, IndexError::ReindexCooldownActive { .. }));
    }

    #[test]
    fn reindex_cooldown_clears_after_window() {
        let state = GlobalState::new();
        let t0 = Instant::now();
        state.try_begin_reindex(t0).unwrap();
        assert!(state.try_begin_reindex(t0 + Duration::from_secs(61)).is_ok());
    }

    #[test]
    fn write_rate_limit_allows_exactly_the_budget() {
        let state = GlobalState::new();
        let t0 = Instant::now();
        for _ in 0..MAX_WRITES_PER_WINDOW {
            assert!(state.try_record_write(t0));
        }
        assert!(!state.try_record_write(t0));
    }

    #[test]
    fn write_rate_limit_recovers_after_window_slides() {
        let state = GlobalState::new();
        let t0 = Instant::now();
        for _ in 0..MAX_WRITES_PER_WINDOW {
            assert!(state.try_record_write(t0));
        }
        assert!(state.try_record_write(t0 + Duration::from_secs(61)));
    }
}
