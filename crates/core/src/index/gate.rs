//! Single-flight guard for reconciliation passes.
//!
//! At most one pass runs at a time. A caller that arrives while a pass is in
//! flight waits for it to finish and shares its result instead of starting
//! an overlapping pass against the same store.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use super::reconciler::{ReconcileError, ReconcileOutcome};

#[derive(Debug, Default)]
struct GateState {
    running: bool,
    /// Incremented every time a pass finishes.
    generation: u64,
    /// Error message of the most recently finished pass, if it failed.
    last_error: Option<String>,
    waiters: usize,
}

#[derive(Debug, Default)]
pub struct ScanGate {
    state: Mutex<GateState>,
    done: Condvar,
}

impl ScanGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `pass` unless one is already in flight, in which case block until
    /// that pass finishes and report [`ReconcileOutcome::Joined`] (or
    /// [`ReconcileError::JoinedPassFailed`] if it failed).
    pub fn run<F>(&self, pass: F) -> Result<ReconcileOutcome, ReconcileError>
    where
        F: FnOnce() -> Result<ReconcileOutcome, ReconcileError>,
    {
        let mut state = self.lock();

        if state.running {
            let joined = state.generation;
            state.waiters += 1;
            while state.generation == joined {
                state = self.done.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
            state.waiters -= 1;

            return match &state.last_error {
                Some(message) => Err(ReconcileError::JoinedPassFailed(message.clone())),
                None => Ok(ReconcileOutcome::Joined),
            };
        }

        state.running = true;
        drop(state);

        let mut leader = Leader { gate: self, error: None };
        let result = pass();
        if let Err(e) = &result {
            leader.error = Some(e.to_string());
        }
        drop(leader);

        result
    }

    /// Number of callers currently blocked on an in-flight pass.
    #[cfg(test)]
    pub(crate) fn waiters(&self) -> usize {
        self.lock().waiters
    }

    /// Whether a pass is currently running.
    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.lock().running
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the gate when the leading pass ends, including by panic.
struct Leader<'a> {
    gate: &'a ScanGate,
    error: Option<String>,
}

impl Drop for Leader<'_> {
    fn drop(&mut self) {
        let error = self
            .error
            .take()
            .or_else(|| std::thread::panicking().then(|| "scan pass panicked".to_string()));
        {
            let mut state = self.gate.lock();
            state.running = false;
            state.generation = state.generation.wrapping_add(1);
            state.last_error = error;
        }
        self.gate.done.notify_all();
    }
}
