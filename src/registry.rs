//! Run control and the run registry
//!
//! Every engine owns one [`RunControl`] holding its error flag and the
//! first failure recorded during a run. A process-wide registry maps a
//! [`RunId`] to a weak handle on that control, so code that only has the id
//! (an embedding host, a signal handler) can reach the run without keeping
//! the engine alive.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::EngineError;

/// Opaque identifier of a registered run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(u64);

impl RunId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// Error flag of one run
///
/// Once set, every operator invocation of the run short-circuits to a
/// neutral value and the loop stops at its next stopping check.
#[derive(Debug, Default)]
pub struct RunControl {
    flag: AtomicBool,
    failure: Mutex<Option<EngineError>>,
}

impl RunControl {
    /// Create a control with the flag cleared
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the error flag
    pub fn is_failed(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Record a failure and set the flag; only the first failure is kept
    pub fn fail(&self, error: EngineError) {
        let mut slot = match self.failure.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_none() {
            warn!(error = %error, "run failed, unwinding");
            *slot = Some(error);
        } else {
            debug!(error = %error, "ignoring failure after the first");
        }
        self.flag.store(true, Ordering::Release);
    }

    /// Cooperatively cancel the run
    pub fn cancel(&self) {
        self.fail(EngineError::Cancelled);
    }

    /// Take the recorded failure and clear the flag
    pub fn take_failure(&self) -> Option<EngineError> {
        let mut slot = match self.failure.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.flag.store(false, Ordering::Release);
        slot.take()
    }
}

fn registry() -> &'static DashMap<RunId, Weak<RunControl>> {
    static REGISTRY: OnceLock<DashMap<RunId, Weak<RunControl>>> = OnceLock::new();
    REGISTRY.get_or_init(DashMap::new)
}

/// Registration of a run; unregisters itself when dropped
#[derive(Debug)]
pub struct Registration {
    id: RunId,
}

impl Registration {
    /// Register a weak handle to `control` under a fresh id
    pub fn new(control: &Arc<RunControl>) -> Self {
        let id = RunId::next();
        registry().insert(id, Arc::downgrade(control));
        debug!(run = %id, "registered run");
        Self { id }
    }

    /// The id this run is registered under
    pub fn id(&self) -> RunId {
        self.id
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        registry().remove(&self.id);
    }
}

/// Look up the control of a live run
pub fn lookup(id: RunId) -> Option<Arc<RunControl>> {
    registry().get(&id).and_then(|entry| entry.value().upgrade())
}

/// Cancel a live run by id; returns false if it no longer exists
pub fn cancel(id: RunId) -> bool {
    match lookup(id) {
        Some(control) => {
            control.cancel();
            true
        }
        None => false,
    }
}

/// Ids of every live registered run
pub fn live_runs() -> Vec<RunId> {
    let mut ids: Vec<RunId> = registry()
        .iter()
        .filter(|entry| entry.value().strong_count() > 0)
        .map(|entry| *entry.key())
        .collect();
    ids.sort();
    ids
}

pub mod prelude {
    pub use super::{RunControl, RunId};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContractViolation;

    #[test]
    fn test_first_failure_wins() {
        let control = RunControl::new();
        assert!(!control.is_failed());
        control.fail(EngineError::ResourceExhaustion("first".into()));
        control.fail(EngineError::Cancelled);
        assert!(control.is_failed());
        assert!(matches!(
            control.take_failure(),
            Some(EngineError::ResourceExhaustion(_))
        ));
        assert!(!control.is_failed());
        assert!(control.take_failure().is_none());
    }

    #[test]
    fn test_registry_lookup_and_cancel() {
        let control = Arc::new(RunControl::new());
        let registration = Registration::new(&control);
        let id = registration.id();

        assert!(live_runs().contains(&id));
        assert!(cancel(id));
        assert!(control.is_failed());
        assert!(matches!(control.take_failure(), Some(EngineError::Cancelled)));

        drop(registration);
        assert!(lookup(id).is_none());
        assert!(!cancel(id));
    }

    #[test]
    fn test_registry_does_not_keep_runs_alive() {
        let control = Arc::new(RunControl::new());
        let registration = Registration::new(&control);
        let id = registration.id();
        drop(control);
        assert!(lookup(id).is_none());
        assert!(!live_runs().contains(&id));
    }

    #[test]
    fn test_concurrent_registrations() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    let control = Arc::new(RunControl::new());
                    let registration = Registration::new(&control);
                    let id = registration.id();
                    assert!(lookup(id).is_some());
                    drop(registration);
                    id
                })
            })
            .collect();
        let mut ids: Vec<RunId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert!(ids.iter().all(|&id| lookup(id).is_none()));
    }

    #[test]
    fn test_contract_failure_is_recorded() {
        let control = RunControl::new();
        control.fail(
            ContractViolation::EvaluationArity {
                expected: 1,
                actual: 2,
            }
            .into(),
        );
        assert!(matches!(
            control.take_failure(),
            Some(EngineError::Contract(ContractViolation::EvaluationArity { .. }))
        ));
    }
}
