//! Thread-local runtime counters.
//!
//! Counters accumulate per thread through the default metrics sink.
//! `snapshot` and `reset` give tests and embedders a cheap window into
//! what the engine has been doing.

use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// MetricsState
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct MetricsState {
    pub plans_built: u64,
    pub actions_staged: u64,
    pub exec_calls: u64,
    pub rows_touched: u64,
    pub merge_fallbacks: u64,
    pub generated_ids: u64,
    pub entities: BTreeMap<String, EntityMetrics>,
}

///
/// EntityMetrics
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityMetrics {
    pub saves: u64,
    pub deletes: u64,
    pub rows_touched: u64,
}

thread_local! {
    static STATE: RefCell<MetricsState> = RefCell::new(MetricsState::default());
}

pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut MetricsState) -> R) -> R {
    STATE.with(|state| f(&mut state.borrow_mut()))
}

/// Copy of the current thread's counters.
#[must_use]
pub fn snapshot() -> MetricsState {
    STATE.with(|state| state.borrow().clone())
}

/// Reset the current thread's counters to zero.
pub fn reset() {
    STATE.with(|state| *state.borrow_mut() = MetricsState::default());
}
