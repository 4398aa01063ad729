//! Metrics event boundary.
//!
//! The engine emits structured events at planning and execution
//! milestones. By default they feed the thread-local counters in
//! [`crate::obs::metrics`]; a test or embedder can intercept them by
//! installing its own sink for the current thread.

use crate::obs::metrics::{self, MetricsState};
use std::cell::Cell;

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Save,
    Delete,
}

///
/// MetricsEvent
///

#[derive(Clone, Debug)]
pub enum MetricsEvent {
    /// A change plan was built.
    PlanBuilt { entity_type: String, actions: usize },
    /// Execution of a change began.
    ExecStart {
        kind: ExecKind,
        entity_type: String,
    },
    /// Execution of a change completed.
    ExecFinish {
        kind: ExecKind,
        entity_type: String,
        rows_touched: u64,
    },
    /// A merge's update matched no row and fell back to an insert.
    MergeFallback { entity_type: String },
    /// The store generated an identifier for an inserted row.
    GeneratedId { entity_type: String },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: &MetricsEvent);
}

///
/// GlobalMetricsSink
///
/// Default sink: folds events into the thread-local counters.
///

struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: &MetricsEvent) {
        metrics::with_state_mut(|state| fold(state, event));
    }
}

fn fold(state: &mut MetricsState, event: &MetricsEvent) {
    match event {
        MetricsEvent::PlanBuilt { actions, .. } => {
            state.plans_built = state.plans_built.saturating_add(1);
            state.actions_staged = state
                .actions_staged
                .saturating_add(u64::try_from(*actions).unwrap_or(u64::MAX));
        }
        MetricsEvent::ExecStart { kind, entity_type } => {
            state.exec_calls = state.exec_calls.saturating_add(1);
            let entity = state.entities.entry(entity_type.clone()).or_default();
            match kind {
                ExecKind::Save => entity.saves = entity.saves.saturating_add(1),
                ExecKind::Delete => entity.deletes = entity.deletes.saturating_add(1),
            }
        }
        MetricsEvent::ExecFinish {
            entity_type,
            rows_touched,
            ..
        } => {
            state.rows_touched = state.rows_touched.saturating_add(*rows_touched);
            let entity = state.entities.entry(entity_type.clone()).or_default();
            entity.rows_touched = entity.rows_touched.saturating_add(*rows_touched);
        }
        MetricsEvent::MergeFallback { .. } => {
            state.merge_fallbacks = state.merge_fallbacks.saturating_add(1);
        }
        MetricsEvent::GeneratedId { .. } => {
            state.generated_ids = state.generated_ids.saturating_add(1);
        }
    }
}

static GLOBAL: GlobalMetricsSink = GlobalMetricsSink;

thread_local! {
    static SINK_OVERRIDE: Cell<Option<&'static dyn MetricsSink>> = const { Cell::new(None) };
}

/// Install a sink for the current thread, or `None` to restore the
/// default counter sink.
pub fn set_sink(sink: Option<&'static dyn MetricsSink>) {
    SINK_OVERRIDE.with(|cell| cell.set(sink));
}

pub(crate) fn record(event: &MetricsEvent) {
    SINK_OVERRIDE.with(|cell| match cell.get() {
        Some(sink) => sink.record(event),
        None => GLOBAL.record(event),
    });
}

///
/// TESTS
///
