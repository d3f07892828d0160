//! Trace sink boundary.
//!
//! Sinks are optional, injected by the caller, and must not affect planning.

use crate::obs::PlannerEvent;
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn PlannerTraceSink>>> = RefCell::new(None);
}

///
/// PlannerTraceSink
///

pub trait PlannerTraceSink {
    fn record(&self, event: &PlannerEvent);
}

///
/// RecordingSink
/// Sink that keeps every event in memory, in order.
///

#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<PlannerEvent>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<PlannerEvent> {
        self.events.borrow().clone()
    }
}

impl PlannerTraceSink for RecordingSink {
    fn record(&self, event: &PlannerEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

// Restores the previous sink even if the scoped closure panics.
struct SinkGuard {
    previous: Option<Rc<dyn PlannerTraceSink>>,
}

impl Drop for SinkGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        SINK_OVERRIDE.with(|cell| *cell.borrow_mut() = previous);
    }
}

/// Run `f` with `sink` installed as the planner trace sink for this thread.
pub fn with_trace_sink<T>(sink: Rc<dyn PlannerTraceSink>, f: impl FnOnce() -> T) -> T {
    let previous = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = SinkGuard { previous };

    f()
}

/// Record one planner event.
pub(crate) fn record(event: PlannerEvent) {
    tracing::debug!(?event, "planner event");

    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    if let Some(sink) = sink {
        sink.record(&event);
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::obs::BranchRemoval;

    #[test]
    fn scoped_sink_receives_events_and_is_uninstalled_afterwards() {
        let sink = Rc::new(RecordingSink::new());

        with_trace_sink(sink.clone(), || {
            record(PlannerEvent::BranchRemoved {
                reason: BranchRemoval::Impossible,
            });
        });
        record(PlannerEvent::JoinComposed { members: 2 });

        assert_eq!(
            sink.events(),
            vec![PlannerEvent::BranchRemoved {
                reason: BranchRemoval::Impossible
            }]
        );
    }
}
