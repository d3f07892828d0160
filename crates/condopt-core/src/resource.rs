//! Resource accounting for planner-side allocations.
//!
//! Planning is confined to one thread per query, so the monitor uses `Cell`
//! rather than atomics.

use crate::error::{ErrorOrigin, InternalError};
use std::cell::Cell;

///
/// ResourceMonitor
///

#[derive(Debug, Default)]
pub struct ResourceMonitor {
    limit: Option<usize>,
    current: Cell<usize>,
    peak: Cell<usize>,
}

impl ResourceMonitor {
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            limit: None,
            current: Cell::new(0),
            peak: Cell::new(0),
        }
    }

    #[must_use]
    pub const fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            current: Cell::new(0),
            peak: Cell::new(0),
        }
    }

    /// Charge `bytes` against the limit; rejected charges leave usage unchanged.
    pub fn increase(&self, origin: ErrorOrigin, bytes: usize) -> Result<(), InternalError> {
        let next = self.current.get().saturating_add(bytes);
        if let Some(limit) = self.limit
            && next > limit
        {
            return Err(InternalError::resource_exhausted(
                origin,
                format!("resource limit exceeded: {next} bytes requested, limit is {limit} bytes"),
            ));
        }

        self.current.set(next);
        if next > self.peak.get() {
            self.peak.set(next);
        }

        Ok(())
    }

    pub fn decrease(&self, bytes: usize) {
        self.current.set(self.current.get().saturating_sub(bytes));
    }

    #[must_use]
    pub fn current(&self) -> usize {
        self.current.get()
    }

    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.get()
    }

    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.limit
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    #[test]
    fn rejected_charge_does_not_change_usage() {
        let monitor = ResourceMonitor::with_limit(100);
        monitor.increase(ErrorOrigin::Path, 60).expect("fits");

        let err = monitor.increase(ErrorOrigin::Path, 50).expect_err("over limit");
        assert_eq!(err.class, ErrorClass::ResourceExhausted);
        assert_eq!(monitor.current(), 60);

        monitor.decrease(60);
        assert_eq!(monitor.current(), 0);
        assert_eq!(monitor.peak(), 60);
    }
}
