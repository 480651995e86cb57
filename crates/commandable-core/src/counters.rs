//! Instance-scoped call counters and timers.
//!
//! Each service or client owns its own [`CallCounters`]; nothing here is
//! global. Timers are RAII guards so they stop on every exit path.

use crate::ApplicationError;
use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::{error, trace};

/// Snapshot of one counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counter {
    pub count: u64,
    pub total: Duration,
    pub last: Option<Duration>,
    pub max: Duration,
}

#[derive(Debug, Default)]
pub struct CallCounters {
    entries: DashMap<String, Counter>,
}

impl CallCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self, name: &str, by: u64) {
        self.entries.entry(name.to_string()).or_default().count += by;
    }

    pub fn increment_one(&self, name: &str) {
        self.increment(name, 1);
    }

    /// Record one measured interval.
    pub fn record_elapsed(&self, name: &str, elapsed: Duration) {
        let mut entry = self.entries.entry(name.to_string()).or_default();
        entry.count += 1;
        entry.total += elapsed;
        entry.last = Some(elapsed);
        entry.max = entry.max.max(elapsed);
    }

    /// Start a timer that records into `name` when dropped.
    pub fn begin_timing(&self, name: impl Into<String>) -> Timing<'_> {
        Timing {
            counters: self,
            name: name.into(),
            start: Instant::now(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Counter> {
        self.entries.get(name).map(|e| *e)
    }

    /// Count for `name`, zero when never touched.
    pub fn count(&self, name: &str) -> u64 {
        self.get(name).map_or(0, |c| c.count)
    }

    /// Guard for one outbound call: `<name>.call_count`, `.call_time`, `.call_errors`.
    pub fn instrument_call(
        &self,
        correlation_id: Option<&str>,
        name: &str,
    ) -> InstrumentTiming<'_> {
        self.instrument(correlation_id, name, "call")
    }

    /// Guard for one served execution: `<name>.exec_count`, `.exec_time`, `.exec_errors`.
    pub fn instrument_exec(
        &self,
        correlation_id: Option<&str>,
        name: &str,
    ) -> InstrumentTiming<'_> {
        self.instrument(correlation_id, name, "exec")
    }

    fn instrument(
        &self,
        correlation_id: Option<&str>,
        name: &str,
        verb: &'static str,
    ) -> InstrumentTiming<'_> {
        trace!(correlation_id, "Executing {} method", name);
        self.increment_one(&format!("{name}.{verb}_count"));
        InstrumentTiming {
            counters: self,
            name: name.to_string(),
            verb,
            correlation_id: correlation_id.map(str::to_string),
            _timing: self.begin_timing(format!("{name}.{verb}_time")),
        }
    }
}

/// Timer that records its elapsed time on drop.
#[derive(Debug)]
pub struct Timing<'a> {
    counters: &'a CallCounters,
    name: String,
    start: Instant,
}

impl Drop for Timing<'_> {
    fn drop(&mut self) {
        self.counters.record_elapsed(&self.name, self.start.elapsed());
    }
}

/// Scope guard around an instrumented call.
///
/// The timer stops when the guard is dropped, whichever way the call ends.
#[derive(Debug)]
pub struct InstrumentTiming<'a> {
    counters: &'a CallCounters,
    name: String,
    verb: &'static str,
    correlation_id: Option<String>,
    _timing: Timing<'a>,
}

impl InstrumentTiming<'_> {
    pub fn end_success(self) {}

    /// Count and log the failure, then stop the timer.
    pub fn end_failure(self, err: &ApplicationError) {
        self.counters
            .increment_one(&format!("{}.{}_errors", self.name, self.verb));
        error!(
            correlation_id = self.correlation_id.as_deref(),
            code = err.code(),
            "Failed to execute {} method: {}",
            self.name,
            err
        );
    }

    /// Close the guard according to `result` and hand the result back.
    pub fn end<T>(self, result: Result<T, ApplicationError>) -> Result<T, ApplicationError> {
        match &result {
            Ok(_) => self.end_success(),
            Err(e) => self.end_failure(e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timing_records_on_drop() {
        let counters = CallCounters::new();
        {
            let _t = counters.begin_timing("op.time");
        }
        let counter = counters.get("op.time").unwrap();
        assert_eq!(counter.count, 1);
        assert!(counter.last.is_some());
    }

    #[test]
    fn instrument_counts_calls_and_errors() {
        let counters = CallCounters::new();
        let ok: Result<(), ApplicationError> = Ok(());
        counters.instrument_call(None, "dummy.create").end(ok).unwrap();

        let err = ApplicationError::not_found(None, "TEST_ERROR", "Dummy error");
        let failed = counters.instrument_call(Some("cid"), "dummy.create").end::<()>(Err(err));
        assert!(failed.is_err());

        assert_eq!(counters.count("dummy.create.call_count"), 2);
        assert_eq!(counters.count("dummy.create.call_time"), 2);
        assert_eq!(counters.count("dummy.create.call_errors"), 1);
        assert_eq!(counters.count("dummy.create.exec_count"), 0);
    }

    #[test]
    fn dropped_guard_still_stops_timer() {
        let counters = CallCounters::new();
        drop(counters.instrument_exec(None, "svc.ping"));
        assert_eq!(counters.count("svc.ping.exec_time"), 1);
        assert_eq!(counters.count("svc.ping.exec_errors"), 0);
    }
}
