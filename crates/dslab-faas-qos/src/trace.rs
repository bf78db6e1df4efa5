//! Append-only record of instance state transitions produced by a simulation run.

use std::slice::Iter;

use serde::Serialize;

/// Transition recorded in the trace.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum TransitionKind {
    /// A new instance was created to serve the request.
    ColdStart { request: usize, instance: usize },
    /// An idle instance was reused for the request.
    WarmStart { request: usize, instance: usize },
    /// The request was rejected because the capacity bound was reached.
    Rejected { request: usize },
    /// The instance finished serving the request and became idle.
    ServiceComplete { request: usize, instance: usize },
    /// The instance was destroyed after staying idle for the expiration threshold.
    Expired { instance: usize, created_at: f64 },
    /// Expiration event for an instance that was reused in the meantime, counters are unchanged.
    ExpirationSkipped { instance: usize },
}

/// Single trace entry. Counters are valid from `time` until the next record.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TraceRecord {
    pub time: f64,
    pub kind: TransitionKind,
    pub server_count: usize,
    pub running_count: usize,
    pub idle_count: usize,
}

/// Lifespan of an instance that was still alive when the run ended.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct OpenLifespan {
    pub instance: usize,
    pub created_at: f64,
    /// Time between creation and the end of the run.
    pub duration: f64,
}

/// Trace of a single simulation run.
///
/// Records are only appended by the simulator, external code gets read-only access.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Trace {
    records: Vec<TraceRecord>,
    end_time: f64,
    open_lifespans: Vec<OpenLifespan>,
    finished: bool,
}

impl Trace {
    pub(crate) fn push(&mut self, record: TraceRecord) {
        assert!(!self.finished, "trace is already finished");
        debug_assert!(record.running_count + record.idle_count == record.server_count);
        debug_assert!(self.records.last().map_or(true, |last| last.time <= record.time));
        self.records.push(record);
    }

    pub(crate) fn set_end_time(&mut self, time: f64) {
        self.end_time = time;
    }

    pub(crate) fn finish(&mut self, open_lifespans: Vec<OpenLifespan>) {
        self.open_lifespans = open_lifespans;
        self.finished = true;
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn iter(&self) -> Iter<'_, TraceRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Simulation always starts at time 0.
    pub fn start_time(&self) -> f64 {
        0.
    }

    /// Time at which the run ended (or was aborted).
    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Lifespans of instances alive at the end of the run, empty until the run is finished.
    pub fn open_lifespans(&self) -> &[OpenLifespan] {
        &self.open_lifespans
    }

    /// Whether the run producing this trace has ended.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
