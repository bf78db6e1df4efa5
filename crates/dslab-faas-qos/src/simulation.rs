//! Discrete-event simulator of a scale-per-request serverless platform.

use std::time::{Duration, Instant};

use serde_json::json;

use crate::config::{Config, Termination};
use crate::error::SimulationError;
use crate::instance::InstancePool;
use crate::process::RandomVariateSource;
use crate::request::{RequestOutcome, RequestRegistry};
use crate::routing::{default_routing_policy_resolver, RoutingPolicy};
use crate::stats::{Stats, StatsOptions};
use crate::timeline::{Event, EventKind, Timeline};
use crate::trace::{OpenLifespan, Trace, TraceRecord, TransitionKind};
use crate::{log_debug, log_info, log_trace, log_warn};

/// Limits of a single [`ServerlessSimulator::run_with_budget`] call.
#[derive(Clone, Copy, Debug, Default)]
pub struct RunBudget {
    /// Maximum number of processed events.
    pub max_steps: Option<u64>,
    /// Maximum wall-clock duration.
    pub max_wall_time: Option<Duration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The termination bound of the config was reached.
    Completed,
    /// The budget was exhausted first, the trace contains all transitions applied until then.
    Aborted,
}

pub struct ServerlessSimulator {
    name: String,
    config: Config,
    time: f64,
    rvs: RandomVariateSource,
    timeline: Timeline,
    pool: InstancePool,
    requests: RequestRegistry,
    routing: Box<dyn RoutingPolicy + Send>,
    trace: Trace,
    processed_events: u64,
}

impl ServerlessSimulator {
    /// Validates the config and schedules the first arrival.
    pub fn new(config: Config) -> Result<Self, SimulationError> {
        config.validate()?;
        let rvs = RandomVariateSource::new(
            config.seed,
            &config.arrival_process,
            &config.warm_service_process,
            &config.cold_service_process,
        )?;
        let routing = default_routing_policy_resolver(&config.routing_policy)?;
        let mut sim = Self {
            name: "simulation".to_string(),
            config,
            time: 0.,
            rvs,
            timeline: Timeline::new(),
            pool: InstancePool::new(),
            requests: Default::default(),
            routing,
            trace: Default::default(),
            processed_events: 0,
        };
        let first_arrival = sim.rvs.next_interarrival();
        sim.timeline.schedule(first_arrival, EventKind::Arrival { request: 0 });
        log_debug!(
            sim,
            "created simulator: {}",
            json!({"seed": sim.config.seed, "routing": sim.routing.to_string(), "first_arrival": first_arrival})
        );
        Ok(sim)
    }

    /// Sets the name used as the log target.
    pub fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current simulated time.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    pub fn requests(&self) -> &RequestRegistry {
        &self.requests
    }

    pub fn instances(&self) -> &InstancePool {
        &self.pool
    }

    /// Number of events popped from the timeline so far.
    pub fn event_count(&self) -> u64 {
        self.processed_events
    }

    pub fn is_finished(&self) -> bool {
        self.trace.is_finished()
    }

    /// Runs the simulation until the termination bound.
    ///
    /// If `progress` is set, progress is reported to the log at info level every percent.
    pub fn generate_trace(&mut self, progress: bool) -> Result<(), SimulationError> {
        let mut last_percent = 0;
        while self.step()? {
            if progress {
                self.report_progress(&mut last_percent);
            }
        }
        Ok(())
    }

    /// Runs the simulation until the termination bound or until the budget is exhausted.
    ///
    /// An aborted run is finished at the time of the last processed event and can not be resumed.
    pub fn run_with_budget(&mut self, budget: RunBudget) -> Result<RunOutcome, SimulationError> {
        if self.is_finished() {
            return Ok(RunOutcome::Completed);
        }
        let started = Instant::now();
        let mut steps = 0;
        loop {
            let out_of_steps = budget.max_steps.map_or(false, |max| steps >= max);
            let out_of_time = budget.max_wall_time.map_or(false, |max| started.elapsed() >= max);
            if out_of_steps || out_of_time {
                log_warn!(self, "run aborted after {} steps", steps);
                self.finish(self.time);
                return Ok(RunOutcome::Aborted);
            }
            if !self.step()? {
                return Ok(RunOutcome::Completed);
            }
            steps += 1;
        }
    }

    /// Processes the next event. Returns false once the termination bound is reached.
    pub fn step(&mut self) -> Result<bool, SimulationError> {
        if self.is_finished() {
            return Ok(false);
        }
        let next_time = self
            .timeline
            .peek_time()
            .ok_or(SimulationError::TimelineUnderflow { time: self.time })?;
        if let Termination::MaxTime(max_time) = self.config.termination {
            if next_time > max_time {
                self.finish(max_time);
                return Ok(false);
            }
        }
        let event = self
            .timeline
            .pop_next()
            .map_err(|_| SimulationError::TimelineUnderflow { time: self.time })?;
        debug_assert!(event.time >= self.time);
        self.time = event.time;
        self.processed_events += 1;
        self.on_event(event);
        self.trace.set_end_time(self.time);
        if let Termination::MaxRequests(max_requests) = self.config.termination {
            if self.requests.len() as u64 >= max_requests {
                self.finish(self.time);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Computes metrics of the trace produced so far.
    pub fn stats(&self) -> Stats {
        Stats::from_trace(&self.trace, &StatsOptions::default())
    }

    pub fn stats_with_options(&self, options: &StatsOptions) -> Stats {
        Stats::from_trace(&self.trace, options)
    }

    /// Logs the metrics report and returns the metrics.
    pub fn print_trace_results(&self) -> Stats {
        let stats = self.stats();
        for (name, value) in stats.as_map() {
            log_info!(self, "{}: {:.6}", name, value);
        }
        stats
    }

    fn on_event(&mut self, event: Event) {
        log_trace!(self, "event: {}", json!({"id": event.id, "kind": event.kind}));
        match event.kind {
            EventKind::Arrival { request } => self.on_arrival(request),
            EventKind::ServiceComplete { request, instance } => self.on_service_complete(request, instance),
            EventKind::Expire { instance, epoch } => self.on_expire(instance, epoch),
        }
    }

    fn on_arrival(&mut self, request: usize) {
        let next_arrival = self.time + self.rvs.next_interarrival();
        self.timeline
            .schedule(next_arrival, EventKind::Arrival { request: request + 1 });
        let id = self.requests.add_request(self.time);
        debug_assert_eq!(id, request);

        let warm = if self.pool.idle_count() > 0 {
            self.routing.select_idle(&self.pool)
        } else {
            None
        };
        if let Some(instance) = warm {
            self.pool.start_warm(instance);
            self.start_service(id, instance, RequestOutcome::Warm);
            self.record(TransitionKind::WarmStart { request: id, instance });
        } else if self.config.capacity.map_or(true, |cap| self.pool.server_count() < cap) {
            let instance = self.pool.start_cold(self.time);
            self.start_service(id, instance, RequestOutcome::Cold);
            self.record(TransitionKind::ColdStart { request: id, instance });
        } else {
            self.requests.set_outcome(id, RequestOutcome::Rejected, None, self.time);
            log_debug!(self, "request {} rejected, capacity is exhausted", id);
            self.record(TransitionKind::Rejected { request: id });
        }
    }

    fn start_service(&mut self, request: usize, instance: usize, outcome: RequestOutcome) {
        self.requests.set_outcome(request, outcome, Some(instance), self.time);
        let service_time = self.rvs.next_service_time(outcome == RequestOutcome::Cold);
        self.timeline.schedule(
            self.time + service_time,
            EventKind::ServiceComplete { request, instance },
        );
    }

    fn on_service_complete(&mut self, request: usize, instance: usize) {
        let epoch = self.pool.finish_service(instance, self.time);
        self.requests.complete(request, self.time);
        if self.config.expiration_threshold.is_finite() {
            self.timeline.schedule(
                self.time + self.config.expiration_threshold,
                EventKind::Expire { instance, epoch },
            );
        }
        self.record(TransitionKind::ServiceComplete { request, instance });
    }

    fn on_expire(&mut self, instance: usize, epoch: u64) {
        let threshold = self.config.expiration_threshold;
        let time = self.time;
        let expired = self.pool.try_expire(instance, epoch, time).map(|x| {
            debug_assert!(x.became_idle_at.map_or(false, |t| t + threshold <= time));
            x.created_at
        });
        match expired {
            Some(created_at) => {
                log_debug!(self, "instance {} expired after {:.3}", instance, time - created_at);
                self.record(TransitionKind::Expired { instance, created_at });
            }
            None => {
                log_trace!(self, "outdated expiration of instance {} at epoch {}", instance, epoch);
                self.record(TransitionKind::ExpirationSkipped { instance });
            }
        }
    }

    fn record(&mut self, kind: TransitionKind) {
        self.trace.push(TraceRecord {
            time: self.time,
            kind,
            server_count: self.pool.server_count(),
            running_count: self.pool.running_count(),
            idle_count: self.pool.idle_count(),
        });
    }

    fn finish(&mut self, end_time: f64) {
        self.time = end_time;
        self.trace.set_end_time(end_time);
        let open_lifespans = self
            .pool
            .alive()
            .map(|x| OpenLifespan {
                instance: x.id,
                created_at: x.created_at,
                duration: end_time - x.created_at,
            })
            .collect();
        self.trace.finish(open_lifespans);
        log_info!(
            self,
            "simulation finished: {}",
            json!({
                "events": self.processed_events,
                "requests": self.requests.len(),
                "instances_created": self.pool.created_count(),
                "instances_alive": self.pool.server_count(),
            })
        );
    }

    fn report_progress(&self, last_percent: &mut u64) {
        let fraction = match self.config.termination {
            Termination::MaxTime(max_time) => self.time / max_time,
            Termination::MaxRequests(max_requests) => self.requests.len() as f64 / max_requests as f64,
        };
        let percent = ((fraction * 100.).floor() as u64).min(100);
        if percent > *last_percent {
            *last_percent = percent;
            log_info!(self, "progress: {}%", percent);
        }
    }
}
