//! Metrics derived from a finished simulation trace.
use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::trace::{Trace, TransitionKind};

/// Collection of samples with basic descriptive statistics.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SampleMetric {
    data: Vec<f64>,
}

impl SampleMetric {
    pub fn add(&mut self, x: f64) {
        self.data.push(x);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Returns NaN for an empty metric.
    pub fn mean(&self) -> f64 {
        self.sum() / (self.data.len() as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.data.iter().copied().min_by(|a, b| a.total_cmp(b))
    }

    pub fn max(&self) -> Option<f64> {
        self.data.iter().copied().max_by(|a, b| a.total_cmp(b))
    }

    pub fn biased_variance(&self) -> f64 {
        let mean = self.mean();
        self.data.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / (self.data.len() as f64)
    }

    pub fn unbiased_variance(&self) -> f64 {
        let n = self.data.len() as f64;
        self.biased_variance() * n / (n - 1.)
    }

    /// Returns q-th quantile with linear interpolation between closest ranks. Returns NaN for an empty metric.
    pub fn quantile(&self, q: f64) -> f64 {
        if self.data.is_empty() {
            return f64::NAN;
        }
        let pos = q.clamp(0., 1.) * ((self.data.len() - 1) as f64);
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        let mut data = self.data.clone();
        let lo_val = *order_stat::kth_by(&mut data, lo, |a, b| a.total_cmp(b));
        if hi == lo {
            return lo_val;
        }
        let hi_val = *order_stat::kth_by(&mut data, hi, |a, b| a.total_cmp(b));
        lo_val + (hi_val - lo_val) * (pos - lo as f64)
    }
}

/// Integrates a piecewise-constant function of time.
#[derive(Clone, Debug, Default)]
pub struct TimeWeightedMetric {
    start: f64,
    last_time: f64,
    value: f64,
    area: f64,
}

impl TimeWeightedMetric {
    pub fn new(start: f64, value: f64) -> Self {
        Self {
            start,
            last_time: start,
            value,
            area: 0.,
        }
    }

    /// Sets a new function value from `time` on.
    pub fn update(&mut self, time: f64, value: f64) {
        self.advance(time);
        self.value = value;
    }

    fn advance(&mut self, time: f64) {
        if time > self.last_time {
            self.area += self.value * (time - self.last_time);
            self.last_time = time;
        }
    }

    /// Area under the function on `[start, end]`.
    pub fn integral(&mut self, end: f64) -> f64 {
        self.advance(end);
        self.area
    }

    /// Time-weighted average on `[start, end]`, NaN for an empty interval.
    pub fn average(&mut self, end: f64) -> f64 {
        let area = self.integral(end);
        if end > self.start {
            area / (end - self.start)
        } else {
            f64::NAN
        }
    }
}

/// Options of statistics computation.
#[derive(Clone, Debug, Default)]
pub struct StatsOptions {
    /// Warm-up period at the beginning of the run that is excluded from all metrics.
    pub skip_init_time: f64,
    /// Include lifespans of instances alive at the end of the run into the lifespan metric.
    pub include_open_lifespans: bool,
}

fn ratio(a: u64, b: u64) -> f64 {
    a as f64 / b as f64
}

/// QoS metrics of a simulation run. Probabilities and averages are NaN when undefined.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Stats {
    /// Length of the observed window.
    pub elapsed_time: f64,
    pub requests: u64,
    pub cold_starts: u64,
    pub warm_starts: u64,
    pub rejections: u64,
    pub expirations: u64,
    /// Cold starts over accepted (cold + warm) requests.
    pub cold_start_probability: f64,
    /// Warm starts over accepted (cold + warm) requests.
    pub warm_start_probability: f64,
    /// Rejections over all requests.
    pub rejection_probability: f64,
    pub lifespan: SampleMetric,
    pub average_instance_lifespan: f64,
    pub average_server_count: f64,
    pub average_running_count: f64,
    pub average_idle_count: f64,
    /// Fraction of time during which exactly `i` instances existed.
    pub server_count_distribution: Vec<f64>,
}

impl Stats {
    /// Computes metrics from a trace. This is a pure function of its arguments.
    pub fn from_trace(trace: &Trace, options: &StatsOptions) -> Self {
        let end = trace.end_time();
        // NaN offset means no warm-up
        let skip = if options.skip_init_time.is_nan() {
            0.
        } else {
            options.skip_init_time
        };
        let window_start = skip.clamp(0., end.max(0.));
        let mut stats = Self {
            elapsed_time: end - window_start,
            ..Default::default()
        };
        let mut server = TimeWeightedMetric::new(window_start, 0.);
        let mut running = TimeWeightedMetric::new(window_start, 0.);
        let mut idle = TimeWeightedMetric::new(window_start, 0.);
        let mut durations: Vec<f64> = Vec::new();
        let mut curr_servers = 0;
        let mut curr_time = window_start;
        for record in trace.iter() {
            if record.time > curr_time {
                if durations.len() <= curr_servers {
                    durations.resize(curr_servers + 1, 0.);
                }
                durations[curr_servers] += record.time - curr_time;
                curr_time = record.time;
            }
            curr_servers = record.server_count;
            server.update(record.time, record.server_count as f64);
            running.update(record.time, record.running_count as f64);
            idle.update(record.time, record.idle_count as f64);
            if record.time < window_start {
                continue;
            }
            match record.kind {
                TransitionKind::ColdStart { .. } => stats.cold_starts += 1,
                TransitionKind::WarmStart { .. } => stats.warm_starts += 1,
                TransitionKind::Rejected { .. } => stats.rejections += 1,
                TransitionKind::ServiceComplete { .. } | TransitionKind::ExpirationSkipped { .. } => {}
                TransitionKind::Expired { created_at, .. } => {
                    stats.expirations += 1;
                    stats.lifespan.add(record.time - created_at);
                }
            }
        }
        if end > curr_time {
            if durations.len() <= curr_servers {
                durations.resize(curr_servers + 1, 0.);
            }
            durations[curr_servers] += end - curr_time;
        }
        if options.include_open_lifespans {
            for open in trace.open_lifespans() {
                stats.lifespan.add(open.duration);
            }
        }
        stats.requests = stats.cold_starts + stats.warm_starts + stats.rejections;
        let accepted = stats.cold_starts + stats.warm_starts;
        stats.cold_start_probability = ratio(stats.cold_starts, accepted);
        stats.warm_start_probability = ratio(stats.warm_starts, accepted);
        stats.rejection_probability = ratio(stats.rejections, stats.requests);
        stats.average_instance_lifespan = stats.lifespan.mean();
        stats.average_server_count = server.average(end);
        stats.average_running_count = running.average(end);
        stats.average_idle_count = idle.average(end);
        stats.server_count_distribution = if stats.elapsed_time > 0. {
            durations.iter().map(|d| d / stats.elapsed_time).collect()
        } else {
            Vec::new()
        };
        stats
    }

    /// Returns named metric values in report order.
    pub fn as_map(&self) -> IndexMap<&'static str, f64> {
        let mut map = IndexMap::new();
        map.insert("elapsed_time", self.elapsed_time);
        map.insert("requests", self.requests as f64);
        map.insert("cold_starts", self.cold_starts as f64);
        map.insert("warm_starts", self.warm_starts as f64);
        map.insert("rejections", self.rejections as f64);
        map.insert("expirations", self.expirations as f64);
        map.insert("cold_start_probability", self.cold_start_probability);
        map.insert("warm_start_probability", self.warm_start_probability);
        map.insert("rejection_probability", self.rejection_probability);
        map.insert("average_instance_lifespan", self.average_instance_lifespan);
        map.insert("average_server_count", self.average_server_count);
        map.insert("average_running_count", self.average_running_count);
        map.insert("average_idle_count", self.average_idle_count);
        map
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self.as_map() {
            writeln!(f, "{:<28}{:>16.6}", name, value)?;
        }
        Ok(())
    }
}
