//! Random variate source for inter-arrival and service times.

use rand::prelude::*;
use rand_distr::{Exp, Gamma, Uniform};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// YAML-serializable description of a stochastic process producing non-negative durations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProcessConfig {
    /// Exponentially distributed durations with given rate (events per time unit).
    Exponential { rate: f64 },
    /// Constant durations.
    Deterministic { value: f64 },
    /// Gamma distributed durations, mean is `shape / rate`.
    Gamma { shape: f64, rate: f64 },
    /// Durations uniformly distributed over `[low, high)`.
    Uniform { low: f64, high: f64 },
}

fn positive(x: f64) -> bool {
    x.is_finite() && x > 0.
}

impl ProcessConfig {
    pub fn exponential(rate: f64) -> Self {
        Self::Exponential { rate }
    }

    /// Expected duration.
    pub fn mean(&self) -> f64 {
        match self {
            Self::Exponential { rate } => 1. / rate,
            Self::Deterministic { value } => *value,
            Self::Gamma { shape, rate } => shape / rate,
            Self::Uniform { low, high } => (low + high) / 2.,
        }
    }

    /// Expected number of events per time unit.
    pub fn rate(&self) -> f64 {
        1. / self.mean()
    }

    /// Checks process parameters, `name` is used in the error message.
    pub fn validate(&self, name: &'static str) -> Result<(), ConfigError> {
        let reason = match self {
            Self::Exponential { rate } if !positive(*rate) => format!("rate must be positive, got {}", rate),
            Self::Deterministic { value } if !positive(*value) => {
                format!("value must be positive, got {}", value)
            }
            Self::Gamma { shape, rate } if !positive(*shape) || !positive(*rate) => {
                format!("shape and rate must be positive, got shape={} rate={}", shape, rate)
            }
            Self::Uniform { low, high } if !(low.is_finite() && high.is_finite() && *low >= 0. && low < high) => {
                format!("expected 0 <= low < high, got low={} high={}", low, high)
            }
            _ => return Ok(()),
        };
        Err(ConfigError::InvalidProcess { name, reason })
    }

    /// Builds a sampler for this process.
    pub fn build(&self, name: &'static str) -> Result<Process, ConfigError> {
        self.validate(name)?;
        let err = |e: String| ConfigError::InvalidProcess { name, reason: e };
        Ok(match self {
            Self::Exponential { rate } => Process::Exponential(Exp::new(*rate).map_err(|e| err(e.to_string()))?),
            Self::Deterministic { value } => Process::Deterministic(*value),
            Self::Gamma { shape, rate } => {
                Process::Gamma(Gamma::new(*shape, 1. / rate).map_err(|e| err(e.to_string()))?)
            }
            Self::Uniform { low, high } => Process::Uniform(Uniform::new(*low, *high)),
        })
    }
}

/// Sampler built from [`ProcessConfig`].
#[derive(Clone, Debug)]
pub enum Process {
    Exponential(Exp<f64>),
    Deterministic(f64),
    Gamma(Gamma<f64>),
    Uniform(Uniform<f64>),
}

impl Process {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Self::Exponential(d) => d.sample(rng),
            Self::Deterministic(v) => *v,
            Self::Gamma(d) => d.sample(rng),
            Self::Uniform(d) => d.sample(rng),
        }
    }
}

/// Owns the random stream of a single simulation run.
///
/// All draws of a run come from one seeded [`Pcg64`] generator, so runs with equal seeds are reproducible
/// and concurrently running simulations never share state.
#[derive(Clone)]
pub struct RandomVariateSource {
    rand: Pcg64,
    arrival: Process,
    warm_service: Process,
    cold_service: Process,
}

impl RandomVariateSource {
    pub fn new(
        seed: u64,
        arrival: &ProcessConfig,
        warm_service: &ProcessConfig,
        cold_service: &ProcessConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            rand: Pcg64::seed_from_u64(seed),
            arrival: arrival.build("arrival")?,
            warm_service: warm_service.build("warm service")?,
            cold_service: cold_service.build("cold service")?,
        })
    }

    /// Time until the next request arrival.
    pub fn next_interarrival(&mut self) -> f64 {
        self.arrival.sample(&mut self.rand)
    }

    /// Service duration of a request, cold starts include instance provisioning.
    pub fn next_service_time(&mut self, is_cold: bool) -> f64 {
        if is_cold {
            self.cold_service.sample(&mut self.rand)
        } else {
            self.warm_service.sample(&mut self.rand)
        }
    }
}
