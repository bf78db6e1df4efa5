use std::fs::File;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::process::ProcessConfig;
use crate::routing::default_routing_policy_resolver;

/// Termination bound of a simulation run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Termination {
    /// Stop once simulated time reaches the bound.
    MaxTime(f64),
    /// Stop after the given number of request arrivals have been routed.
    MaxRequests(u64),
}

fn default_expiration_threshold() -> f64 {
    600.
}

fn default_seed() -> u64 {
    1
}

/// YAML-serializable config.
///
/// Processes can be given either explicitly or by rate (exponential), the rate takes precedence.
#[derive(Clone, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub arrival_rate: Option<f64>,
    #[serde(default)]
    pub arrival_process: Option<ProcessConfig>,
    #[serde(default)]
    pub warm_service_rate: Option<f64>,
    #[serde(default)]
    pub warm_service_process: Option<ProcessConfig>,
    #[serde(default)]
    pub cold_service_rate: Option<f64>,
    #[serde(default)]
    pub cold_service_process: Option<ProcessConfig>,
    #[serde(default = "default_expiration_threshold")]
    pub expiration_threshold: f64,
    #[serde(default)]
    pub max_time: Option<f64>,
    #[serde(default)]
    pub max_requests: Option<u64>,
    #[serde(default)]
    pub capacity: Option<usize>,
    #[serde(default)]
    pub routing_policy: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn resolve_process(
    name: &'static str,
    rate: Option<f64>,
    process: Option<ProcessConfig>,
) -> Result<ProcessConfig, ConfigError> {
    match (rate, process) {
        (Some(rate), _) => Ok(ProcessConfig::exponential(rate)),
        (None, Some(process)) => Ok(process),
        (None, None) => Err(ConfigError::InvalidProcess {
            name,
            reason: "process is not defined".to_string(),
        }),
    }
}

/// This is simulation config. It implements Default trait (see below) so that you can create
/// default config and change only the fields you need.
///
/// The config is checked by [`Config::validate`] when a simulator is created and is not changed afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub arrival_process: ProcessConfig,
    pub warm_service_process: ProcessConfig,
    /// Cold service time includes instance provisioning, so it is expected to be longer than warm service time.
    pub cold_service_process: ProcessConfig,
    /// Idle duration after which an instance is destroyed. `f64::INFINITY` disables expiration.
    pub expiration_threshold: f64,
    pub termination: Termination,
    /// Maximum number of concurrently existing instances, `None` means unbounded.
    pub capacity: Option<usize>,
    /// Name of the routing policy, see [`default_routing_policy_resolver`].
    pub routing_policy: String,
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            arrival_process: ProcessConfig::exponential(0.3),
            warm_service_process: ProcessConfig::exponential(1. / 2.05),
            cold_service_process: ProcessConfig::exponential(1. / 2.2),
            expiration_threshold: default_expiration_threshold(),
            termination: Termination::MaxTime(24. * 60. * 60.),
            capacity: None,
            routing_policy: "NewestFirst".to_string(),
            seed: default_seed(),
        }
    }
}

impl Config {
    /// Creates config with exponential arrival and service processes.
    pub fn exponential(arrival_rate: f64, warm_service_rate: f64, cold_service_rate: f64) -> Self {
        Self {
            arrival_process: ProcessConfig::exponential(arrival_rate),
            warm_service_process: ProcessConfig::exponential(warm_service_rate),
            cold_service_process: ProcessConfig::exponential(cold_service_rate),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.arrival_process.validate("arrival")?;
        self.warm_service_process.validate("warm service")?;
        self.cold_service_process.validate("cold service")?;
        if self.expiration_threshold.is_nan() || self.expiration_threshold < 0. {
            return Err(ConfigError::NegativeExpirationThreshold(self.expiration_threshold));
        }
        match self.termination {
            Termination::MaxTime(t) if !(t.is_finite() && t > 0.) => {
                return Err(ConfigError::InvalidTermination(format!(
                    "max_time must be positive and finite, got {}",
                    t
                )));
            }
            Termination::MaxRequests(0) => {
                return Err(ConfigError::InvalidTermination("max_requests must be positive".to_string()));
            }
            _ => {}
        }
        if self.capacity == Some(0) {
            return Err(ConfigError::ZeroCapacity);
        }
        default_routing_policy_resolver(&self.routing_policy)?;
        if self.cold_service_process.mean() < self.warm_service_process.mean() {
            warn!(
                target: "config",
                "cold service is expected to be slower than warm service, got cold mean {:.3} < warm mean {:.3}",
                self.cold_service_process.mean(),
                self.warm_service_process.mean()
            );
        }
        Ok(())
    }

    pub fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let termination = match (raw.max_time, raw.max_requests) {
            (Some(t), None) => Termination::MaxTime(t),
            (None, Some(n)) => Termination::MaxRequests(n),
            _ => return Err(ConfigError::AmbiguousTermination),
        };
        let config = Self {
            arrival_process: resolve_process("arrival", raw.arrival_rate, raw.arrival_process)?,
            warm_service_process: resolve_process("warm service", raw.warm_service_rate, raw.warm_service_process)?,
            cold_service_process: resolve_process("cold service", raw.cold_service_rate, raw.cold_service_process)?,
            expiration_threshold: raw.expiration_threshold,
            termination,
            capacity: raw.capacity,
            routing_policy: raw.routing_policy,
            seed: raw.seed,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(path: &Path) -> Result<Self, ConfigError> {
        let f = File::open(path)?;
        Self::from_raw(serde_yaml::from_reader(f)?)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        Self::from_raw(serde_yaml::from_str(s)?)
    }
}
