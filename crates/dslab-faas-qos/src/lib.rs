//! A discrete-event simulator of scale-per-request serverless platforms for studying QoS metrics.
//!
//! Each request arriving to the platform is either served by an idle (warm) function instance, or triggers a
//! cold start of a new instance, or is rejected if the optional capacity bound is reached. Idle instances are
//! destroyed after staying idle for the expiration threshold. The simulator produces a trace of instance state
//! transitions from which [`stats::Stats`] derives cold start and rejection probabilities, average instance
//! lifespan and time-averaged instance counts.
//!
//! ```rust
//! use dslab_faas_qos::config::{Config, Termination};
//! use dslab_faas_qos::simulation::ServerlessSimulator;
//!
//! let config = Config {
//!     expiration_threshold: 600.,
//!     termination: Termination::MaxRequests(10000),
//!     ..Config::exponential(0.9, 1. / 1.991, 1. / 2.244)
//! };
//! let mut sim = ServerlessSimulator::new(config).unwrap();
//! sim.generate_trace(false).unwrap();
//! let stats = sim.stats();
//! assert_eq!(stats.requests, 10000);
//! assert_eq!(stats.rejections, 0);
//! ```
//!
//! See the `faas-qos-sweep` demo for a parallel sweep over expiration thresholds.

pub mod config;
pub mod error;
pub mod instance;
pub mod log;
pub mod parallel;
pub mod process;
pub mod request;
pub mod routing;
pub mod simulation;
pub mod stats;
pub mod timeline;
pub mod trace;
pub mod util;

pub use colored;
