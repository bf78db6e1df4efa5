use std::time::Duration;

mod common;
use common::{assert_float_eq, init_logger};

use dslab_faas_qos::config::{Config, RawConfig, Termination};
use dslab_faas_qos::error::SimulationError;
use dslab_faas_qos::parallel::{parallel_simulation_n_workers, parallel_simulation_raw_n_workers, replicate};
use dslab_faas_qos::request::RequestOutcome;
use dslab_faas_qos::simulation::{RunBudget, RunOutcome, ServerlessSimulator};
use dslab_faas_qos::stats::StatsOptions;
use dslab_faas_qos::trace::TransitionKind;

fn run(config: Config) -> ServerlessSimulator {
    let mut sim = ServerlessSimulator::new(config).unwrap();
    sim.generate_trace(false).unwrap();
    sim
}

fn bounded_config(capacity: usize, requests: u64) -> Config {
    Config {
        expiration_threshold: 2.,
        termination: Termination::MaxRequests(requests),
        capacity: Some(capacity),
        ..Config::exponential(1.5, 1., 0.8)
    }
}

#[test]
fn test_trace_invariants() {
    let sim = run(bounded_config(3, 5000));
    let trace = sim.trace();
    assert!(trace.is_finished());
    let mut last_time = trace.start_time();
    for record in trace.iter() {
        assert!(record.time >= last_time);
        last_time = record.time;
        assert_eq!(record.running_count + record.idle_count, record.server_count);
        assert!(record.server_count <= 3);
    }
    assert!(trace.end_time() >= last_time);

    let stats = sim.stats();
    assert_eq!(stats.requests, 5000);
    assert_eq!(stats.cold_starts + stats.warm_starts + stats.rejections, stats.requests);
    assert!(stats.rejections > 0);
    let outcomes = |outcome| sim.requests().iter().filter(|r| r.outcome == Some(outcome)).count() as u64;
    assert_eq!(outcomes(RequestOutcome::Cold), stats.cold_starts);
    assert_eq!(outcomes(RequestOutcome::Warm), stats.warm_starts);
    assert_eq!(outcomes(RequestOutcome::Rejected), stats.rejections);
    assert_float_eq(stats.cold_start_probability + stats.warm_start_probability, 1., 1e-12);
    assert_float_eq(
        stats.average_server_count,
        stats.average_running_count + stats.average_idle_count,
        1e-9,
    );
    for request in sim.requests().iter() {
        if let (Some(start), Some(end)) = (request.service_start_time, request.completion_time) {
            assert!(request.arrival_time <= start && start <= end);
        }
        if request.outcome == Some(RequestOutcome::Rejected) {
            assert_eq!(request.instance, None);
        }
    }
}

#[test]
fn test_determinism() {
    let config = bounded_config(4, 3000);
    let a = run(config.clone());
    let b = run(config.clone());
    assert_eq!(a.trace(), b.trace());
    assert_eq!(a.stats().as_map(), b.stats().as_map());
    let c = run(Config { seed: 2, ..config });
    assert_ne!(a.trace(), c.trace());
}

#[test]
fn test_max_time_termination() {
    let config = Config {
        expiration_threshold: 5.,
        termination: Termination::MaxTime(1000.),
        ..Config::exponential(0.9, 1. / 1.991, 1. / 2.244)
    };
    let sim = run(config);
    assert_eq!(sim.trace().end_time(), 1000.);
    assert_eq!(sim.time(), 1000.);
    assert!(sim.trace().iter().all(|r| r.time <= 1000.));
    assert_float_eq(sim.stats().elapsed_time, 1000., 1e-12);
}

#[test]
fn test_run_with_budget() {
    let mut sim = ServerlessSimulator::new(bounded_config(4, 10000)).unwrap();
    let budget = RunBudget {
        max_steps: Some(100),
        ..Default::default()
    };
    assert_eq!(sim.run_with_budget(budget).unwrap(), RunOutcome::Aborted);
    assert_eq!(sim.event_count(), 100);
    assert!(sim.is_finished());
    assert_eq!(sim.trace().end_time(), sim.time());
    assert!(!sim.step().unwrap());
    assert!(sim.stats().requests < 100);

    let mut sim = ServerlessSimulator::new(bounded_config(4, 50)).unwrap();
    let outcome = sim.run_with_budget(RunBudget::default()).unwrap();
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(sim.requests().len(), 50);
}

#[test]
fn test_empty_budget_processes_nothing() {
    let mut sim = ServerlessSimulator::new(bounded_config(4, 100)).unwrap();
    let budget = RunBudget {
        max_steps: Some(0),
        ..Default::default()
    };
    assert_eq!(sim.run_with_budget(budget).unwrap(), RunOutcome::Aborted);
    assert_eq!(sim.event_count(), 0);
    assert!(sim.trace().is_empty());
    assert!(sim.is_finished());
    assert_eq!(sim.trace().end_time(), 0.);
}

#[test]
fn test_wall_time_budget() {
    let mut sim = ServerlessSimulator::new(bounded_config(4, 100)).unwrap();
    let budget = RunBudget {
        max_wall_time: Some(Duration::ZERO),
        ..Default::default()
    };
    assert_eq!(sim.run_with_budget(budget).unwrap(), RunOutcome::Aborted);
    assert_eq!(sim.event_count(), 0);

    let mut sim = ServerlessSimulator::new(bounded_config(4, 100)).unwrap();
    let budget = RunBudget {
        max_steps: Some(1000000),
        max_wall_time: Some(Duration::from_secs(600)),
    };
    assert_eq!(sim.run_with_budget(budget).unwrap(), RunOutcome::Completed);
    assert_eq!(sim.requests().len(), 100);
    // a finished run stays finished
    assert_eq!(sim.run_with_budget(budget).unwrap(), RunOutcome::Completed);
}

#[test]
fn test_step_by_step() {
    init_logger();
    let mut sim = ServerlessSimulator::new(bounded_config(2, 20)).unwrap();
    let mut steps = 0;
    while sim.step().unwrap() {
        steps += 1;
    }
    assert_eq!(steps + 1, sim.event_count());
    assert_eq!(sim.requests().len(), 20);
    let mut other = ServerlessSimulator::new(bounded_config(2, 20)).unwrap();
    other.generate_trace(true).unwrap();
    assert_eq!(sim.trace(), other.trace());
}

#[test]
fn test_routing_policies() {
    // with an infinite threshold every instance is reused forever, so policies only change instance ids
    for policy in ["NewestFirst", "OldestFirst", "LongestIdleFirst"] {
        let config = Config {
            expiration_threshold: f64::INFINITY,
            termination: Termination::MaxRequests(2000),
            routing_policy: policy.to_string(),
            ..Config::exponential(1., 1., 0.8)
        };
        let sim = run(config);
        let stats = sim.stats();
        assert_eq!(stats.expirations, 0, "{}", policy);
        assert_eq!(stats.cold_starts as usize, sim.instances().created_count());
    }
}

#[test]
fn test_rejected_requests_leave_no_transitions() {
    let sim = run(bounded_config(1, 2000));
    for record in sim.trace().iter() {
        if let TransitionKind::Rejected { request } = record.kind {
            assert_eq!(record.server_count, 1);
            assert_eq!(sim.requests()[request].outcome, Some(RequestOutcome::Rejected));
        }
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let configs = replicate(&bounded_config(3, 1000), &[1, 2, 3, 4]);
    let results = parallel_simulation_n_workers(configs.clone(), StatsOptions::default(), 3);
    for (config, result) in configs.into_iter().zip(results) {
        let expected = run(config).stats();
        assert_eq!(result.unwrap().as_map(), expected.as_map());
    }
}

#[test]
fn test_parallel_raw_configs() {
    let valid: RawConfig = serde_yaml::from_str(
        "{arrival_rate: 1.0, warm_service_rate: 1.0, cold_service_rate: 0.5, max_requests: 500, expiration_threshold: 3.0}",
    )
    .unwrap();
    let invalid: RawConfig = serde_yaml::from_str("{arrival_rate: 1.0, warm_service_rate: 1.0, max_requests: 500}").unwrap();
    let results = parallel_simulation_raw_n_workers(
        vec![valid.clone(), invalid, valid],
        StatsOptions::default(),
        2,
    );
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().requests, 500);
    assert!(matches!(results[1], Err(SimulationError::Config(_))));
    assert_eq!(results[2].as_ref().unwrap().requests, 500);
}

#[test]
fn test_invalid_config_is_rejected_before_run() {
    let config = Config {
        capacity: Some(0),
        ..Default::default()
    };
    assert!(matches!(ServerlessSimulator::new(config), Err(SimulationError::Config(_))));
}
