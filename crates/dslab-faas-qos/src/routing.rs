//! Routing policies choosing an idle instance for an arriving request.

use std::boxed::Box;

use crate::error::ConfigError;
use crate::instance::InstancePool;

/// RoutingPolicy picks one of the idle instances to serve a new request warm.
///
/// The engine calls it only when at least one idle instance exists, returning `None` forces a cold start.
pub trait RoutingPolicy {
    fn select_idle(&mut self, pool: &InstancePool) -> Option<usize>;

    fn to_string(&self) -> String {
        "STUB ROUTING POLICY NAME".to_string()
    }
}

/// NewestFirst reuses the most recently created idle instance, letting older instances expire.
pub struct NewestFirst {}

impl RoutingPolicy for NewestFirst {
    fn select_idle(&mut self, pool: &InstancePool) -> Option<usize> {
        pool.idle_ids().next_back()
    }

    fn to_string(&self) -> String {
        "NewestFirst".to_string()
    }
}

/// OldestFirst reuses the idle instance with the smallest id.
pub struct OldestFirst {}

impl RoutingPolicy for OldestFirst {
    fn select_idle(&mut self, pool: &InstancePool) -> Option<usize> {
        pool.idle_ids().next()
    }

    fn to_string(&self) -> String {
        "OldestFirst".to_string()
    }
}

/// LongestIdleFirst reuses the instance that has been idle for the longest time, ties are broken by id.
pub struct LongestIdleFirst {}

impl RoutingPolicy for LongestIdleFirst {
    fn select_idle(&mut self, pool: &InstancePool) -> Option<usize> {
        let mut best: Option<(f64, usize)> = None;
        for id in pool.idle_ids() {
            let since = pool.get(id).and_then(|x| x.became_idle_at).unwrap_or(f64::INFINITY);
            if best.map_or(true, |(t, _)| since < t) {
                best = Some((since, id));
            }
        }
        best.map(|(_, id)| id)
    }

    fn to_string(&self) -> String {
        "LongestIdleFirst".to_string()
    }
}

pub fn default_routing_policy_resolver(s: &str) -> Result<Box<dyn RoutingPolicy + Send>, ConfigError> {
    match s {
        "" | "NewestFirst" => Ok(Box::new(NewestFirst {})),
        "OldestFirst" => Ok(Box::new(OldestFirst {})),
        "LongestIdleFirst" => Ok(Box::new(LongestIdleFirst {})),
        _ => Err(ConfigError::UnknownRoutingPolicy(s.to_string())),
    }
}
