//! Function instance model and the pool of live instances.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::util::{Counter, FxIndexMap};

/// Lifecycle state of a function instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum InstanceState {
    /// Instance is being provisioned for its first request.
    ColdStarting,
    /// Instance is serving a request.
    Running,
    /// Instance is up and kept warm, but isn't serving anything.
    Idle,
    /// Instance is destroyed. This state is terminal.
    Expired,
}

impl InstanceState {
    /// Transition table of the instance state machine.
    pub fn can_transition_to(self, next: InstanceState) -> bool {
        use InstanceState::*;
        matches!(
            (self, next),
            (ColdStarting, Running) | (Running, Idle) | (Idle, Running) | (Idle, Expired)
        )
    }
}

/// Function instance model.
#[derive(Clone, Debug, Serialize)]
pub struct Instance {
    /// Ordinal id assigned at creation.
    pub id: usize,
    pub state: InstanceState,
    pub created_at: f64,
    /// Set while the instance is idle.
    pub became_idle_at: Option<f64>,
    /// Set once the instance is expired.
    pub destroyed_at: Option<f64>,
    /// Incremented on every reuse, used to discard outdated expiration events.
    pub epoch: u64,
    /// Number of requests served by this instance.
    pub served_requests: u64,
}

impl Instance {
    pub fn new(id: usize, time: f64) -> Self {
        Self {
            id,
            state: InstanceState::ColdStarting,
            created_at: time,
            became_idle_at: None,
            destroyed_at: None,
            epoch: 0,
            served_requests: 0,
        }
    }

    fn transition(&mut self, next: InstanceState) {
        assert!(
            self.state.can_transition_to(next),
            "illegal transition of instance {}: {:?} -> {:?}",
            self.id,
            self.state,
            next
        );
        self.state = next;
    }

    /// Starts serving a request, either right after creation or after an idle period.
    pub fn begin_service(&mut self) {
        if self.state == InstanceState::Idle {
            self.epoch += 1;
            self.became_idle_at = None;
        }
        self.transition(InstanceState::Running);
        self.served_requests += 1;
    }

    pub fn end_service(&mut self, time: f64) {
        self.transition(InstanceState::Idle);
        self.became_idle_at = Some(time);
    }

    pub fn expire(&mut self, time: f64) {
        self.transition(InstanceState::Expired);
        self.destroyed_at = Some(time);
    }

    pub fn is_idle(&self) -> bool {
        self.state == InstanceState::Idle
    }

    /// Time between creation and destruction, `None` while the instance is alive.
    pub fn lifespan(&self) -> Option<f64> {
        self.destroyed_at.map(|t| t - self.created_at)
    }
}

/// Keeps live instances, the index of idle ones and the archive of expired instances.
#[derive(Clone, Default)]
pub struct InstancePool {
    instances: FxIndexMap<usize, Instance>,
    idle: BTreeSet<usize>,
    expired: Vec<Instance>,
    running_count: usize,
    instance_counter: Counter,
}

impl InstancePool {
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a new instance which immediately starts serving a request.
    pub fn start_cold(&mut self, time: f64) -> usize {
        let id = self.instance_counter.increment();
        let mut instance = Instance::new(id, time);
        instance.begin_service();
        self.instances.insert(id, instance);
        self.running_count += 1;
        id
    }

    /// Reuses an idle instance for a new request.
    pub fn start_warm(&mut self, id: usize) {
        let was_idle = self.idle.remove(&id);
        assert!(was_idle, "instance {} is not idle", id);
        self.get_mut(id).begin_service();
        self.running_count += 1;
    }

    /// Moves a running instance to idle state and returns its current epoch.
    pub fn finish_service(&mut self, id: usize, time: f64) -> u64 {
        let instance = self.get_mut(id);
        instance.end_service(time);
        let epoch = instance.epoch;
        self.idle.insert(id);
        self.running_count -= 1;
        epoch
    }

    /// Expires an instance if it is still idle at the given epoch.
    ///
    /// Returns `None` for outdated requests, i.e. when the instance was reused after the expiration
    /// was scheduled.
    pub fn try_expire(&mut self, id: usize, epoch: u64, time: f64) -> Option<&Instance> {
        match self.instances.get(&id) {
            Some(instance) if instance.is_idle() && instance.epoch == epoch => {}
            _ => return None,
        }
        self.idle.remove(&id);
        let mut instance = self.instances.swap_remove(&id)?;
        instance.expire(time);
        self.expired.push(instance);
        self.expired.last()
    }

    /// Returns a reference to a live instance if it exists.
    pub fn get(&self, id: usize) -> Option<&Instance> {
        self.instances.get(&id)
    }

    fn get_mut(&mut self, id: usize) -> &mut Instance {
        self.instances
            .get_mut(&id)
            .unwrap_or_else(|| panic!("instance {} is not alive", id))
    }

    /// Ids of idle instances in increasing order.
    pub fn idle_ids(&self) -> impl DoubleEndedIterator<Item = usize> + '_ {
        self.idle.iter().copied()
    }

    /// Iterates over live instances.
    pub fn alive(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    /// Expired instances in order of expiration.
    pub fn expired(&self) -> &[Instance] {
        &self.expired
    }

    pub fn server_count(&self) -> usize {
        self.instances.len()
    }

    pub fn running_count(&self) -> usize {
        self.running_count
    }

    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Number of instances ever created.
    pub fn created_count(&self) -> usize {
        self.instance_counter.curr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use InstanceState::*;
        let states = [ColdStarting, Running, Idle, Expired];
        let legal = [(ColdStarting, Running), (Running, Idle), (Idle, Running), (Idle, Expired)];
        for from in states {
            for to in states {
                assert_eq!(from.can_transition_to(to), legal.contains(&(from, to)));
            }
        }
    }

    #[test]
    #[should_panic]
    fn test_expired_is_terminal() {
        let mut instance = Instance::new(0, 0.);
        instance.begin_service();
        instance.end_service(1.);
        instance.expire(2.);
        instance.begin_service();
    }

    #[test]
    #[should_panic]
    fn test_running_instance_can_not_expire() {
        let mut instance = Instance::new(0, 0.);
        instance.begin_service();
        instance.expire(1.);
    }

    #[test]
    fn test_instance_timestamps() {
        let mut instance = Instance::new(3, 1.);
        assert_eq!(instance.state, InstanceState::ColdStarting);
        instance.begin_service();
        assert_eq!(instance.became_idle_at, None);
        instance.end_service(2.);
        assert_eq!(instance.became_idle_at, Some(2.));
        instance.begin_service();
        assert_eq!(instance.became_idle_at, None);
        assert_eq!(instance.epoch, 1);
        instance.end_service(4.);
        instance.expire(10.);
        assert_eq!(instance.lifespan(), Some(9.));
        assert_eq!(instance.served_requests, 2);
    }

    #[test]
    fn test_pool_counts() {
        let mut pool = InstancePool::new();
        let a = pool.start_cold(0.);
        let b = pool.start_cold(0.5);
        assert_eq!((pool.server_count(), pool.running_count(), pool.idle_count()), (2, 2, 0));
        pool.finish_service(a, 1.);
        pool.finish_service(b, 1.5);
        assert_eq!((pool.server_count(), pool.running_count(), pool.idle_count()), (2, 0, 2));
        assert_eq!(pool.idle_ids().collect::<Vec<_>>(), vec![a, b]);
        pool.start_warm(b);
        assert_eq!((pool.server_count(), pool.running_count(), pool.idle_count()), (2, 1, 1));
        assert_eq!(pool.created_count(), 2);
    }

    #[test]
    fn test_stale_expiration_is_ignored() {
        let mut pool = InstancePool::new();
        let id = pool.start_cold(0.);
        let epoch = pool.finish_service(id, 1.);
        pool.start_warm(id);
        assert!(pool.try_expire(id, epoch, 2.).is_none());
        let epoch2 = pool.finish_service(id, 3.);
        assert!(pool.try_expire(id, epoch, 4.).is_none());
        let expired = pool.try_expire(id, epoch2, 5.).unwrap();
        assert_eq!(expired.lifespan(), Some(5.));
        assert_eq!(pool.server_count(), 0);
        assert_eq!(pool.expired().len(), 1);
        assert!(pool.try_expire(id, epoch2, 6.).is_none());
    }
}
