use std::ops::Index;

use serde::Serialize;

/// How a request was handled by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RequestOutcome {
    /// Served by a newly created instance.
    Cold,
    /// Served by an idle instance.
    Warm,
    /// Rejected because the capacity bound was reached.
    Rejected,
}

#[derive(Clone, Debug, Serialize)]
pub struct Request {
    pub id: usize,
    pub arrival_time: f64,
    pub instance: Option<usize>,
    pub service_start_time: Option<f64>,
    pub completion_time: Option<f64>,
    /// `None` only until the request is routed.
    pub outcome: Option<RequestOutcome>,
}

impl Request {
    pub fn response_time(&self) -> Option<f64> {
        self.completion_time.map(|t| t - self.arrival_time)
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, Some(RequestOutcome::Cold) | Some(RequestOutcome::Warm))
    }
}

#[derive(Clone, Default)]
pub struct RequestRegistry {
    requests: Vec<Request>,
}

impl RequestRegistry {
    pub fn add_request(&mut self, arrival_time: f64) -> usize {
        let id = self.requests.len();
        self.requests.push(Request {
            id,
            arrival_time,
            instance: None,
            service_start_time: None,
            completion_time: None,
            outcome: None,
        });
        id
    }

    /// Records the routing decision. Accepted requests start their service immediately.
    pub fn set_outcome(&mut self, id: usize, outcome: RequestOutcome, instance: Option<usize>, time: f64) {
        let request = &mut self.requests[id];
        assert!(request.outcome.is_none(), "request {} is already routed", id);
        request.outcome = Some(outcome);
        if outcome != RequestOutcome::Rejected {
            request.instance = instance;
            request.service_start_time = Some(time);
        }
    }

    pub fn complete(&mut self, id: usize, time: f64) {
        let request = &mut self.requests[id];
        debug_assert!(request.is_accepted());
        request.completion_time = Some(time);
    }

    pub fn get(&self, id: usize) -> Option<&Request> {
        self.requests.get(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Request> {
        self.requests.iter()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

impl Index<usize> for RequestRegistry {
    type Output = Request;

    fn index(&self, index: usize) -> &Self::Output {
        &self.requests[index]
    }
}
