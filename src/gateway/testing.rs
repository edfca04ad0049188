//! Scripted gateway for unit tests.

use futures_util::future::BoxFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::gateway::{GatewayFailure, QueryGateway, ValidationRequest};

/// Answers call `n` with `steps[n]`; the last step repeats.
pub struct ScriptedGateway {
    steps: Vec<(Duration, Result<(), GatewayFailure>)>,
    calls: AtomicUsize,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    requests: Mutex<Vec<ValidationRequest>>,
}

impl ScriptedGateway {
    pub fn new(delay_ms: u64, outcome: Result<(), GatewayFailure>) -> Arc<Self> {
        Self::script(vec![(delay_ms, outcome)])
    }

    pub fn script(steps: Vec<(u64, Result<(), GatewayFailure>)>) -> Arc<Self> {
        assert!(!steps.is_empty());
        Arc::new(Self {
            steps: steps
                .into_iter()
                .map(|(ms, outcome)| (Duration::from_millis(ms), outcome))
                .collect(),
            calls: AtomicUsize::new(0),
            active: Arc::new(AtomicUsize::new(0)),
            max_active: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of requests that were running at the same time.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ValidationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl QueryGateway for ScriptedGateway {
    fn validate(&self, request: ValidationRequest) -> BoxFuture<'static, Result<(), GatewayFailure>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let (delay, outcome) = self.steps[n.min(self.steps.len() - 1)].clone();
        self.requests.lock().unwrap().push(request);

        let active = self.active.clone();
        let max_active = self.max_active.clone();
        Box::pin(async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            active.fetch_sub(1, Ordering::SeqCst);
            outcome
        })
    }
}
