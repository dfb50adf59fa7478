//! Background prefetch of provider scenarios.
//!
//! At most one batch request is in flight at a time. Each reply is tagged
//! with the generation it was requested under; `reset` bumps the generation
//! so replies belonging to an abandoned run are dropped on arrival.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use super::{ProviderPayload, ProviderScenario, RequestType, ScenarioContext, ScenarioProvider};

pub const DEFAULT_TARGET: usize = 3;

type Reply = (u64, Option<ProviderPayload>);

pub struct ScenarioQueue {
    provider: Arc<dyn ScenarioProvider>,
    target: usize,
    buffer: VecDeque<ProviderScenario>,
    in_flight: bool,
    generation: u64,
    tx: Sender<Reply>,
    rx: Receiver<Reply>,
}

impl ScenarioQueue {
    pub fn new(provider: Arc<dyn ScenarioProvider>, target: usize) -> Self {
        let (tx, rx) = unbounded();
        Self {
            provider,
            target: target.max(1),
            buffer: VecDeque::new(),
            in_flight: false,
            generation: 0,
            tx,
            rx,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_refilling(&self) -> bool {
        self.in_flight
    }

    /// Take whatever replies have arrived without blocking.
    pub fn poll(&mut self) {
        while let Ok(reply) = self.rx.try_recv() {
            self.accept(reply);
        }
    }

    pub fn pop(&mut self) -> Option<ProviderScenario> {
        self.poll();
        self.buffer.pop_front()
    }

    /// Start a batch request in the background unless one is already running
    /// or the buffer is at its target size. Returns whether a request started.
    pub fn refill(&mut self, context: ScenarioContext) -> bool {
        self.poll();
        if self.in_flight || self.buffer.len() >= self.target {
            return false;
        }

        self.in_flight = true;
        let generation = self.generation;
        let provider = Arc::clone(&self.provider);
        let tx = self.tx.clone();
        let context = context.with_request_type(RequestType::Batch);

        tracing::debug!(
            target: "leadsim::provider",
            provider = provider.name(),
            generation,
            buffered = self.buffer.len(),
            "prefetch.started"
        );
        thread::spawn(move || {
            let payload = provider.request(&context);
            // The queue may already be gone; nothing to do then.
            let _ = tx.send((generation, payload));
        });
        true
    }

    /// Block up to `timeout` for the in-flight request. Returns true when a
    /// reply for the current generation was taken.
    pub fn wait_for_refill(&mut self, timeout: Duration) -> bool {
        if !self.in_flight {
            return false;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(reply) => {
                let current = self.accept(reply);
                self.poll();
                current || !self.in_flight
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Drop everything buffered and forget any request still running.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.buffer.clear();
        self.in_flight = false;
    }

    fn accept(&mut self, (generation, payload): Reply) -> bool {
        if generation != self.generation {
            tracing::debug!(
                target: "leadsim::provider",
                generation,
                current = self.generation,
                "prefetch.stale"
            );
            return false;
        }
        self.in_flight = false;
        if let Some(payload) = payload {
            let scenarios = payload.into_scenarios();
            tracing::debug!(
                target: "leadsim::provider",
                received = scenarios.len(),
                "prefetch.received"
            );
            self.buffer.extend(scenarios);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::provider::MockScenarioProvider;
    use crate::state::GameState;

    const WAIT: Duration = Duration::from_secs(5);

    fn context() -> ScenarioContext {
        ScenarioContext::from_state(&GameState::default(), None)
    }

    #[test]
    fn refill_fills_the_buffer() {
        let mut queue = ScenarioQueue::new(Arc::new(MockScenarioProvider::new()), DEFAULT_TARGET);
        assert!(queue.refill(context()));
        assert!(queue.is_refilling());
        assert!(!queue.refill(context()));

        assert!(queue.wait_for_refill(WAIT));
        assert_eq!(queue.len(), 3);
        assert!(!queue.is_refilling());

        assert!(!queue.refill(context()));
        assert!(queue.pop().is_some());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn stale_replies_are_dropped_after_reset() {
        let mut queue = ScenarioQueue::new(Arc::new(MockScenarioProvider::new()), DEFAULT_TARGET);
        assert!(queue.refill(context()));
        queue.reset();
        assert!(!queue.is_refilling());

        // The old reply arrives under the previous generation.
        let reply = queue.rx.recv_timeout(WAIT).unwrap();
        assert!(!queue.accept(reply));
        assert!(queue.is_empty());
    }

    struct Offline {
        calls: AtomicUsize,
    }

    impl ScenarioProvider for Offline {
        fn name(&self) -> &'static str {
            "offline"
        }

        fn request(&self, _context: &ScenarioContext) -> Option<ProviderPayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            None
        }
    }

    #[test]
    fn failed_refill_clears_in_flight() {
        let provider = Arc::new(Offline {
            calls: AtomicUsize::new(0),
        });
        let mut queue = ScenarioQueue::new(provider.clone(), DEFAULT_TARGET);
        assert!(queue.refill(context()));
        assert!(queue.wait_for_refill(WAIT));
        assert!(queue.is_empty());
        assert!(!queue.is_refilling());
        assert!(queue.refill(context()));
        assert!(queue.wait_for_refill(WAIT));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn wait_without_request_returns_immediately() {
        let mut queue = ScenarioQueue::new(Arc::new(MockScenarioProvider::new()), 1);
        assert!(!queue.wait_for_refill(Duration::from_millis(1)));
        assert!(queue.pop().is_none());
    }
}
