use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use dcp_sink::{
    Action, DcpClient, DcpEventHandler, Event, EventKind, KvAgent, KvCallback, ListenerContext,
    Result, SinkError,
};
use tokio::sync::Mutex;

/// Installs an `env_logger` subscriber the first time any test calls it.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// A `KvAgent` test double. Every `execute` succeeds by default; call
/// `fail_next` / `fail_key` to script errors for specific keys, and
/// `set_delay` to make the simulated round trip take measurable time (for
/// exercising the inflight cap).
pub struct MockAgent {
    calls: Mutex<Vec<Action>>,
    failures: Mutex<HashMap<Vec<u8>, SinkError>>,
    delay: Mutex<Duration>,
    inflight: AtomicUsize,
    max_observed_inflight: AtomicUsize,
    connected: AtomicBool,
    closed: AtomicBool,
}

impl MockAgent {
    pub fn new() -> Arc<Self> {
        Arc::new(MockAgent {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            delay: Mutex::new(Duration::from_millis(0)),
            inflight: AtomicUsize::new(0),
            max_observed_inflight: AtomicUsize::new(0),
            connected: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    pub async fn fail_key(&self, key: impl Into<Vec<u8>>, err: SinkError) {
        self.failures.lock().await.insert(key.into(), err);
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.lock().await = delay;
    }

    pub async fn call_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    pub fn max_observed_inflight(&self) -> usize {
        self.max_observed_inflight.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl KvAgent for MockAgent {
    async fn dispatch(&self, action: Action, cb: KvCallback) {
        let current = self.inflight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_observed_inflight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.delay.lock().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = {
            let mut failures = self.failures.lock().await;
            match failures.remove(action.id()) {
                Some(err) => Err(err),
                None => Ok(()),
            }
        };
        self.calls.lock().await.push(action);
        self.inflight.fetch_sub(1, Ordering::SeqCst);
        cb(outcome);
    }

    async fn get(&self, id: &[u8]) -> Result<(Vec<u8>, u64)> {
        if id.is_empty() {
            return Err(SinkError::UnexpectedActionType);
        }
        Ok((Vec::new(), 0))
    }

    async fn connect(&self, _timeout: Duration) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// A `DcpClient` test double counting checkpoint commits.
pub struct MockDcpClient {
    commit_count: AtomicUsize,
    started: AtomicBool,
}

impl MockDcpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(MockDcpClient {
            commit_count: AtomicUsize::new(0),
            started: AtomicBool::new(false),
        })
    }

    pub fn commit_count(&self) -> usize {
        self.commit_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DcpClient for MockDcpClient {
    async fn wait_until_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.commit_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_event_handler(&self, _handler: Arc<dyn DcpEventHandler>) {}
}

/// Build an `Event` with sensible defaults for `Mutated` changes.
pub fn mutation(key: &str, value: &[u8]) -> Event {
    Event {
        key: key.as_bytes().to_vec(),
        value: value.to_vec(),
        collection_name: "_default".to_string(),
        event_time: SystemTime::now(),
        cas: 1,
        vb_id: 0,
        seq_no: 1,
        rev_no: 1,
        kind: EventKind::Mutated,
    }
}

/// Build an `Event` with sensible defaults for `Deleted` changes.
pub fn deletion(key: &str) -> Event {
    Event {
        key: key.as_bytes().to_vec(),
        value: Vec::new(),
        collection_name: "_default".to_string(),
        event_time: SystemTime::now(),
        cas: 1,
        vb_id: 0,
        seq_no: 1,
        rev_no: 1,
        kind: EventKind::Deleted,
    }
}

/// A `ListenerContext` plus an externally-observable Ack counter.
pub fn listener_ctx_with_counter(event: Event) -> (ListenerContext, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&count);
    let ack_fn: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
        counted.fetch_add(1, Ordering::SeqCst);
    });
    (ListenerContext::new(event, ack_fn), count)
}
