//! Per-key serial execution
//!
//! Each key (a room) owns a FIFO lane. A job submitted for a key starts only
//! after every job submitted before it for that key has finished, while lanes
//! for different keys run independently. A job that errors or panics does not
//! poison its lane.
//!
//! Lanes are created on demand and retired by their worker once drained, so an
//! idle room costs nothing.

use crate::error::{PlaybackError, Result};
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

type Job = BoxFuture<'static, ()>;

struct Lane {
    tx: mpsc::UnboundedSender<Job>,
    /// Distinguishes a retired lane from its replacement under the same key
    generation: u64,
}

type Lanes<K> = Arc<Mutex<HashMap<K, Lane>>>;

pub struct SerialExecutor<K> {
    lanes: Lanes<K>,
    next_generation: AtomicU64,
}

impl<K> Default for SerialExecutor<K> {
    fn default() -> Self {
        Self {
            lanes: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }
}

fn lock<K>(lanes: &Mutex<HashMap<K, Lane>>) -> MutexGuard<'_, HashMap<K, Lane>> {
    lanes.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K> SerialExecutor<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `fut` on the lane for `key`
    ///
    /// The job is queued when this is called, not when the returned future is
    /// first polled; dropping the returned future does not cancel the job.
    /// A panicking job resolves to [`PlaybackError::Executor`].
    ///
    /// Must be called from within a Tokio runtime.
    pub fn run<F, T>(&self, key: K, fut: F) -> impl Future<Output = Result<T>> + Send + 'static
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(fut).catch_unwind().await;
            // Caller may have stopped waiting
            let _ = done_tx.send(outcome);
        });
        self.submit(key, job);

        async move {
            match done_rx.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(panic)) => Err(PlaybackError::Executor(panic_message(panic.as_ref()))),
                Err(_) => Err(PlaybackError::Executor("job dropped before completion".into())),
            }
        }
    }

    /// Number of lanes with queued or running work
    pub fn active_lanes(&self) -> usize {
        lock(&self.lanes).len()
    }

    /// Whether `key` has queued or running work
    pub fn is_busy(&self, key: &K) -> bool {
        lock(&self.lanes).contains_key(key)
    }

    fn submit(&self, key: K, job: Job) {
        let mut lanes = lock(&self.lanes);

        let mut job = job;
        if let Some(lane) = lanes.get(&key) {
            match lane.tx.send(job) {
                Ok(()) => return,
                // Worker already exited; start a fresh lane below
                Err(mpsc::error::SendError(returned)) => job = returned,
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        if tx.send(job).is_err() {
            error!(?key, "lane receiver vanished before first job");
            return;
        }
        lanes.insert(key.clone(), Lane { tx, generation });
        drop(lanes);

        debug!(?key, generation, "lane opened");
        tokio::spawn(drain(Arc::clone(&self.lanes), key, generation, rx));
    }
}

/// Run jobs for one lane until it is empty, then retire it
///
/// Senders push while holding the lane map lock, so checking for more work
/// under that same lock cannot miss a job.
async fn drain<K>(lanes: Lanes<K>, key: K, generation: u64, mut rx: mpsc::UnboundedReceiver<Job>)
where
    K: Eq + Hash + Debug,
{
    loop {
        let next = {
            let mut map = lock(&lanes);
            match rx.try_recv() {
                Ok(job) => Some(job),
                Err(_) => {
                    if map.get(&key).is_some_and(|lane| lane.generation == generation) {
                        map.remove(&key);
                    }
                    None
                }
            }
        };

        match next {
            Some(job) => job.await,
            None => {
                debug!(?key, generation, "lane retired");
                return;
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("operation panicked: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("operation panicked: {}", msg)
    } else {
        "operation panicked".to_string()
    }
}
