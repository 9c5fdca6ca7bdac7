//! FIFO task queue with a fixed number of concurrent slots.
//!
//! `submit` never blocks: the job is appended to the pending list and as many
//! jobs as there are free slots are spawned onto the current tokio runtime, in
//! submission order. A finished job (success, error or panic) frees its slot
//! and pulls the next pending job. Each submission gets its own handle that
//! resolves with that job's output only.

use crate::error::QueueError;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::oneshot;

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Inner>,
}

struct Inner {
    limit: usize,
    state: Mutex<QueueState>,
}

#[derive(Default)]
struct QueueState {
    active: usize,
    pending: VecDeque<Job>,
}

impl TaskQueue {
    pub fn new(limit: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                limit: limit.max(1),
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    /// Jobs currently running.
    pub fn active(&self) -> usize {
        self.inner.lock().active
    }

    /// Jobs waiting for a slot.
    pub fn pending(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Must be called from within a tokio runtime.
    pub fn submit<F, Fut, T>(&self, f: F) -> TaskHandle<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let out = f().await;
                // Receiver gone means the caller stopped caring.
                let _ = tx.send(out);
            })
        });
        self.inner.lock().pending.push_back(job);
        Inner::dispatch(&self.inner);
        TaskHandle { rx }
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn dispatch(this: &Arc<Inner>) {
        let Ok(rt) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("task queue used outside a tokio runtime; jobs stay pending");
            return;
        };
        loop {
            let job = {
                let mut st = this.lock();
                if st.active >= this.limit {
                    return;
                }
                match st.pending.pop_front() {
                    Some(job) => {
                        st.active += 1;
                        job
                    }
                    None => return,
                }
            };
            let slot = Slot(Arc::clone(this));
            rt.spawn(async move {
                let _slot = slot;
                job().await;
            });
        }
    }
}

/// Held by a running job; releasing it frees the slot and dispatches the next job.
struct Slot(Arc<Inner>);

impl Drop for Slot {
    fn drop(&mut self) {
        {
            let mut st = self.0.lock();
            st.active = st.active.saturating_sub(1);
        }
        Inner::dispatch(&self.0);
    }
}

/// Resolves with the submitted job's output.
#[must_use = "dropping the handle does not cancel the job, but its output is lost"]
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, QueueError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map_err(|_| QueueError::Dropped)
    }
}
