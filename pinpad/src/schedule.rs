//! Execution contexts that responses can be delivered on.
//!
//! A POS front-end usually wants callbacks on its own UI or main thread,
//! not on the transport's receive thread. The engine snapshots the
//! configured [`Scheduler`] whenever a request is issued and posts
//! deliveries to it when the receiving thread is not already that context.

use std::fmt;
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;
use tracing::debug;

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send>;

/// An execution context that accepts posted work.
pub trait Scheduler: Send + Sync {
    /// Queues `job` to run on this context. Must not block.
    fn post(&self, job: Job);

    /// Whether the calling thread is this context.
    fn is_current(&self) -> bool;
}

/// A job queue drained by the thread that created it.
///
/// ```
/// use pinpad::EventLoop;
///
/// let (mut event_loop, handle) = EventLoop::new();
/// // Hand `handle` to `EngineBuilder::scheduler`, then periodically:
/// event_loop.run_pending();
/// # drop(handle);
/// ```
pub struct EventLoop {
    /// Posted jobs.
    rx: mpsc::UnboundedReceiver<Job>,
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop").finish_non_exhaustive()
    }
}

/// Posting side of an [`EventLoop`].
#[derive(Debug, Clone)]
pub struct LoopHandle {
    /// Job queue.
    tx: mpsc::UnboundedSender<Job>,
    /// Thread that owns the loop.
    owner: ThreadId,
}

impl EventLoop {
    /// Creates a loop owned by the calling thread.
    pub fn new() -> (Self, LoopHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = LoopHandle {
            tx,
            owner: thread::current().id(),
        };
        (Self { rx }, handle)
    }

    /// Runs every job queued so far and returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Runs jobs as they arrive until every [`LoopHandle`] is dropped.
    pub async fn run(mut self) {
        while let Some(job) = self.rx.recv().await {
            job();
        }
    }
}

impl Scheduler for LoopHandle {
    fn post(&self, job: Job) {
        if self.tx.send(job).is_err() {
            debug!("event loop closed, dropping delivery");
        }
    }

    fn is_current(&self) -> bool {
        thread::current().id() == self.owner
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn jobs_run_on_owner_thread() {
        let (mut event_loop, handle) = EventLoop::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let owner = thread::current().id();

        let remote = handle.clone();
        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            assert!(!remote.is_current());
            remote.post(Box::new(move || {
                assert_eq!(thread::current().id(), owner);
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        })
        .join()
        .unwrap();

        assert!(handle.is_current());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(event_loop.run_pending(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_ends_when_handles_drop() {
        let (event_loop, handle) = EventLoop::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        handle.post(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        drop(handle);

        event_loop.run().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
