//! Bounded fire-and-forget task dispatch.
//!
//! The webhook handler acknowledges the sender before processing starts, so
//! each accepted event runs on its own tokio task. A semaphore bounds how
//! many events process concurrently; the handler drops the join handle,
//! tests keep it to observe completion and panics.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct Dispatcher {
    permits: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(max_inflight: usize) -> Self {
        Dispatcher {
            permits: Arc::new(Semaphore::new(max_inflight)),
        }
    }

    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = self.permits.clone();
        tokio::spawn(async move {
            // the semaphore is never closed, so acquire only fails on shutdown
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            task.await;
        })
    }
}
