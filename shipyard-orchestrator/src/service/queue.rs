//! Work queues
//!
//! A bounded channel drained by a single dispatcher task that spawns one task
//! per item. Used for both builds and chat interactions, so that the HTTP
//! handlers return as soon as the item is queued.
//!
//! Items never share state and are not ordered relative to each other. A
//! failing or panicking item only ends its own task.

use std::future::Future;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The dispatcher is gone, nothing will ever drain the queue again
#[derive(Debug, Error)]
#[error("{0} queue is closed")]
pub struct QueueClosed(pub &'static str);

/// Producer side of a work queue
#[derive(Debug)]
pub struct WorkQueue<T> {
    name: &'static str,
    tx: mpsc::Sender<T>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<T: Send + 'static> WorkQueue<T> {
    /// Creates a queue and returns the receiving end, without a dispatcher
    pub fn bounded(name: &'static str, capacity: usize) -> (Self, mpsc::Receiver<T>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { name, tx }, rx)
    }

    /// Creates a queue and starts its dispatcher
    ///
    /// # Arguments
    /// * `name` - Used in logs
    /// * `capacity` - Items buffered before `submit` starts waiting
    /// * `handler` - Invoked in a fresh task for every item
    pub fn spawn<F, Fut>(name: &'static str, capacity: usize, handler: F) -> (Self, JoinHandle<()>)
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (queue, rx) = Self::bounded(name, capacity);
        let dispatcher = dispatch(name, rx, handler);
        (queue, dispatcher)
    }

    /// Enqueues an item, waiting while the queue is full
    pub async fn submit(&self, item: T) -> Result<(), QueueClosed> {
        self.tx.send(item).await.map_err(|_| QueueClosed(self.name))?;
        debug!("Queued item on {} queue", self.name);
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Drains `rx`, spawning `handler` for each item until every sender is dropped
pub fn dispatch<T, F, Fut>(name: &'static str, mut rx: mpsc::Receiver<T>, handler: F) -> JoinHandle<()>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        info!("Starting {} dispatcher", name);

        while let Some(item) = rx.recv().await {
            let task = tokio::spawn(handler(item));

            // Observe panics without waiting on the task
            tokio::spawn(async move {
                if let Err(e) = task.await {
                    warn!("{} task panicked: {}", name, e);
                }
            });
        }

        info!("{} queue closed, dispatcher exiting", name);
    })
}
