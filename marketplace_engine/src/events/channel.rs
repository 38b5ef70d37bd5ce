//! Stateless pub-sub for marketplace events.
//!
//! A hook only ever sees the event it is handed; it has no access to the engine's state. Hooks may be async, and each
//! event is handled on its own task so a slow hook does not hold up the producer.
use std::{future::Future, pin::Pin, sync::Arc};

use log::*;
use tokio::{sync::mpsc, task::JoinSet};

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    listener: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    handler: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, handler: Handler<E>) -> Self {
        let (sender, listener) = mpsc::channel(buffer_size);
        Self { listener, sender, handler }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Runs until every producer has been dropped, then waits for in-flight hooks to finish.
    pub async fn start_handler(self) {
        let Self { mut listener, sender, handler } = self;
        debug!("📬️ Starting event handler");
        // Only subscribers keep the channel open from here on
        drop(sender);
        let mut jobs = JoinSet::new();
        while let Some(ev) = listener.recv().await {
            trace!("📬️ Handling event");
            let handler = Arc::clone(&handler);
            jobs.spawn(async move { (handler)(ev).await });
            // reap whatever has already finished so the set does not grow without bound
            while jobs.try_join_next().is_some() {}
        }
        debug!("📬️ All producers are gone. Waiting on {} running hooks", jobs.len());
        while let Some(result) = jobs.join_next().await {
            if let Err(e) = result {
                warn!("📬️ An event hook did not complete: {e}");
            }
        }
        debug!("📬️ Event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}
