use crate::domain::LifecycleEvent;
use crate::engine::{EventOutcome, ProposalTracker, RideReconciler};
use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A view that consumes lifecycle events.
pub trait EventSink: Send + 'static {
    fn apply(&mut self, event: &LifecycleEvent) -> EventOutcome;
}

impl EventSink for RideReconciler {
    fn apply(&mut self, event: &LifecycleEvent) -> EventOutcome {
        self.apply_event(event)
    }
}

impl EventSink for ProposalTracker {
    fn apply(&mut self, event: &LifecycleEvent) -> EventOutcome {
        self.apply_event(event)
    }
}

/// A running event listener. Dropping it stops the listener.
#[derive(Debug)]
pub struct Subscription {
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn spawn<T: EventSink>(
        mut events: BoxStream<'static, LifecycleEvent>,
        sink: Arc<Mutex<T>>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                sink.lock().await.apply(&event);
            }
            debug!("Event feed closed, listener exiting");
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Stop listening now.
    pub fn unsubscribe(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }

    /// Wait until the feed ends and every delivered event has been applied.
    pub async fn finished(mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Event listener ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
