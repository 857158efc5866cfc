//! In-process fan-out of pipeline events.

use futures::{stream::BoxStream, StreamExt};
use scry_types::events::SystemEvent;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Broadcast bus for pipeline observers. Slow subscribers lose old events
/// instead of exerting backpressure on the pipeline.
#[derive(Clone)]
pub struct LocalBus {
    tx: broadcast::Sender<SystemEvent>,
}

impl LocalBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: SystemEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> BoxStream<'static, SystemEvent> {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|event| async move { event.ok() })
            .boxed()
    }
}
