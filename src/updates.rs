use tokio::sync::{mpsc, oneshot};

use crate::models::Event;

/// An emitted event plus the acknowledgement its sender is waiting on.
struct Delivery {
    event: Event,
    taken: oneshot::Sender<()>,
}

/// Rendezvous hand-off between the watcher and whoever announces its events.
///
/// `EventSink::send` resolves only after `EventStream::recv` has taken the event,
/// so a slow consumer holds the watcher back.
pub fn channel() -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::channel(1);
    (EventSink { tx }, EventStream { rx })
}

pub struct EventSink {
    tx: mpsc::Sender<Delivery>,
}

impl EventSink {
    /// Hands the event over and waits for the consumer to take it.
    ///
    /// Returns `false` once the stream is gone. Dropping the returned future before it
    /// resolves withdraws the event: the stream skips it instead of yielding it late.
    pub async fn send(&self, event: Event) -> bool {
        let (taken, ack) = oneshot::channel();
        if self.tx.send(Delivery { event, taken }).await.is_err() {
            return false;
        }
        ack.await.is_ok()
    }

    /// Resolves when the stream has been dropped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

pub struct EventStream {
    rx: mpsc::Receiver<Delivery>,
}

impl EventStream {
    /// Next event, or `None` once every sink is dropped.
    pub async fn recv(&mut self) -> Option<Event> {
        while let Some(Delivery { event, taken }) = self.rx.recv().await {
            if taken.send(()).is_ok() {
                return Some(event);
            }
        }
        None
    }
}
