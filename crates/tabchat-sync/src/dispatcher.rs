use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tracing::{debug, warn};
use uuid::Uuid;

/// An event stamped with the context that published it.
#[derive(Debug, Clone)]
pub struct Envelope<E> {
    pub origin: Uuid,
    pub event: E,
}

/// Fan-out hub for one origin. Holds one broadcast channel per name; every
/// context of the origin shares the same `Dispatcher`.
pub struct Dispatcher<E> {
    inner: Arc<DispatcherInner<E>>,
}

struct DispatcherInner<E> {
    /// Per-channel buffer size. A receiver further behind than this lags.
    capacity: usize,

    /// channel name -> sender
    channels: Mutex<HashMap<String, broadcast::Sender<Envelope<E>>>>,
}

impl<E> Clone for Dispatcher<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Clone + Send + 'static> Dispatcher<E> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                capacity: capacity.max(1),
                channels: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Handle to the channel called `name`, creating it on first use.
    pub fn channel(&self, name: &str) -> BroadcastChannel<E> {
        let mut channels = self
            .inner
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let tx = channels
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .clone();

        BroadcastChannel {
            name: name.to_string(),
            tx,
        }
    }

    /// Number of live subscriptions on `name`.
    pub fn subscriber_count(&self, name: &str) -> usize {
        self.inner
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .map_or(0, |tx| tx.receiver_count())
    }
}

/// A named channel. Cheap to clone.
#[derive(Clone)]
pub struct BroadcastChannel<E> {
    name: String,
    tx: broadcast::Sender<Envelope<E>>,
}

impl<E: Clone + Send + 'static> BroadcastChannel<E> {
    /// Fire-and-forget publish on behalf of context `origin`. Returns how many
    /// subscriptions, the publisher's own included, were live to receive it.
    pub fn publish(&self, origin: Uuid, event: E) -> usize {
        match self.tx.send(Envelope { origin, event }) {
            Ok(n) => n,
            Err(_) => {
                debug!("No live subscribers on {}", self.name);
                0
            }
        }
    }

    /// Subscribe on behalf of context `context_id`. Only publishes made after
    /// this call are delivered, and never those stamped with `context_id`.
    pub fn subscribe(&self, context_id: Uuid) -> Subscription<E> {
        Subscription {
            name: self.name.clone(),
            context_id,
            rx: self.tx.subscribe(),
            missed: 0,
        }
    }
}

/// One context's receiving end of a channel.
pub struct Subscription<E> {
    name: String,
    context_id: Uuid,
    rx: broadcast::Receiver<Envelope<E>>,
    missed: u64,
}

impl<E: Clone + Send + 'static> Subscription<E> {
    /// Next pending event from another context, without waiting.
    pub fn try_next(&mut self) -> Option<E> {
        loop {
            match self.rx.try_recv() {
                Ok(envelope) if envelope.origin == self.context_id => continue,
                Ok(envelope) => return Some(envelope.event),
                Err(TryRecvError::Lagged(n)) => self.note_lag(n),
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next event from another context. `None` once every
    /// sender is gone.
    pub async fn next(&mut self) -> Option<E> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if envelope.origin == self.context_id => continue,
                Ok(envelope) => return Some(envelope.event),
                Err(RecvError::Lagged(n)) => self.note_lag(n),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Number of events dropped because this subscription fell behind since
    /// the last call. Resets the count.
    pub fn take_missed(&mut self) -> u64 {
        std::mem::take(&mut self.missed)
    }

    fn note_lag(&mut self, n: u64) {
        warn!("Receiver on {} lagged by {} messages", self.name, n);
        self.missed += n;
    }
}
