//! Async event sources: background tasks that push encoded `ZREV` batches
//! onto a bounded channel for a backend's `pollEvents` to drain. Generalizes
//! the corpus's async-input-task pattern — each source owns its task
//! lifecycle and stops cooperatively when the channel closes.

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::task::JoinHandle;

use crate::wire::{self, Event, EventBatch, TimestampTracker};

/// Backpressure policy: a full channel means the consumer is behind, so
/// sources drop the batch rather than block the terminal's input thread.
pub const EVENT_CHANNEL_CAP: usize = 256;

pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static BATCHES_DECODED: AtomicU64 = AtomicU64::new(0);
pub static PROTOCOL_ERRORS: AtomicU64 = AtomicU64::new(0);
pub static TICKS_EMITTED: AtomicU64 = AtomicU64::new(0);

pub fn channel() -> (crossbeam_channel::Sender<Vec<u8>>, crossbeam_channel::Receiver<Vec<u8>>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAP)
}

/// Implemented by any async producer of encoded event batches. Implementors
/// typically spawn one background task that repeatedly encodes a batch via
/// [`wire::encode`] and `try_send`s it, incrementing
/// [`CHANNEL_SEND_FAILURES`] rather than blocking when the channel is full.
pub trait AsyncEventSource: Send + 'static {
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: crossbeam_channel::Sender<Vec<u8>>) -> JoinHandle<()>;
}

#[derive(Default)]
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<S: AsyncEventSource>(&mut self, source: S) {
        self.sources.push(Box::new(source));
    }

    /// Spawn every registered source. Callers should drop their own `tx`
    /// clone during shutdown so each source observes the closed channel and
    /// exits instead of blocking the process from terminating.
    pub fn spawn_all(&mut self, tx: &crossbeam_channel::Sender<Vec<u8>>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.sources.len());
        for source in self.sources.drain(..) {
            let name = source.name();
            tracing::debug!(target: "rezi_events", source = name, "spawning event source");
            handles.push(source.spawn(tx.clone()));
        }
        handles
    }
}

/// Emits a monotonic `Event::Tick` every `interval`, giving the consumer a
/// render cadence independent of input activity.
pub struct TickEventSource {
    interval: std::time::Duration,
}

impl TickEventSource {
    pub fn new(interval: std::time::Duration) -> Self {
        Self { interval }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }

    fn spawn(self: Box<Self>, tx: crossbeam_channel::Sender<Vec<u8>>) -> JoinHandle<()> {
        let interval_dur = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval_dur);
            loop {
                ticker.tick().await;
                let dt_ms = interval_dur.as_millis().min(u32::MAX as u128) as u32;
                let bytes = wire::encode(&[Event::Tick { dt_ms }], 0, false);
                match tx.try_send(bytes) {
                    Ok(()) => {
                        TICKS_EMITTED.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(crossbeam_channel::TrySendError::Full(_)) => {
                        CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(crossbeam_channel::TrySendError::Disconnected(_)) => break,
                }
            }
        })
    }
}

/// Drains every batch currently queued on `rx` into a single merged
/// [`EventBatch`], normalizing timestamps through `tracker`. A batch that
/// fails to decode is logged and dropped (§7 `ZRUI_PROTOCOL_ERROR` policy:
/// discard the batch, keep polling) rather than aborting the drain.
pub fn drain_batches(rx: &crossbeam_channel::Receiver<Vec<u8>>, tracker: &mut TimestampTracker) -> EventBatch {
    let mut merged = EventBatch::default();
    let channel_drops = CHANNEL_SEND_FAILURES.swap(0, Ordering::Relaxed) as u32;
    merged.dropped_batches = channel_drops;

    while let Ok(bytes) = rx.try_recv() {
        match wire::decode(&bytes, 0, tracker) {
            Ok(mut batch) => {
                BATCHES_DECODED.fetch_add(1, Ordering::Relaxed);
                merged.truncated |= batch.truncated;
                merged.events.append(&mut batch.events);
            }
            Err(err) => {
                PROTOCOL_ERRORS.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(target: "rezi_events", error = %err, "dropping malformed event batch");
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct OnceSource;

    impl AsyncEventSource for OnceSource {
        fn name(&self) -> &'static str {
            "once"
        }
        fn spawn(self: Box<Self>, tx: crossbeam_channel::Sender<Vec<u8>>) -> JoinHandle<()> {
            tokio::spawn(async move {
                let bytes = wire::encode(&[Event::Focus(true)], 0, false);
                let _ = tx.try_send(bytes);
            })
        }
    }

    #[tokio::test]
    async fn registry_spawns_and_drain_sees_the_event() {
        let (tx, rx) = channel();
        let mut registry = EventSourceRegistry::new();
        registry.register(OnceSource);
        let handles = registry.spawn_all(&tx);
        for h in handles {
            h.await.unwrap();
        }
        let mut tracker = TimestampTracker::new();
        let batch = drain_batches(&rx, &mut tracker);
        assert_eq!(batch.events.len(), 1);
        assert!(matches!(batch.events[0], Event::Focus(true)));
    }

    #[test]
    fn malformed_batch_is_dropped_not_fatal() {
        let (tx, rx) = channel();
        tx.try_send(b"not a valid batch".to_vec()).unwrap();
        let mut tracker = TimestampTracker::new();
        let batch = drain_batches(&rx, &mut tracker);
        assert!(batch.events.is_empty());
    }

    #[tokio::test]
    async fn tick_source_emits_at_least_once_quickly() {
        let (tx, rx) = channel();
        let mut registry = EventSourceRegistry::new();
        registry.register(TickEventSource::new(Duration::from_millis(5)));
        let handles = registry.spawn_all(&tx);
        drop(tx);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let mut tracker = TimestampTracker::new();
        let batch = drain_batches(&rx, &mut tracker);
        assert!(batch.events.iter().any(|e| matches!(e, Event::Tick { .. })));

        // Dropping the receiver is what lets the background task observe a
        // disconnected channel and exit; join to confirm it does.
        drop(rx);
        for h in handles {
            let _ = tokio::time::timeout(Duration::from_millis(50), h).await;
        }
    }
}
