//! Push-event bus between Logic and Dispatcher.
//!
//! Built on core NATS pub/sub (no JetStream): subjects are partitioned by
//! `hash(session_id) % partitions` so that all events for one session land
//! on one subject and are therefore observed in publish order by whichever
//! single dispatcher worker consumes that subject.
//! Delivery is at-least-once only up to the publish call succeeding — the
//! outbox relay is what guarantees a row eventually gets published at all;
//! once it's on the bus, a dispatcher crash mid-fanout can still drop it,
//! which the inbox's idempotent insert and the client's gap-filling
//! `PullInboxDelta` pull are what paper over on the read side.

use std::future::Future;
use std::sync::Arc;

use futures_util::StreamExt;
use resonance_wire::{push_subject, PushEvent};

#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("nats connect error: {0}")]
    Connect(#[from] async_nats::ConnectError),
    #[error("nats publish error: {0}")]
    Publish(#[from] async_nats::PublishError),
    #[error("nats subscribe error: {0}")]
    Subscribe(#[from] async_nats::SubscribeError),
    #[error("malformed bus payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("bus channel closed")]
    Closed,
}

#[async_trait::async_trait]
pub trait BusPublisher: Send + Sync {
    async fn publish(&self, event: &PushEvent) -> Result<(), BusError>;
}

pub struct NatsBus {
    client: async_nats::Client,
    partitions: u32,
}

impl NatsBus {
    pub async fn connect(url: &str, partitions: u32) -> Result<Self, BusError> {
        let client = async_nats::connect(url).await?;
        Ok(Self { client, partitions })
    }

    pub fn partitions(&self) -> u32 {
        self.partitions
    }

    /// Subscribe to one partition's subject, or a wildcard like
    /// `resonance.push.*` to consume every partition this worker owns.
    pub async fn subscribe(&self, subject: &str) -> Result<BusSubscription, BusError> {
        let inner = self.client.subscribe(subject.to_owned()).await?;
        Ok(BusSubscription { inner })
    }
}

#[async_trait::async_trait]
impl BusPublisher for NatsBus {
    async fn publish(&self, event: &PushEvent) -> Result<(), BusError> {
        let subject = push_subject(&event.session_id, self.partitions);
        let payload = serde_json::to_vec(event)?;
        self.client.publish(subject, payload.into()).await?;
        Ok(())
    }
}

pub struct BusSubscription {
    inner: async_nats::Subscriber,
}

impl BusSubscription {
    pub async fn next(&mut self) -> Option<Result<PushEvent, BusError>> {
        let msg = self.inner.next().await?;
        Some(serde_json::from_slice(&msg.payload).map_err(BusError::from))
    }
}

/// Drain a subscription with bounded concurrency: at most `max_in_flight`
/// handler invocations run at once, the rest wait for a free semaphore
/// permit, so one slow recipient edge can't let the dispatcher's task
/// count run away.
pub async fn run_consumer<F, Fut>(mut subscription: BusSubscription, max_in_flight: usize, handler: F)
where
    F: Fn(PushEvent) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let semaphore = Arc::new(tokio::sync::Semaphore::new(max_in_flight.max(1)));
    let handler = Arc::new(handler);
    while let Some(result) = subscription.next().await {
        match result {
            Ok(event) => {
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("consumer semaphore never closes");
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler(event).await;
                    drop(permit);
                });
            }
            Err(err) => {
                tracing::warn!(%err, "dropping malformed bus message");
            }
        }
    }
}

/// In-memory double for tests: a single unbounded channel standing in for
/// "the bus", ignoring partitioning since tests don't need ordering proof
/// across concurrent sessions.
pub mod test_support {
    use super::{BusError, BusPublisher};
    use resonance_wire::PushEvent;
    use tokio::sync::mpsc;

    #[derive(Clone)]
    pub struct InMemoryBus {
        sender: mpsc::UnboundedSender<PushEvent>,
    }

    pub struct InMemoryBusReceiver {
        receiver: mpsc::UnboundedReceiver<PushEvent>,
    }

    impl InMemoryBus {
        pub fn new() -> (Self, InMemoryBusReceiver) {
            let (sender, receiver) = mpsc::unbounded_channel();
            (Self { sender }, InMemoryBusReceiver { receiver })
        }
    }

    #[async_trait::async_trait]
    impl BusPublisher for InMemoryBus {
        async fn publish(&self, event: &PushEvent) -> Result<(), BusError> {
            self.sender.send(event.clone()).map_err(|_| BusError::Closed)
        }
    }

    impl InMemoryBusReceiver {
        pub async fn recv(&mut self) -> Option<PushEvent> {
            self.receiver.recv().await
        }
    }
}
