//! Event broadcast hub
//!
//! Fans notification payloads out to every active stream subscriber.
//!
//! Each subscription owns a bounded FIFO queue and one consumer task bound
//! to one [`EventSink`]. The consumer writes queued payloads to the sink,
//! one JSON object per line, until a write fails:
//!
//! ```text
//! Registered ──task starts──▶ Streaming ──sink closed──▶ Closed
//!                                 │
//!                                 └──────other error──▶ Failed
//! ```
//!
//! A terminating consumer removes its own queue from the registry before it
//! exits, so the next `publish` no longer targets it. Consumer tasks hold a
//! permit from a fixed-size pool; a subscription beyond the pool size is
//! rejected with [`RestconfError::PoolExhausted`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use restconf_core::{NotificationEvent, NotificationKind, RestconfError, RestconfResult};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Line terminator written after every event
pub const LINE_TERMINATOR: &str = "\r\n";

/// What `publish` does when a subscriber's queue is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Wait for space. A stalled consumer delays every later subscriber
    /// in the same publish call.
    #[default]
    Block,
    /// Drop the event for that subscriber only
    Drop,
}

/// Hub sizing and queue policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    /// Maximum number of concurrent subscriptions (consumer tasks)
    pub worker_pool_size: usize,
    /// Capacity of each subscriber queue
    pub queue_capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            worker_pool_size: 5,
            queue_capacity: 64,
            overflow: OverflowPolicy::Block,
        }
    }
}

/// Lifecycle of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// Queue registered, consumer not yet running
    Registered,
    /// Consumer is delivering events
    Streaming,
    /// Sink closed by the client, or the hub shut down. Terminal.
    Closed,
    /// Consumer stopped on an unexpected error. Terminal.
    Failed,
}

/// Output of one stream subscription
#[async_trait]
pub trait EventSink: Send + 'static {
    /// Write one line. Must return [`RestconfError::SinkClosed`] when the
    /// receiving side is gone.
    async fn write_line(&mut self, line: &str) -> RestconfResult<()>;

    /// Release the sink. Called once when the consumer stops.
    async fn close(&mut self) -> RestconfResult<()> {
        Ok(())
    }
}

/// [`EventSink`] feeding a channel of body chunks (e.g. a chunked HTTP
/// response). The sink counts as closed once the receiver is dropped.
#[derive(Debug)]
pub struct ChannelSink {
    sender: Option<mpsc::Sender<Bytes>>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<Bytes>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Create a sink together with the receiving end of its channel
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn write_line(&mut self, line: &str) -> RestconfResult<()> {
        let sender = self.sender.as_ref().ok_or(RestconfError::SinkClosed)?;
        let chunk = Bytes::from(format!("{}{}", line, LINE_TERMINATOR));
        sender
            .send(chunk)
            .await
            .map_err(|_| RestconfError::SinkClosed)
    }

    async fn close(&mut self) -> RestconfResult<()> {
        self.sender.take();
        Ok(())
    }
}

/// Identity and state shared by a registry entry and its consumer
struct Subscription {
    id: String,
    stream_id: String,
    state: Mutex<SubscriptionState>,
}

impl Subscription {
    fn set_state(&self, state: SubscriptionState) {
        *self.state.lock() = state;
    }
}

/// Registry entry. The registry owns the only long-lived queue sender, so
/// removing the entry ends the consumer once the queue is drained.
#[derive(Clone)]
struct Subscriber {
    subscription: Arc<Subscription>,
    queue: mpsc::Sender<Arc<str>>,
}

type Registry = Arc<RwLock<HashMap<String, Subscriber>>>;

/// Handle returned by [`EventBroadcastHub::subscribe`]
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: String,
    task: JoinHandle<SubscriptionState>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the consumer to stop and return its terminal state
    pub async fn join(self) -> SubscriptionState {
        match self.task.await {
            Ok(state) => state,
            Err(e) => {
                error!(subscription_id = %self.id, error = %e, "Consumer task panicked or was aborted");
                SubscriptionState::Failed
            }
        }
    }
}

/// Registry of subscriber queues plus the consumer worker pool
#[derive(Clone)]
pub struct EventBroadcastHub {
    config: HubConfig,
    registry: Registry,
    pool: Arc<Semaphore>,
}

impl Default for EventBroadcastHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl EventBroadcastHub {
    pub fn new(config: HubConfig) -> Self {
        let pool = Arc::new(Semaphore::new(config.worker_pool_size));
        Self {
            config,
            registry: Arc::new(RwLock::new(HashMap::new())),
            pool,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Register a queue for `stream_id` and spawn its consumer on `sink`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn subscribe<S: EventSink>(
        &self,
        stream_id: &str,
        sink: S,
    ) -> RestconfResult<SubscriptionHandle> {
        let permit = self
            .pool
            .clone()
            .try_acquire_owned()
            .map_err(|_| RestconfError::PoolExhausted {
                capacity: self.config.worker_pool_size,
            })?;

        let (queue, receiver) = mpsc::channel(self.config.queue_capacity.max(1));
        let subscription = Arc::new(Subscription {
            id: Uuid::new_v4().to_string(),
            stream_id: stream_id.to_string(),
            state: Mutex::new(SubscriptionState::Registered),
        });

        self.registry.write().insert(
            subscription.id.clone(),
            Subscriber {
                subscription: subscription.clone(),
                queue,
            },
        );

        info!(
            subscription_id = %subscription.id,
            stream_id = %subscription.stream_id,
            "Stream subscription registered"
        );

        let id = subscription.id.clone();
        let task = tokio::spawn(consume(
            subscription,
            receiver,
            sink,
            self.registry.clone(),
            permit,
        ));

        Ok(SubscriptionHandle { id, task })
    }

    /// Enqueue `payload` into every registered queue.
    ///
    /// Returns the number of queues that accepted the event. With no
    /// subscribers this is a no-op.
    pub async fn publish(&self, payload: &serde_json::Value) -> usize {
        // Copy-on-iterate: never hold the registry lock across an await
        let targets: Vec<Subscriber> = self.registry.read().values().cloned().collect();
        if targets.is_empty() {
            return 0;
        }

        let line: Arc<str> = Arc::from(payload.to_string());
        let mut delivered = 0;

        for subscriber in targets {
            let accepted = match self.config.overflow {
                OverflowPolicy::Block => subscriber.queue.send(line.clone()).await.is_ok(),
                OverflowPolicy::Drop => match subscriber.queue.try_send(line.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        warn!(subscription_id = %subscriber.subscription.id, "Subscriber queue full, event dropped");
                        continue;
                    }
                    Err(TrySendError::Closed(_)) => false,
                },
            };

            if accepted {
                delivered += 1;
            } else {
                debug!(subscription_id = %subscriber.subscription.id, "Subscriber queue closed, removing");
                self.registry.write().remove(&subscriber.subscription.id);
            }
        }

        delivered
    }

    /// Forward YANG notifications from an engine channel into `publish`.
    ///
    /// Other notification kinds are ignored. The task ends when the
    /// channel closes.
    pub fn spawn_notification_listener(
        &self,
        mut notifications: broadcast::Receiver<NotificationEvent>,
    ) -> JoinHandle<()> {
        let hub = self.clone();
        tokio::spawn(async move {
            loop {
                match notifications.recv().await {
                    Ok(event) if event.kind == NotificationKind::YangNotification => {
                        let delivered = hub.publish(&event.data).await;
                        debug!(delivered, "Notification published");
                    }
                    Ok(event) => {
                        debug!(kind = ?event.kind, "Ignoring non-YANG notification");
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "Notification listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Notification channel closed");
                        break;
                    }
                }
            }
        })
    }

    /// Number of registered subscriber queues
    pub fn subscriber_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Current state of a registered subscription
    pub fn state(&self, subscription_id: &str) -> Option<SubscriptionState> {
        self.registry
            .read()
            .get(subscription_id)
            .map(|s| *s.subscription.state.lock())
    }

    /// Drop every queue; consumers drain, close their sinks and stop
    pub fn shutdown(&self) {
        let removed = std::mem::take(&mut *self.registry.write());
        info!(subscriptions = removed.len(), "Event hub shutting down");
    }
}

async fn consume<S: EventSink>(
    subscription: Arc<Subscription>,
    mut queue: mpsc::Receiver<Arc<str>>,
    mut sink: S,
    registry: Registry,
    _permit: OwnedSemaphorePermit,
) -> SubscriptionState {
    subscription.set_state(SubscriptionState::Streaming);

    let state = loop {
        let Some(line) = queue.recv().await else {
            break SubscriptionState::Closed;
        };

        match sink.write_line(&line).await {
            Ok(()) => {}
            Err(RestconfError::SinkClosed) => {
                info!(subscription_id = %subscription.id, "Event sink closed");
                break SubscriptionState::Closed;
            }
            Err(e) => {
                error!(subscription_id = %subscription.id, error = %e, "Event consumer failed");
                break SubscriptionState::Failed;
            }
        }
    };

    subscription.set_state(state);
    registry.write().remove(&subscription.id);

    if let Err(e) = sink.close().await {
        warn!(subscription_id = %subscription.id, error = %e, "Failed to close event sink");
    }
    info!(
        subscription_id = %subscription.id,
        stream_id = %subscription.stream_id,
        ?state,
        "Event consumer terminated"
    );

    state
}
