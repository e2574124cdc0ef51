//! Driver abstraction: the broker-specific plumbing the worker drives
//!
//! These traits are defined in core to keep the load engine independent of
//! any concrete broker. Implementations live in their own crates (see
//! `msg-bench-drivers` for the built-in ones) and are resolved through the
//! [`DriverRegistry`](crate::registry::DriverRegistry).

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;

/// Completion handle for an asynchronous send.
///
/// The send is initiated before the producer returns this future; awaiting
/// it only observes broker acknowledgement. The `'static` bound lets the
/// load engine spawn the completion continuation without borrowing the
/// producer across it.
pub type SendFuture = BoxFuture<'static, Result<(), DriverError>>;

/// Errors produced by driver implementations.
#[derive(Debug, Error)]
pub enum DriverError {
    /// Invalid or unusable driver configuration
    #[error("driver configuration error: {0}")]
    Config(String),

    /// Topic administration failed
    #[error("topic error: {0}")]
    Topic(String),

    /// Producer creation or operation failed
    #[error("producer error: {0}")]
    Producer(String),

    /// Consumer creation or operation failed
    #[error("consumer error: {0}")]
    Consumer(String),

    /// A send was not acknowledged
    #[error("send failed: {0}")]
    Send(String),

    /// The driver has already been closed
    #[error("driver is closed")]
    Closed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A broker-specific driver: topic administration plus producer and
/// consumer factories.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Prefix the worker uses when generating topic names.
    fn topic_name_prefix(&self) -> String;

    /// Create `topic` with the given partition count.
    async fn create_topic(&self, topic: &str, partitions: u32) -> Result<(), DriverError>;

    /// Check whether `topic` already exists on the broker.
    async fn validate_topic_exists(&self, topic: &str) -> Result<bool, DriverError>;

    /// Create a producer publishing to `topic`.
    async fn create_producer(&self, topic: &str) -> Result<Arc<dyn Producer>, DriverError>;

    /// Create a consumer on `(topic, subscription)` delivering into
    /// `callback`.
    async fn create_consumer(
        &self,
        topic: &str,
        subscription: &str,
        callback: Arc<dyn ConsumerCallback>,
    ) -> Result<Arc<dyn Consumer>, DriverError>;

    /// Release all broker resources held by the driver.
    async fn close(&self) -> Result<(), DriverError>;
}

/// A single-topic message producer.
#[async_trait]
pub trait Producer: Send + Sync {
    /// Begin an asynchronous send and return its completion handle.
    fn send_async(&self, key: Option<String>, payload: Bytes) -> SendFuture;

    /// Close the producer.
    async fn close(&self) -> Result<(), DriverError>;
}

/// A message consumer. Messages arrive through the [`ConsumerCallback`]
/// supplied at creation time; the handle itself only supports teardown.
#[async_trait]
pub trait Consumer: Send + Sync {
    /// Close the consumer.
    async fn close(&self) -> Result<(), DriverError>;
}

/// Receives messages and delivery errors from a driver's consumers.
///
/// Drivers call whichever entry point matches what they have in hand: owned
/// payload bytes, a borrowed view, or an end-to-end latency they computed
/// themselves. Implementations may block (the worker's pause gate does), so
/// drivers should invoke these from threads that tolerate back-pressure.
pub trait ConsumerCallback: Send + Sync {
    /// A message arrived. `publish_timestamp_ms` is the producing host's
    /// wall clock in milliseconds.
    fn message_received(&self, payload: Bytes, publish_timestamp_ms: i64) {
        self.message_received_view(&payload, publish_timestamp_ms);
    }

    /// Zero-copy variant of [`message_received`](Self::message_received).
    fn message_received_view(&self, payload: &[u8], publish_timestamp_ms: i64);

    /// A message arrived and the driver already measured its end-to-end
    /// latency.
    fn message_received_with_latency(&self, payload_size: u64, e2e_latency_ns: i64);

    /// A poll/delivery error occurred.
    fn error(&self);
}
