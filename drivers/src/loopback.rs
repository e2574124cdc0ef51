//! In-process loopback driver
//!
//! Messages published to a topic are delivered to every consumer subscribed
//! to that topic. Delivery runs on a dedicated forwarding thread, so a
//! paused (blocking) consumer callback backs the queue up instead of
//! stalling producers, mirroring how a real broker client's delivery
//! pipeline behaves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::future;

use msg_bench_core::clock;
use msg_bench_core::driver::{
    Consumer, ConsumerCallback, Driver, DriverError, Producer, SendFuture,
};

struct Delivery {
    topic: String,
    payload: Bytes,
    publish_timestamp_ms: i64,
}

#[derive(Default)]
struct Subscriptions {
    by_topic: HashMap<String, Vec<Arc<dyn ConsumerCallback>>>,
}

/// Driver that loops published messages back to in-process subscribers.
pub struct LoopbackDriver {
    topics: Mutex<HashMap<String, u32>>,
    subscriptions: Arc<Mutex<Subscriptions>>,
    delivery_tx: Mutex<Option<Sender<Delivery>>>,
    closed: Arc<AtomicBool>,
}

impl LoopbackDriver {
    /// Create the driver and start its forwarding thread.
    pub fn new() -> Self {
        let subscriptions = Arc::new(Mutex::new(Subscriptions::default()));
        let (tx, rx) = mpsc::channel::<Delivery>();

        let forward_subs = Arc::clone(&subscriptions);
        std::thread::Builder::new()
            .name("loopback-delivery".to_string())
            .spawn(move || {
                while let Ok(delivery) = rx.recv() {
                    let callbacks: Vec<Arc<dyn ConsumerCallback>> = {
                        let subs = forward_subs.lock().unwrap();
                        subs.by_topic
                            .get(&delivery.topic)
                            .cloned()
                            .unwrap_or_default()
                    };
                    for callback in callbacks {
                        callback
                            .message_received(delivery.payload.clone(), delivery.publish_timestamp_ms);
                    }
                }
            })
            .expect("spawn loopback delivery thread");

        Self {
            topics: Mutex::new(HashMap::new()),
            subscriptions,
            delivery_tx: Mutex::new(Some(tx)),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn sender(&self) -> Result<Sender<Delivery>, DriverError> {
        self.delivery_tx
            .lock()
            .unwrap()
            .clone()
            .ok_or(DriverError::Closed)
    }
}

impl Default for LoopbackDriver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Driver for LoopbackDriver {
    fn topic_name_prefix(&self) -> String {
        "loopback".to_string()
    }

    async fn create_topic(&self, topic: &str, partitions: u32) -> Result<(), DriverError> {
        self.topics
            .lock()
            .unwrap()
            .insert(topic.to_string(), partitions);
        Ok(())
    }

    async fn validate_topic_exists(&self, topic: &str) -> Result<bool, DriverError> {
        Ok(self.topics.lock().unwrap().contains_key(topic))
    }

    async fn create_producer(&self, topic: &str) -> Result<Arc<dyn Producer>, DriverError> {
        if !self.topics.lock().unwrap().contains_key(topic) {
            return Err(DriverError::Topic(format!("unknown topic: {topic}")));
        }
        Ok(Arc::new(LoopbackProducer {
            topic: topic.to_string(),
            delivery_tx: self.sender()?,
            closed: Arc::clone(&self.closed),
        }))
    }

    async fn create_consumer(
        &self,
        topic: &str,
        _subscription: &str,
        callback: Arc<dyn ConsumerCallback>,
    ) -> Result<Arc<dyn Consumer>, DriverError> {
        if !self.topics.lock().unwrap().contains_key(topic) {
            return Err(DriverError::Topic(format!("unknown topic: {topic}")));
        }
        self.subscriptions
            .lock()
            .unwrap()
            .by_topic
            .entry(topic.to_string())
            .or_default()
            .push(callback);
        Ok(Arc::new(LoopbackConsumer))
    }

    async fn close(&self) -> Result<(), DriverError> {
        // The forwarding thread exits once every sender clone is gone:
        // ours is dropped here, and the worker drops its producers first.
        self.closed.store(true, Ordering::Release);
        self.delivery_tx.lock().unwrap().take();
        self.subscriptions.lock().unwrap().by_topic.clear();
        tracing::debug!("loopback driver closed");
        Ok(())
    }
}

struct LoopbackProducer {
    topic: String,
    delivery_tx: Sender<Delivery>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Producer for LoopbackProducer {
    fn send_async(&self, _key: Option<String>, payload: Bytes) -> SendFuture {
        if self.closed.load(Ordering::Acquire) {
            return Box::pin(future::ready(Err(DriverError::Closed)));
        }
        let result = self
            .delivery_tx
            .send(Delivery {
                topic: self.topic.clone(),
                payload,
                publish_timestamp_ms: clock::wall_millis(),
            })
            .map_err(|_| DriverError::Closed);
        Box::pin(future::ready(result))
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

struct LoopbackConsumer;

#[async_trait]
impl Consumer for LoopbackConsumer {
    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingCallback {
        messages: AtomicU64,
        bytes: AtomicU64,
    }

    impl ConsumerCallback for CountingCallback {
        fn message_received_view(&self, payload: &[u8], _publish_timestamp_ms: i64) {
            self.messages.fetch_add(1, Ordering::SeqCst);
            self.bytes.fetch_add(payload.len() as u64, Ordering::SeqCst);
        }

        fn message_received_with_latency(&self, payload_size: u64, _e2e_latency_ns: i64) {
            self.messages.fetch_add(1, Ordering::SeqCst);
            self.bytes.fetch_add(payload_size, Ordering::SeqCst);
        }

        fn error(&self) {}
    }

    async fn wait_for(callback: &CountingCallback, messages: u64) {
        for _ in 0..100 {
            if callback.messages.load(Ordering::SeqCst) >= messages {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "only {} messages delivered",
            callback.messages.load(Ordering::SeqCst)
        );
    }

    #[tokio::test]
    async fn published_messages_reach_subscribers() {
        let driver = LoopbackDriver::new();
        driver.create_topic("t", 1).await.unwrap();

        let callback = Arc::new(CountingCallback::default());
        driver
            .create_consumer("t", "sub", Arc::clone(&callback) as Arc<dyn ConsumerCallback>)
            .await
            .unwrap();

        let producer = driver.create_producer("t").await.unwrap();
        for _ in 0..5 {
            producer
                .send_async(None, Bytes::from_static(b"0123456789"))
                .await
                .unwrap();
        }

        wait_for(&callback, 5).await;
        assert_eq!(callback.bytes.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn producers_require_an_existing_topic() {
        let driver = LoopbackDriver::new();
        assert!(driver.create_producer("missing").await.is_err());
        assert!(driver.create_consumer(
            "missing",
            "sub",
            Arc::new(CountingCallback::default()) as Arc<dyn ConsumerCallback>
        )
        .await
        .is_err());
    }

    #[tokio::test]
    async fn sends_fail_after_close() {
        let driver = LoopbackDriver::new();
        driver.create_topic("t", 1).await.unwrap();
        let producer = driver.create_producer("t").await.unwrap();

        driver.close().await.unwrap();
        let result = producer.send_async(None, Bytes::from_static(b"x")).await;
        assert!(result.is_err());
    }
}
