//! Ack-only driver
//!
//! Every send is acknowledged immediately and nothing is ever delivered to
//! consumers. Useful for measuring the worker's own pacing accuracy and as
//! a smoke-test target.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::future;

use msg_bench_core::driver::{
    Consumer, ConsumerCallback, Driver, DriverError, Producer, SendFuture,
};

/// Driver that acknowledges sends instantly and never delivers.
#[derive(Debug, Default)]
pub struct NoopDriver {
    topics: Mutex<HashSet<String>>,
}

impl NoopDriver {
    /// Create a driver with no topics.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Driver for NoopDriver {
    fn topic_name_prefix(&self) -> String {
        "noop".to_string()
    }

    async fn create_topic(&self, topic: &str, _partitions: u32) -> Result<(), DriverError> {
        self.topics.lock().unwrap().insert(topic.to_string());
        Ok(())
    }

    async fn validate_topic_exists(&self, topic: &str) -> Result<bool, DriverError> {
        Ok(self.topics.lock().unwrap().contains(topic))
    }

    async fn create_producer(&self, _topic: &str) -> Result<Arc<dyn Producer>, DriverError> {
        Ok(Arc::new(NoopProducer))
    }

    async fn create_consumer(
        &self,
        _topic: &str,
        _subscription: &str,
        _callback: Arc<dyn ConsumerCallback>,
    ) -> Result<Arc<dyn Consumer>, DriverError> {
        Ok(Arc::new(NoopConsumer))
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

struct NoopProducer;

#[async_trait]
impl Producer for NoopProducer {
    fn send_async(&self, _key: Option<String>, _payload: Bytes) -> SendFuture {
        Box::pin(future::ready(Ok(())))
    }

    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

struct NoopConsumer;

#[async_trait]
impl Consumer for NoopConsumer {
    async fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sends_complete_immediately() {
        let driver = NoopDriver::new();
        driver.create_topic("t", 1).await.unwrap();
        assert!(driver.validate_topic_exists("t").await.unwrap());
        assert!(!driver.validate_topic_exists("u").await.unwrap());

        let producer = driver.create_producer("t").await.unwrap();
        producer
            .send_async(None, Bytes::from_static(b"payload"))
            .await
            .unwrap();
        producer.close().await.unwrap();
    }
}
