//! The local worker: lifecycle control, the consumer ingest path, and the
//! statistics endpoints polled by a coordinator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use bytes::Bytes;
use futures::future;
use rand::Rng;

use crate::clock;
use crate::config::{ConsumerAssignment, DriverConfig, ProducerWorkAssignment, TopicsInfo};
use crate::driver::{Consumer, ConsumerCallback, Driver, Producer};
use crate::error::{Error, Result};
use crate::metrics::{MetricsSink, NoopMetricsSink, SinkCounter};
use crate::registry::DriverRegistry;
use crate::stats::{
    CountersStats, CumulativeLatencies, LatencyTracker, PeriodStats, WorkerCounters,
    END_TO_END_MAX_MICROS, PRODUCER_MAX_MICROS,
};

use super::executor;
use super::rate_limiter::UniformRateLimiter;

/// Fixed payload sent by `probe_producers`.
const PROBE_PAYLOAD: [u8; 24] = [0; 24];

/// How long `stop_all` lets in-flight sends drain before tearing down.
const SHUTDOWN_DRAIN: Duration = Duration::from_millis(100);

/// Interval at which a paused consumer callback re-checks the pause flag.
const PAUSE_POLL: Duration = Duration::from_secs(1);

/// State shared between the control surface, the load tasks, and the
/// consumer callback.
pub(crate) struct WorkerState {
    pub(crate) counters: WorkerCounters,

    pub(crate) publish: LatencyTracker,
    pub(crate) schedule: LatencyTracker,
    pub(crate) publish_delay: LatencyTracker,
    pub(crate) end_to_end: LatencyTracker,

    pub(crate) messages_sent_sink: Arc<dyn SinkCounter>,
    pub(crate) bytes_sent_sink: Arc<dyn SinkCounter>,
    pub(crate) messages_received_sink: Arc<dyn SinkCounter>,
    pub(crate) bytes_received_sink: Arc<dyn SinkCounter>,

    pub(crate) rate_limiter: ArcSwap<UniformRateLimiter>,
    pub(crate) test_completed: AtomicBool,
    pub(crate) consumers_paused: AtomicBool,
}

impl WorkerState {
    pub(crate) fn is_completed(&self) -> bool {
        self.test_completed.load(Ordering::Acquire)
    }

    fn reset_recorders(&self) {
        self.publish.reset();
        self.schedule.reset();
        self.publish_delay.reset();
        self.end_to_end.reset();
    }
}

/// A benchmark worker driving one driver instance.
///
/// The worker owns the driver, the producer and consumer lists, the rate
/// limiter, and all statistics state. A coordinator walks it through its
/// lifecycle: initialize the driver, create topics, create producers and
/// consumers, start the load, adjust/pause as needed, poll the stats
/// endpoints, and finally stop everything.
pub struct LocalWorker {
    registry: DriverRegistry,
    sink: Arc<dyn MetricsSink>,
    driver: Mutex<Option<Arc<dyn Driver>>>,
    producers: Mutex<Vec<Arc<dyn Producer>>>,
    consumers: Mutex<Vec<Arc<dyn Consumer>>>,
    state: Arc<WorkerState>,
}

impl LocalWorker {
    /// Create a worker resolving drivers from `registry`, with metrics
    /// discarded.
    pub fn new(registry: DriverRegistry) -> Self {
        Self::with_sink(registry, Arc::new(NoopMetricsSink))
    }

    /// Create a worker mirroring its cumulative stats into `sink`.
    pub fn with_sink(registry: DriverRegistry, sink: Arc<dyn MetricsSink>) -> Self {
        let producer_sink = sink.scope("producer");
        let consumer_sink = sink.scope("consumer");

        let state = Arc::new(WorkerState {
            counters: WorkerCounters::default(),
            publish: LatencyTracker::new(
                PRODUCER_MAX_MICROS,
                producer_sink.op_stats("produce_latency"),
            ),
            schedule: LatencyTracker::new(
                PRODUCER_MAX_MICROS,
                producer_sink.op_stats("schedule_latency"),
            ),
            publish_delay: LatencyTracker::new(
                PRODUCER_MAX_MICROS,
                producer_sink.op_stats("producer_delay_latency"),
            ),
            end_to_end: LatencyTracker::new(
                END_TO_END_MAX_MICROS,
                consumer_sink.op_stats("e2e_latency"),
            ),
            messages_sent_sink: producer_sink.counter("messages_sent"),
            bytes_sent_sink: producer_sink.counter("bytes_sent"),
            messages_received_sink: consumer_sink.counter("messages_recv"),
            bytes_received_sink: consumer_sink.counter("bytes_recv"),
            rate_limiter: ArcSwap::from_pointee(UniformRateLimiter::new(1.0)),
            test_completed: AtomicBool::new(false),
            consumers_paused: AtomicBool::new(false),
        });

        Self {
            registry,
            sink,
            driver: Mutex::new(None),
            producers: Mutex::new(Vec::new()),
            consumers: Mutex::new(Vec::new()),
            state,
        }
    }

    fn driver(&self) -> Result<Arc<dyn Driver>> {
        self.driver
            .lock()
            .unwrap()
            .clone()
            .ok_or(Error::DriverNotInitialized)
    }

    /// Resolve and initialize the driver named by `config`.
    ///
    /// Fails if a driver is already initialized or the name is not in the
    /// registry.
    pub async fn initialize_driver(&self, config: DriverConfig) -> Result<()> {
        if self.driver.lock().unwrap().is_some() {
            return Err(Error::DriverAlreadyInitialized);
        }
        self.state.test_completed.store(false, Ordering::Release);

        tracing::info!(
            driver = %config.driver_class,
            name = config.name.as_deref().unwrap_or(""),
            "initializing driver"
        );

        let factory = self
            .registry
            .get(&config.driver_class)
            .ok_or_else(|| Error::UnknownDriver(config.driver_class.clone()))?;
        let driver = factory(config, Arc::clone(&self.sink)).await?;

        let mut guard = self.driver.lock().unwrap();
        if guard.is_some() {
            drop(guard);
            // Lost the race to a concurrent initialize; release the loser.
            if let Err(e) = driver.close().await {
                tracing::warn!(error = %e, "error closing redundant driver");
            }
            return Err(Error::DriverAlreadyInitialized);
        }
        *guard = Some(driver);
        Ok(())
    }

    /// Validate existing topics or create fresh ones, returning the topic
    /// names the test will use.
    pub async fn create_or_validate_topics(&self, topics_info: TopicsInfo) -> Result<Vec<String>> {
        let driver = self.driver()?;

        match topics_info {
            TopicsInfo::Existing(topics) => {
                for topic in &topics {
                    if !driver.validate_topic_exists(topic).await? {
                        return Err(Error::TopicDoesNotExist(topic.clone()));
                    }
                }
                Ok(topics)
            }
            TopicsInfo::Create {
                number_of_topics,
                partitions_per_topic,
            } => {
                let prefix = driver.topic_name_prefix();
                let topics: Vec<String> = (0..number_of_topics)
                    .map(|i| format!("{}-{}-{:04}", prefix, random_suffix(), i))
                    .collect();

                future::try_join_all(
                    topics
                        .iter()
                        .map(|topic| driver.create_topic(topic, partitions_per_topic)),
                )
                .await?;

                tracing::info!(count = topics.len(), partitions_per_topic, "created topics");
                Ok(topics)
            }
        }
    }

    /// Create one producer per topic, in the supplied order.
    pub async fn create_producers(&self, topics: &[String]) -> Result<()> {
        let driver = self.driver()?;
        let start = Instant::now();

        let created =
            future::try_join_all(topics.iter().map(|topic| driver.create_producer(topic))).await?;

        let count = created.len();
        self.producers.lock().unwrap().extend(created);
        tracing::info!(
            count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "created producers"
        );
        Ok(())
    }

    /// Create one consumer per `(topic, subscription)` pair.
    pub async fn create_consumers(&self, assignment: ConsumerAssignment) -> Result<()> {
        let driver = self.driver()?;
        let start = Instant::now();
        let callback: Arc<dyn ConsumerCallback> = Arc::new(WorkerCallback {
            state: Arc::clone(&self.state),
        });

        let created = future::try_join_all(assignment.topics_subscriptions.iter().map(|ts| {
            driver.create_consumer(&ts.topic, &ts.subscription, Arc::clone(&callback))
        }))
        .await?;

        let count = created.len();
        self.consumers.lock().unwrap().extend(created);
        tracing::info!(
            count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "created consumers"
        );
        Ok(())
    }

    /// Push one fixed probe message through every producer to warm it up
    /// and verify reachability. Only the sent-messages total is affected.
    pub async fn probe_producers(&self) -> Result<()> {
        let producers: Vec<Arc<dyn Producer>> = self.producers.lock().unwrap().clone();
        let sends: Vec<_> = producers
            .iter()
            .map(|producer| {
                producer.send_async(Some("key".to_string()), Bytes::from_static(&PROBE_PAYLOAD))
            })
            .collect();

        for send in sends {
            send.await?;
            self.state.counters.total_messages_sent.inc();
        }
        Ok(())
    }

    /// Configure the rate limiter and start the producer load tasks.
    pub async fn start_load(&self, assignment: ProducerWorkAssignment) -> Result<()> {
        if assignment.payload_data.is_empty() {
            return Err(Error::Config(
                "payload_data must contain at least one payload".to_string(),
            ));
        }

        self.state
            .rate_limiter
            .store(Arc::new(UniformRateLimiter::new(assignment.publish_rate)));
        self.state.test_completed.store(false, Ordering::Release);

        let producers: Vec<Arc<dyn Producer>> = self.producers.lock().unwrap().clone();
        tracing::info!(
            publish_rate = self.publish_rate(),
            producers = producers.len(),
            payloads = assignment.payload_data.len(),
            "starting load"
        );
        executor::spawn_load(Arc::clone(&self.state), producers, &assignment);
        Ok(())
    }

    /// Replace the rate limiter with one running at `rate` (floored at 1.0
    /// message per second). In-flight acquisitions finish against the old
    /// limiter; load tasks pick up the new one on their next send.
    pub fn adjust_publish_rate(&self, rate: f64) {
        self.state
            .rate_limiter
            .store(Arc::new(UniformRateLimiter::new(rate)));
        tracing::info!(rate = self.publish_rate(), "adjusted publish rate");
    }

    /// The rate the current limiter is operating at.
    pub fn publish_rate(&self) -> f64 {
        self.state.rate_limiter.load().rate()
    }

    /// Block consumer callbacks until [`resume_consumers`](Self::resume_consumers).
    pub fn pause_consumers(&self) {
        self.state.consumers_paused.store(true, Ordering::Release);
        tracing::info!("pausing consumers");
    }

    /// Release consumer callbacks blocked by [`pause_consumers`](Self::pause_consumers).
    pub fn resume_consumers(&self) {
        self.state.consumers_paused.store(false, Ordering::Release);
        tracing::info!("resuming consumers");
    }

    /// Drain the session counters and interval recorders into a snapshot.
    pub fn period_stats(&self) -> PeriodStats {
        let counters = &self.state.counters;

        // Counters drain before the histogram swaps: a record landing in
        // between may surface in this interval's histogram while its
        // message/byte counts surface in the next. At most a handful of
        // records per snapshot sit in that window.
        PeriodStats {
            messages_sent: counters.messages_sent.sum_then_reset(),
            bytes_sent: counters.bytes_sent.sum_then_reset(),
            errors: counters.errors.sum_then_reset(),
            poll_errors: counters.poll_errors.sum_then_reset(),
            messages_received: counters.messages_received.sum_then_reset(),
            bytes_received: counters.bytes_received.sum_then_reset(),

            total_messages_sent: counters.total_messages_sent.sum(),
            total_errors: counters.total_errors.sum(),
            total_messages_received: counters.total_messages_received.sum(),

            publish_latency: self.state.publish.interval_histogram(),
            schedule_latency: self.state.schedule.interval_histogram(),
            publish_delay_latency: self.state.publish_delay.interval_histogram(),
            end_to_end_latency: self.state.end_to_end.interval_histogram(),
        }
    }

    /// Copy the cumulative latency distributions without clearing them.
    pub fn cumulative_latencies(&self) -> CumulativeLatencies {
        CumulativeLatencies {
            publish_latency: self.state.publish.cumulative_histogram(),
            schedule_latency: self.state.schedule.cumulative_histogram(),
            publish_delay_latency: self.state.publish_delay.cumulative_histogram(),
            end_to_end_latency: self.state.end_to_end.cumulative_histogram(),
        }
    }

    /// Read the sent/received totals.
    pub fn counters_stats(&self) -> CountersStats {
        CountersStats {
            messages_sent: self.state.counters.total_messages_sent.sum(),
            messages_received: self.state.counters.total_messages_received.sum(),
        }
    }

    /// Clear all recorders and session counters. The `total_*` counters are
    /// left untouched; only [`stop_all`](Self::stop_all) resets those.
    pub fn reset_stats(&self) {
        self.state.reset_recorders();
        self.state.counters.reset_session();
    }

    /// Stop the test: raise the completion flag, clear the pause gate,
    /// reset every statistic (totals included), let in-flight sends drain
    /// briefly, then close producers, consumers, and the driver, in that
    /// order. Calling it again is a no-op.
    pub async fn stop_all(&self) {
        self.state.test_completed.store(true, Ordering::Release);
        self.state.consumers_paused.store(false, Ordering::Release);

        self.state.reset_recorders();
        self.state.counters.reset_all();

        tokio::time::sleep(SHUTDOWN_DRAIN).await;

        let producers: Vec<Arc<dyn Producer>> =
            self.producers.lock().unwrap().drain(..).collect();
        for producer in producers {
            if let Err(e) = producer.close().await {
                tracing::warn!(error = %e, "error closing producer");
            }
        }

        let consumers: Vec<Arc<dyn Consumer>> =
            self.consumers.lock().unwrap().drain(..).collect();
        for consumer in consumers {
            if let Err(e) = consumer.close().await {
                tracing::warn!(error = %e, "error closing consumer");
            }
        }

        let driver = self.driver.lock().unwrap().take();
        if let Some(driver) = driver {
            if let Err(e) = driver.close().await {
                tracing::warn!(error = %e, "error closing driver");
            }
        }

        tracing::info!("worker stopped");
    }

    /// Release the worker. Any load tasks still running observe the
    /// completion flag and exit within one loop iteration.
    pub fn close(&self) {
        self.state.test_completed.store(true, Ordering::Release);
    }
}

/// Eight random alphanumeric characters for generated topic names.
fn random_suffix() -> String {
    rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(8)
        .map(char::from)
        .collect()
}

/// The callback handed to every consumer the worker creates.
struct WorkerCallback {
    state: Arc<WorkerState>,
}

impl WorkerCallback {
    fn record_received(&self, size: u64, publish_timestamp_ms: i64) {
        let counters = &self.state.counters;
        counters.messages_received.inc();
        counters.total_messages_received.inc();
        self.state.messages_received_sink.inc();
        counters.bytes_received.add(size);
        self.state.bytes_received_sink.add(size);

        // Publish timestamps are wall-clock milliseconds stamped on the
        // producing host; skew between machines is accepted, and samples it
        // drives negative are dropped rather than recorded.
        let e2e_micros = (clock::wall_nanos() - publish_timestamp_ms * 1_000_000) / 1_000;
        if e2e_micros > 0 {
            self.state.end_to_end.record_micros(e2e_micros as u64);
        }

        self.pause_gate();
    }

    /// Hold the delivery thread while consumers are paused, applying
    /// back-pressure to the driver's pipeline.
    fn pause_gate(&self) {
        while self.state.consumers_paused.load(Ordering::Acquire) {
            std::thread::sleep(PAUSE_POLL);
        }
    }
}

impl ConsumerCallback for WorkerCallback {
    fn message_received_view(&self, payload: &[u8], publish_timestamp_ms: i64) {
        self.record_received(payload.len() as u64, publish_timestamp_ms);
    }

    fn message_received_with_latency(&self, payload_size: u64, e2e_latency_ns: i64) {
        if e2e_latency_ns <= 0 {
            // The driver measured an impossible latency; count the poll
            // error and drop the message entirely.
            self.state.counters.poll_errors.inc();
            return;
        }

        let counters = &self.state.counters;
        counters.messages_received.inc();
        counters.total_messages_received.inc();
        self.state.messages_received_sink.inc();
        counters.bytes_received.add(payload_size);
        self.state.bytes_received_sink.add(payload_size);

        self.state
            .end_to_end
            .record_micros(e2e_latency_ns as u64 / 1_000);

        self.pause_gate();
    }

    fn error(&self) {
        self.state.counters.poll_errors.inc();
    }
}
