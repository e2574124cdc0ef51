//! Producer load engine
//!
//! Fans producer-driving tasks out across cores and runs the paced hot send
//! loop. Each task owns one producer group and runs on the blocking pool so
//! its precise sleeps never stall the async runtime; send completions are
//! spawned back onto the runtime and recorded on whatever thread finishes
//! them.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use rand::Rng;
use tokio::runtime::Handle;

use crate::clock;
use crate::config::ProducerWorkAssignment;
use crate::driver::Producer;

use super::key_distributor::{self, KeyDistributor};
use super::local::WorkerState;
use super::rate_limiter;

/// Partition `producers` round-robin into at most `max_groups` groups.
///
/// A slow producer only delays the other members of its own group; the rate
/// limiter is shared, so groups cannot starve each other of send slots.
pub(crate) fn partition_producers(
    producers: Vec<Arc<dyn Producer>>,
    max_groups: usize,
) -> Vec<Vec<Arc<dyn Producer>>> {
    if producers.is_empty() {
        return Vec::new();
    }
    let group_count = producers.len().min(max_groups.max(1));
    let mut groups: Vec<Vec<Arc<dyn Producer>>> = vec![Vec::new(); group_count];
    for (i, producer) in producers.into_iter().enumerate() {
        groups[i % group_count].push(producer);
    }
    groups
}

/// Spawn one load task per producer group.
///
/// Must be called from within the runtime; the returned tasks run until the
/// worker's completion flag is raised.
pub(crate) fn spawn_load(
    state: Arc<WorkerState>,
    producers: Vec<Arc<dyn Producer>>,
    assignment: &ProducerWorkAssignment,
) {
    let handle = Handle::current();
    let payloads: Arc<[Bytes]> = assignment.payload_data.clone().into();
    let groups = partition_producers(producers, num_cpus::get());
    let group_count = groups.len();

    for (group_id, group) in groups.into_iter().enumerate() {
        let state = Arc::clone(&state);
        let payloads = Arc::clone(&payloads);
        let keys = key_distributor::build(assignment.key_distributor_type);
        let handle = handle.clone();

        tokio::task::spawn_blocking(move || {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
                producer_loop(&handle, &state, &group, keys.as_ref(), &payloads);
            }));
            if let Err(panic) = outcome {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(group_id, reason = %reason, "producer task failed");
            }
        });
    }

    tracing::debug!(groups = group_count, "producer load tasks submitted");
}

/// The hot send loop for one producer group.
fn producer_loop(
    handle: &Handle,
    state: &Arc<WorkerState>,
    producers: &[Arc<dyn Producer>],
    keys: &dyn KeyDistributor,
    payloads: &[Bytes],
) {
    let mut rng = rand::rng();

    while !state.is_completed() {
        for producer in producers {
            let payload = payloads[rng.random_range(0..payloads.len())].clone();
            let payload_len = payload.len() as u64;

            let intended_ns = state.rate_limiter.load().acquire();
            if !rate_limiter::sleep_until(intended_ns, &state.test_completed) {
                return;
            }

            let send_ns = clock::now_nanos();
            let completion = producer.send_async(keys.next(), payload);
            let schedule_micros = (clock::now_nanos() - send_ns) / 1_000;
            state.schedule.record_micros(schedule_micros);

            let state = Arc::clone(state);
            handle.spawn(async move {
                match completion.await {
                    Ok(()) => {
                        let counters = &state.counters;
                        counters.messages_sent.inc();
                        counters.total_messages_sent.inc();
                        state.messages_sent_sink.inc();
                        counters.bytes_sent.add(payload_len);
                        state.bytes_sent_sink.add(payload_len);

                        let publish_micros = (clock::now_nanos() - send_ns) / 1_000;
                        state.publish.record_micros(publish_micros);

                        let delay_micros = send_ns.saturating_sub(intended_ns) / 1_000;
                        state.publish_delay.record_micros(delay_micros);
                    }
                    Err(e) => {
                        state.counters.errors.inc();
                        state.counters.total_errors.inc();
                        tracing::warn!(error = %e, "write error on message");
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverError, SendFuture};
    use async_trait::async_trait;
    use futures::future;

    struct IdleProducer;

    #[async_trait]
    impl Producer for IdleProducer {
        fn send_async(&self, _key: Option<String>, _payload: Bytes) -> SendFuture {
            Box::pin(future::ready(Ok(())))
        }

        async fn close(&self) -> Result<(), DriverError> {
            Ok(())
        }
    }

    fn producers(n: usize) -> Vec<Arc<dyn Producer>> {
        (0..n).map(|_| Arc::new(IdleProducer) as Arc<dyn Producer>).collect()
    }

    #[test]
    fn partitioning_caps_group_count_at_producers() {
        let groups = partition_producers(producers(3), 8);
        assert_eq!(groups.len(), 3);
        assert!(groups.iter().all(|g| g.len() == 1));
    }

    #[test]
    fn partitioning_round_robins_across_groups() {
        let groups = partition_producers(producers(10), 4);
        assert_eq!(groups.len(), 4);
        let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2]);
    }

    #[test]
    fn partitioning_handles_no_producers() {
        assert!(partition_producers(producers(0), 4).is_empty());
    }

    #[test]
    fn partitioning_tolerates_zero_group_cap() {
        let groups = partition_producers(producers(2), 0);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }
}
