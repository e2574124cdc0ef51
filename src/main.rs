//! msg-bench - messaging-system benchmark worker

use std::time::{Duration, Instant};

use anyhow::Result;
use bytes::Bytes;
use clap::Parser;
use rand::Rng;

use msg_bench_core::worker::KeyDistributorType;
use msg_bench_core::{
    ConsumerAssignment, DriverConfig, DriverRegistry, LocalWorker, ProducerWorkAssignment,
    TopicSubscription, TopicsInfo,
};

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.into()),
        )
        .init();

    run(cli).await
}

async fn run(cli: cli::Cli) -> Result<()> {
    let mut registry = DriverRegistry::new();
    msg_bench_drivers::register_builtin(&mut registry);

    let worker = LocalWorker::new(registry);
    let config = DriverConfig::from_yaml_file(&cli.driver)?;
    worker.initialize_driver(config).await?;

    let topics = worker
        .create_or_validate_topics(TopicsInfo::Create {
            number_of_topics: cli.topics,
            partitions_per_topic: cli.partitions,
        })
        .await?;
    worker.create_producers(&topics).await?;

    let consumer_assignment = ConsumerAssignment {
        topics_subscriptions: topics
            .iter()
            .flat_map(|topic| {
                (0..cli.subscriptions).map(move |i| TopicSubscription {
                    topic: topic.clone(),
                    subscription: format!("sub-{:03}", i),
                })
            })
            .collect(),
    };
    worker.create_consumers(consumer_assignment).await?;

    worker.probe_producers().await?;

    let key_distributor_type: KeyDistributorType =
        serde_yaml::from_str(&cli.key_distributor).unwrap_or_default();
    let mut payload = vec![0u8; cli.payload_size];
    rand::rng().fill(payload.as_mut_slice());
    worker
        .start_load(ProducerWorkAssignment {
            publish_rate: cli.rate,
            key_distributor_type,
            payload_data: vec![Bytes::from(payload)],
        })
        .await?;

    let started = Instant::now();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(cli.duration);
    let mut ticker = tokio::time::interval(Duration::from_secs(cli.stats_interval.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                report_period(&worker, cli.stats_interval.max(1));
            }
            _ = tokio::time::sleep_until(deadline) => {
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, stopping");
                break;
            }
        }
    }

    report_cumulative(&worker, started.elapsed());
    worker.stop_all().await;
    Ok(())
}

fn report_period(worker: &LocalWorker, interval_secs: u64) {
    let stats = worker.period_stats();
    let secs = interval_secs as f64;
    tracing::info!(
        publish_rate = stats.messages_sent as f64 / secs,
        consume_rate = stats.messages_received as f64 / secs,
        errors = stats.errors,
        poll_errors = stats.poll_errors,
        publish_p50_us = stats.publish_latency.value_at_quantile(0.5),
        publish_p99_us = stats.publish_latency.value_at_quantile(0.99),
        delay_p99_us = stats.publish_delay_latency.value_at_quantile(0.99),
        e2e_p50_us = stats.end_to_end_latency.value_at_quantile(0.5),
        e2e_p99_us = stats.end_to_end_latency.value_at_quantile(0.99),
        "period stats"
    );
}

fn report_cumulative(worker: &LocalWorker, elapsed: Duration) {
    let totals = worker.counters_stats();
    let latencies = worker.cumulative_latencies();
    tracing::info!(
        elapsed_secs = elapsed.as_secs_f64(),
        total_sent = totals.messages_sent,
        total_received = totals.messages_received,
        publish_p50_us = latencies.publish_latency.value_at_quantile(0.5),
        publish_p99_us = latencies.publish_latency.value_at_quantile(0.99),
        publish_max_us = latencies.publish_latency.max(),
        schedule_p99_us = latencies.schedule_latency.value_at_quantile(0.99),
        delay_p99_us = latencies.publish_delay_latency.value_at_quantile(0.99),
        e2e_p50_us = latencies.end_to_end_latency.value_at_quantile(0.5),
        e2e_p99_us = latencies.end_to_end_latency.value_at_quantile(0.99),
        "cumulative stats"
    );
}
