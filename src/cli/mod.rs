//! CLI argument parsing

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "msg-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the driver configuration YAML
    #[arg(short, long)]
    pub driver: PathBuf,

    /// Aggregate publish rate in messages per second
    #[arg(short, long, default_value_t = 1000.0)]
    pub rate: f64,

    /// Number of topics to create
    #[arg(long, default_value_t = 1)]
    pub topics: usize,

    /// Partitions per topic
    #[arg(long, default_value_t = 1)]
    pub partitions: u32,

    /// Consumer subscriptions per topic
    #[arg(long, default_value_t = 1)]
    pub subscriptions: usize,

    /// Payload size in bytes
    #[arg(long, default_value_t = 1024)]
    pub payload_size: usize,

    /// Key distribution (NO_KEY, KEY_ROUND_ROBIN, RANDOM_NANO)
    #[arg(long, default_value = "NO_KEY")]
    pub key_distributor: String,

    /// Test duration in seconds
    #[arg(long, default_value_t = 60)]
    pub duration: u64,

    /// Seconds between period stats snapshots
    #[arg(long, default_value_t = 10)]
    pub stats_interval: u64,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}
