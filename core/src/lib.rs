//! Load-generation and measurement core for messaging-system benchmarks
//!
//! This crate drives a pluggable broker driver at a configurable aggregate
//! publish rate and measures what actually happened, at microsecond
//! resolution:
//!
//! - A coordinated-omission-resistant uniform rate limiter that hands out
//!   *intended* send times instead of blocking
//! - A producer load engine that fans send loops out across cores without
//!   sharing locks on the hot path
//! - High-dynamic-range interval/cumulative latency recorders for publish,
//!   schedule, publish-delay, and end-to-end latency
//! - A worker lifecycle (initialize driver, create topics, producers,
//!   consumers, start load, adjust, pause, stop) exposed to an external
//!   coordinator together with snapshot statistics endpoints
//!
//! Broker specifics stay behind the [`driver`] traits; built-in
//! implementations live in the `msg-bench-drivers` crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod config;
pub mod driver;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod stats;
pub mod worker;

pub use config::{
    ConsumerAssignment, DriverConfig, ProducerWorkAssignment, TopicSubscription, TopicsInfo,
};
pub use error::{Error, Result};
pub use registry::DriverRegistry;
pub use worker::LocalWorker;

/// Commonly used imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::registry::DriverRegistry;
    pub use crate::worker::LocalWorker;
}
