//! Coordinator-facing configuration and command types
//!
//! These are the structures a coordinator hands to the worker: the driver
//! configuration file, topic selection, and producer/consumer work
//! assignments. Field names serialize in camelCase to stay compatible with
//! existing workload tooling.

use std::collections::BTreeMap;
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::worker::KeyDistributorType;

/// Parsed driver configuration file.
///
/// Only `driverClass` is interpreted by the worker; every other key is
/// retained verbatim for the driver factory, so unknown keys are ignored
/// rather than rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Registry identifier of the driver implementation.
    #[serde(rename = "driverClass")]
    pub driver_class: String,

    /// Human-readable driver name, if the file carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// All remaining driver-specific settings.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl DriverConfig {
    /// Load a YAML driver configuration from `path`.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse a YAML driver configuration.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| Error::Config(format!("invalid driver configuration: {e}")))
    }
}

/// Which topics a test run should use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TopicsInfo {
    /// Reuse topics that already exist on the broker; each one is validated
    /// before use.
    #[serde(rename = "existingTopics")]
    Existing(Vec<String>),

    /// Create fresh, randomly named topics.
    #[serde(rename = "createTopics", rename_all = "camelCase")]
    Create {
        /// How many topics to create.
        number_of_topics: usize,
        /// Partition count for each created topic.
        partitions_per_topic: u32,
    },
}

/// One `(topic, subscription)` pair a consumer should be created for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSubscription {
    /// Topic to consume from.
    pub topic: String,
    /// Subscription (consumer group) name.
    pub subscription: String,
}

/// The full set of consumers a worker should run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerAssignment {
    /// One consumer is created per entry, in order.
    pub topics_subscriptions: Vec<TopicSubscription>,
}

/// Producer-side work assignment for a load phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerWorkAssignment {
    /// Aggregate publish rate across all producers, in messages per second.
    pub publish_rate: f64,

    /// Key distribution applied to outgoing messages.
    #[serde(default)]
    pub key_distributor_type: KeyDistributorType,

    /// Candidate payloads; each send picks one uniformly at random. Must
    /// contain at least one entry.
    pub payload_data: Vec<Bytes>,
}
