//! Per-message key generation strategies

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of distinct keys the round-robin distributor cycles through.
const ROUND_ROBIN_KEY_COUNT: usize = 10_000;

/// Key distribution strategy names as they appear in work assignments.
///
/// Unrecognized names deserialize to [`NoKey`](Self::NoKey) so newer
/// workload files keep working against older workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyDistributorType {
    /// Cycle through a fixed decimal key sequence.
    KeyRoundRobin,
    /// A fresh random key for every message.
    RandomNano,
    /// Messages carry no key.
    #[default]
    #[serde(other)]
    NoKey,
}

/// Produces the optional key attached to each outgoing message.
pub trait KeyDistributor: Send + Sync {
    /// Next key, or `None` for keyless messages.
    fn next(&self) -> Option<String>;
}

/// Build the distributor for `kind`.
pub fn build(kind: KeyDistributorType) -> Box<dyn KeyDistributor> {
    match kind {
        KeyDistributorType::NoKey => Box::new(NoKeyDistributor),
        KeyDistributorType::KeyRoundRobin => {
            Box::new(RoundRobinKeyDistributor::new(ROUND_ROBIN_KEY_COUNT))
        }
        KeyDistributorType::RandomNano => Box::new(RandomNanoKeyDistributor),
    }
}

struct NoKeyDistributor;

impl KeyDistributor for NoKeyDistributor {
    fn next(&self) -> Option<String> {
        None
    }
}

struct RoundRobinKeyDistributor {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl RoundRobinKeyDistributor {
    fn new(count: usize) -> Self {
        Self {
            keys: (0..count).map(|i| i.to_string()).collect(),
            cursor: AtomicUsize::new(0),
        }
    }
}

impl KeyDistributor for RoundRobinKeyDistributor {
    fn next(&self) -> Option<String> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        Some(self.keys[i].clone())
    }
}

struct RandomNanoKeyDistributor;

impl KeyDistributor for RandomNanoKeyDistributor {
    fn next(&self) -> Option<String> {
        Some(rand::rng().random::<u64>().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_key_yields_nothing() {
        let dist = build(KeyDistributorType::NoKey);
        assert_eq!(dist.next(), None);
        assert_eq!(dist.next(), None);
    }

    #[test]
    fn round_robin_cycles_in_decimal() {
        let dist = RoundRobinKeyDistributor::new(3);
        assert_eq!(dist.next().as_deref(), Some("0"));
        assert_eq!(dist.next().as_deref(), Some("1"));
        assert_eq!(dist.next().as_deref(), Some("2"));
        assert_eq!(dist.next().as_deref(), Some("0"));
    }

    #[test]
    fn built_round_robin_starts_at_zero() {
        let dist = build(KeyDistributorType::KeyRoundRobin);
        assert_eq!(dist.next().as_deref(), Some("0"));
        assert_eq!(dist.next().as_deref(), Some("1"));
    }

    #[test]
    fn random_nano_produces_parsable_keys() {
        let dist = build(KeyDistributorType::RandomNano);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..100 {
            let key = dist.next().expect("random keys are always present");
            key.parse::<u64>().expect("decimal rendering");
            seen.insert(key);
        }
        // Collisions in 100 draws from a 64-bit space would be astonishing.
        assert!(seen.len() > 90);
    }
}
