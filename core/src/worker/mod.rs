//! The benchmark worker
//!
//! The worker's job is a deceptively simple loop run very fast: **pace ->
//! send -> record -> repeat**. For every message a load task
//!
//! 1. Acquires an intended-send timestamp from the shared rate limiter
//! 2. Sleeps (precisely) until that timestamp
//! 3. Dispatches `send_async` and records the dispatch cost
//! 4. Spawns the completion, which records publish latency and publish
//!    delay and bumps the counters on whatever thread it finishes on
//!
//! Consumers feed the same statistics through the callback the worker hands
//! to the driver. A coordinator polls the period/cumulative snapshots and
//! steers the lifecycle.

mod executor;
pub mod key_distributor;
mod local;
pub mod rate_limiter;

pub use key_distributor::{KeyDistributor, KeyDistributorType};
pub use local::LocalWorker;
pub use rate_limiter::{sleep_until, UniformRateLimiter};
