//! Driver registry
//!
//! Driver implementations register a factory closure under a string
//! identifier at program start; [`LocalWorker`](crate::worker::LocalWorker)
//! looks up the `driverClass` named by the configuration. This replaces the
//! runtime class loading a JVM-style deployment would use.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::config::DriverConfig;
use crate::driver::{Driver, DriverError};
use crate::metrics::MetricsSink;

/// Factory closure producing an initialized driver from its configuration
/// and the worker's metrics sink.
pub type DriverFactory = Arc<
    dyn Fn(DriverConfig, Arc<dyn MetricsSink>) -> BoxFuture<'static, Result<Arc<dyn Driver>, DriverError>>
        + Send
        + Sync,
>;

/// Registry of named driver factories.
#[derive(Default, Clone)]
pub struct DriverRegistry {
    factories: HashMap<String, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`. Registering the same name again
    /// replaces the previous factory.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(DriverConfig, Arc<dyn MetricsSink>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn Driver>, DriverError>> + Send + 'static,
    {
        self.factories.insert(
            name.into(),
            Arc::new(move |config, sink| Box::pin(factory(config, sink))),
        );
    }

    /// Look up the factory registered under `name`.
    pub fn get(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).cloned()
    }

    /// Names of all registered drivers, for diagnostics.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
