//! Built-in driver implementations for msg-bench
//!
//! This crate provides drivers that need no external broker:
//!
//! - [`NoopDriver`] — acknowledges every send immediately, delivers nothing
//! - [`LoopbackDriver`] — delivers published messages to in-process
//!   subscribers through a dedicated forwarding thread
//!
//! Call [`register_builtin`] at startup to make them resolvable by name.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod loopback;
mod noop;

pub use loopback::LoopbackDriver;
pub use noop::NoopDriver;

use std::sync::Arc;

use msg_bench_core::driver::Driver;
use msg_bench_core::registry::DriverRegistry;

/// Register the built-in drivers under the names `noop` and `loopback`.
pub fn register_builtin(registry: &mut DriverRegistry) {
    registry.register("noop", |_config, _sink| async {
        Ok(Arc::new(NoopDriver::new()) as Arc<dyn Driver>)
    });
    registry.register("loopback", |_config, _sink| async {
        Ok(Arc::new(LoopbackDriver::new()) as Arc<dyn Driver>)
    });
}
