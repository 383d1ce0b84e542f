//! Module registration and dependency-resolution engine.
//!
//! Callers register named modules with declared dependencies and request
//! modules by id. Requested modules are fetched through a pluggable
//! [`Fetcher`], their factories run exactly once after their dependencies
//! resolve, and the memoized values are handed back in request order.
//!
//! # Architecture
//!
//! - **Registry**: one [`Loader`] record per module id, created on first
//!   reference and never removed
//! - **Resolver**: fetches every requested id, then executes each
//! - **Executor**: runs a factory once, shares the in-flight run between
//!   concurrent requesters, and rejects dependency cycles
//! - **Facade**: `config`, `define`, `require` and `import` on [`Loader`],
//!   plus the process-wide instance behind [`global`]
//!
//! ```no_run
//! # async fn demo() -> rq_loader::Result<()> {
//! use serde_json::json;
//!
//! let loader = rq_loader::global();
//! loader.define("mod", |_| Ok(json!({ "a": 4, "b": 6 })))?;
//! loader.define_with("habi", ["mod"], |deps| Ok(json!({ "sim": 55, "mod": deps[0] })))?;
//! loader
//!     .require(&["mod", "habi"], |values| println!("{values:?}"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod execute;
pub mod fetch;
pub mod fs;
pub mod loader;
pub mod record;
mod registry;
pub mod resolve;
pub mod tree;

#[cfg(test)]
mod test_support;

// Re-exports for convenience.
pub use config::LoaderConfig;
pub use error::{ConfigError, FetchError, LoaderError, Result};
pub use fetch::{FetchRequest, Fetcher, NullFetcher};
pub use fs::FsFetcher;
pub use loader::{global, install_global, GlobalValue, Loader};
pub use record::{Factory, FactoryError, FactoryFuture, ModuleStatus, ModuleValue};
pub use resolve::ResolvedModule;
pub use tree::format_tree;
