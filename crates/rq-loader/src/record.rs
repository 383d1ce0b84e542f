//! Loader records: the per-module unit of memoization.
//!
//! A record is created the first time its id is referenced, either by a
//! registration or by a request, and is mutated in place as its fetch
//! settles and its definition and value become available. Records are never
//! removed.

use std::fmt;
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt, Shared};

use crate::error::LoaderError;

/// Values a module may export.
pub trait ModuleValue: Clone + Send + Sync + 'static {}

impl<T: Clone + Send + Sync + 'static> ModuleValue for T {}

/// Error type returned by module factories.
pub type FactoryError = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by a module factory.
pub type FactoryFuture<V> = BoxFuture<'static, Result<V, FactoryError>>;

/// A module factory: dependency values in declaration order to module value.
pub type Factory<V> = Arc<dyn Fn(Vec<V>) -> FactoryFuture<V> + Send + Sync>;

/// Completes with the module id once the module's code is available.
pub(crate) type FetchState = Shared<BoxFuture<'static, Result<String, LoaderError>>>;

/// In-flight factory run shared by every concurrent executor.
pub(crate) type Execution<V> = Shared<BoxFuture<'static, Result<V, LoaderError>>>;

/// A registered module definition.
pub(crate) struct Definition<V> {
    /// Declared dependencies, in the order their values reach the factory.
    pub dependencies: Vec<String>,
    pub factory: Factory<V>,
}

impl<V> Clone for Definition<V> {
    fn clone(&self) -> Self {
        Definition {
            dependencies: self.dependencies.clone(),
            factory: Arc::clone(&self.factory),
        }
    }
}

pub(crate) struct LoaderRecord<V: ModuleValue> {
    pub locator: String,
    pub fetch: FetchState,
    pub definition: Option<Definition<V>>,
    pub execution: Option<Execution<V>>,
    pub value: Option<V>,
}

impl<V: ModuleValue> LoaderRecord<V> {
    /// A record waiting on an external fetch.
    pub fn pending(locator: String, fetch: FetchState) -> Self {
        LoaderRecord {
            locator,
            fetch,
            definition: None,
            execution: None,
            value: None,
        }
    }

    /// A locally defined record; its fetch is already satisfied.
    pub fn local(id: &str, locator: String, definition: Definition<V>) -> Self {
        let fetch = future::ready(Ok(id.to_string())).boxed().shared();
        LoaderRecord {
            locator,
            fetch,
            definition: Some(definition),
            execution: None,
            value: None,
        }
    }

    pub fn status(&self) -> ModuleStatus {
        if self.value.is_some() {
            return ModuleStatus::Ready;
        }
        if let Some(execution) = &self.execution {
            return match execution.peek() {
                Some(Err(_)) => ModuleStatus::Failed,
                _ => ModuleStatus::Executing,
            };
        }
        match self.fetch.peek() {
            Some(Err(_)) => ModuleStatus::Failed,
            _ if self.definition.is_some() => ModuleStatus::Defined,
            Some(Ok(_)) => ModuleStatus::Fetched,
            None => ModuleStatus::Fetching,
        }
    }
}

/// Lifecycle stage of a module record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleStatus {
    /// Requested; the fetch has not settled.
    Fetching,
    /// Fetched, but nothing registered a definition.
    Fetched,
    /// A definition is bound; the factory has not run.
    Defined,
    /// The factory is running.
    Executing,
    /// The value is memoized.
    Ready,
    /// The fetch or the factory failed.
    Failed,
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModuleStatus::Fetching => "fetching",
            ModuleStatus::Fetched => "fetched",
            ModuleStatus::Defined => "defined",
            ModuleStatus::Executing => "executing",
            ModuleStatus::Ready => "ready",
            ModuleStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}
