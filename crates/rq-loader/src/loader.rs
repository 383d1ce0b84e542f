//! The public facade: `config`, `define`, `require` and `import`.
//!
//! A [`Loader`] is a cheap, clonable handle to one registry. Most programs
//! use a single process-wide instance obtained through [`global`]; tests and
//! embedders construct their own with [`Loader::new`].

use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock, Weak};

use futures::future::{self, FutureExt};
use parking_lot::RwLock;
use tracing::debug;

use crate::config::LoaderConfig;
use crate::error::{LoaderError, Result};
use crate::fetch::Fetcher;
use crate::fs::FsFetcher;
use crate::record::{Factory, FactoryError, ModuleValue};
use crate::registry::Registry;

/// Handle to a module registry and its configuration.
pub struct Loader<V: ModuleValue> {
    pub(crate) inner: Arc<LoaderInner<V>>,
}

pub(crate) struct LoaderInner<V: ModuleValue> {
    pub registry: Registry<V>,
    pub config: RwLock<LoaderConfig>,
    pub fetcher: Arc<dyn Fetcher<V>>,
}

/// A handle that does not keep the registry alive.
///
/// Futures stored inside the registry hold this instead of a [`Loader`].
pub(crate) struct WeakLoader<V: ModuleValue> {
    inner: Weak<LoaderInner<V>>,
}

impl<V: ModuleValue> WeakLoader<V> {
    pub fn upgrade(&self) -> Option<Loader<V>> {
        self.inner.upgrade().map(|inner| Loader { inner })
    }
}

impl<V: ModuleValue> Clone for Loader<V> {
    fn clone(&self) -> Self {
        Loader {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: ModuleValue> fmt::Debug for Loader<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.current_config();
        f.debug_struct("Loader")
            .field("config", &config)
            .field("modules", &self.module_ids())
            .finish()
    }
}

impl<V: ModuleValue> Loader<V> {
    /// Create a loader with its own empty registry.
    pub fn new(config: LoaderConfig, fetcher: impl Fetcher<V> + 'static) -> Self {
        Loader {
            inner: Arc::new(LoaderInner {
                registry: Registry::new(),
                config: RwLock::new(config),
                fetcher: Arc::new(fetcher),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakLoader<V> {
        WeakLoader {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether two handles share one registry.
    pub fn ptr_eq(&self, other: &Loader<V>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Replace the configuration. Last write wins.
    ///
    /// Records created earlier keep the locator they were created with.
    pub fn config(&self, config: LoaderConfig) {
        debug!(base_url = %config.base_url, paths = config.paths.len(), "loader configured");
        *self.inner.config.write() = config;
    }

    /// A copy of the current configuration.
    pub fn current_config(&self) -> LoaderConfig {
        self.inner.config.read().clone()
    }

    /// Compute the locator `id` would be fetched from.
    pub fn locate(&self, id: &str) -> String {
        self.inner.config.read().locate(id)
    }

    /// Define a module without dependencies.
    pub fn define<F>(&self, id: &str, factory: F) -> Result<()>
    where
        F: Fn(Vec<V>) -> std::result::Result<V, FactoryError> + Send + Sync + 'static,
    {
        self.define_with(id, Vec::<String>::new(), factory)
    }

    /// Define a module whose factory receives its dependencies' values.
    pub fn define_with<I, S, F>(&self, id: &str, dependencies: I, factory: F) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Vec<V>) -> std::result::Result<V, FactoryError> + Send + Sync + 'static,
    {
        let factory: Factory<V> = Arc::new(move |values| future::ready(factory(values)).boxed());
        self.register(id, dependencies.into_iter().map(Into::into).collect(), factory)
    }

    /// Define a module with an asynchronous factory.
    pub fn define_async<I, S, F, Fut>(&self, id: &str, dependencies: I, factory: F) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(Vec<V>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<V, FactoryError>> + Send + 'static,
    {
        let factory: Factory<V> = Arc::new(move |values| factory(values).boxed());
        self.register(id, dependencies.into_iter().map(Into::into).collect(), factory)
    }

    /// Resolve `ids` and hand their values, in order, to `callback`.
    ///
    /// The callback's result is discarded. Resolution errors are returned.
    pub async fn require<S, F>(&self, ids: &[S], callback: F) -> Result<()>
    where
        S: AsRef<str>,
        F: FnOnce(Vec<V>),
    {
        let resolved = self.resolve_all(ids).await?;
        callback(resolved.into_iter().map(|module| module.value).collect());
        Ok(())
    }

    /// Resolve a single module and return its value.
    pub async fn import(&self, id: &str) -> Result<V> {
        self.get(id).await?;
        self.execute(id).await
    }
}

/// The error futures report when their loader was dropped mid-flight.
pub(crate) fn loader_dropped(id: &str, locator: &str) -> LoaderError {
    LoaderError::LoadFailed {
        id: id.to_string(),
        locator: locator.to_string(),
        reason: "loader was dropped".to_string(),
    }
}

/// Values of the process-wide loader.
pub type GlobalValue = serde_json::Value;

static GLOBAL: OnceLock<Loader<GlobalValue>> = OnceLock::new();

/// The process-wide loader.
///
/// Constructed on first use with the default configuration and an
/// [`FsFetcher`] unless [`install_global`] ran first.
pub fn global() -> &'static Loader<GlobalValue> {
    GLOBAL.get_or_init(|| Loader::new(LoaderConfig::default(), FsFetcher::new()))
}

/// Install `loader` as the process-wide loader.
///
/// If one already exists it is kept, so modules registered through it stay
/// visible, and `loader` is dropped.
pub fn install_global(loader: Loader<GlobalValue>) -> &'static Loader<GlobalValue> {
    let mut installed = false;
    let global = GLOBAL.get_or_init(|| {
        installed = true;
        loader
    });
    if !installed {
        debug!("global loader already initialized; reusing it");
    }
    global
}
