//! Fetcher trait and the built-in fetchers.
//!
//! A `Fetcher` turns a locator into a loaded artifact. Loading is expected to
//! register the module through the [`Loader`] handle it receives, the way a
//! script calls `define` when it runs. The fetch must not complete before the
//! artifact is fully loaded, and must release any transient resources it
//! created on both success and failure.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::loader::Loader;
use crate::record::ModuleValue;

/// What to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// The requested module id.
    pub id: String,
    /// The locator computed from the configuration.
    pub locator: String,
}

/// Abstract fetch backend.
#[async_trait]
pub trait Fetcher<V: ModuleValue>: Send + Sync {
    /// Load the artifact for `request.id`.
    async fn fetch(&self, request: FetchRequest, loader: Loader<V>) -> Result<(), FetchError>;
}

#[async_trait]
impl<V: ModuleValue, T: Fetcher<V> + ?Sized> Fetcher<V> for Arc<T> {
    async fn fetch(&self, request: FetchRequest, loader: Loader<V>) -> Result<(), FetchError> {
        (**self).fetch(request, loader).await
    }
}

/// A fetcher for loaders that only hold locally defined modules.
///
/// Every fetch fails with [`FetchError::NotFound`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NullFetcher;

#[async_trait]
impl<V: ModuleValue> Fetcher<V> for NullFetcher {
    async fn fetch(&self, request: FetchRequest, _loader: Loader<V>) -> Result<(), FetchError> {
        Err(FetchError::NotFound {
            locator: request.locator,
        })
    }
}
