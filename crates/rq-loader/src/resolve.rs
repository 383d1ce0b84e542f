//! Batch resolution of requested modules.
//!
//! Every requested id gets a record (pending ones start fetching), every
//! fetch is awaited, then every module is executed. The result preserves the
//! request order, not completion order.

use futures::future::{join_all, BoxFuture, FutureExt};

use crate::error::Result;
use crate::loader::Loader;
use crate::record::{FetchState, ModuleValue};

/// A module resolved to its value.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModule<V> {
    /// Module id.
    pub id: String,
    /// Locator the module's record was created with.
    pub locator: String,
    /// The memoized module value.
    pub value: V,
}

impl<V: ModuleValue> Loader<V> {
    /// Resolve `ids` to their values, in order.
    ///
    /// Fails as a whole when any module fails; the first failing id in
    /// request order determines the error. Fetches and executions already
    /// started run to completion regardless, and their records stay usable.
    pub fn resolve_all<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> BoxFuture<'static, Result<Vec<ResolvedModule<V>>>> {
        let ids: Vec<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();
        let fetches: Vec<FetchState> = ids.iter().map(|id| self.get(id)).collect();
        resolve_fetched(self.clone(), ids, fetches).boxed()
    }
}

async fn resolve_fetched<V: ModuleValue>(
    loader: Loader<V>,
    ids: Vec<String>,
    fetches: Vec<FetchState>,
) -> Result<Vec<ResolvedModule<V>>> {
    for fetched in join_all(fetches).await {
        fetched?;
    }

    let executions = ids.iter().map(|id| loader.execute(id));
    let values = join_all(executions).await;

    let mut resolved = Vec::with_capacity(ids.len());
    for (id, value) in ids.into_iter().zip(values) {
        let value = value?;
        let locator = loader.locator(&id).unwrap_or_default();
        resolved.push(ResolvedModule { id, locator, value });
    }
    Ok(resolved)
}
