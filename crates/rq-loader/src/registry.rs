//! The id → record map, record creation and registration.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::FutureExt;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{LoaderError, Result};
use crate::fetch::FetchRequest;
use crate::loader::{loader_dropped, Loader};
use crate::record::{Definition, Factory, FetchState, LoaderRecord, ModuleStatus, ModuleValue};

/// Process-lifetime storage of loader records.
///
/// The lock is never held across an await and the fetcher is never invoked
/// while it is held, so fetchers may call back into `define`.
pub(crate) struct Registry<V: ModuleValue> {
    records: Mutex<HashMap<String, LoaderRecord<V>>>,
}

impl<V: ModuleValue> Registry<V> {
    pub fn new() -> Self {
        Registry {
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, HashMap<String, LoaderRecord<V>>> {
        self.records.lock()
    }
}

impl<V: ModuleValue> Loader<V> {
    /// Return the fetch state for `id`, creating a pending record on first
    /// reference.
    pub(crate) fn get(&self, id: &str) -> FetchState {
        let mut records = self.inner.registry.lock();
        if let Some(record) = records.get(id) {
            return record.fetch.clone();
        }

        let locator = self.locate(id);
        debug!(module = id, %locator, "creating pending module record");
        let fetch = self.fetch_future(id.to_string(), locator.clone());
        records.insert(id.to_string(), LoaderRecord::pending(locator, fetch.clone()));
        fetch
    }

    /// The fetch runs lazily, on first poll, outside the registry lock.
    fn fetch_future(&self, id: String, locator: String) -> FetchState {
        let weak = self.downgrade();
        async move {
            let Some(loader) = weak.upgrade() else {
                return Err(loader_dropped(&id, &locator));
            };
            let fetcher = Arc::clone(&loader.inner.fetcher);
            let request = FetchRequest {
                id: id.clone(),
                locator: locator.clone(),
            };

            debug!(module = %id, %locator, "fetching module");
            match fetcher.fetch(request, loader).await {
                Ok(()) => Ok(id),
                Err(e) => {
                    warn!(module = %id, %locator, error = %e, "module fetch failed");
                    Err(LoaderError::LoadFailed {
                        id,
                        locator,
                        reason: e.to_string(),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Bind a definition to `id`.
    pub(crate) fn register(
        &self,
        id: &str,
        dependencies: Vec<String>,
        factory: Factory<V>,
    ) -> Result<()> {
        if id.is_empty() {
            return Err(LoaderError::InvalidCall {
                detail: "module id must not be empty".to_string(),
            });
        }
        if dependencies.iter().any(String::is_empty) {
            return Err(LoaderError::InvalidCall {
                detail: format!("module '{id}' declares an empty dependency id"),
            });
        }

        let definition = Definition {
            dependencies,
            factory,
        };

        let mut records = self.inner.registry.lock();
        match records.get_mut(id) {
            Some(record) if record.definition.is_some() => {
                Err(LoaderError::DuplicateRegistration { id: id.to_string() })
            }
            Some(record) => {
                debug!(module = id, "attaching definition to requested module");
                record.definition = Some(definition);
                Ok(())
            }
            None => {
                let locator = self.locate(id);
                debug!(module = id, "defining local module");
                records.insert(id.to_string(), LoaderRecord::local(id, locator, definition));
                Ok(())
            }
        }
    }

    /// Whether a record exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.registry.lock().contains_key(id)
    }

    /// All known module ids, sorted.
    pub fn module_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.registry.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The lifecycle stage of `id`, if it has a record.
    pub fn status(&self, id: &str) -> Option<ModuleStatus> {
        self.inner.registry.lock().get(id).map(LoaderRecord::status)
    }

    /// The locator `id`'s record was created with.
    pub fn locator(&self, id: &str) -> Option<String> {
        self.inner
            .registry
            .lock()
            .get(id)
            .map(|record| record.locator.clone())
    }

    /// The declared dependencies of `id`, once it is defined.
    pub fn dependencies(&self, id: &str) -> Option<Vec<String>> {
        self.inner
            .registry
            .lock()
            .get(id)
            .and_then(|record| record.definition.as_ref())
            .map(|definition| definition.dependencies.clone())
    }
}
