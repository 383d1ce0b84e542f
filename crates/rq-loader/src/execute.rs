//! Module execution: run each factory once and memoize its value.
//!
//! Concurrent executors of one module share a single in-flight future stored
//! on the record. Before that future is created the declared dependency graph
//! is checked for a path back to the module, so cycles fail instead of
//! waiting on themselves forever.

use std::collections::{HashMap, HashSet};

use futures::future::{self, BoxFuture, FutureExt};
use tracing::{debug, trace, warn};

use crate::error::{LoaderError, Result};
use crate::loader::{loader_dropped, Loader, WeakLoader};
use crate::record::{Definition, Execution, LoaderRecord, ModuleValue};

enum Step<V: ModuleValue> {
    Ready(V),
    Wait(Execution<V>),
}

impl<V: ModuleValue> Loader<V> {
    /// Execute a fetched module, returning its memoized value.
    pub(crate) fn execute(&self, id: &str) -> BoxFuture<'static, Result<V>> {
        match self.prepare(id) {
            Ok(Step::Ready(value)) => future::ready(Ok(value)).boxed(),
            Ok(Step::Wait(execution)) => execution.boxed(),
            Err(e) => future::ready(Err(e)).boxed(),
        }
    }

    fn prepare(&self, id: &str) -> Result<Step<V>> {
        let mut records = self.inner.registry.lock();
        let Some(record) = records.get(id) else {
            return Err(self.missing_definition(id, None));
        };
        if let Some(value) = &record.value {
            trace!(module = id, "memoized value");
            return Ok(Step::Ready(value.clone()));
        }
        if let Some(execution) = &record.execution {
            trace!(module = id, "joining in-flight execution");
            return Ok(Step::Wait(execution.clone()));
        }
        let Some(definition) = record.definition.clone() else {
            return Err(self.missing_definition(id, Some(record.locator.clone())));
        };
        if let Some(chain) = find_cycle(&records, id) {
            warn!(module = id, chain = %chain.join(" -> "), "circular dependency");
            return Err(LoaderError::CycleDetected { chain });
        }

        let locator = record.locator.clone();
        let execution = run(self.downgrade(), id.to_string(), locator, definition)
            .boxed()
            .shared();
        if let Some(record) = records.get_mut(id) {
            record.execution = Some(execution.clone());
        }
        Ok(Step::Wait(execution))
    }

    /// `locator` is the one the record was fetched from; ids without a
    /// record report the locator a fetch would use now.
    fn missing_definition(&self, id: &str, locator: Option<String>) -> LoaderError {
        let config = self.inner.config.read();
        LoaderError::MissingDefinition {
            id: id.to_string(),
            locator: locator.unwrap_or_else(|| config.locate(id)),
            base_url: config.base_url.clone(),
            path: config.path_for(id).to_string(),
        }
    }

    fn store_value(&self, id: &str, value: V) {
        if let Some(record) = self.inner.registry.lock().get_mut(id) {
            record.value = Some(value);
            record.execution = None;
        }
    }

    fn clear_execution(&self, id: &str) {
        if let Some(record) = self.inner.registry.lock().get_mut(id) {
            record.execution = None;
        }
    }
}

/// Resolve the dependencies, then invoke the factory.
///
/// When the dependencies fail the factory never ran, so the execution slot
/// is cleared and a later request may try again. A factory failure stays
/// memoized in the shared future.
async fn run<V: ModuleValue>(
    weak: WeakLoader<V>,
    id: String,
    locator: String,
    definition: Definition<V>,
) -> Result<V> {
    let Some(loader) = weak.upgrade() else {
        return Err(loader_dropped(&id, &locator));
    };

    let resolved = match loader.resolve_all(&definition.dependencies).await {
        Ok(resolved) => resolved,
        Err(e) => {
            loader.clear_execution(&id);
            return Err(e);
        }
    };
    let values = resolved.into_iter().map(|module| module.value).collect();

    debug!(module = %id, "invoking factory");
    match (definition.factory)(values).await {
        Ok(value) => {
            loader.store_value(&id, value.clone());
            Ok(value)
        }
        Err(e) => {
            warn!(module = %id, error = %e, "module factory failed");
            Err(LoaderError::FactoryFailed {
                id,
                reason: e.to_string(),
            })
        }
    }
}

/// Find a declared-dependency path from `start` back to itself.
///
/// Only records that are defined but not yet evaluated take part; a record
/// with a value can no longer wait on anything.
fn find_cycle<V: ModuleValue>(
    records: &HashMap<String, LoaderRecord<V>>,
    start: &str,
) -> Option<Vec<String>> {
    let mut path = vec![start.to_string()];
    let mut visited = HashSet::new();
    if walk(records, start, start, &mut path, &mut visited) {
        Some(path)
    } else {
        None
    }
}

fn walk<'a, V: ModuleValue>(
    records: &'a HashMap<String, LoaderRecord<V>>,
    start: &str,
    current: &str,
    path: &mut Vec<String>,
    visited: &mut HashSet<&'a str>,
) -> bool {
    let Some(definition) = records
        .get(current)
        .filter(|record| record.value.is_none())
        .and_then(|record| record.definition.as_ref())
    else {
        return false;
    };

    for dep in &definition.dependencies {
        if dep == start {
            path.push(dep.clone());
            return true;
        }
        if !visited.insert(dep.as_str()) {
            continue;
        }
        path.push(dep.clone());
        if walk(records, start, dep, path, visited) {
            return true;
        }
        path.pop();
    }
    false
}
