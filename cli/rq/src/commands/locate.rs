//! `rq locate`.

use rq_loader::Loader;
use serde_json::Value;

/// Render the locator each id resolves to. Nothing is fetched.
pub fn locate(loader: &Loader<Value>, ids: &[String]) -> String {
    ids.iter()
        .map(|id| format!("{id} -> {}\n", loader.locate(id)))
        .collect()
}
