//! `rq tree`.

use anyhow::{Context, Result};
use rq_loader::{format_tree, Loader};
use serde_json::Value;

/// Run `rq tree <id>`: resolve the module, then print its dependency tree.
///
/// The tree is printed even when resolution fails, so the failing branch
/// shows up with its status.
pub async fn run(loader: &Loader<Value>, id: &str) -> Result<()> {
    let result = loader.import(id).await;
    print!("{}", format_tree(loader, id));
    result.map(|_| ()).with_context(|| format!("resolving {id}"))
}
