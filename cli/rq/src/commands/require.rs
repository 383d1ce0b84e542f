//! `rq require` and `rq import`.

use anyhow::{Context, Result};
use rq_loader::Loader;
use serde_json::Value;

/// Run `rq require <ids..>`: resolve every id, render values in order.
pub async fn require(loader: &Loader<Value>, ids: &[String]) -> Result<String> {
    let mut values = Vec::new();
    loader
        .require(ids, |resolved| values = resolved)
        .await
        .with_context(|| format!("resolving {}", ids.join(", ")))?;

    let mut out = String::new();
    for (id, value) in ids.iter().zip(&values) {
        out.push_str(&format!("{id} = {}\n", serde_json::to_string_pretty(value)?));
    }
    Ok(out)
}

/// Run `rq import <id>`: resolve one id and render its value.
pub async fn import(loader: &Loader<Value>, id: &str) -> Result<String> {
    let value = loader
        .import(id)
        .await
        .with_context(|| format!("importing {id}"))?;
    Ok(format!("{}\n", serde_json::to_string_pretty(&value)?))
}
