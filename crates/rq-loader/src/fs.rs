//! Filesystem fetcher for TOML module artifacts.
//!
//! Each locator names a file declaring one or more modules:
//!
//! ```toml
//! [[define]]
//! id = "habi"              # optional, defaults to the requested id
//! dependencies = ["mod"]
//! spread = true            # merge dependency objects into the exports
//!
//! [define.exports]
//! sim = 55
//! ```
//!
//! Loading the file registers every declaration with the loader, which is
//! the artifact's equivalent of running code that calls `define`. Files are
//! read through `tokio::fs`, so fetching needs a Tokio runtime.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::FetchError;
use crate::fetch::{FetchRequest, Fetcher};
use crate::loader::Loader;
use crate::record::FactoryError;

/// Loads module artifacts from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFetcher;

impl FsFetcher {
    pub fn new() -> Self {
        FsFetcher
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Artifact {
    #[serde(default)]
    define: Vec<Declaration>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Declaration {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(default)]
    spread: bool,
    #[serde(default)]
    exports: Option<Value>,
}

impl Declaration {
    fn register(self, requested: &str, loader: &Loader<Value>) -> Result<(), FetchError> {
        let id = self.id.unwrap_or_else(|| requested.to_string());
        let exports = self.exports.unwrap_or_else(|| Value::Object(Map::new()));
        let spread = self.spread;
        debug!(module = %id, dependencies = ?self.dependencies, "registering declared module");
        loader.define_with(&id, self.dependencies, move |deps| {
            build_exports(&exports, spread, deps)
        })?;
        Ok(())
    }
}

/// Evaluate a declaration: its exports, with dependency objects merged in
/// declaration order when `spread` is set. Later keys win.
fn build_exports(exports: &Value, spread: bool, deps: Vec<Value>) -> Result<Value, FactoryError> {
    if !spread {
        return Ok(exports.clone());
    }
    let Value::Object(base) = exports else {
        return Err("only table exports can spread dependencies".into());
    };
    let mut object = base.clone();
    for dep in deps {
        match dep {
            Value::Object(fields) => object.extend(fields),
            other => {
                return Err(format!("cannot spread non-table dependency value {other}").into());
            }
        }
    }
    Ok(Value::Object(object))
}

async fn read_artifact(locator: &str) -> Result<Artifact, FetchError> {
    let source = tokio::fs::read_to_string(locator).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => FetchError::NotFound {
            locator: locator.to_string(),
        },
        _ => FetchError::Io {
            locator: locator.to_string(),
            detail: e.to_string(),
        },
    })?;
    toml::from_str(&source).map_err(|e| FetchError::Malformed {
        locator: locator.to_string(),
        detail: e.to_string(),
    })
}

#[async_trait]
impl Fetcher<Value> for FsFetcher {
    async fn fetch(&self, request: FetchRequest, loader: Loader<Value>) -> Result<(), FetchError> {
        let artifact = read_artifact(&request.locator).await?;
        for declaration in artifact.define {
            declaration.register(&request.id, &loader)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::LoaderConfig;
    use crate::error::LoaderError;

    fn loader_in(dir: &tempfile::TempDir) -> Loader<Value> {
        let base = format!("{}/", dir.path().display());
        Loader::new(LoaderConfig::new(base), FsFetcher::new())
    }

    fn write(dir: &tempfile::TempDir, name: &str, content: &str) {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn loads_and_spreads_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "mod", "[[define]]\n[define.exports]\na = 4\nb = 6\n");
        write(
            &dir,
            "habi",
            "[[define]]\ndependencies = [\"mod\"]\nspread = true\n[define.exports]\nsim = 55\n",
        );
        let loader = loader_in(&dir);

        let mut values = Vec::new();
        loader
            .require(&["mod", "habi"], |v| values = v)
            .await
            .unwrap();
        assert_eq!(values[0], json!({ "a": 4, "b": 6 }));
        assert_eq!(values[1], json!({ "sim": 55, "a": 4, "b": 6 }));
    }

    #[tokio::test]
    async fn path_alias_selects_file() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir,
            "vendor/util-1.2.toml",
            "[[define]]\nid = \"util\"\n[define.exports]\nversion = \"1.2\"\n",
        );
        let loader = loader_in(&dir);
        let mut config = loader.current_config();
        config.paths.insert("util".into(), "vendor/util-1.2.toml".into());
        loader.config(config);

        assert_eq!(loader.import("util").await.unwrap(), json!({ "version": "1.2" }));
    }

    #[tokio::test]
    async fn one_artifact_may_define_several_modules() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir,
            "bundle",
            "[[define]]\nid = \"bundle\"\ndependencies = [\"helper\"]\nspread = true\n\n\
             [[define]]\nid = \"helper\"\n[define.exports]\nhelp = true\n",
        );
        let loader = loader_in(&dir);

        assert_eq!(loader.import("bundle").await.unwrap(), json!({ "help": true }));
        // "helper" was registered by the bundle; it was never fetched itself.
        assert_eq!(loader.locator("helper"), Some(loader.locate("helper")));
    }

    #[tokio::test]
    async fn missing_file_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let loader = loader_in(&dir);
        let err = loader.import("nowhere").await.unwrap_err();
        assert!(matches!(err, LoaderError::LoadFailed { ref id, ref reason, .. }
            if id == "nowhere" && reason.starts_with("artifact not found")));
    }

    #[tokio::test]
    async fn malformed_file_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "bad", "[[define]\nid = ");
        let loader = loader_in(&dir);
        let err = loader.import("bad").await.unwrap_err();
        assert!(matches!(err, LoaderError::LoadFailed { ref reason, .. } if reason.starts_with("malformed artifact")));
    }

    #[tokio::test]
    async fn directory_locator_is_io_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pkg")).unwrap();
        let loader = loader_in(&dir);
        let err = loader.import("pkg").await.unwrap_err();
        assert!(matches!(err, LoaderError::LoadFailed { ref reason, .. } if reason.starts_with("I/O error")));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn loads_on_current_thread_runtime() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a", "b", "c"] {
            write(&dir, name, &format!("[[define]]\n[define.exports]\nname = \"{name}\"\n"));
        }
        let loader = loader_in(&dir);

        let ticker = tokio::spawn(async {
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            "ticked"
        });
        let mut values = Vec::new();
        loader.require(&["a", "b", "c"], |v| values = v).await.unwrap();

        assert_eq!(ticker.await.unwrap(), "ticked");
        assert_eq!(values[2], json!({ "name": "c" }));
    }

    #[tokio::test]
    async fn artifact_without_definitions_is_missing_definition() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "empty", "# nothing here\n");
        let loader = loader_in(&dir);
        let err = loader.import("empty").await.unwrap_err();
        assert!(matches!(err, LoaderError::MissingDefinition { ref id, .. } if id == "empty"));
    }

    #[tokio::test]
    async fn redefinition_inside_artifact_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir, "dup", "[[define]]\n\n[[define]]\nid = \"dup\"\n");
        let loader = loader_in(&dir);
        let err = loader.import("dup").await.unwrap_err();
        assert!(matches!(err, LoaderError::LoadFailed { ref reason, .. } if reason.contains("duplicate registration")));
    }

    #[test]
    fn spread_rejects_scalars() {
        assert!(build_exports(&json!({}), true, vec![json!(3)]).is_err());
        assert_eq!(build_exports(&json!(3), false, vec![json!({})]).unwrap(), json!(3));
    }
}
