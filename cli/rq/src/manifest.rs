//! `rq.toml` manifest parsing and loader configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rq_loader::LoaderConfig;
use serde::{Deserialize, Serialize};

/// The top-level manifest structure.
///
/// ```toml
/// main = ["app"]
///
/// [loader]
/// base_url = "modules/"
///
/// [loader.paths]
/// util = "vendor/util-1.2.toml"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RqManifest {
    /// Modules `rq require` resolves when none are named.
    #[serde(default)]
    pub main: Vec<String>,
    /// Loader configuration.
    #[serde(default)]
    pub loader: LoaderConfig,
}

impl RqManifest {
    /// Search upward from `start_dir` for an `rq.toml` file, parse and return
    /// it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join("rq.toml");
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: RqManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse a manifest from a TOML string.
    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing rq.toml")
    }

    /// The loader configuration, with a relative base made relative to the
    /// manifest's directory.
    pub fn loader_config(&self, manifest_dir: &Path) -> LoaderConfig {
        let mut config = self.loader.clone();
        if is_relative_base(&config.base_url) {
            config.base_url = format!("{}/{}", manifest_dir.display(), config.base_url);
        }
        config
    }
}

/// Absolute paths and URLs are used as they are.
fn is_relative_base(base: &str) -> bool {
    !(base.starts_with('/') || base.contains("://") || Path::new(base).is_absolute())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let manifest = RqManifest::from_str(
            r#"
main = ["app", "extras"]

[loader]
base_url = "modules/"

[loader.paths]
util = "vendor/util.toml"
"#,
        )
        .unwrap();
        assert_eq!(manifest.main, vec!["app", "extras"]);
        assert_eq!(manifest.loader.base_url, "modules/");
        assert_eq!(manifest.loader.locate("util"), "modules/vendor/util.toml");
    }

    #[test]
    fn parse_minimal_manifest() {
        let manifest = RqManifest::from_str("").unwrap();
        assert!(manifest.main.is_empty());
        assert_eq!(manifest.loader, LoaderConfig::default());
    }

    #[test]
    fn reject_invalid_toml() {
        assert!(RqManifest::from_str("main = [").is_err());
    }

    #[test]
    fn relative_base_follows_manifest_dir() {
        let manifest = RqManifest::from_str("[loader]\nbase_url = \"mods/\"\n").unwrap();
        let config = manifest.loader_config(Path::new("/work/project"));
        assert_eq!(config.base_url, "/work/project/mods/");

        let manifest =
            RqManifest::from_str("[loader]\nbase_url = \"https://cdn.example.com/\"\n").unwrap();
        let config = manifest.loader_config(Path::new("/work/project"));
        assert_eq!(config.base_url, "https://cdn.example.com/");
    }

    #[test]
    fn find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rq.toml"), "main = [\"root\"]\n").unwrap();

        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (manifest, found_dir) = RqManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(manifest.main, vec!["root"]);
        assert_eq!(found_dir, dir.path());
    }

    #[test]
    fn find_and_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("rq.toml"), "main = 3\n").unwrap();
        let err = RqManifest::find_and_load(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }
}
