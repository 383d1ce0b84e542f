//! Scripted fetcher shared by the unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::FetchError;
use crate::fetch::{FetchRequest, Fetcher};
use crate::loader::Loader;

/// What fetching an id does.
#[derive(Debug, Clone)]
pub enum Script {
    /// Register the id with a constant value.
    Define { dependencies: Vec<String>, value: Value },
    /// Load successfully without registering anything.
    Silent,
    /// Fail to load.
    Fail,
    /// Yield to the scheduler `n` times first.
    Delayed(usize, Box<Script>),
}

impl Script {
    pub fn define(dependencies: &[&str], value: Value) -> Self {
        Script::Define {
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
            value,
        }
    }

    pub fn yielding(self, n: usize) -> Self {
        Script::Delayed(n, Box::new(self))
    }
}

/// Records every locator it is asked for. Unscripted ids are not found.
#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, id: &str, script: Script) -> Self {
        self.scripts.insert(id.to_string(), script);
        self
    }

    /// Locators fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Fetcher<Value> for ScriptedFetcher {
    async fn fetch(&self, request: FetchRequest, loader: Loader<Value>) -> Result<(), FetchError> {
        self.calls.lock().push(request.locator.clone());

        let mut script = self.scripts.get(&request.id).cloned();
        while let Some(Script::Delayed(n, inner)) = script {
            for _ in 0..n {
                tokio::task::yield_now().await;
            }
            script = Some(*inner);
        }

        match script {
            Some(Script::Define {
                dependencies,
                value,
            }) => {
                loader.define_with(&request.id, dependencies, move |_| Ok(value.clone()))?;
                Ok(())
            }
            Some(Script::Silent) => Ok(()),
            Some(Script::Fail) => Err(FetchError::Io {
                locator: request.locator,
                detail: "connection reset".to_string(),
            }),
            Some(Script::Delayed(..)) | None => Err(FetchError::NotFound {
                locator: request.locator,
            }),
        }
    }
}
