//! Point-in-time secret retrieval.
//!
//! Secrets are addressed by a logical secret name plus a key inside it
//! (`Selector` / `slackSigningSecret`). Every call reads the backing store again;
//! nothing is cached between invocations.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::Value;
use thiserror::Error;

use crate::config::{SecretsBackend, SecretsConfig};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecretError {
    #[error("secret `{secret_name}` has no value for key `{key}`")]
    NotFound { secret_name: String, key: String },
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, secret_name: &str, key: &str) -> Result<SecretString, SecretError>;
}

/// Reads `SELECTOR_SECRET_<SECRET_NAME>_<KEY>` from the process environment.
#[derive(Clone, Debug, Default)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get(&self, secret_name: &str, key: &str) -> Result<SecretString, SecretError> {
        let var = env_var_name(secret_name, key);
        env::var(&var)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| SecretError::NotFound {
                secret_name: secret_name.to_owned(),
                key: key.to_owned(),
            })
    }
}

/// Reads a JSON document of the form `{"<secret_name>": {"<key>": "<value>"}}`.
#[derive(Clone, Debug)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, secret_name: &str, key: &str) -> Result<SecretString, SecretError> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|error| {
            SecretError::Unavailable(format!("could not read `{}`: {error}", self.path.display()))
        })?;
        let document: Value = serde_json::from_str(&raw).map_err(|error| {
            SecretError::Unavailable(format!("could not parse `{}`: {error}", self.path.display()))
        })?;

        document
            .get(secret_name)
            .and_then(|secret| secret.get(key))
            .and_then(Value::as_str)
            .filter(|value| !value.trim().is_empty())
            .map(|value| SecretString::from(value.to_owned()))
            .ok_or_else(|| SecretError::NotFound {
                secret_name: secret_name.to_owned(),
                key: key.to_owned(),
            })
    }
}

/// Fixed in-memory values. Used by tests and local runs.
#[derive(Clone, Debug, Default)]
pub struct StaticSecretStore {
    values: HashMap<(String, String), String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        secret_name: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.values.insert((secret_name.into(), key.into()), value.into());
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get(&self, secret_name: &str, key: &str) -> Result<SecretString, SecretError> {
        self.values
            .get(&(secret_name.to_owned(), key.to_owned()))
            .map(|value| SecretString::from(value.clone()))
            .ok_or_else(|| SecretError::NotFound {
                secret_name: secret_name.to_owned(),
                key: key.to_owned(),
            })
    }
}

pub fn store_from_config(config: &SecretsConfig) -> Arc<dyn SecretStore> {
    match (&config.backend, &config.file_path) {
        (SecretsBackend::File, Some(path)) => Arc::new(FileSecretStore::new(path.clone())),
        // validate() rejects a file backend without a path
        (SecretsBackend::File, None) | (SecretsBackend::Env, _) => Arc::new(EnvSecretStore),
    }
}

/// `("Selector", "slackSigningSecret")` → `SELECTOR_SECRET_SELECTOR_SLACK_SIGNING_SECRET`
pub fn env_var_name(secret_name: &str, key: &str) -> String {
    format!("SELECTOR_SECRET_{}_{}", upper_snake(secret_name), upper_snake(key))
}

fn upper_snake(value: &str) -> String {
    let mut output = String::with_capacity(value.len() + 4);
    let mut previous_lower = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            if ch.is_ascii_uppercase() && previous_lower {
                output.push('_');
            }
            previous_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            output.push(ch.to_ascii_uppercase());
        } else {
            if !output.ends_with('_') && !output.is_empty() {
                output.push('_');
            }
            previous_lower = false;
        }
    }
    output
}
