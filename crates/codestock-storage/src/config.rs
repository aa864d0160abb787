use std::env;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use codestock_core::columns::SNIPPETS_TABLE;

use crate::error::StorageError;

pub const ENV_URL: &str = "CODESTOCK_STORE_URL";
pub const ENV_KEY: &str = "CODESTOCK_STORE_KEY";
pub const ENV_TABLE: &str = "CODESTOCK_STORE_TABLE";
pub const ENV_TIMEOUT_SECS: &str = "CODESTOCK_STORE_TIMEOUT_SECS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the tabular REST store.
///
/// Built once at process start and shared by reference; nothing below this
/// type reads the environment.
#[derive(Debug)]
pub struct StoreConfig {
    pub base_url: Url,
    api_key: SecretString,
    pub table: String,
    /// Deadline applied to each outbound request by the HTTP transport.
    pub timeout: Duration,
}

impl StoreConfig {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, StorageError> {
        let base_url = Url::parse(base_url.trim())
            .map_err(|e| StorageError::Config(format!("invalid store url {base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::Config(format!(
                "store url cannot carry a path: {base_url}"
            )));
        }

        let api_key: String = api_key.into();
        if api_key.trim().is_empty() {
            return Err(StorageError::Config("store api key is empty".to_string()));
        }

        Ok(Self {
            base_url,
            api_key: SecretString::from(api_key),
            table: SNIPPETS_TABLE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Read the store settings from the process environment.
    ///
    /// URL and key are required; table and timeout fall back to defaults.
    pub fn from_env() -> Result<Self, StorageError> {
        let url = required_var(ENV_URL)?;
        let key = required_var(ENV_KEY)?;
        let mut config = Self::new(&url, key)?;

        if let Ok(table) = env::var(ENV_TABLE) {
            if !table.trim().is_empty() {
                config = config.with_table(table.trim());
            }
        }

        if let Ok(raw) = env::var(ENV_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                StorageError::Config(format!("{ENV_TIMEOUT_SECS} must be a whole number of seconds"))
            })?;
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// `<base_url>/rest/v1/<table>`, keeping any path prefix on the base.
    pub fn table_url(&self, table: &str) -> Result<Url, StorageError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| StorageError::Config("store url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["rest", "v1", table]);
        Ok(url)
    }
}

fn required_var(name: &str) -> Result<String, StorageError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(StorageError::Config(format!("{name} is not set"))),
    }
}
