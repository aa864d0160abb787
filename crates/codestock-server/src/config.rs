use std::env;
use std::net::SocketAddr;

use codestock_storage::config::StoreConfig;
use codestock_storage::error::StorageError;

pub const ENV_BIND: &str = "CODESTOCK_BIND";
const DEFAULT_BIND: &str = "0.0.0.0:3000";

/// Set by the AWS Lambda runtime; when present the router is served through
/// `lambda_http` instead of a TCP listener.
pub const ENV_LAMBDA_RUNTIME: &str = "AWS_LAMBDA_RUNTIME_API";

/// Process configuration, read once at startup.
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Kept as a result so a missing credential degrades the snippet routes
    /// instead of aborting the process.
    pub store: Result<StoreConfig, StorageError>,
    pub lambda: bool,
}

impl ServerConfig {
    pub fn from_env() -> eyre::Result<Self> {
        let raw = env::var(ENV_BIND).unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let bind: SocketAddr = raw
            .parse()
            .map_err(|e| eyre::eyre!("{ENV_BIND}={raw:?} is not a socket address: {e}"))?;

        Ok(Self {
            bind,
            store: StoreConfig::from_env(),
            lambda: env::var(ENV_LAMBDA_RUNTIME).is_ok(),
        })
    }
}
