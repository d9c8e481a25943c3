use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

/// Configuration for connecting to a Datalayers server over Arrow Flight SQL.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Hostname of the Datalayers server.
    pub host: String,
    /// Port the Flight SQL service listens on.
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Optional PEM certificate. When set the channel uses TLS and the
    /// certificate is trusted as the server's root.
    pub tls_cert: Option<PathBuf>,
    /// Database selected for every request right after authentication.
    pub database: Option<String>,
    /// Deadline applied to every outgoing call, in seconds.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8360,
            username: "admin".to_string(),
            password: "public".to_string(),
            tls_cert: None,
            database: None,
            timeout_secs: 10,
            connect_timeout_secs: 5,
        }
    }
}

impl ClientConfig {
    /// Loads the defaults overlaid with `DATALAYERS_*` environment variables,
    /// e.g. `DATALAYERS_HOST` or `DATALAYERS_TLS_CERT`.
    pub fn load() -> anyhow::Result<Self> {
        let defaults_json = serde_json::to_string(&Self::default())
            .with_context(|| "failed to serialize defaults")?;
        let settings = config::Config::builder()
            .add_source(
                config::File::from_str(&defaults_json, config::FileFormat::Json).required(false),
            )
            .add_source(config::Environment::with_prefix("DATALAYERS"))
            .build()
            .with_context(|| "failed to load configuration")?;
        let cfg: ClientConfig = settings
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.host.trim().is_empty() {
            bail!("ClientConfig.host must not be empty");
        }
        if self.port == 0 {
            bail!("ClientConfig.port must be greater than 0");
        }
        if self.timeout_secs == 0 {
            bail!("ClientConfig.timeout_secs must be greater than 0");
        }
        Ok(())
    }

    /// The URI of the server, `https` when a certificate is configured.
    pub fn endpoint_uri(&self) -> String {
        let protocol = if self.tls_cert.is_some() { "https" } else { "http" };
        format!("{}://{}:{}", protocol, self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
