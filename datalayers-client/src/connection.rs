use std::time::Duration;

use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// Configurable builder for establishing the gRPC channel to a Datalayers
/// server.
pub struct ChannelBuilder {
    uri: String,
    host: String,
    tls_cert_pem: Option<String>,
    connect_timeout: Duration,
}

impl ChannelBuilder {
    /// Create a builder from the client configuration, reading the TLS
    /// certificate if one is configured.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use datalayers_client::{ChannelBuilder, ClientConfig};
    ///
    /// let channel = ChannelBuilder::from_config(&ClientConfig::default())?
    ///     .connect()
    ///     .await?;
    /// # Ok::<(), datalayers_client::Error>(())
    /// ```
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let tls_cert_pem = match &config.tls_cert {
            Some(path) => Some(std::fs::read_to_string(path).map_err(|e| {
                Error::Connection(format!(
                    "failed to read the TLS cert file {}: {e}",
                    path.display()
                ))
            })?),
            None => None,
        };
        Ok(Self {
            uri: config.endpoint_uri(),
            host: config.host.clone(),
            tls_cert_pem,
            connect_timeout: config.connect_timeout(),
        })
    }

    /// Override the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    fn endpoint(&self) -> Result<Endpoint> {
        let mut endpoint = Endpoint::from_shared(self.uri.clone())
            .map_err(|e| {
                Error::Connection(format!("invalid endpoint uri {}: {e}", self.uri))
            })?
            .connect_timeout(self.connect_timeout)
            .keep_alive_while_idle(true);

        if let Some(pem) = &self.tls_cert_pem {
            debug!(host = %self.host, "configuring TLS");
            let tls_config = ClientTlsConfig::new()
                .domain_name(self.host.clone())
                .ca_certificate(Certificate::from_pem(pem));
            endpoint = endpoint
                .tls_config(tls_config)
                .map_err(|e| Error::Connection(format!("failed to configure TLS: {e}")))?;
        }
        Ok(endpoint)
    }

    /// Establish the channel.
    pub async fn connect(&self) -> Result<Channel> {
        let channel = self.endpoint()?.connect().await.map_err(|e| {
            Error::Connection(format!("failed to connect to server with uri {}: {e}", self.uri))
        })?;
        info!(uri = %self.uri, "channel established");
        Ok(channel)
    }
}

/// Convenience helper to open a channel with the configured settings.
pub async fn connect(config: &ClientConfig) -> Result<Channel> {
    ChannelBuilder::from_config(config)?.connect().await
}
