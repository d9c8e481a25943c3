//! Authentication and the per-call session context.
//!
//! A [`SessionContext`] is an immutable value: deriving a context with a
//! different database produces a copy and never touches the source, so
//! contexts can be shared freely across tasks.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use arrow_flight::flight_service_client::FlightServiceClient;
use arrow_flight::{HandshakeRequest, HandshakeResponse};
use base64::prelude::{Engine, BASE64_STANDARD};
use futures::{stream, TryStreamExt};
use tonic::metadata::{AsciiMetadataValue, MetadataKey, MetadataMap};
use tonic::transport::Channel;
use tonic::{Code, Request, Status};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const AUTHORIZATION_HEADER: &str = "authorization";
pub const DATABASE_HEADER: &str = "database";

const BEARER_PREFIX: &str = "Bearer ";

/// Token negotiated at authentication time. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    fn bearer(&self) -> String {
        format!("{BEARER_PREFIX}{}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Credential plus the attributes attached to every outgoing call.
#[derive(Debug, Clone)]
pub struct SessionContext {
    credential: Credential,
    attributes: BTreeMap<String, String>,
    timeout: Duration,
}

impl SessionContext {
    pub fn new(credential: Credential, timeout: Duration) -> Self {
        Self {
            credential,
            attributes: BTreeMap::new(),
            timeout,
        }
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// The selected database, if any.
    pub fn database(&self) -> Option<&str> {
        self.attribute(DATABASE_HEADER)
    }

    /// Looks up an attribute. Keys are case-insensitive, like gRPC metadata.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Deadline applied to each call issued under this context.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns a copy of this context with `database` selected.
    #[must_use]
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        self.with_attribute(DATABASE_HEADER, database)
    }

    /// Returns a copy of this context with one attribute overwritten.
    #[must_use]
    pub fn with_attribute(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut derived = self.clone();
        derived
            .attributes
            .insert(key.into().to_ascii_lowercase(), value.into());
        derived
    }

    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            timeout,
            ..self.clone()
        }
    }

    /// Wraps `message` in a request carrying the credential, the attributes
    /// and the deadline.
    pub(crate) fn request<T>(&self, message: T) -> Result<Request<T>> {
        let mut request = Request::new(message);
        request.set_timeout(self.timeout);
        let metadata = request.metadata_mut();
        insert_header(metadata, AUTHORIZATION_HEADER, &self.credential.bearer())?;
        for (key, value) in &self.attributes {
            insert_header(metadata, key, value)?;
        }
        Ok(request)
    }

    /// Runs one call under the context's deadline. On expiry the call future
    /// is dropped, releasing whatever it had received so far.
    pub(crate) async fn scoped<F, T>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::elapsed(self.timeout)),
        }
    }

    /// Maps a failed call, keeping timeouts distinct from the call's own
    /// error category.
    pub(crate) fn status_error(&self, status: Status, category: fn(Status) -> Error) -> Error {
        if status.code() == Code::DeadlineExceeded {
            Error::deadline(self.timeout, status)
        } else {
            category(status)
        }
    }
}

fn insert_header(metadata: &mut MetadataMap, key: &str, value: &str) -> Result<()> {
    let name = MetadataKey::from_bytes(key.as_bytes())
        .map_err(|e| Error::Exec(format!("invalid request attribute name {key}: {e}")))?;
    let value = AsciiMetadataValue::try_from(value)
        .map_err(|e| Error::Exec(format!("invalid value for request attribute {key}: {e}")))?;
    metadata.insert(name, value);
    Ok(())
}

fn bearer_token(metadata: &MetadataMap) -> Result<String> {
    let header = metadata
        .get(AUTHORIZATION_HEADER)
        .ok_or_else(|| Error::Auth("server did not return an authorization header".to_string()))?;
    let header = header
        .to_str()
        .map_err(|e| Error::Auth(format!("authorization header is not ascii: {e}")))?;
    header
        .strip_prefix(BEARER_PREFIX)
        .map(str::to_string)
        .ok_or_else(|| Error::Auth("server did not return a bearer token".to_string()))
}

fn handshake_error(status: Status, timeout: Duration) -> Error {
    if status.code() == Code::DeadlineExceeded {
        Error::deadline(timeout, status)
    } else {
        Error::auth(status)
    }
}

/// Performs the Flight basic-auth handshake and returns a context carrying
/// the bearer token the server issued.
pub async fn authenticate(
    channel: Channel,
    username: &str,
    password: &str,
    timeout: Duration,
) -> Result<SessionContext> {
    let mut client = FlightServiceClient::new(channel);

    let handshake = HandshakeRequest {
        protocol_version: 0,
        payload: Default::default(),
    };
    let mut request = Request::new(stream::iter(vec![handshake]));
    request.set_timeout(timeout);
    let basic = BASE64_STANDARD.encode(format!("{username}:{password}"));
    insert_header(
        request.metadata_mut(),
        AUTHORIZATION_HEADER,
        &format!("Basic {basic}"),
    )?;

    let call = async move {
        let response = client
            .handshake(request)
            .await
            .map_err(|status| handshake_error(status, timeout))?;
        let token = bearer_token(response.metadata())?;
        let payloads: Vec<HandshakeResponse> = response
            .into_inner()
            .try_collect()
            .await
            .map_err(|status| handshake_error(status, timeout))?;
        debug!(responses = payloads.len(), "handshake stream drained");
        Ok::<_, Error>(token)
    };

    let token = match tokio::time::timeout(timeout, call).await {
        Ok(result) => result?,
        Err(_) => return Err(Error::elapsed(timeout)),
    };

    info!(username, "authenticated with the server");
    Ok(SessionContext::new(Credential::new(token), timeout))
}
