use std::time::Duration;

use arrow_flight::flight_service_client::FlightServiceClient;
use tonic::transport::Channel;
use tracing::{info, instrument};

use crate::batch::Batch;
use crate::config::ClientConfig;
use crate::connection::ChannelBuilder;
use crate::error::Result;
use crate::prepared::{self, ParameterBatch, PreparedStatement};
use crate::session::{self, SessionContext};
use crate::statement;
use crate::stream::{self, ResultHandle, ResultStream};

/// A Flight SQL client for a Datalayers server.
///
/// Cloning is cheap and clones share the underlying channel. Every call
/// carries this client's [`SessionContext`].
#[derive(Debug, Clone)]
pub struct Client {
    flight: FlightServiceClient<Channel>,
    context: SessionContext,
}

impl Client {
    /// Connects, authenticates and selects the configured database.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let channel = ChannelBuilder::from_config(config)?.connect().await?;
        let context = session::authenticate(
            channel.clone(),
            &config.username,
            &config.password,
            config.timeout(),
        )
        .await?;
        let context = match &config.database {
            Some(database) => context.with_database(database),
            None => context,
        };
        info!(host = %config.host, port = config.port, "client ready");
        Ok(Self::from_parts(channel, context))
    }

    /// Builds a client from an established channel and an authenticated
    /// context.
    pub fn from_parts(channel: Channel, context: SessionContext) -> Self {
        Self {
            flight: FlightServiceClient::new(channel),
            context,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Returns a client whose calls target `database`. This client is left
    /// untouched.
    #[must_use]
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self {
            flight: self.flight.clone(),
            context: self.context.with_database(database),
        }
    }

    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        Self {
            flight: self.flight.clone(),
            context: self.context.with_timeout(timeout),
        }
    }

    /// Submits `sql` and returns the handle of the first result endpoint.
    #[instrument(skip(self), fields(database = self.context.database()))]
    pub async fn execute(&self, sql: &str) -> Result<ResultHandle> {
        statement::execute(&mut self.flight.clone(), &self.context, sql).await
    }

    /// Submits `sql` and fetches the whole result set.
    #[instrument(skip(self), fields(database = self.context.database()))]
    pub async fn query(&self, sql: &str) -> Result<Vec<Batch>> {
        let handle = statement::execute(&mut self.flight.clone(), &self.context, sql).await?;
        self.fetch(handle).await
    }

    /// Runs an INSERT or DELETE and returns the server's affected-row count.
    #[instrument(skip(self), fields(database = self.context.database()))]
    pub async fn execute_update(&self, sql: &str) -> Result<i64> {
        statement::execute_update(&mut self.flight.clone(), &self.context, sql).await
    }

    /// Redeems `handle`, returning every batch of the result set. An empty
    /// result set yields an empty vector.
    #[instrument(skip_all)]
    pub async fn fetch(&self, handle: ResultHandle) -> Result<Vec<Batch>> {
        stream::fetch(&mut self.flight.clone(), &self.context, handle).await
    }

    /// Redeems `handle` as a stream, for callers that consume batches one at
    /// a time.
    #[instrument(skip_all)]
    pub async fn stream(&self, handle: ResultHandle) -> Result<ResultStream> {
        let mut flight = self.flight.clone();
        self.context
            .scoped(stream::open(&mut flight, &self.context, handle))
            .await
    }

    #[instrument(skip(self), fields(database = self.context.database()))]
    pub async fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        prepared::prepare(&mut self.flight.clone(), &self.context, sql).await
    }

    /// Executes `statement` with `params` and fetches the result. `params`
    /// is consumed and released before this returns, on success or failure.
    #[instrument(skip_all, fields(sql = statement.sql(), rows = params.num_rows()))]
    pub async fn execute_prepared(
        &self,
        statement: &mut PreparedStatement,
        params: ParameterBatch,
    ) -> Result<Vec<Batch>> {
        let handle =
            prepared::execute_with(&mut self.flight.clone(), &self.context, statement, params)
                .await?;
        self.fetch(handle).await
    }

    /// Executes a prepared INSERT or DELETE and returns the affected-row
    /// count. `params` is consumed like in [`Client::execute_prepared`].
    #[instrument(skip_all, fields(sql = statement.sql(), rows = params.num_rows()))]
    pub async fn execute_prepared_update(
        &self,
        statement: &mut PreparedStatement,
        params: ParameterBatch,
    ) -> Result<i64> {
        prepared::execute_update_with(&mut self.flight.clone(), &self.context, statement, params)
            .await
    }

    /// Releases `statement` on the server. Closing twice fails with
    /// [`Error::UseAfterClose`](crate::Error::UseAfterClose).
    #[instrument(skip_all, fields(sql = statement.sql()))]
    pub async fn close_prepared(&self, statement: &mut PreparedStatement) -> Result<()> {
        prepared::close(&mut self.flight.clone(), &self.context, statement).await
    }
}
