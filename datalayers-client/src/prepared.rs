//! Server-side prepared statements.
//!
//! A [`PreparedStatement`] moves from prepared to closed exactly once. Each
//! execution consumes a [`ParameterBatch`]: the batch is owned by the call
//! and released when the call returns, whatever the outcome.

use std::fmt;
use std::sync::Arc;

use arrow_array::{ArrayRef, RecordBatch};
use arrow_flight::encode::FlightDataEncoderBuilder;
use arrow_flight::flight_service_client::FlightServiceClient;
use arrow_flight::sql::{
    ActionClosePreparedStatementRequest, ActionCreatePreparedStatementRequest,
    ActionCreatePreparedStatementResult, CommandPreparedStatementQuery,
    CommandPreparedStatementUpdate, DoPutPreparedStatementResult, DoPutUpdateResult,
    ProstMessageExt,
};
use arrow_flight::{Action, FlightData, FlightDescriptor};
use arrow_ipc::convert::try_schema_from_ipc_buffer;
use arrow_schema::{Schema, SchemaRef};
use futures::{stream, TryStreamExt};
use prost::bytes::Bytes;
use prost::Message;
use tonic::transport::Channel;
use tracing::{debug, info, warn};

use crate::batch::BatchWatch;
use crate::error::{Error, Result};
use crate::session::SessionContext;
use crate::statement::{command_descriptor, decode_message, decode_put_result, flight_info, put};
use crate::stream::ResultHandle;

const CREATE_PREPARED_STATEMENT: &str = "CreatePreparedStatement";
const CLOSE_PREPARED_STATEMENT: &str = "ClosePreparedStatement";

/// Positional parameters for one execution: one column per placeholder,
/// one row per execution instance.
pub struct ParameterBatch {
    inner: Arc<RecordBatch>,
}

impl ParameterBatch {
    pub fn try_new(schema: SchemaRef, columns: Vec<ArrayRef>) -> Result<Self> {
        Ok(RecordBatch::try_new(schema, columns)?.into())
    }

    pub fn num_rows(&self) -> usize {
        self.inner.num_rows()
    }

    pub fn schema(&self) -> SchemaRef {
        self.inner.schema()
    }

    /// Observer that reports once the batch has been released.
    pub fn watch(&self) -> BatchWatch {
        BatchWatch::new(Arc::downgrade(&self.inner))
    }

    async fn encode(&self, descriptor: FlightDescriptor) -> Result<Vec<FlightData>> {
        FlightDataEncoderBuilder::new()
            .with_flight_descriptor(Some(descriptor))
            .build(stream::iter(vec![Ok(RecordBatch::clone(&self.inner))]))
            .try_collect()
            .await
            .map_err(|e| Error::Exec(format!("failed to encode parameters: {e}")))
    }
}

impl From<RecordBatch> for ParameterBatch {
    fn from(batch: RecordBatch) -> Self {
        Self {
            inner: Arc::new(batch),
        }
    }
}

impl fmt::Debug for ParameterBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterBatch")
            .field("columns", &self.inner.num_columns())
            .field("rows", &self.inner.num_rows())
            .finish()
    }
}

impl Drop for ParameterBatch {
    fn drop(&mut self) {
        debug!(rows = self.inner.num_rows(), "parameter batch released");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Prepared,
    Closed,
}

/// Handle to a statement prepared on the server.
pub struct PreparedStatement {
    handle: Bytes,
    sql: String,
    dataset_schema: SchemaRef,
    parameter_schema: SchemaRef,
    state: State,
    executions: u64,
}

impl PreparedStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Schema of the rows the statement produces. Empty when the server
    /// did not describe it.
    pub fn dataset_schema(&self) -> &SchemaRef {
        &self.dataset_schema
    }

    pub fn parameter_schema(&self) -> &SchemaRef {
        &self.parameter_schema
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Number of successful executions so far. Kept after close.
    pub fn executions(&self) -> u64 {
        self.executions
    }

    fn label(&self) -> String {
        self.handle.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            State::Prepared => Ok(()),
            State::Closed => Err(Error::UseAfterClose(self.label())),
        }
    }

    fn record_execution(&mut self) {
        self.executions += 1;
    }
}

impl fmt::Debug for PreparedStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedStatement")
            .field("handle", &self.label())
            .field("sql", &self.sql)
            .field("state", &self.state)
            .field("executions", &self.executions)
            .finish()
    }
}

impl Drop for PreparedStatement {
    fn drop(&mut self) {
        if !self.is_closed() {
            warn!(
                handle = %self.label(),
                sql = %self.sql,
                "prepared statement dropped without close; server resources stay allocated"
            );
        }
    }
}

fn decode_schema(bytes: &[u8]) -> Result<SchemaRef> {
    if bytes.is_empty() {
        return Ok(Arc::new(Schema::empty()));
    }
    Ok(Arc::new(try_schema_from_ipc_buffer(bytes)?))
}

async fn action(
    flight: &mut FlightServiceClient<Channel>,
    ctx: &SessionContext,
    kind: &str,
    body: Vec<u8>,
) -> Result<Vec<arrow_flight::Result>> {
    let action = Action {
        r#type: kind.to_string(),
        body: body.into(),
    };
    let request = ctx.request(action)?;
    let results = flight
        .do_action(request)
        .await
        .map_err(|status| ctx.status_error(status, Error::exec))?
        .into_inner()
        .try_collect()
        .await
        .map_err(|status| ctx.status_error(status, Error::exec))?;
    Ok(results)
}

pub(crate) async fn prepare(
    flight: &mut FlightServiceClient<Channel>,
    ctx: &SessionContext,
    sql: &str,
) -> Result<PreparedStatement> {
    let request = ActionCreatePreparedStatementRequest {
        query: sql.to_string(),
        transaction_id: None,
    };
    let body = request.as_any().encode_to_vec();
    ctx.scoped(async {
        let results = action(flight, ctx, CREATE_PREPARED_STATEMENT, body).await?;
        let result = results.into_iter().next().ok_or_else(|| {
            Error::InvalidResponse("no result for CreatePreparedStatement".to_string())
        })?;
        let created: ActionCreatePreparedStatementResult = decode_message(result.body.as_ref())?;
        let statement = PreparedStatement {
            dataset_schema: decode_schema(&created.dataset_schema)?,
            parameter_schema: decode_schema(&created.parameter_schema)?,
            handle: created.prepared_statement_handle,
            sql: sql.to_string(),
            state: State::Prepared,
            executions: 0,
        };
        info!(
            handle = %statement.label(),
            parameters = statement.parameter_schema.fields().len(),
            "prepared statement created"
        );
        Ok(statement)
    })
    .await
}

/// Binds `params` and plans the execution. The returned handle is redeemed
/// by a fetch.
pub(crate) async fn execute_with(
    flight: &mut FlightServiceClient<Channel>,
    ctx: &SessionContext,
    statement: &mut PreparedStatement,
    params: ParameterBatch,
) -> Result<ResultHandle> {
    statement.ensure_open()?;
    let handle = ctx
        .scoped(async {
            let command = CommandPreparedStatementQuery {
                prepared_statement_handle: statement.handle.clone(),
            };
            let data = params.encode(command_descriptor(&command)).await?;
            if let Some(result) = put(flight, ctx, data).await? {
                let bound: DoPutPreparedStatementResult = decode_put_result(&result)?;
                if let Some(updated) = bound.prepared_statement_handle {
                    debug!("server replaced the prepared statement handle");
                    statement.handle = updated;
                }
            }
            let command = CommandPreparedStatementQuery {
                prepared_statement_handle: statement.handle.clone(),
            };
            flight_info(flight, ctx, command_descriptor(&command)).await
        })
        .await?;
    statement.record_execution();
    drop(params);
    Ok(handle)
}

pub(crate) async fn execute_update_with(
    flight: &mut FlightServiceClient<Channel>,
    ctx: &SessionContext,
    statement: &mut PreparedStatement,
    params: ParameterBatch,
) -> Result<i64> {
    statement.ensure_open()?;
    let command = CommandPreparedStatementUpdate {
        prepared_statement_handle: statement.handle.clone(),
    };
    let count = ctx
        .scoped(async {
            let data = params.encode(command_descriptor(&command)).await?;
            let result = put(flight, ctx, data).await?.ok_or_else(|| {
                Error::InvalidResponse("server sent no result for a prepared update".to_string())
            })?;
            let update: DoPutUpdateResult = decode_put_result(&result)?;
            Ok(update.record_count)
        })
        .await?;
    statement.record_execution();
    Ok(count)
}

/// Releases the statement on the server. A failed call leaves the handle
/// open so the close can be retried.
pub(crate) async fn close(
    flight: &mut FlightServiceClient<Channel>,
    ctx: &SessionContext,
    statement: &mut PreparedStatement,
) -> Result<()> {
    statement.ensure_open()?;
    let request = ActionClosePreparedStatementRequest {
        prepared_statement_handle: statement.handle.clone(),
    };
    let body = request.as_any().encode_to_vec();
    ctx.scoped(action(flight, ctx, CLOSE_PREPARED_STATEMENT, body))
        .await?;
    statement.state = State::Closed;
    info!(
        handle = %statement.label(),
        executions = statement.executions,
        "prepared statement closed"
    );
    Ok(())
}
