//! Streaming fetch: redeems a result handle with `DoGet` and turns the
//! returned flight data into batches.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use arrow_array::RecordBatch;
use arrow_flight::decode::FlightRecordBatchStream;
use arrow_flight::error::FlightError;
use arrow_flight::flight_service_client::FlightServiceClient;
use arrow_flight::{FlightData, FlightInfo, Ticket};
use arrow_schema::SchemaRef;
use futures::{Stream, StreamExt, TryStreamExt};
use tokio::time::Instant;
use tonic::transport::Channel;
use tonic::{Code, Status};
use tracing::debug;

use crate::batch::{Batch, StreamBatch};
use crate::error::{Error, Result};
use crate::session::SessionContext;

/// Server-issued ticket for a pending result set. Redeeming it consumes it.
#[derive(Debug)]
pub struct ResultHandle {
    ticket: Ticket,
}

impl ResultHandle {
    pub fn new(ticket: Ticket) -> Self {
        Self { ticket }
    }

    /// Takes the ticket of the first endpoint. Any further endpoints are
    /// ignored.
    pub fn from_flight_info(info: FlightInfo) -> Result<Self> {
        let endpoints = info.endpoint.len();
        let endpoint = info.endpoint.into_iter().next().ok_or_else(|| {
            Error::InvalidResponse("no endpoint in flight info".to_string())
        })?;
        if endpoints > 1 {
            debug!(endpoints, "using the first of several endpoints");
        }
        let ticket = endpoint
            .ticket
            .ok_or_else(|| Error::InvalidResponse("no ticket in endpoint".to_string()))?;
        Ok(Self { ticket })
    }

    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }
}

type FlightDataStream =
    Pin<Box<dyn Stream<Item = std::result::Result<FlightData, FlightError>> + Send>>;

/// An open `DoGet` stream.
///
/// Batches come out borrowed from the stream and are dropped on the next
/// pull unless retained. Dropping or closing the stream cancels the call.
pub struct ResultStream {
    inner: FlightRecordBatchStream,
    current: Option<Arc<RecordBatch>>,
    deadline: Instant,
    timeout: Duration,
}

impl ResultStream {
    /// Wraps raw flight data. Each pull must finish before `timeout` elapses
    /// from now.
    pub fn new<S>(data: S, timeout: Duration) -> Self
    where
        S: Stream<Item = std::result::Result<FlightData, Status>> + Send + 'static,
    {
        let data: FlightDataStream = Box::pin(data.map_err(FlightError::from));
        Self {
            inner: FlightRecordBatchStream::new_from_flight_data(data),
            current: None,
            deadline: Instant::now() + timeout,
            timeout,
        }
    }

    /// Schema announced by the server, once the first message has arrived.
    pub fn schema(&self) -> Option<&SchemaRef> {
        self.inner.schema()
    }

    /// Pulls the next batch. `Ok(None)` marks the end of the result set.
    pub async fn next_batch(&mut self) -> Result<Option<StreamBatch<'_>>> {
        self.current = None;
        let next = tokio::time::timeout_at(self.deadline, self.inner.next())
            .await
            .map_err(|_| Error::elapsed(self.timeout))?;
        match next {
            Some(Ok(batch)) => {
                self.current = Some(Arc::new(batch));
                Ok(self.current.as_ref().map(StreamBatch::new))
            }
            Some(Err(e)) => Err(self.fetch_error(e)),
            None => Ok(None),
        }
    }

    /// Releases the stream's own reference to the last batch and cancels
    /// the call if it is still running.
    pub fn close(self) {
        debug!(holding_batch = self.current.is_some(), "closing result stream");
    }

    fn fetch_error(&self, err: FlightError) -> Error {
        match err {
            FlightError::Tonic(status) if status.code() == Code::DeadlineExceeded => {
                Error::deadline(self.timeout, *status)
            }
            FlightError::Tonic(status) => Error::fetch(*status),
            other => Error::Fetch(other.to_string()),
        }
    }
}

/// Opens the `DoGet` stream for `handle`.
pub(crate) async fn open(
    flight: &mut FlightServiceClient<Channel>,
    ctx: &SessionContext,
    handle: ResultHandle,
) -> Result<ResultStream> {
    let request = ctx.request(handle.ticket)?;
    let response = flight
        .do_get(request)
        .await
        .map_err(|status| ctx.status_error(status, Error::fetch))?;
    Ok(ResultStream::new(response.into_inner(), ctx.timeout()))
}

/// Drains `stream`, retaining every batch before the stream is closed.
pub(crate) async fn collect(mut stream: ResultStream) -> Result<Vec<Batch>> {
    let mut batches = Vec::new();
    let drained = loop {
        match stream.next_batch().await {
            Ok(Some(batch)) if batch.num_rows() == 0 => continue,
            Ok(Some(batch)) => batches.push(batch.retain()),
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        }
    };
    stream.close();
    drained?;
    debug!(batches = batches.len(), "fetched result set");
    Ok(batches)
}

/// Redeems `handle` and materializes the whole result set.
pub(crate) async fn fetch(
    flight: &mut FlightServiceClient<Channel>,
    ctx: &SessionContext,
    handle: ResultHandle,
) -> Result<Vec<Batch>> {
    ctx.scoped(async {
        let stream = open(flight, ctx, handle).await?;
        collect(stream).await
    })
    .await
}
