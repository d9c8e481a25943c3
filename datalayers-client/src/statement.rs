//! Direct statement execution and the Flight SQL round trips shared with
//! prepared statements.

use arrow_flight::flight_service_client::FlightServiceClient;
use arrow_flight::sql::{
    Any, CommandStatementQuery, CommandStatementUpdate, DoPutUpdateResult, ProstMessageExt,
};
use arrow_flight::{FlightData, FlightDescriptor, PutResult};
use futures::stream;
use prost::Message;
use tonic::transport::Channel;
use tracing::debug;

use crate::error::{Error, Result};
use crate::session::SessionContext;
use crate::stream::ResultHandle;

pub(crate) fn command_descriptor<T: ProstMessageExt>(command: &T) -> FlightDescriptor {
    FlightDescriptor::new_cmd(command.as_any().encode_to_vec())
}

/// Asks the server to plan `descriptor` and returns the first endpoint's
/// ticket.
pub(crate) async fn flight_info(
    flight: &mut FlightServiceClient<Channel>,
    ctx: &SessionContext,
    descriptor: FlightDescriptor,
) -> Result<ResultHandle> {
    let request = ctx.request(descriptor)?;
    let info = flight
        .get_flight_info(request)
        .await
        .map_err(|status| ctx.status_error(status, Error::exec))?
        .into_inner();
    ResultHandle::from_flight_info(info)
}

/// Uploads `data` with `DoPut` and returns the first put result, if the
/// server sent one.
pub(crate) async fn put(
    flight: &mut FlightServiceClient<Channel>,
    ctx: &SessionContext,
    data: Vec<FlightData>,
) -> Result<Option<PutResult>> {
    let messages = data.len();
    let request = ctx.request(stream::iter(data))?;
    let mut results = flight
        .do_put(request)
        .await
        .map_err(|status| ctx.status_error(status, Error::exec))?
        .into_inner();
    let result = results
        .message()
        .await
        .map_err(|status| ctx.status_error(status, Error::exec))?;
    debug!(messages, answered = result.is_some(), "put completed");
    Ok(result)
}

/// Decodes a Flight SQL message that is either packed in an `Any` or sent
/// bare.
pub(crate) fn decode_message<T: ProstMessageExt>(payload: &[u8]) -> Result<T> {
    if let Ok(any) = Any::decode(payload) {
        if let Ok(Some(message)) = any.unpack::<T>() {
            return Ok(message);
        }
    }
    T::decode(payload)
        .map_err(|e| Error::InvalidResponse(format!("undecodable {}: {e}", T::type_url())))
}

pub(crate) fn decode_put_result<T: ProstMessageExt>(result: &PutResult) -> Result<T> {
    decode_message(result.app_metadata.as_ref())
}

pub(crate) async fn execute(
    flight: &mut FlightServiceClient<Channel>,
    ctx: &SessionContext,
    sql: &str,
) -> Result<ResultHandle> {
    let command = CommandStatementQuery {
        query: sql.to_string(),
        transaction_id: None,
    };
    ctx.scoped(flight_info(flight, ctx, command_descriptor(&command)))
        .await
}

pub(crate) async fn execute_update(
    flight: &mut FlightServiceClient<Channel>,
    ctx: &SessionContext,
    sql: &str,
) -> Result<i64> {
    let command = CommandStatementUpdate {
        query: sql.to_string(),
        transaction_id: None,
    };
    let data = FlightData {
        flight_descriptor: Some(command_descriptor(&command)),
        ..FlightData::default()
    };
    ctx.scoped(async {
        let result = put(flight, ctx, vec![data]).await?.ok_or_else(|| {
            Error::InvalidResponse("server sent no result for an update".to_string())
        })?;
        let update: DoPutUpdateResult = decode_put_result(&result)?;
        Ok(update.record_count)
    })
    .await
}
