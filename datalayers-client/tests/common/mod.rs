//! In-process Flight SQL server that mimics the parts of Datalayers the
//! client talks to: basic-auth handshake, a `database` header, and a tiny
//! in-memory store for the `demo` table layout.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, Int32Type, Int8Type, TimestampMillisecondType};
use arrow_array::{
    Array, Float32Array, Int32Array, Int64Array, Int8Array, RecordBatch, TimestampMillisecondArray,
};
use arrow_flight::decode::FlightRecordBatchStream;
use arrow_flight::error::FlightError;
use arrow_flight::flight_service_server::{FlightService, FlightServiceServer};
use arrow_flight::sql::server::{FlightSqlService, PeekableFlightDataStream};
use arrow_flight::sql::{
    ActionClosePreparedStatementRequest, ActionCreatePreparedStatementRequest,
    ActionCreatePreparedStatementResult, CommandPreparedStatementQuery,
    CommandPreparedStatementUpdate, CommandStatementQuery, CommandStatementUpdate,
    DoPutPreparedStatementResult, ProstMessageExt, SqlInfo, TicketStatementQuery,
};
use arrow_flight::utils::batches_to_flight_data;
use arrow_flight::{
    Action, FlightDescriptor, FlightEndpoint, FlightInfo, HandshakeRequest, HandshakeResponse,
    IpcMessage, SchemaAsIpc, Ticket,
};
use arrow_ipc::writer::IpcWriteOptions;
use arrow_schema::{DataType, Field, Schema, SchemaRef, TimeUnit};
use base64::prelude::{Engine, BASE64_STANDARD};
use datalayers_client::ClientConfig;
use futures::{stream, Stream, TryStreamExt};
use prost::bytes::Bytes;
use prost::Message;
use tokio::net::TcpListener;
use tonic::metadata::AsciiMetadataValue;
use tonic::transport::Server;
use tonic::{Request, Response, Status, Streaming};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "public";
pub const TOKEN: &str = "datalayers-test-token";
pub const TIMEZONE: &str = "Asia/Shanghai";

/// Rows per batch returned by a select, so larger results span batches.
const BATCH_ROWS: usize = 3;
const SLEEP_SECS: u64 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub ts: i64,
    pub sid: Option<i32>,
    pub value: Option<f32>,
    pub flag: Option<i8>,
}

pub fn demo_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(
            "ts",
            DataType::Timestamp(TimeUnit::Millisecond, Some(TIMEZONE.into())),
            false,
        ),
        Field::new("sid", DataType::Int32, true),
        Field::new("value", DataType::Float32, true),
        Field::new("flag", DataType::Int8, true),
    ]))
}

fn affected_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![Field::new(
        "affected_rows",
        DataType::Int64,
        false,
    )]))
}

fn sid_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![Field::new("sid", DataType::Int32, true)]))
}

fn internal(message: &str) -> Status {
    Status::internal(format!(
        "status: Internal, message: \"{message} at src/dbserver/src/sql/mod.rs:42\", details: []"
    ))
}

enum Outcome {
    Affected(i64),
    Rows(Vec<Row>),
}

impl Outcome {
    fn into_batches(self) -> Result<(SchemaRef, Vec<RecordBatch>), Status> {
        match self {
            Outcome::Affected(count) => {
                let schema = affected_schema();
                let batch = RecordBatch::try_new(
                    schema.clone(),
                    vec![Arc::new(Int64Array::from(vec![count]))],
                )
                .map_err(|e| Status::internal(e.to_string()))?;
                Ok((schema, vec![batch]))
            }
            Outcome::Rows(rows) => {
                let schema = demo_schema();
                let batches = rows
                    .chunks(BATCH_ROWS)
                    .map(|chunk| rows_to_batch(&schema, chunk))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((schema, batches))
            }
        }
    }
}

fn rows_to_batch(schema: &SchemaRef, rows: &[Row]) -> Result<RecordBatch, Status> {
    RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(
                TimestampMillisecondArray::from(rows.iter().map(|r| r.ts).collect::<Vec<_>>())
                    .with_timezone(TIMEZONE),
            ),
            Arc::new(Int32Array::from(rows.iter().map(|r| r.sid).collect::<Vec<_>>())),
            Arc::new(Float32Array::from(rows.iter().map(|r| r.value).collect::<Vec<_>>())),
            Arc::new(Int8Array::from(rows.iter().map(|r| r.flag).collect::<Vec<_>>())),
        ],
    )
    .map_err(|e| Status::internal(e.to_string()))
}

fn rows_from_params(params: &[RecordBatch]) -> Result<Vec<Row>, Status> {
    let mut rows = Vec::new();
    for batch in params {
        if batch.num_columns() != 4 {
            return Err(Status::invalid_argument(format!(
                "expected 4 parameters, got {}",
                batch.num_columns()
            )));
        }
        let mismatch = || Status::invalid_argument("parameter types do not match the table");
        let ts = batch
            .column(0)
            .as_primitive_opt::<TimestampMillisecondType>()
            .ok_or_else(mismatch)?;
        let sid = batch.column(1).as_primitive_opt::<Int32Type>().ok_or_else(mismatch)?;
        let value = batch.column(2).as_primitive_opt::<Float32Type>().ok_or_else(mismatch)?;
        let flag = batch.column(3).as_primitive_opt::<Int8Type>().ok_or_else(mismatch)?;
        for i in 0..batch.num_rows() {
            rows.push(Row {
                ts: ts.value(i),
                sid: sid.is_valid(i).then(|| sid.value(i)),
                value: value.is_valid(i).then(|| value.value(i)),
                flag: flag.is_valid(i).then(|| flag.value(i)),
            });
        }
    }
    Ok(rows)
}

fn sid_from_params(params: &[RecordBatch]) -> Result<i32, Status> {
    params
        .first()
        .filter(|batch| batch.num_rows() > 0 && batch.num_columns() > 0)
        .and_then(|batch| batch.column(0).as_primitive_opt::<Int32Type>())
        .map(|sid| sid.value(0))
        .ok_or_else(|| Status::invalid_argument("missing sid parameter"))
}

/// Splits the tuples after `VALUES` into trimmed, unquoted literals.
fn parse_tuples(values: &str) -> Vec<Vec<String>> {
    let mut tuples = Vec::new();
    let mut current: Option<Vec<String>> = None;
    let mut literal = String::new();
    let mut quoted = false;
    for c in values.chars() {
        match (c, quoted, current.is_some()) {
            ('\'', _, true) => quoted = !quoted,
            ('(', false, false) => current = Some(Vec::new()),
            (',', false, true) => {
                if let Some(tuple) = current.as_mut() {
                    tuple.push(literal.trim().to_string());
                }
                literal.clear();
            }
            (')', false, true) => {
                if let Some(mut tuple) = current.take() {
                    tuple.push(literal.trim().to_string());
                    tuples.push(tuple);
                }
                literal.clear();
            }
            (c, _, true) => literal.push(c),
            _ => {}
        }
    }
    tuples
}

fn parse_row(tuple: &[String]) -> Result<Row, Status> {
    let bad = |what: &str, raw: &str| internal(&format!("invalid {what} literal {raw}"));
    let [ts, sid, value, flag] = tuple else {
        return Err(internal(&format!("expected 4 values, got {}", tuple.len())));
    };
    let ts = chrono::DateTime::parse_from_rfc3339(ts)
        .map_err(|_| bad("timestamp", ts))?
        .timestamp_millis();
    let nullable = |raw: &String| (!raw.eq_ignore_ascii_case("null")).then_some(raw.clone());
    Ok(Row {
        ts,
        sid: nullable(sid)
            .map(|raw| raw.parse().map_err(|_| bad("sid", &raw)))
            .transpose()?,
        value: nullable(value)
            .map(|raw| raw.parse().map_err(|_| bad("value", &raw)))
            .transpose()?,
        flag: nullable(flag)
            .map(|raw| raw.parse().map_err(|_| bad("flag", &raw)))
            .transpose()?,
    })
}

/// `sid = N` or `sid = ?` after `WHERE`.
fn sid_filter(words: &[&str], params: &[RecordBatch]) -> Result<Option<i32>, Status> {
    match words {
        [] => Ok(None),
        [where_, "sid", "=", "?"] if where_.eq_ignore_ascii_case("where") => {
            sid_from_params(params).map(Some)
        }
        [where_, "sid", "=", literal] if where_.eq_ignore_ascii_case("where") => literal
            .parse()
            .map(Some)
            .map_err(|_| internal(&format!("invalid sid literal {literal}"))),
        _ => Err(internal(&format!("unsupported filter {}", words.join(" ")))),
    }
}

struct PreparedEntry {
    sql: String,
    params: Vec<RecordBatch>,
}

#[derive(Default)]
pub struct Store {
    databases: BTreeSet<String>,
    tables: BTreeMap<String, Vec<Row>>,
    pending: HashMap<u64, (String, Option<String>)>,
    statements: HashMap<u64, PreparedEntry>,
    next_id: u64,
    seen_databases: Vec<Option<String>>,
    closed: Vec<u64>,
}

impl Store {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn qualify(&self, name: &str, database: Option<&str>) -> Result<String, Status> {
        let qualified = match (name.contains('.'), database) {
            (true, _) => name.to_string(),
            (false, Some(database)) => format!("{database}.{name}"),
            (false, None) => return Err(internal(&format!("no database selected for {name}"))),
        };
        Ok(qualified)
    }

    fn table_mut(&mut self, name: &str, database: Option<&str>) -> Result<&mut Vec<Row>, Status> {
        let name = self.qualify(name, database)?;
        self.tables
            .get_mut(&name)
            .ok_or_else(|| internal(&format!("table {name} not found")))
    }

    fn run(
        &mut self,
        sql: &str,
        database: Option<&str>,
        params: &[RecordBatch],
    ) -> Result<Outcome, Status> {
        let normalized = sql.trim().trim_end_matches(';');
        let words: Vec<&str> = normalized.split_whitespace().collect();
        let upper: Vec<String> = words.iter().map(|w| w.to_ascii_uppercase()).collect();
        let upper: Vec<&str> = upper.iter().map(String::as_str).collect();

        match upper.as_slice() {
            ["CREATE", "DATABASE", ..] if words.len() == 3 => {
                self.databases.insert(words[2].to_string());
                Ok(Outcome::Affected(0))
            }
            ["CREATE", "TABLE", ..] if words.len() > 2 => {
                let name = words[2].trim_end_matches('(');
                let name = self.qualify(name, database)?;
                let owner = name.split('.').next().unwrap_or_default();
                if !self.databases.contains(owner) {
                    return Err(internal(&format!("database {owner} not found")));
                }
                self.tables.entry(name).or_default();
                Ok(Outcome::Affected(0))
            }
            ["INSERT", "INTO", ..] if words.len() > 2 => {
                let values_at = normalized
                    .to_ascii_uppercase()
                    .find("VALUES")
                    .ok_or_else(|| internal("INSERT without VALUES"))?;
                let values = &normalized[values_at + "VALUES".len()..];
                let rows = if values.contains('?') {
                    rows_from_params(params)?
                } else {
                    parse_tuples(values)
                        .iter()
                        .map(|tuple| parse_row(tuple))
                        .collect::<Result<Vec<_>, _>>()?
                };
                let count = rows.len() as i64;
                self.table_mut(words[2], database)?.extend(rows);
                Ok(Outcome::Affected(count))
            }
            ["SELECT", "*", "FROM", ..] if words.len() > 3 => {
                let filter = sid_filter(&words[4..], params)?;
                let rows = self
                    .table_mut(words[3], database)?
                    .iter()
                    .filter(|row| filter.map_or(true, |sid| row.sid == Some(sid)))
                    .cloned()
                    .collect();
                Ok(Outcome::Rows(rows))
            }
            ["DELETE", "FROM", ..] if words.len() > 2 => {
                let filter = sid_filter(&words[3..], params)?;
                let table = self.table_mut(words[2], database)?;
                let before = table.len();
                table.retain(|row| !filter.map_or(true, |sid| row.sid == Some(sid)));
                Ok(Outcome::Affected((before - table.len()) as i64))
            }
            _ => Err(internal(&format!("sql parser error: {normalized}"))),
        }
    }
}

fn is_sleep(sql: &str) -> bool {
    sql.trim().to_ascii_uppercase().starts_with("SELECT SLEEP")
}

fn handle_bytes(id: u64) -> Bytes {
    Bytes::copy_from_slice(&id.to_be_bytes())
}

fn handle_id(bytes: &[u8]) -> Result<u64, Status> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Status::invalid_argument("invalid prepared statement handle"))?;
    Ok(u64::from_be_bytes(raw))
}

fn schema_bytes(schema: &Schema) -> Result<Bytes, Status> {
    let message: IpcMessage = SchemaAsIpc::new(schema, &IpcWriteOptions::default())
        .try_into()
        .map_err(|e: arrow_schema::ArrowError| Status::internal(e.to_string()))?;
    Ok(message.0)
}

fn ticket_info<T: ProstMessageExt>(ticket: &T) -> FlightInfo {
    let ticket = Ticket::new(ticket.as_any().encode_to_vec());
    FlightInfo::new().with_endpoint(FlightEndpoint::new().with_ticket(ticket))
}

type DoGetStream = <MockDatalayers as FlightService>::DoGetStream;

fn into_stream(outcome: Outcome) -> Result<Response<DoGetStream>, Status> {
    let (schema, batches) = outcome.into_batches()?;
    let data =
        batches_to_flight_data(&schema, batches).map_err(|e| Status::internal(e.to_string()))?;
    let output: DoGetStream = Box::pin(stream::iter(data.into_iter().map(Ok)));
    Ok(Response::new(output))
}

async fn read_params(
    request: Request<PeekableFlightDataStream>,
) -> Result<Vec<RecordBatch>, Status> {
    let data = request.into_inner().map_err(FlightError::from);
    FlightRecordBatchStream::new_from_flight_data(data)
        .try_collect()
        .await
        .map_err(|e| Status::invalid_argument(format!("undecodable parameters: {e}")))
}

#[derive(Clone, Default)]
pub struct MockDatalayers {
    store: Arc<Mutex<Store>>,
}

impl MockDatalayers {
    fn store(&self) -> MutexGuard<'_, Store> {
        match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Checks the bearer token and returns the `database` header.
    fn authorize<T>(&self, request: &Request<T>) -> Result<Option<String>, Status> {
        let metadata = request.metadata();
        let token = metadata
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if token != Some(TOKEN) {
            return Err(Status::unauthenticated("invalid token"));
        }
        let database = metadata
            .get("database")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.store().seen_databases.push(database.clone());
        Ok(database)
    }
}

#[tonic::async_trait]
impl FlightSqlService for MockDatalayers {
    type FlightService = MockDatalayers;

    async fn do_handshake(
        &self,
        request: Request<Streaming<HandshakeRequest>>,
    ) -> Result<
        Response<Pin<Box<dyn Stream<Item = Result<HandshakeResponse, Status>> + Send>>>,
        Status,
    > {
        let expected = format!(
            "Basic {}",
            BASE64_STANDARD.encode(format!("{USERNAME}:{PASSWORD}"))
        );
        let provided = request
            .metadata()
            .get("authorization")
            .and_then(|value| value.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(Status::unauthenticated("invalid username or password"));
        }

        let payload = HandshakeResponse {
            protocol_version: 0,
            payload: Bytes::from_static(TOKEN.as_bytes()),
        };
        let output: Pin<Box<dyn Stream<Item = Result<HandshakeResponse, Status>> + Send>> =
            Box::pin(stream::iter(vec![Ok(payload)]));
        let mut response = Response::new(output);
        let bearer = AsciiMetadataValue::try_from(format!("Bearer {TOKEN}"))
            .map_err(|e| Status::internal(e.to_string()))?;
        response.metadata_mut().insert("authorization", bearer);
        Ok(response)
    }

    async fn get_flight_info_statement(
        &self,
        query: CommandStatementQuery,
        request: Request<FlightDescriptor>,
    ) -> Result<Response<FlightInfo>, Status> {
        let database = self.authorize(&request)?;
        if is_sleep(&query.query) {
            tokio::time::sleep(Duration::from_secs(SLEEP_SECS)).await;
        }
        let id = {
            let mut store = self.store();
            let id = store.next_id();
            store.pending.insert(id, (query.query, database));
            id
        };
        let ticket = TicketStatementQuery {
            statement_handle: handle_bytes(id),
        };
        Ok(Response::new(ticket_info(&ticket)))
    }

    async fn do_get_statement(
        &self,
        ticket: TicketStatementQuery,
        request: Request<Ticket>,
    ) -> Result<Response<<Self as FlightService>::DoGetStream>, Status> {
        self.authorize(&request)?;
        let id = handle_id(&ticket.statement_handle)?;
        let outcome = {
            let mut store = self.store();
            let (sql, database) = store
                .pending
                .remove(&id)
                .ok_or_else(|| Status::not_found("ticket already redeemed"))?;
            store.run(&sql, database.as_deref(), &[])?
        };
        into_stream(outcome)
    }

    async fn do_put_statement_update(
        &self,
        command: CommandStatementUpdate,
        request: Request<PeekableFlightDataStream>,
    ) -> Result<i64, Status> {
        let database = self.authorize(&request)?;
        match self.store().run(&command.query, database.as_deref(), &[])? {
            Outcome::Affected(count) => Ok(count),
            Outcome::Rows(_) => Err(internal("query sent as an update")),
        }
    }

    async fn do_action_create_prepared_statement(
        &self,
        query: ActionCreatePreparedStatementRequest,
        request: Request<Action>,
    ) -> Result<ActionCreatePreparedStatementResult, Status> {
        self.authorize(&request)?;
        let upper = query.query.trim().to_ascii_uppercase();
        let (dataset_schema, parameter_schema) = if upper.starts_with("INSERT") {
            (affected_schema(), demo_schema())
        } else if upper.starts_with("SELECT") {
            let parameters = if upper.contains('?') {
                sid_schema()
            } else {
                Arc::new(Schema::empty())
            };
            (demo_schema(), parameters)
        } else {
            return Err(internal(&format!("cannot prepare {}", query.query)));
        };

        let mut store = self.store();
        let id = store.next_id();
        store.statements.insert(
            id,
            PreparedEntry {
                sql: query.query,
                params: Vec::new(),
            },
        );
        Ok(ActionCreatePreparedStatementResult {
            prepared_statement_handle: handle_bytes(id),
            dataset_schema: schema_bytes(&dataset_schema)?,
            parameter_schema: schema_bytes(&parameter_schema)?,
        })
    }

    async fn do_put_prepared_statement_query(
        &self,
        query: CommandPreparedStatementQuery,
        request: Request<PeekableFlightDataStream>,
    ) -> Result<DoPutPreparedStatementResult, Status> {
        self.authorize(&request)?;
        let id = handle_id(&query.prepared_statement_handle)?;
        let params = read_params(request).await?;
        let mut store = self.store();
        let entry = store
            .statements
            .get_mut(&id)
            .ok_or_else(|| Status::invalid_argument("unknown prepared statement"))?;
        entry.params = params;
        Ok(DoPutPreparedStatementResult {
            prepared_statement_handle: Some(query.prepared_statement_handle),
        })
    }

    async fn get_flight_info_prepared_statement(
        &self,
        query: CommandPreparedStatementQuery,
        request: Request<FlightDescriptor>,
    ) -> Result<Response<FlightInfo>, Status> {
        self.authorize(&request)?;
        let id = handle_id(&query.prepared_statement_handle)?;
        if !self.store().statements.contains_key(&id) {
            return Err(Status::invalid_argument("unknown prepared statement"));
        }
        Ok(Response::new(ticket_info(&query)))
    }

    async fn do_get_prepared_statement(
        &self,
        query: CommandPreparedStatementQuery,
        request: Request<Ticket>,
    ) -> Result<Response<<Self as FlightService>::DoGetStream>, Status> {
        let database = self.authorize(&request)?;
        let id = handle_id(&query.prepared_statement_handle)?;
        let outcome = {
            let mut store = self.store();
            let entry = store
                .statements
                .get_mut(&id)
                .ok_or_else(|| Status::invalid_argument("unknown prepared statement"))?;
            let sql = entry.sql.clone();
            let params = std::mem::take(&mut entry.params);
            store.run(&sql, database.as_deref(), &params)?
        };
        into_stream(outcome)
    }

    async fn do_put_prepared_statement_update(
        &self,
        query: CommandPreparedStatementUpdate,
        request: Request<PeekableFlightDataStream>,
    ) -> Result<i64, Status> {
        let database = self.authorize(&request)?;
        let id = handle_id(&query.prepared_statement_handle)?;
        let params = read_params(request).await?;
        let mut store = self.store();
        let sql = store
            .statements
            .get(&id)
            .map(|entry| entry.sql.clone())
            .ok_or_else(|| Status::invalid_argument("unknown prepared statement"))?;
        match store.run(&sql, database.as_deref(), &params)? {
            Outcome::Affected(count) => Ok(count),
            Outcome::Rows(_) => Err(internal("query sent as an update")),
        }
    }

    async fn do_action_close_prepared_statement(
        &self,
        query: ActionClosePreparedStatementRequest,
        request: Request<Action>,
    ) -> Result<(), Status> {
        self.authorize(&request)?;
        let id = handle_id(&query.prepared_statement_handle)?;
        let mut store = self.store();
        store
            .statements
            .remove(&id)
            .ok_or_else(|| Status::invalid_argument("unknown prepared statement"))?;
        store.closed.push(id);
        Ok(())
    }

    async fn register_sql_info(&self, _id: i32, _result: &SqlInfo) {}
}

/// A running mock server.
pub struct TestServer {
    pub addr: SocketAddr,
    service: MockDatalayers,
}

impl TestServer {
    pub async fn start() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let service = MockDatalayers::default();

        let incoming = stream::unfold(listener, |listener| async move {
            let accepted = listener.accept().await.map(|(socket, _)| socket);
            Some((accepted, listener))
        });
        let server = Server::builder()
            .add_service(FlightServiceServer::new(service.clone()))
            .serve_with_incoming(incoming);
        tokio::spawn(server);

        Ok(Self { addr, service })
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            host: self.addr.ip().to_string(),
            port: self.addr.port(),
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
            ..ClientConfig::default()
        }
    }

    /// `database` header observed on each authorized call, in order.
    pub fn seen_databases(&self) -> Vec<Option<String>> {
        self.service.store().seen_databases.clone()
    }

    pub fn clear_seen_databases(&self) {
        self.service.store().seen_databases.clear();
    }

    pub fn open_statements(&self) -> usize {
        self.service.store().statements.len()
    }

    pub fn closed_statements(&self) -> usize {
        self.service.store().closed.len()
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.service
            .store()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }
}

/// Creates `rust.demo` through the client.
pub async fn create_demo(client: &datalayers_client::Client) -> anyhow::Result<()> {
    client.query("CREATE DATABASE rust").await?;
    client
        .query(
            "CREATE TABLE rust.demo (ts TIMESTAMP NOT NULL, sid INT32, value REAL, flag INT8, \
             timestamp key(ts)) PARTITION BY HASH(sid) PARTITIONS 8 ENGINE=TimeSeries",
        )
        .await?;
    Ok(())
}

pub const INSERT_FIVE: &str = "INSERT INTO rust.demo (ts, sid, value, flag) VALUES \
    ('2024-09-01T10:00:00+08:00', 1, 12.5, 0), \
    ('2024-09-01T10:05:00+08:00', 2, 15.3, 1), \
    ('2024-09-01T10:10:00+08:00', 3, 9.8, 0), \
    ('2024-09-01T10:15:00+08:00', 4, 22.1, 1), \
    ('2024-09-01T10:20:00+08:00', 5, 30.0, 0);";

/// One parameter row per entry of `sids`, matching the `demo` layout.
pub fn insert_params(sids: &[i32]) -> anyhow::Result<RecordBatch> {
    let base = chrono::DateTime::parse_from_rfc3339("2024-09-02T10:00:00+08:00")?
        .timestamp_millis();
    let ts: Vec<i64> = sids
        .iter()
        .map(|sid| base + i64::from(*sid) * 300_000)
        .collect();
    let batch = RecordBatch::try_new(
        demo_schema(),
        vec![
            Arc::new(TimestampMillisecondArray::from(ts).with_timezone(TIMEZONE)),
            Arc::new(Int32Array::from(sids.to_vec())),
            Arc::new(Float32Array::from(vec![1.5; sids.len()])),
            Arc::new(Int8Array::from(vec![0; sids.len()])),
        ],
    )?;
    Ok(batch)
}

pub fn sid_param(sid: i32) -> anyhow::Result<RecordBatch> {
    Ok(RecordBatch::try_new(
        sid_schema(),
        vec![Arc::new(Int32Array::from(vec![sid]))],
    )?)
}
