//! Walks through the main client operations against a local Datalayers
//! server. Set `DATALAYERS_TLS_CERT` to connect over TLS.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow_array::{ArrayRef, Float32Array, Int32Array, Int8Array, TimestampMillisecondArray};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use chrono::{FixedOffset, TimeZone};
use comfy_table::Table;
use datalayers_client::{affected_rows, Batch, Client, ClientConfig, ParameterBatch};

const TIMEZONE: &str = "Asia/Shanghai";

fn print_batches(batches: &[Batch]) -> Result<()> {
    let Some(first) = batches.first() else {
        println!("(No rows returned)");
        return Ok(());
    };
    let mut table = Table::new();
    table.set_header(first.schema().fields().iter().map(|field| field.name().clone()));
    for batch in batches {
        for row in batch.rows()? {
            table.add_row(row.iter().map(ToString::to_string));
        }
    }
    println!("{table}");
    Ok(())
}

fn insert_binding() -> Result<ParameterBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new(
            "ts",
            DataType::Timestamp(TimeUnit::Millisecond, Some(TIMEZONE.into())),
            false,
        ),
        Field::new("sid", DataType::Int32, true),
        Field::new("value", DataType::Float32, true),
        Field::new("flag", DataType::Int8, true),
    ]));

    let offset = FixedOffset::east_opt(8 * 60 * 60).context("invalid offset")?;
    let ts = [0, 5, 10, 15, 20]
        .into_iter()
        .map(|minute| {
            offset
                .with_ymd_and_hms(2024, 9, 2, 10, minute, 0)
                .single()
                .map(|t| t.timestamp_millis())
                .context("invalid timestamp")
        })
        .collect::<Result<Vec<_>>>()?;

    let columns: Vec<ArrayRef> = vec![
        Arc::new(TimestampMillisecondArray::from(ts).with_timezone(TIMEZONE)),
        Arc::new(Int32Array::from(vec![1, 2, 3, 4, 5])),
        Arc::new(Float32Array::from(vec![12.5, 15.3, 9.8, 22.1, 30.0])),
        Arc::new(Int8Array::from(vec![0, 1, 0, 1, 0])),
    ];
    Ok(ParameterBatch::try_new(schema, columns)?)
}

fn query_binding(sid: i32) -> Result<ParameterBatch> {
    let schema = Arc::new(Schema::new(vec![Field::new("sid", DataType::Int32, true)]));
    Ok(ParameterBatch::try_new(
        schema,
        vec![Arc::new(Int32Array::from(vec![sid]))],
    )?)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .compact()
        .init();

    let config = ClientConfig::load()?;
    let client = Client::connect(&config).await?;

    let result = client.query("CREATE DATABASE rust").await?;
    println!("Affected rows: {}", affected_rows(&result)?);

    // The statements below name the database explicitly, so selecting it
    // is optional.
    let client = client.with_database("rust");

    let result = client
        .query(
            r#"
            CREATE TABLE rust.demo (
                ts TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                sid INT32,
                value REAL,
                flag INT8,
                timestamp key(ts)
            )
            PARTITION BY HASH(sid) PARTITIONS 8
            ENGINE=TimeSeries;
            "#,
        )
        .await?;
    println!("Affected rows: {}", affected_rows(&result)?);

    let result = client
        .query(
            r#"
            INSERT INTO rust.demo (ts, sid, value, flag) VALUES
                ('2024-09-01T10:00:00+08:00', 1, 12.5, 0),
                ('2024-09-01T10:05:00+08:00', 2, 15.3, 1),
                ('2024-09-01T10:10:00+08:00', 3, 9.8, 0),
                ('2024-09-01T10:15:00+08:00', 4, 22.1, 1),
                ('2024-09-01T10:20:00+08:00', 5, 30.0, 0);
            "#,
        )
        .await?;
    println!("Affected rows: {}", affected_rows(&result)?);

    print_batches(&client.query("SELECT * FROM rust.demo").await?)?;

    let mut insert = client
        .prepare("INSERT INTO rust.demo (ts, sid, value, flag) VALUES (?, ?, ?, ?);")
        .await?;
    let result = client.execute_prepared(&mut insert, insert_binding()?).await?;
    println!("Affected rows: {}", affected_rows(&result)?);
    client.close_prepared(&mut insert).await?;

    let mut select = client
        .prepare("SELECT * FROM rust.demo WHERE sid = ?")
        .await?;
    for sid in [1, 2] {
        print_batches(&client.execute_prepared(&mut select, query_binding(sid)?).await?)?;
    }
    client.close_prepared(&mut select).await?;

    let affected = client
        .execute_update(
            r#"
            INSERT INTO rust.demo (ts, sid, value, flag) VALUES
                ('2024-09-03T10:00:00+08:00', 1, 4.5, 0),
                ('2024-09-03T10:05:00+08:00', 2, 11.6, 1);
            "#,
        )
        .await?;
    println!("Affected rows: {affected}");

    print_batches(
        &client
            .query("SELECT * FROM rust.demo where ts >= '2024-09-03T10:00:00+08:00'")
            .await?,
    )?;

    println!("\nFinished, thank you!");
    Ok(())
}
