//! Datalayers CLI - Interactive SQL client for Datalayers over Flight SQL

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, CellAlignment, Color,
    ContentArrangement, Table,
};
use datalayers_client::blocking::Client;
use datalayers_client::{affected_rows, total_rows, Batch, ClientConfig};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Datalayers CLI - Interactive SQL client
#[derive(Parser, Debug)]
#[command(name = "datalayers-cli")]
#[command(about = "Interactive SQL client for Datalayers", long_about = None)]
struct Args {
    /// Server hostname (overrides DATALAYERS_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides DATALAYERS_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    #[arg(short, long)]
    username: Option<String>,

    #[arg(long, env = "DATALAYERS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// PEM certificate; enables TLS
    #[arg(long)]
    tls_cert: Option<PathBuf>,

    /// Database selected after login
    #[arg(long)]
    database: Option<String>,

    /// SQL to execute (if provided, runs in non-interactive mode)
    #[arg(short, long)]
    query: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

impl Args {
    fn apply(&self, config: &mut ClientConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(username) = &self.username {
            config.username = username.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if self.tls_cert.is_some() {
            config.tls_cert = self.tls_cert.clone();
        }
        if self.database.is_some() {
            config.database = self.database.clone();
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .compact()
        .init();

    let mut config = ClientConfig::load()?;
    args.apply(&mut config);
    config.validate()?;

    println!("Connecting to Datalayers at {}...", config.endpoint_uri());
    let client = Client::connect(&config).context("Failed to connect to Datalayers server")?;
    println!("Connected successfully!\n");

    if let Some(query) = &args.query {
        execute_and_display(&client, query)?;
    } else {
        interactive_mode(client, args.debug)?;
    }

    Ok(())
}

fn interactive_mode(mut client: Client, debug: bool) -> Result<()> {
    println!("Datalayers Interactive SQL Shell");
    println!("Type SQL and press Enter. `USE <database>` switches the database.");
    println!("Type 'exit' or 'quit' to exit. Press Ctrl-C twice to exit.\n");

    let mut rl = DefaultEditor::new()?;
    let history_file = dirs::home_dir()
        .map(|mut p| {
            p.push(".datalayers_history");
            p
        })
        .unwrap_or_default();

    if history_file.exists() {
        let _ = rl.load_history(&history_file);
    }

    let mut interrupt_count = 0;

    loop {
        let prompt = match client.context().database() {
            Some(database) => format!("datalayers:{database}> "),
            None => "datalayers> ".to_string(),
        };
        match rl.readline(&prompt) {
            Ok(line) => {
                interrupt_count = 0;

                let query = line.trim();
                if query.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(query);

                if query.eq_ignore_ascii_case("exit") || query.eq_ignore_ascii_case("quit") {
                    println!("Goodbye!");
                    break;
                }

                if let Some(database) = use_database(query) {
                    client = client.with_database(database);
                    println!("Database changed to {database}");
                    continue;
                }

                if let Err(e) = execute_and_display(&client, query) {
                    eprintln!("Error: {}", e);
                    if debug {
                        eprintln!("Details: {:?}", e);
                    }
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                interrupt_count += 1;
                if interrupt_count >= 2 {
                    println!("\nGoodbye!");
                    break;
                }
                println!("^C (press Ctrl-C again to exit)");
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Error reading input: {}", err);
                break;
            }
        }
    }

    if !history_file.as_os_str().is_empty() {
        let _ = rl.save_history(&history_file);
    }

    Ok(())
}

/// Recognizes `USE <database>` with an optional trailing semicolon.
fn use_database(sql: &str) -> Option<&str> {
    let mut words = sql.trim_end_matches(';').split_whitespace();
    let keyword = words.next()?;
    let database = words.next()?;
    if keyword.eq_ignore_ascii_case("use") && words.next().is_none() {
        Some(database.trim_matches('`'))
    } else {
        None
    }
}

fn execute_and_display(client: &Client, query: &str) -> Result<()> {
    let start = Instant::now();
    let batches = client.query(query)?;
    let elapsed = start.elapsed();

    if is_query_statement(query) {
        if batches.is_empty() {
            println!("(No rows returned)");
        } else {
            display_results(&batches)?;
        }
        let rows = total_rows(&batches);
        println!(
            "{} row{} in {:.3}s",
            rows,
            if rows == 1 { "" } else { "s" },
            elapsed.as_secs_f64()
        );
    } else {
        match affected_rows(&batches) {
            Ok(rows) => println!("{} row{} affected", rows, if rows == 1 { "" } else { "s" }),
            Err(_) => println!("Statement executed successfully"),
        }
        println!("{:.3}s", elapsed.as_secs_f64());
    }

    Ok(())
}

fn is_query_statement(sql: &str) -> bool {
    let normalized = sql
        .lines()
        .map(|line| match line.find("--") {
            Some(pos) => &line[..pos],
            None => line,
        })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_uppercase();

    ["SELECT", "WITH", "SHOW", "DESCRIBE", "DESC", "EXPLAIN"]
        .iter()
        .any(|keyword| normalized.starts_with(keyword))
}

fn display_results(batches: &[Batch]) -> Result<()> {
    let Some(first) = batches.first() else {
        return Ok(());
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = first
        .schema()
        .fields()
        .iter()
        .map(|field| {
            Cell::new(field.name())
                .fg(Color::Cyan)
                .set_alignment(CellAlignment::Center)
        })
        .collect();
    table.set_header(header_cells);

    for batch in batches {
        for row in batch.rows()? {
            table.add_row(row.iter().map(|value| Cell::new(value.to_string())));
        }
    }

    println!("{}", table);
    Ok(())
}
