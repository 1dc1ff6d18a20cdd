mod config;

/// Version injected at compile time via AWSQL_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("AWSQL_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{Context, Result};
use awsql::aws::client::{AwsClient, ClientOptions};
use awsql::aws::http::format_aws_error;
use awsql::query::quals::parse_predicate;
use awsql::query::{execute, CollectSink, JsonLinesSink, QueryRequest, QuerySummary};
use awsql::table::{get_all_table_names, get_table, Require, TableDef};
use awsql::QueryError;
use clap::{Parser, Subcommand, ValueEnum};
use config::{Config, OutputFormat};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Query AWS resources as tables
#[derive(Parser, Debug)]
#[command(name = "awsql", version, about, long_about = None)]
struct Args {
    /// AWS region to query
    #[arg(short, long, global = true)]
    region: Option<String>,

    /// AWS profile for credentials and default region
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Send all requests to this endpoint (LocalStack and similar)
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available tables
    Tables,

    /// Show a table's columns and key columns
    Describe {
        /// Table name
        table: String,
    },

    /// Scan a table
    Query {
        /// Table name
        table: String,

        /// Predicate: col=value, col<>value or col=[a,b] (repeatable)
        #[arg(short = 'w', long = "where")]
        predicates: Vec<String>,

        /// Columns to return, comma separated (default: all)
        #[arg(short, long, value_delimiter = ',')]
        columns: Vec<String>,

        /// Stop after this many rows
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum)]
        output: Option<OutputFormat>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> Option<&'static str> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some("error"),
            LogLevel::Warn => Some("warn"),
            LogLevel::Info => Some("info"),
            LogLevel::Debug => Some("debug"),
            LogLevel::Trace => Some("trace"),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = level.as_filter()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {}: {}", log_path.display(), e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // AWSQL_LOG takes full EnvFilter directives, e.g. "awsql::aws=trace"
    let env_filter =
        EnvFilter::try_from_env("AWSQL_LOG").unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("awsql {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("awsql").join("awsql.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".awsql").join("awsql.log");
    }
    PathBuf::from("awsql.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        tracing::error!("{:#}", err);
        let message = match err.downcast_ref::<QueryError>() {
            Some(query_err) => format_aws_error(query_err),
            None => format!("{:#}", err),
        };
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    match &args.command {
        Command::Tables => print_tables(),
        Command::Describe { table } => describe_table(table),
        Command::Query {
            table,
            predicates,
            columns,
            limit,
            output,
        } => {
            let config = Config::load();
            let client = connect(&args, &config).await?;
            let request = build_request(table, predicates, columns, *limit)?;
            let format = config.effective_output(*output);
            let summary = run_query(&client, &request, format).await?;
            tracing::info!(
                "query {} finished: {} rows, {} pages",
                summary.query_id,
                summary.rows,
                summary.pages
            );
            Ok(())
        }
    }
}

async fn connect(args: &Args, config: &Config) -> Result<AwsClient> {
    let profile = config.effective_profile(args.profile.as_deref());
    let region = config.effective_region(args.region.as_deref(), &profile);
    tracing::info!("Using profile: {}, region: {}", profile, region);

    let options = ClientOptions {
        profile,
        region,
        endpoint_url: config.effective_endpoint_url(args.endpoint_url.as_deref()),
        request_timeout: config.request_timeout(),
        credentials: None,
    };
    AwsClient::new(options)
        .await
        .context("Failed to initialize AWS client")
}

fn lookup_table(name: &str) -> Result<&'static TableDef> {
    get_table(name).ok_or_else(|| anyhow::Error::from(QueryError::UnknownTable(name.to_string())))
}

fn build_request(
    table_name: &str,
    predicates: &[String],
    columns: &[String],
    limit: Option<usize>,
) -> Result<QueryRequest> {
    let table = lookup_table(table_name)?;
    let quals = predicates
        .iter()
        .map(|expr| {
            parse_predicate(table_name, expr, |column| {
                table.column(column).map(|c| c.column_type)
            })
        })
        .collect::<awsql::Result<Vec<_>>>()?;

    Ok(QueryRequest {
        table: table_name.to_string(),
        columns: columns.to_vec(),
        quals,
        limit,
    })
}

async fn run_query(
    client: &AwsClient,
    request: &QueryRequest,
    format: OutputFormat,
) -> Result<QuerySummary> {
    let stdout = io::stdout();

    match format {
        OutputFormat::Jsonl => {
            let mut sink = JsonLinesSink::new(stdout.lock());
            Ok(execute(client, request, &mut sink).await?)
        }
        OutputFormat::Json | OutputFormat::Yaml => {
            let mut sink = CollectSink::new();
            let summary = execute(client, request, &mut sink).await?;
            let rows = sink.into_rows();

            let mut out = stdout.lock();
            if format == OutputFormat::Json {
                serde_json::to_writer_pretty(&mut out, &rows)?;
                writeln!(out)?;
            } else {
                serde_yaml::to_writer(&mut out, &rows)?;
            }
            Ok(summary)
        }
    }
}

fn print_tables() -> Result<()> {
    let mut out = io::stdout().lock();
    for name in get_all_table_names() {
        let table = lookup_table(name)?;
        writeln!(out, "{:<48} {}", name, table.description)?;
    }
    Ok(())
}

fn describe_table(name: &str) -> Result<()> {
    let table = lookup_table(name)?;
    let mut out = io::stdout().lock();

    writeln!(out, "{}\n{}\n", table.name, table.description)?;
    for column in &table.columns {
        writeln!(
            out,
            "  {:<24} {:<10} {}",
            column.name,
            column.column_type.as_str(),
            column.description
        )?;
    }

    let operations = [Some(("list", &table.list)), table.get.as_ref().map(|g| ("get", g))];
    for (label, operation) in operations.into_iter().flatten() {
        if operation.key_columns.is_empty() {
            continue;
        }
        writeln!(out, "\n{} key columns:", label)?;
        for key in &operation.key_columns {
            let require = match key.require {
                Require::Required => "required",
                Require::Optional => "optional",
            };
            writeln!(
                out,
                "  {:<24} {:<10} {}",
                key.name,
                require,
                key.operators.join(" ")
            )?;
        }
    }
    Ok(())
}
