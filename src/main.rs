//! Quill - read-only SQL validation and execution.

mod cli;

use cli::{Cli, Command};
use db_quill::config::Config;
use db_quill::db::ConnectionParams;
use db_quill::error::{QuillError, Result};
use db_quill::llm::{query_suggestions, LlmSettings};
use db_quill::logging;
use db_quill::query::QueryExecutor;
use db_quill::safety::validation_report;
use serde::Serialize;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    logging::init_stderr_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;

    let executor = QueryExecutor::new(&config.executor);

    match &cli.command {
        Command::Validate { sql } => {
            let report = validation_report(sql);
            print_json(&report)?;
            if !report.valid {
                return Err(QuillError::validation_rejected(report.message));
            }
        }
        Command::Query { sql } => {
            let params = connection_params(&cli, &config)?;
            let result = executor.submit(&params, sql).await?;
            print_json(&result)?;
        }
        Command::Schema { text } => {
            let params = connection_params(&cli, &config)?;
            let schema = executor.discover_schema(&params).await?;
            if *text {
                print!("{}", schema.format_for_display());
            } else {
                print_json(&schema)?;
            }
        }
        Command::TestConnection => {
            let params = connection_params(&cli, &config)?;
            executor.test_connection(&params).await?;
            println!("Connection successful: {}", params.display_string());
        }
        Command::Suggest => {
            let params = connection_params(&cli, &config)?;
            let schema = executor.discover_schema(&params).await?;
            if schema.is_empty() {
                return Err(QuillError::schema_discovery("Database schemas are required"));
            }
            for suggestion in query_suggestions(&schema) {
                println!("{suggestion}");
            }
        }
        Command::LlmStatus => {
            let settings = LlmSettings::from_env(&config.llm)?;
            print_json(&settings.status())?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| QuillError::internal(format!("Failed to serialize output: {e}")))?;
    println!("{json}");
    Ok(())
}

/// Resolves connection parameters, failing when nothing is configured.
fn connection_params(cli: &Cli, config: &Config) -> Result<ConnectionParams> {
    let mut connection = cli.resolve_connection(config)?.ok_or_else(|| {
        QuillError::config(
            "No database connection configured. Use --url, --file or --help for usage information.",
        )
    })?;
    connection.apply_env_defaults();
    info!("Connection: {}", connection.display_string());
    connection.to_params()
}
