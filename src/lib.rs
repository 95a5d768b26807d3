pub mod aggregate;
pub mod chart;
pub mod cli;
pub mod columns;
pub mod compose;
pub mod error;
pub mod input;
pub mod normalize;
pub mod pdf;
pub mod report;

use std::{env, process::ExitCode, sync::OnceLock};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, error::ErrorKind};
use log::{LevelFilter, debug, info};

pub use crate::error::{DataError, InputError, RenderError, SchemaError};
pub use crate::report::{ReportOptions, ReportOutcome, generate};

use crate::{cli::Cli, input::InputFormat};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_report", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<ExitCode> {
    init_logging();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.kind() == ErrorKind::MissingRequiredArgument => {
            println!("{}", Cli::command().render_usage());
            return Ok(ExitCode::FAILURE);
        }
        Err(err) => err.exit(),
    };
    debug!("Parsed arguments: {cli:?}");

    let options = cli.report_options().context("Preparing report options")?;
    match input::detect_format(&options.input) {
        InputFormat::Delimited => info!(
            "Reading '{}' (delimiter '{}', encoding {})",
            options.input.display(),
            printable_delimiter(input::resolve_input_delimiter(
                &options.input,
                options.input_options.delimiter
            )),
            options.input_options.encoding.name()
        ),
        InputFormat::Workbook => info!(
            "Reading workbook '{}' (sheet {})",
            options.input.display(),
            options
                .input_options
                .sheet
                .as_deref()
                .map(|sheet| format!("'{sheet}'"))
                .unwrap_or_else(|| "#1".to_string())
        ),
    }
    let outcome = report::generate(&options)?;
    info!(
        "{} row(s), {} product(s), {} month(s), total sales {}",
        outcome.rows, outcome.products, outcome.months, outcome.total_sales
    );
    println!("Relatório gerado: {}", outcome.output.display());
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
