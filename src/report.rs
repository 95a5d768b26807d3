use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use rust_decimal::Decimal;

use crate::{
    aggregate, chart,
    columns::resolve_columns,
    compose::{self, ReportCharts, ReportMetadata},
    input::{self, InputOptions},
    normalize::normalize_rows,
    pdf,
};

/// Everything needed for one report run.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub metadata: ReportMetadata,
    /// Bars in the top-products chart.
    pub top_n: usize,
    /// Rows in the product table.
    pub table_rows: usize,
    pub input_options: InputOptions,
}

impl ReportOptions {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            metadata: ReportMetadata::default(),
            top_n: chart::DEFAULT_TOP_N,
            table_rows: compose::DEFAULT_TABLE_ROWS,
            input_options: InputOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    pub output: PathBuf,
    pub rows: usize,
    pub products: usize,
    pub months: usize,
    pub total_sales: Decimal,
    pub pages: usize,
}

/// Runs the whole pipeline: load, resolve, normalize, aggregate, chart,
/// lay out and write the PDF. Nothing is written unless every earlier
/// stage succeeds.
pub fn generate(options: &ReportOptions) -> Result<ReportOutcome> {
    info!(
        "Generating sales report '{}' -> '{}'",
        options.input.display(),
        options.output.display()
    );

    let table = input::load_table(&options.input, &options.input_options)
        .with_context(|| format!("Loading sales data from {:?}", options.input))?;
    debug!(
        "Loaded {} row(s) with columns {:?}",
        table.row_count(),
        table.columns
    );

    let columns = resolve_columns(&table.columns)
        .with_context(|| format!("Resolving columns of {:?}", options.input))?;
    info!("Resolved columns: {}", columns.describe());

    let rows = normalize_rows(&table, &columns)
        .with_context(|| format!("Normalizing rows of {:?}", options.input))?;

    let products = aggregate::summarize_by_product(&rows);
    let months = aggregate::summarize_by_month(&rows);
    info!(
        "Aggregated {} row(s) into {} product(s) and {} month(s)",
        rows.len(),
        products.len(),
        months.len()
    );

    let charts = ReportCharts {
        top_products: chart::render_top_products(&products, options.top_n)
            .context("Rendering top products chart")?,
        monthly_sales: chart::render_monthly_sales(&months)
            .context("Rendering monthly sales chart")?,
    };

    let document = compose::build_document(
        &products,
        &months,
        charts,
        &options.metadata,
        options.table_rows,
    );
    debug!("Document laid out with {} block(s)", document.blocks.len());

    let pages = write_document(&document, &options.output)?;
    info!(
        "Report with {} page(s) written to {:?}",
        pages, options.output
    );

    Ok(ReportOutcome {
        output: options.output.clone(),
        rows: rows.len(),
        products: products.len(),
        months: months.len(),
        total_sales: products.total_sales(),
        pages,
    })
}

fn write_document(document: &compose::ReportDocument, output: &Path) -> Result<usize> {
    pdf::write_pdf(document, output).with_context(|| format!("Writing report to {output:?}"))
}
