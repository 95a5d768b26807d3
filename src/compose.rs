//! Report layout: the ordered blocks that make up the sales report.
//!
//! [`build_document`] only decides *what* goes on the page and in which order.
//! Page breaks, fonts and coordinates belong to [`crate::pdf`].

use chrono::Local;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    aggregate::{MonthSummary, ProductSummary},
    chart::ChartImage,
};

pub const DEFAULT_TITLE: &str = "Relatório de Vendas";
pub const DEFAULT_TABLE_ROWS: usize = 20;

const IMAGE_WIDTH_MM: f32 = 160.0;
const TOP_PRODUCTS_HEIGHT_MM: f32 = 90.0;
const MONTHLY_HEIGHT_MM: f32 = 70.0;
const LABEL_COLUMN_MM: f32 = 110.0;
const VALUE_COLUMN_MM: f32 = 40.0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportMetadata {
    pub title: String,
    pub subtitle: String,
}

impl ReportMetadata {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }
}

impl Default for ReportMetadata {
    fn default() -> Self {
        Self::new(
            DEFAULT_TITLE,
            format!("Gerado em {}", Local::now().format("%Y-%m-%d %H:%M:%S")),
        )
    }
}

/// The two rendered charts, in the order they appear in the report.
#[derive(Debug, Clone)]
pub struct ReportCharts {
    pub top_products: ChartImage,
    pub monthly_sales: ChartImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    Section,
    Subsection,
}

/// A run of text sharing one weight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub header: String,
    pub width_mm: f32,
    pub align: Align,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<String>>,
}

impl TableBlock {
    pub fn width_mm(&self) -> f32 {
        self.columns.iter().map(|column| column.width_mm).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    pub chart: ChartImage,
    pub width_mm: f32,
    pub height_mm: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Paragraph(Vec<Span>),
    Heading(HeadingLevel, String),
    /// Vertical gap, in points.
    Spacer(f32),
    Image(ImageBlock),
    Table(TableBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    pub fn tables(&self) -> impl Iterator<Item = &TableBlock> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Table(table) => Some(table),
            _ => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageBlock> {
        self.blocks.iter().filter_map(|block| match block {
            Block::Image(image) => Some(image),
            _ => None,
        })
    }
}

/// Lays out the full report. `table_rows` caps the product table.
pub fn build_document(
    products: &ProductSummary,
    months: &MonthSummary,
    charts: ReportCharts,
    metadata: &ReportMetadata,
    table_rows: usize,
) -> ReportDocument {
    let mut blocks = vec![
        Block::Title(metadata.title.clone()),
        Block::Paragraph(vec![Span::plain(metadata.subtitle.clone())]),
        Block::Spacer(8.0),
        Block::Heading(HeadingLevel::Section, "Resumo rápido".into()),
        Block::Paragraph(vec![
            Span::plain("Total de vendas: "),
            Span::bold(format_amount(products.total_sales())),
        ]),
        Block::Paragraph(vec![
            Span::plain("Produtos distintos: "),
            Span::bold(products.len().to_string()),
        ]),
        Block::Spacer(10.0),
        Block::Heading(HeadingLevel::Section, "Top produtos".into()),
        Block::Image(ImageBlock {
            chart: charts.top_products,
            width_mm: IMAGE_WIDTH_MM,
            height_mm: TOP_PRODUCTS_HEIGHT_MM,
        }),
        Block::Spacer(8.0),
        Block::Heading(
            HeadingLevel::Subsection,
            format!("Vendas por produto (Top {table_rows})"),
        ),
    ];

    blocks.push(Block::Table(summary_table(
        "Produto",
        products
            .top(table_rows)
            .iter()
            .map(|row| (row.product.clone(), row.sales)),
    )));
    blocks.push(Block::Spacer(12.0));

    blocks.push(Block::Heading(HeadingLevel::Section, "Vendas por mês".into()));
    blocks.push(Block::Image(ImageBlock {
        chart: charts.monthly_sales,
        width_mm: IMAGE_WIDTH_MM,
        height_mm: MONTHLY_HEIGHT_MM,
    }));
    blocks.push(Block::Spacer(12.0));
    blocks.push(Block::Heading(HeadingLevel::Subsection, "Vendas por mês".into()));
    blocks.push(Block::Table(summary_table(
        "Mês",
        months
            .rows
            .iter()
            .map(|row| (row.month.format("%Y-%m").to_string(), row.sales)),
    )));

    ReportDocument {
        title: metadata.title.clone(),
        blocks,
    }
}

fn summary_table(label: &str, rows: impl Iterator<Item = (String, Decimal)>) -> TableBlock {
    TableBlock {
        columns: vec![
            TableColumn {
                header: label.to_string(),
                width_mm: LABEL_COLUMN_MM,
                align: Align::Left,
            },
            TableColumn {
                header: "Vendas".to_string(),
                width_mm: VALUE_COLUMN_MM,
                align: Align::Right,
            },
        ],
        rows: rows
            .map(|(key, sales)| vec![key, format_amount(sales)])
            .collect(),
    }
}

/// Two decimals with `,` thousands separators, e.g. `1,234.50`.
pub fn format_amount(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let fixed = format!("{:.2}", rounded.abs());
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (idx, digit) in integer.chars().enumerate() {
        if idx > 0 && (integer.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{fraction}")
}
