use std::{io, path::PathBuf};

use thiserror::Error;

/// A required canonical role could not be matched to any input column.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("no date column found (expected a name containing 'date' or 'data'); columns: {columns:?}")]
    MissingDateColumn { columns: Vec<String> },

    #[error(
        "no product column found (expected a name containing 'product', 'produto' or 'item'); columns: {columns:?}"
    )]
    MissingProductColumn { columns: Vec<String> },

    #[error(
        "could not identify sales columns; expected 'sales'/'valor', a quantity+price pair, or 'amount'/'valor_total'/'total'; columns: {columns:?}"
    )]
    MissingSalesColumns { columns: Vec<String> },
}

/// A date value was present but could not be read as a calendar date.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("row {row}: failed to parse '{value}' in column '{column}' as a date")]
pub struct DataError {
    pub row: usize,
    pub column: String,
    pub value: String,
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to register chart font '{name}'")]
    Font { name: &'static str },

    #[error("failed to draw chart '{chart}': {message}")]
    Chart { chart: String, message: String },

    #[error("failed to encode chart '{chart}' as PNG")]
    Encode {
        chart: String,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to embed chart image: {source}")]
    Image {
        #[source]
        source: image::ImageError,
    },

    #[error("failed to assemble PDF document: {message}")]
    Pdf { message: String },

    #[error("failed to write report to {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to open input file {path:?}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed delimited data in {path:?} at row {row}")]
    Csv {
        path: PathBuf,
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("failed to decode text in {path:?} with encoding {encoding}")]
    Decode { path: PathBuf, encoding: &'static str },

    #[error("unknown encoding '{label}'")]
    UnknownEncoding { label: String },

    #[error("failed to read workbook {path:?}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("workbook {path:?} does not contain a sheet named '{sheet}' (available: {available:?})")]
    MissingSheet {
        path: PathBuf,
        sheet: String,
        available: Vec<String>,
    },

    #[error("workbook {path:?} does not contain any sheets")]
    EmptyWorkbook { path: PathBuf },

    #[error("input {path:?} has no header row")]
    MissingHeader { path: PathBuf },
}
