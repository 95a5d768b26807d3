use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use log::warn;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::{
    columns::{ResolvedColumns, SalesSource},
    error::DataError,
    input::{RawRow, RawTable, Scalar},
};

/// Label used for rows whose product cell is blank.
pub const MISSING_PRODUCT: &str = "(sem produto)";

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%d.%m.%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub date: NaiveDate,
    pub product: String,
    pub sales: Decimal,
}

/// Converts every raw row into a [`NormalizedRow`].
///
/// A date that cannot be parsed aborts the whole step; sales values never do
/// (see [`coerce_sales_value`]).
pub fn normalize_rows(
    table: &RawTable,
    columns: &ResolvedColumns,
) -> Result<Vec<NormalizedRow>, DataError> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| normalize_row(row, idx + 2, columns))
        .collect()
}

fn normalize_row(
    row: &RawRow,
    line: usize,
    columns: &ResolvedColumns,
) -> Result<NormalizedRow, DataError> {
    let raw_date = row.get(columns.date.index);
    let date = parse_date(raw_date).ok_or_else(|| DataError {
        row: line,
        column: columns.date.name.clone(),
        value: raw_date.as_display(),
    })?;
    let sales = match &columns.sales {
        SalesSource::Direct(column) => coerce_sales_value(row.get(column.index)),
        SalesSource::QuantityTimesPrice { quantity, price } => {
            let quantity = coerce_sales_value(row.get(quantity.index));
            let price = coerce_sales_value(row.get(price.index));
            quantity.checked_mul(price).unwrap_or_else(|| {
                warn!("Row {line}: {quantity} x {price} exceeds the decimal range; clamping");
                quantity.saturating_mul(price)
            })
        }
    };
    Ok(NormalizedRow {
        date,
        product: product_text(row.get(columns.product.index)),
        sales,
    })
}

/// Silent-zero numeric coercion: anything that does not parse as a number
/// counts as `0`.
pub fn coerce_sales_value(value: &Scalar) -> Decimal {
    match value {
        Scalar::Number(number) => decimal_from_f64(*number),
        Scalar::Text(text) => parse_decimal_text(text.trim()).unwrap_or(Decimal::ZERO),
        Scalar::Empty | Scalar::Date(_) | Scalar::DateTime(_) => Decimal::ZERO,
    }
}

fn parse_decimal_text(text: &str) -> Option<Decimal> {
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
        .or_else(|| text.parse::<f64>().ok().map(decimal_from_f64))
}

fn decimal_from_f64(value: f64) -> Decimal {
    if value.is_finite() {
        Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    }
}

pub fn parse_date(value: &Scalar) -> Option<NaiveDate> {
    match value {
        Scalar::Date(date) => Some(*date),
        Scalar::DateTime(datetime) => Some(datetime.date()),
        Scalar::Text(text) => parse_date_text(text.trim()),
        Scalar::Number(_) | Scalar::Empty => None,
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|datetime| datetime.date())
        })
}

pub fn product_text(value: &Scalar) -> String {
    if value.is_empty() {
        MISSING_PRODUCT.to_string()
    } else {
        value.as_display()
    }
}
