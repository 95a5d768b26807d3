use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::normalize::NormalizedRow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTotal {
    pub product: String,
    pub sales: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthTotal {
    /// First day of the month.
    pub month: NaiveDate,
    pub sales: Decimal,
}

/// Sales per product, highest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductSummary {
    pub rows: Vec<ProductTotal>,
}

/// Sales per calendar month, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MonthSummary {
    pub rows: Vec<MonthTotal>,
}

impl ProductSummary {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_sales(&self) -> Decimal {
        saturating_sum(self.rows.iter().map(|row| row.sales))
    }

    pub fn top(&self, n: usize) -> &[ProductTotal] {
        &self.rows[..n.min(self.rows.len())]
    }
}

impl MonthSummary {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn total_sales(&self) -> Decimal {
        saturating_sum(self.rows.iter().map(|row| row.sales))
    }
}

pub fn summarize_by_product(rows: &[NormalizedRow]) -> ProductSummary {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut totals: Vec<ProductTotal> = Vec::new();
    for row in rows {
        match positions.get(row.product.as_str()) {
            Some(&idx) => {
                let total = &mut totals[idx].sales;
                *total = total.saturating_add(row.sales);
            }
            None => {
                positions.insert(row.product.as_str(), totals.len());
                totals.push(ProductTotal {
                    product: row.product.clone(),
                    sales: row.sales,
                });
            }
        }
    }
    // stable: equal sums keep first-seen order
    totals.sort_by(|a, b| b.sales.cmp(&a.sales));
    ProductSummary { rows: totals }
}

pub fn summarize_by_month(rows: &[NormalizedRow]) -> MonthSummary {
    let mut totals: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for row in rows {
        let total = totals.entry(month_start(row.date)).or_insert(Decimal::ZERO);
        *total = total.saturating_add(row.sales);
    }
    MonthSummary {
        rows: totals
            .into_iter()
            .map(|(month, sales)| MonthTotal { month, sales })
            .collect(),
    }
}

/// Sums sales, clamping at the ends of the `Decimal` range instead of
/// overflowing.
pub fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values
        .into_iter()
        .fold(Decimal::ZERO, |acc, value| acc.saturating_add(value))
}

pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}
