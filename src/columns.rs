//! Heuristic mapping of free-text column headers to the canonical
//! `date` / `product` / `sales` roles.
//!
//! Headers are matched by substring in English and Portuguese. The sales
//! value is found by walking [`SALES_RULES`] in order and taking the first
//! rule that matches; within a rule, candidates are scanned in table order.

use crate::error::SchemaError;

const DATE_TOKENS: &[&str] = &["date", "data"];
const PRODUCT_TOKENS: &[&str] = &["product", "produto", "item"];
const QUANTITY_TOKENS: &[&str] = &["qty", "quantity", "quantidade"];
const PRICE_TOKENS: &[&str] = &["price", "preco", "valor_unit"];

/// A column picked for a canonical role: its normalized name and position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SalesSource {
    /// The column already holds a monetary value per row.
    Direct(ColumnRef),
    /// Sales is computed per row as quantity × unit price.
    QuantityTimesPrice {
        quantity: ColumnRef,
        price: ColumnRef,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub date: ColumnRef,
    pub product: ColumnRef,
    pub sales: SalesSource,
}

impl ResolvedColumns {
    pub fn date_col(&self) -> &str {
        &self.date.name
    }

    pub fn product_col(&self) -> &str {
        &self.product.name
    }

    pub fn sales_col(&self) -> Option<&str> {
        match &self.sales {
            SalesSource::Direct(column) => Some(&column.name),
            SalesSource::QuantityTimesPrice { .. } => None,
        }
    }

    pub fn quantity_col(&self) -> Option<&str> {
        match &self.sales {
            SalesSource::QuantityTimesPrice { quantity, .. } => Some(&quantity.name),
            SalesSource::Direct(_) => None,
        }
    }

    pub fn price_col(&self) -> Option<&str> {
        match &self.sales {
            SalesSource::QuantityTimesPrice { price, .. } => Some(&price.name),
            SalesSource::Direct(_) => None,
        }
    }

    pub fn describe(&self) -> String {
        match &self.sales {
            SalesSource::Direct(column) => format!(
                "date='{}', product='{}', sales='{}'",
                self.date.name, self.product.name, column.name
            ),
            SalesSource::QuantityTimesPrice { quantity, price } => format!(
                "date='{}', product='{}', sales='{}' x '{}'",
                self.date.name, self.product.name, quantity.name, price.name
            ),
        }
    }
}

/// One step of the sales-value resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SalesRule {
    /// A column named exactly one of these; earlier names win.
    ExactName(&'static [&'static str]),
    /// A quantity-like column together with a price-like column.
    QuantityAndPrice,
    /// The first column, in table order, whose name is one of these.
    AnyOfNames(&'static [&'static str]),
}

pub const SALES_RULES: &[SalesRule] = &[
    SalesRule::ExactName(&["sales", "valor"]),
    SalesRule::QuantityAndPrice,
    SalesRule::AnyOfNames(&["amount", "valor_total", "total"]),
];

impl SalesRule {
    fn apply(&self, columns: &[String]) -> Option<SalesSource> {
        match self {
            SalesRule::ExactName(names) => names
                .iter()
                .find_map(|name| position_exact(columns, name))
                .map(SalesSource::Direct),
            SalesRule::QuantityAndPrice => {
                let quantity = first_containing(columns, QUANTITY_TOKENS)?;
                let price = first_containing(columns, PRICE_TOKENS)?;
                Some(SalesSource::QuantityTimesPrice { quantity, price })
            }
            SalesRule::AnyOfNames(names) => columns
                .iter()
                .position(|column| names.contains(&column.as_str()))
                .map(|index| SalesSource::Direct(column_at(columns, index))),
        }
    }
}

/// Resolves canonical roles from already-normalized column names.
pub fn resolve_columns(columns: &[String]) -> Result<ResolvedColumns, SchemaError> {
    let date = first_containing(columns, DATE_TOKENS).ok_or_else(|| {
        SchemaError::MissingDateColumn {
            columns: columns.to_vec(),
        }
    })?;
    let sales = SALES_RULES
        .iter()
        .find_map(|rule| rule.apply(columns))
        .ok_or_else(|| SchemaError::MissingSalesColumns {
            columns: columns.to_vec(),
        })?;
    let product = first_containing(columns, PRODUCT_TOKENS).ok_or_else(|| {
        SchemaError::MissingProductColumn {
            columns: columns.to_vec(),
        }
    })?;
    Ok(ResolvedColumns {
        date,
        product,
        sales,
    })
}

fn column_at(columns: &[String], index: usize) -> ColumnRef {
    ColumnRef {
        name: columns[index].clone(),
        index,
    }
}

fn position_exact(columns: &[String], name: &str) -> Option<ColumnRef> {
    columns
        .iter()
        .position(|column| column == name)
        .map(|index| column_at(columns, index))
}

fn first_containing(columns: &[String], tokens: &[&str]) -> Option<ColumnRef> {
    columns
        .iter()
        .position(|column| tokens.iter().any(|token| column.contains(token)))
        .map(|index| column_at(columns, index))
}
