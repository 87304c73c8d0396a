use crate::table::ColumnKey;
use core_types::{ScriptOutcome, SortDirection, Stock, StockField};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::cmp::Ordering;
use std::str::FromStr;

/// The single active sort column and its direction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    pub column: Option<ColumnKey>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(column: ColumnKey, direction: SortDirection) -> Self {
        Self {
            column: Some(column),
            direction,
        }
    }

    /// Header click: flips the direction on the active column, otherwise
    /// switches to the new column ascending.
    pub fn toggle(&mut self, column: ColumnKey) {
        if self.column.as_ref() == Some(&column) {
            self.direction = self.direction.toggled();
        } else {
            self.column = Some(column);
            self.direction = SortDirection::Ascending;
        }
    }

    /// Returns a sorted copy of the rows; with no active column the input
    /// order is kept.
    pub fn sorted(&self, rows: &[Stock]) -> Vec<Stock> {
        let mut sorted = rows.to_vec();
        if let Some(column) = &self.column {
            sorted.sort_by(|a, b| {
                let (a, b) = (sort_key(a, column), sort_key(b, column));
                match self.direction {
                    SortDirection::Ascending => compare_keys(&a, &b),
                    SortDirection::Descending => compare_keys(&b, &a),
                }
            });
        }
        sorted
    }
}

/// The comparable value of one cell.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
    Decimal(Decimal),
    /// A script number too large or too precise for a decimal.
    Number(f64),
    Text(String),
    Null,
}

fn decimal_key(value: Option<Decimal>) -> SortKey {
    value.map_or(SortKey::Null, SortKey::Decimal)
}

fn number_key(n: &serde_json::Number) -> SortKey {
    match Decimal::from_str(&n.to_string()) {
        Ok(d) => SortKey::Decimal(d),
        Err(_) => n.as_f64().map_or(SortKey::Null, SortKey::Number),
    }
}

fn text_key(value: Option<&String>) -> SortKey {
    value.map_or(SortKey::Null, |s| SortKey::Text(s.clone()))
}

pub fn sort_key(stock: &Stock, column: &ColumnKey) -> SortKey {
    match column {
        ColumnKey::Field(field) => match field {
            StockField::Symbol => SortKey::Text(stock.symbol.clone()),
            StockField::StockName => text_key(stock.stock_name.as_ref()),
            StockField::ClosePrice => decimal_key(stock.close_price),
            StockField::PriceChangePct => decimal_key(stock.price_change_pct),
            StockField::Volume => decimal_key(stock.volume),
            StockField::MarketCode => text_key(stock.market_code.as_ref()),
        },
        ColumnKey::Script(id) => match stock.script_outcome(id) {
            Some(ScriptOutcome::Value(Value::Number(n))) => number_key(n),
            Some(ScriptOutcome::Value(Value::String(s))) => SortKey::Text(s.clone()),
            Some(ScriptOutcome::Value(other)) => SortKey::Text(other.to_string()),
            _ => SortKey::Null,
        },
    }
}

/// Ascending order: present values first, nulls last. Numbers compare
/// numerically and strings lexically; a number sorts before a string so the
/// order stays total on mixed columns.
pub fn compare_keys(a: &SortKey, b: &SortKey) -> Ordering {
    match (a, b) {
        (SortKey::Null, SortKey::Null) => Ordering::Equal,
        (SortKey::Null, _) => Ordering::Greater,
        (_, SortKey::Null) => Ordering::Less,
        (SortKey::Decimal(x), SortKey::Decimal(y)) => x.cmp(y),
        (SortKey::Number(x), SortKey::Number(y)) => x.total_cmp(y),
        (SortKey::Decimal(x), SortKey::Number(y)) => approximate(x).total_cmp(y),
        (SortKey::Number(x), SortKey::Decimal(y)) => x.total_cmp(&approximate(y)),
        (SortKey::Text(x), SortKey::Text(y)) => x.cmp(y),
        (SortKey::Text(_), _) => Ordering::Greater,
        (_, SortKey::Text(_)) => Ordering::Less,
    }
}

fn approximate(value: &Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}
