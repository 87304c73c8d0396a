use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "asc")]
    Ascending,
    #[serde(alias = "desc")]
    Descending,
}

impl SortDirection {
    /// Returns the opposite direction.
    pub fn toggled(&self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }

    pub fn arrow(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

/// The raw fields of a stock row that can be shown as table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockField {
    Symbol,
    StockName,
    ClosePrice,
    PriceChangePct,
    Volume,
    MarketCode,
}

impl StockField {
    /// Every field, in the default column order.
    pub const ALL: [StockField; 6] = [
        StockField::Symbol,
        StockField::StockName,
        StockField::ClosePrice,
        StockField::PriceChangePct,
        StockField::Volume,
        StockField::MarketCode,
    ];

    /// The wire/storage key, identical to the JSON field name on a stock row.
    pub fn key(&self) -> &'static str {
        match self {
            StockField::Symbol => "symbol",
            StockField::StockName => "stock_name",
            StockField::ClosePrice => "close_price",
            StockField::PriceChangePct => "price_change_pct",
            StockField::Volume => "volume",
            StockField::MarketCode => "market_code",
        }
    }

    pub fn default_label(&self) -> &'static str {
        match self {
            StockField::Symbol => "Symbol",
            StockField::StockName => "Name",
            StockField::ClosePrice => "Price",
            StockField::PriceChangePct => "Change %",
            StockField::Volume => "Volume",
            StockField::MarketCode => "Market",
        }
    }
}

impl fmt::Display for StockField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for StockField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StockField::ALL
            .into_iter()
            .find(|field| field.key() == s)
            .ok_or_else(|| CoreError::InvalidInput("column".to_string(), s.to_string()))
    }
}

/// An exchange a listed stock trades on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "SH")]
    Shanghai,
    #[serde(rename = "SZ")]
    Shenzhen,
    #[serde(rename = "BJ")]
    Beijing,
}

impl Market {
    pub const ALL: [Market; 3] = [Market::Shanghai, Market::Shenzhen, Market::Beijing];

    pub fn code(&self) -> &'static str {
        match self {
            Market::Shanghai => "SH",
            Market::Shenzhen => "SZ",
            Market::Beijing => "BJ",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Market::Shanghai => "Shanghai (上海)",
            Market::Shenzhen => "Shenzhen (深圳)",
            Market::Beijing => "Beijing (北京)",
        }
    }
}

impl FromStr for Market {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Market::ALL
            .into_iter()
            .find(|market| market.code() == upper)
            .ok_or_else(|| CoreError::InvalidInput("market".to_string(), s.to_string()))
    }
}
