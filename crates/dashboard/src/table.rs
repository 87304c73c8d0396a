//! The render model of the stock table: base columns from the visibility
//! settings followed by one column per selected script.

use crate::error::DashboardError;
use crate::format::{
    format_currency, format_percentage, format_script_value, format_volume, PLACEHOLDER,
};
use crate::selection::{ScriptLibrary, ScriptSelection};
use core_types::{ScriptId, ScriptOutcome, Stock, StockField};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Identifies a table column: a raw stock field or a script result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnKey {
    Field(StockField),
    Script(ScriptId),
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKey::Field(field) => write!(f, "{}", field.key()),
            ColumnKey::Script(id) => write!(f, "script:{}", id),
        }
    }
}

impl FromStr for ColumnKey {
    type Err = DashboardError;

    /// Parses a field key (`close_price`) or a script column (`script:7`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(id) = s.strip_prefix("script:") {
            return Ok(ColumnKey::Script(ScriptId::new(id)));
        }
        s.parse::<StockField>()
            .map(ColumnKey::Field)
            .map_err(|_| DashboardError::UnknownColumn(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub key: ColumnKey,
    pub label: String,
}

/// Colouring hint for a cell; only the change column carries one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    Up,
    Down,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableCell {
    pub text: String,
    pub tone: Tone,
}

impl TableCell {
    fn plain(text: String) -> Self {
        Self {
            text,
            tone: Tone::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub symbol: String,
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableModel {
    pub columns: Vec<TableColumn>,
    pub rows: Vec<TableRow>,
}

impl TableModel {
    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }

    /// Cell texts of one column, top to bottom.
    pub fn column_texts(&self, key: &ColumnKey) -> Vec<&str> {
        let Some(index) = self.columns.iter().position(|c| &c.key == key) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .map(|row| row.cells[index].text.as_str())
            .collect()
    }
}

/// Builds the table for already filtered and sorted rows.
pub fn build_table(
    rows: &[Stock],
    selection: &ScriptSelection,
    library: &ScriptLibrary,
    visible_fields: &[StockField],
) -> TableModel {
    let mut columns: Vec<TableColumn> = visible_fields
        .iter()
        .map(|field| TableColumn {
            key: ColumnKey::Field(*field),
            label: field.default_label().to_string(),
        })
        .collect();
    columns.extend(selection.ids().iter().map(|id| TableColumn {
        key: ColumnKey::Script(id.clone()),
        label: library.label(id),
    }));

    let rows = rows
        .iter()
        .map(|stock| TableRow {
            symbol: stock.symbol.clone(),
            cells: columns.iter().map(|c| cell(stock, &c.key)).collect(),
        })
        .collect();

    TableModel { columns, rows }
}

fn cell(stock: &Stock, key: &ColumnKey) -> TableCell {
    match key {
        ColumnKey::Field(field) => field_cell(stock, *field),
        ColumnKey::Script(id) => TableCell::plain(script_cell_text(stock.script_outcome(id))),
    }
}

fn field_cell(stock: &Stock, field: StockField) -> TableCell {
    let text_or_placeholder =
        |text: Option<&String>| text.cloned().unwrap_or_else(|| PLACEHOLDER.to_string());

    match field {
        StockField::Symbol => TableCell::plain(stock.symbol.clone()),
        StockField::StockName => TableCell::plain(text_or_placeholder(stock.stock_name.as_ref())),
        StockField::ClosePrice => TableCell::plain(format_currency(stock.close_price, 2)),
        StockField::PriceChangePct => TableCell {
            text: format_percentage(stock.price_change_pct, 2),
            tone: tone_of(stock.price_change_pct),
        },
        StockField::Volume => TableCell::plain(format_volume(stock.volume)),
        StockField::MarketCode => TableCell::plain(text_or_placeholder(stock.market_code.as_ref())),
    }
}

/// Direction of a signed change; zero and missing are neutral.
pub fn tone_of(change: Option<Decimal>) -> Tone {
    match change {
        Some(c) if c > Decimal::ZERO => Tone::Up,
        Some(c) if c < Decimal::ZERO => Tone::Down,
        _ => Tone::Neutral,
    }
}

/// A failed or missing script result is a placeholder, never an error.
pub fn script_cell_text(outcome: Option<&ScriptOutcome>) -> String {
    match outcome {
        Some(ScriptOutcome::Value(value)) => format_script_value(value),
        Some(ScriptOutcome::Failed { .. }) | Some(ScriptOutcome::Missing) | None => {
            PLACEHOLDER.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::Script;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn library() -> ScriptLibrary {
        ScriptLibrary::new(vec![
            Script {
                id: ScriptId::from(1),
                name: Some("A".into()),
                description: None,
                code: "return 1".into(),
            },
            Script {
                id: ScriptId::from(2),
                name: None,
                description: Some("B".into()),
                code: "return 2".into(),
            },
        ])
    }

    fn scored_stock() -> Stock {
        serde_json::from_value(json!({
            "symbol": "600000",
            "stock_name": "浦发银行",
            "close_price": 10.5,
            "price_change_pct": -1.234,
            "volume": 123456,
            "market_code": "SH",
            "script_results": {"1": 0.12345, "2": {"result": "x"}, "3": {"error": "boom"}}
        }))
        .unwrap()
    }

    #[test]
    fn script_columns_follow_selection_order() {
        let selection =
            ScriptSelection::new([ScriptId::from(1), ScriptId::from(2), ScriptId::from(3)]);
        let table = build_table(&[scored_stock()], &selection, &library(), &[]);

        assert_eq!(table.labels(), vec!["A", "B", "Script 3"]);
        assert_eq!(table.rows[0].cells.len(), 3);
        let texts: Vec<&str> = table.rows[0].cells.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["0.1235", "x", "--"]);
    }

    #[test]
    fn base_columns_respect_visibility_order() {
        let table = build_table(
            &[scored_stock()],
            &ScriptSelection::default(),
            &ScriptLibrary::default(),
            &[StockField::Volume, StockField::ClosePrice, StockField::PriceChangePct],
        );
        assert_eq!(table.labels(), vec!["Volume", "Price", "Change %"]);
        let row = &table.rows[0];
        assert_eq!(row.cells[0].text, "12.35万");
        assert_eq!(row.cells[1].text, "¥10.50");
        assert_eq!(row.cells[2].text, "-1.23%");
        assert_eq!(row.cells[2].tone, Tone::Down);
    }

    #[test]
    fn column_keys_parse_from_display_form() {
        for key in [
            ColumnKey::Field(StockField::PriceChangePct),
            ColumnKey::Script(ScriptId::from(7)),
        ] {
            assert_eq!(key.to_string().parse::<ColumnKey>().unwrap(), key);
        }
        assert!("pe_ratio".parse::<ColumnKey>().is_err());
    }

    #[test]
    fn sparse_rows_render_placeholders() {
        let mut stock = Stock::new("1");
        stock.price_change_pct = Some(dec!(0));
        let selection = ScriptSelection::new([ScriptId::from(9)]);
        let table = build_table(
            &[stock],
            &selection,
            &ScriptLibrary::default(),
            &StockField::ALL,
        );
        let texts: Vec<&str> = table.rows[0].cells.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["1", "--", "--", "0.00%", "--", "--", "--"]);
        assert_eq!(table.rows[0].cells[3].tone, Tone::Neutral);
        assert_eq!(
            table.column_texts(&ColumnKey::Script(ScriptId::from(9))),
            vec!["--"]
        );
    }
}
