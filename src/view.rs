//! Terminal rendering of dashboard models with `comfy-table`.

use api_client::ExecutionResults;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table};
use core_types::{ColumnSetting, Fund, Portfolio, Script, Stock};
use dashboard::format::{
    format_currency, format_number, format_percentage, format_volume, PLACEHOLDER,
};
use dashboard::indicators::DEFAULT_RSI_PERIOD;
use dashboard::table::{script_cell_text, tone_of};
use dashboard::{SortState, StockDetail, TableModel, Tone};

fn new_table<I, S>(headers: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<Cell>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table
}

fn text(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or(PLACEHOLDER)
}

/// Red for gains and green for losses, as on mainland exchanges.
fn toned(text: &str, tone: Tone) -> Cell {
    let cell = Cell::new(text);
    match tone {
        Tone::Up => cell.fg(Color::Red),
        Tone::Down => cell.fg(Color::Green),
        Tone::Neutral => cell,
    }
}

pub fn stock_table(model: &TableModel, sort: &SortState) -> Table {
    let headers = model.columns.iter().map(|column| {
        if sort.column.as_ref() == Some(&column.key) {
            format!("{} {}", column.label, sort.direction.arrow())
        } else {
            column.label.clone()
        }
    });
    let mut table = new_table(headers);
    for row in &model.rows {
        table.add_row(row.cells.iter().map(|c| toned(&c.text, c.tone)));
    }
    table
}

pub fn stock_info_table(stock: &Stock) -> Table {
    let mut table = new_table(["Field", "Value"]);
    table
        .add_row(vec!["Symbol", stock.symbol.as_str()])
        .add_row(vec!["Name", text(stock.stock_name.as_deref())])
        .add_row(vec!["Market", text(stock.market_code.as_deref())]);
    table.add_row(vec![
        "Price".to_string(),
        format_currency(stock.close_price, 2),
    ]);
    table.add_row(vec![
        "Change %".to_string(),
        format_percentage(stock.price_change_pct, 2),
    ]);
    table.add_row(vec!["Volume".to_string(), format_volume(stock.volume)]);
    table
}

pub fn indicator_table(detail: &StockDetail) -> Table {
    let mut table = new_table(["Indicator", "Value"]);
    for (lookback, value) in &detail.indicators.momentum {
        table.add_row(vec![
            format!("{lookback}-Day Momentum"),
            format_percentage(Some(*value), 2),
        ]);
    }
    for (period, value) in &detail.indicators.moving_averages {
        table.add_row(vec![format!("MA-{period}"), format_number(Some(*value), 2)]);
    }
    table.add_row(vec![
        format!("RSI-{DEFAULT_RSI_PERIOD}"),
        format_number(Some(detail.rsi), 2),
    ]);
    table
}

pub fn scripts_table(scripts: &[Script]) -> Table {
    let mut table = new_table(["ID", "Name", "Description"]);
    for script in scripts {
        table.add_row(vec![
            script.id.as_str(),
            text(script.name.as_deref()),
            text(script.description.as_deref()),
        ]);
    }
    table
}

pub fn script_detail(script: &Script) -> String {
    format!(
        "ID:          {}\nName:        {}\nDescription: {}\n\n{}",
        script.id,
        text(script.name.as_deref()),
        text(script.description.as_deref()),
        script.code
    )
}

pub fn results_table(results: &ExecutionResults, column_name: &str) -> Table {
    let header = results.column_name.as_deref().unwrap_or(column_name);
    let mut table = new_table(["Symbol", header, "Error"]);
    for (symbol, outcome) in &results.results {
        let error = match outcome {
            core_types::ScriptOutcome::Failed { error } => error.as_str(),
            _ => "",
        };
        table.add_row(vec![
            symbol.clone(),
            script_cell_text(Some(outcome)),
            error.to_string(),
        ]);
    }
    table
}

pub fn columns_table(settings: &[ColumnSetting]) -> Table {
    let mut table = new_table(["Key", "Label", "Visible"]);
    for setting in settings {
        let visible = Cell::new(if setting.visible { "yes" } else { "no" })
            .set_alignment(CellAlignment::Center);
        table.add_row(vec![
            Cell::new(&setting.key),
            Cell::new(&setting.label),
            visible,
        ]);
    }
    table
}

pub fn funds_table(funds: &[Fund]) -> Table {
    let mut table = new_table([
        "Code",
        "Name",
        "Type",
        "Net Value",
        "Daily",
        "1Y Return",
        "Risk",
    ]);
    for fund in funds {
        table.add_row(vec![
            Cell::new(&fund.code),
            Cell::new(&fund.name),
            Cell::new(text(fund.fund_type.as_deref())),
            Cell::new(format_number(fund.net_value, 4)),
            toned(
                &format_percentage(fund.daily_change, 2),
                tone_of(fund.daily_change),
            ),
            toned(
                &format_percentage(fund.year_return, 2),
                tone_of(fund.year_return),
            ),
            Cell::new(text(fund.risk_level.as_deref())),
        ]);
    }
    table
}

pub fn portfolio_table(portfolio: &Portfolio) -> Table {
    let mut table = new_table(["Fund", "Shares", "Avg Cost", "Value"]);
    for holding in &portfolio.holdings {
        table.add_row(vec![
            text(holding.fund_name.as_deref()).to_string(),
            format_number(holding.shares, 2),
            format_currency(holding.avg_cost, 4),
            format_currency(holding.current_value, 2),
        ]);
    }
    table
}

pub fn portfolio_summary(portfolio: &Portfolio) -> String {
    format!(
        "{}  value {}  cost {}  return {} ({})",
        portfolio.name,
        format_currency(portfolio.total_value, 2),
        format_currency(portfolio.total_cost, 2),
        format_currency(portfolio.total_return, 2),
        format_percentage(portfolio.return_percentage, 2),
    )
}

