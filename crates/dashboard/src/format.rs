//! Display formatting for prices, percentages, volumes and script results.
//!
//! Every formatter renders a missing value as [`PLACEHOLDER`].

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

pub const PLACEHOLDER: &str = "--";

const YI: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);
const WAN: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

fn fixed(value: Decimal, decimals: u32) -> String {
    let mut rounded =
        value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded = rounded.abs();
    }
    format!("{:.*}", decimals as usize, rounded)
}

fn group_thousands(number: &str) -> String {
    let (sign, digits) = match number.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", number),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((int_part, frac)) => (int_part, Some(frac)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// `¥1,234.56`, the zh-CN rendering of a CNY amount.
pub fn format_currency(value: Option<Decimal>, decimals: u32) -> String {
    let Some(value) = value else {
        return PLACEHOLDER.to_string();
    };
    let text = fixed(value, decimals);
    match text.strip_prefix('-') {
        Some(abs) => format!("-¥{}", group_thousands(abs)),
        None => format!("¥{}", group_thousands(&text)),
    }
}

pub fn format_percentage(value: Option<Decimal>, decimals: u32) -> String {
    match value {
        Some(value) => format!("{}%", fixed(value, decimals)),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn format_number(value: Option<Decimal>, decimals: u32) -> String {
    match value {
        Some(value) => group_thousands(&fixed(value, decimals)),
        None => PLACEHOLDER.to_string(),
    }
}

/// Volumes in Chinese units: 亿 (1e8) and 万 (1e4), plain below that.
pub fn format_volume(value: Option<Decimal>) -> String {
    match value {
        None => PLACEHOLDER.to_string(),
        Some(v) if v >= YI => format!("{}亿", fixed(v / YI, 2)),
        Some(v) if v >= WAN => format!("{}万", fixed(v / WAN, 2)),
        Some(v) => v.normalize().to_string(),
    }
}

/// Text of a script result cell: numbers to exactly four fraction digits,
/// strings verbatim, anything else as its JSON text.
pub fn format_script_value(value: &Value) -> String {
    match value {
        Value::Null => PLACEHOLDER.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) => format!("{:.4}", f),
            None => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
