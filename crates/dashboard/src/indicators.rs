//! Momentum, moving-average and RSI figures over a close-price history.
//!
//! Histories are ordered oldest first; the last point is the most recent.

use core_types::PricePoint;
use rust_decimal::Decimal;

pub const MOMENTUM_LOOKBACKS: [usize; 4] = [26, 29, 31, 34];
pub const MA_PERIODS: [usize; 2] = [20, 50];
pub const DEFAULT_RSI_PERIOD: usize = 14;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const NEUTRAL_RSI: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

/// Percentage change from `past` to `current`. A zero base yields zero.
pub fn rate_of_change(current: Option<Decimal>, past: Option<Decimal>) -> Option<Decimal> {
    let (current, past) = (current?, past?);
    if past.is_zero() {
        return Some(Decimal::ZERO);
    }
    (current - past).checked_div(past).map(|r| r * HUNDRED)
}

/// Mean close of the last `period` points; missing closes count as zero.
pub fn moving_average(history: &[PricePoint], period: usize) -> Option<Decimal> {
    if period == 0 || history.len() < period {
        return None;
    }
    let sum: Decimal = history[history.len() - period..]
        .iter()
        .map(|p| p.close_price.unwrap_or_default())
        .sum();
    sum.checked_div(Decimal::from(period))
}

/// Rate of change of `close` against the close `lookback` points from the end.
pub fn momentum(
    close: Option<Decimal>,
    history: &[PricePoint],
    lookback: usize,
) -> Option<Decimal> {
    if lookback == 0 || history.len() < lookback {
        return None;
    }
    let past = history[history.len() - lookback]
        .close_price
        .filter(|p| !p.is_zero())?;
    rate_of_change(close, Some(past))
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Indicators {
    /// `(lookback, percent)` for each lookback the history is long enough for.
    pub momentum: Vec<(usize, Decimal)>,
    /// `(period, average)` for each period the history is long enough for.
    pub moving_averages: Vec<(usize, Decimal)>,
}

impl Indicators {
    pub fn is_empty(&self) -> bool {
        self.momentum.is_empty() && self.moving_averages.is_empty()
    }
}

/// Every indicator the history supports. Nothing is computed without a close.
pub fn indicators(close: Option<Decimal>, history: &[PricePoint]) -> Indicators {
    let mut out = Indicators::default();
    if close.is_none_or(|c| c.is_zero()) {
        return out;
    }
    for lookback in MOMENTUM_LOOKBACKS {
        if let Some(value) = momentum(close, history, lookback) {
            out.momentum.push((lookback, value));
        }
    }
    for period in MA_PERIODS {
        if let Some(value) = moving_average(history, period) {
            out.moving_averages.push((period, value));
        }
    }
    out
}

/// Relative strength index over the last `period` price changes.
///
/// Returns the neutral 50 when there are not enough prices, and 100 when the
/// window has no losses.
pub fn rsi(prices: &[Decimal], period: usize) -> Decimal {
    if period == 0 || prices.len() < period + 1 {
        return NEUTRAL_RSI;
    }
    let window = &prices[prices.len() - period - 1..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((Decimal::ZERO, Decimal::ZERO), |(g, l), change| {
            if change > Decimal::ZERO {
                (g + change, l)
            } else {
                (g, l + change.abs())
            }
        });

    if losses.is_zero() {
        return HUNDRED;
    }
    // The period cancels out of avg_gain / avg_loss.
    match gains.checked_div(losses) {
        Some(rs) => HUNDRED - HUNDRED / (Decimal::ONE + rs),
        None => HUNDRED,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn history(closes: impl IntoIterator<Item = Decimal>) -> Vec<PricePoint> {
        closes
            .into_iter()
            .map(|c| PricePoint {
                trade_date: None,
                close_price: Some(c),
            })
            .collect()
    }

    #[test]
    fn rate_of_change_handles_gaps_and_zero() {
        assert_eq!(rate_of_change(Some(dec!(110)), Some(dec!(100))), Some(dec!(10)));
        assert_eq!(rate_of_change(Some(dec!(5)), Some(dec!(0))), Some(dec!(0)));
        assert_eq!(rate_of_change(None, Some(dec!(1))), None);
        assert_eq!(rate_of_change(Some(dec!(1)), None), None);
    }

    #[test]
    fn moving_average_needs_a_full_window() {
        let points = history((1..=5).map(Decimal::from));
        assert_eq!(moving_average(&points, 3), Some(dec!(4)));
        assert_eq!(moving_average(&points, 6), None);

        let mut gappy = points.clone();
        gappy[4].close_price = None;
        assert_eq!(moving_average(&gappy, 2), Some(dec!(2)));
    }

    #[test]
    fn momentum_reads_back_from_the_end() {
        // 40 points: 1..=40. 26 back from the end is the value 15.
        let points = history((1..=40).map(Decimal::from));
        assert_eq!(momentum(Some(dec!(30)), &points, 26), Some(dec!(100)));
        assert_eq!(momentum(Some(dec!(30)), &points, 41), None);
    }

    #[test]
    fn indicators_include_only_supported_windows() {
        let points = history(std::iter::repeat_n(dec!(10), 30));
        let result = indicators(Some(dec!(11)), &points);
        assert_eq!(result.momentum, vec![(26, dec!(10)), (29, dec!(10))]);
        assert_eq!(result.moving_averages, vec![(20, dec!(10))]);

        assert!(indicators(None, &points).is_empty());
    }

    #[test]
    fn rsi_edges_and_mixed_window() {
        assert_eq!(rsi(&[dec!(1), dec!(2)], 14), dec!(50));
        let rising: Vec<Decimal> = (1..=15).map(Decimal::from).collect();
        assert_eq!(rsi(&rising, 14), dec!(100));

        // Changes: +2, -1 -> RS = 2, RSI = 100 - 100/3.
        let mixed = [dec!(10), dec!(12), dec!(11)];
        let value = rsi(&mixed, 2);
        assert_eq!(value.round_dp(4), dec!(66.6667));
    }
}
