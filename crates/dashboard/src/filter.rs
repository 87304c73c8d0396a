use core_types::{Fund, Market, Stock};

/// The set of market codes whose rows are visible, in toggle order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSet(Vec<String>);

impl MarketSet {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = MarketSet(Vec::new());
        for code in codes {
            let code = code.into();
            if !set.contains(&code) {
                set.0.push(code);
            }
        }
        set
    }

    pub fn from_markets(markets: &[Market]) -> Self {
        MarketSet::new(markets.iter().map(Market::code))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.0.iter().any(|c| c == code)
    }

    /// Adds the code if absent, removes it if present.
    pub fn toggle(&mut self, code: &str) {
        if self.contains(code) {
            self.0.retain(|c| c != code);
        } else {
            self.0.push(code.to_string());
        }
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }
}

impl Default for MarketSet {
    fn default() -> Self {
        MarketSet::from_markets(&Market::ALL)
    }
}

/// Search term plus market membership; both must match for a row to show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockFilter {
    pub search_term: String,
    pub markets: MarketSet,
}

impl StockFilter {
    pub fn matches(&self, stock: &Stock) -> bool {
        let matches_market = stock
            .market_code
            .as_deref()
            .is_some_and(|code| self.markets.contains(code));
        matches_market
            && matches_search(
                &self.search_term,
                &[Some(&stock.symbol), stock.stock_name.as_ref()],
            )
    }

    /// Returns the visible rows in their original order.
    pub fn apply(&self, stocks: &[Stock]) -> Vec<Stock> {
        stocks.iter().filter(|s| self.matches(s)).cloned().collect()
    }
}

fn matches_search(term: &str, haystacks: &[Option<&String>]) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    haystacks
        .iter()
        .flatten()
        .any(|text| text.to_lowercase().contains(&needle))
}

/// Funds matching the term by name or code, case-insensitively.
pub fn filter_funds(funds: &[Fund], search_term: &str) -> Vec<Fund> {
    funds
        .iter()
        .filter(|f| matches_search(search_term, &[Some(&f.name), Some(&f.code)]))
        .cloned()
        .collect()
}
