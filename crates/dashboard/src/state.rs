use crate::columns::default_columns;
use crate::filter::{MarketSet, StockFilter};
use crate::selection::ScriptLibrary;
use crate::sort::SortState;
use core_types::{ColumnSetting, Stock};

/// Every change to [`DashboardState`] goes through one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardAction {
    SetStocks(Vec<Stock>),
    SetFilteredStocks(Vec<Stock>),
    SetLoading(bool),
    SetError(Option<String>),
    SetSearchTerm(String),
    SetMarketFilter(MarketSet),
    SetSort(SortState),
    SetColumnConfig(Vec<ColumnSetting>),
    SetCustomScripts(ScriptLibrary),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    pub stocks: Vec<Stock>,
    pub filtered_stocks: Vec<Stock>,
    pub column_config: Vec<ColumnSetting>,
    pub market_filter: MarketSet,
    pub search_term: String,
    pub sort: SortState,
    pub custom_scripts: ScriptLibrary,
    pub loading: bool,
    pub error: Option<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            stocks: Vec::new(),
            filtered_stocks: Vec::new(),
            column_config: default_columns(),
            market_filter: MarketSet::default(),
            search_term: String::new(),
            sort: SortState::default(),
            custom_scripts: ScriptLibrary::default(),
            loading: false,
            error: None,
        }
    }
}

impl DashboardState {
    /// Applies one action. Changing the rows, the search term or the market
    /// set recomputes `filtered_stocks` before returning.
    pub fn apply(&mut self, action: DashboardAction) {
        match action {
            DashboardAction::SetStocks(stocks) => {
                self.stocks = stocks;
                self.refilter();
            }
            DashboardAction::SetFilteredStocks(stocks) => self.filtered_stocks = stocks,
            DashboardAction::SetLoading(loading) => self.loading = loading,
            DashboardAction::SetError(error) => self.error = error,
            DashboardAction::SetSearchTerm(term) => {
                self.search_term = term;
                self.refilter();
            }
            DashboardAction::SetMarketFilter(markets) => {
                self.market_filter = markets;
                self.refilter();
            }
            DashboardAction::SetSort(sort) => self.sort = sort,
            DashboardAction::SetColumnConfig(config) => self.column_config = config,
            DashboardAction::SetCustomScripts(library) => self.custom_scripts = library,
        }
    }

    pub fn filter(&self) -> StockFilter {
        StockFilter {
            search_term: self.search_term.clone(),
            markets: self.market_filter.clone(),
        }
    }

    /// Filtered rows in the active sort order.
    pub fn sorted_rows(&self) -> Vec<Stock> {
        self.sort.sorted(&self.filtered_stocks)
    }

    fn refilter(&mut self) {
        let filtered = self.filter().apply(&self.stocks);
        self.apply(DashboardAction::SetFilteredStocks(filtered));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock(symbol: &str, market: &str) -> Stock {
        let mut stock = Stock::new(symbol);
        stock.stock_name = Some(format!("{symbol} Co"));
        stock.market_code = Some(market.to_string());
        stock
    }

    fn visible(state: &DashboardState) -> Vec<&str> {
        state.filtered_stocks.iter().map(|s| s.symbol.as_str()).collect()
    }

    #[test]
    fn row_and_filter_changes_refilter() {
        let mut state = DashboardState::default();
        state.apply(DashboardAction::SetStocks(vec![
            stock("AAA", "SH"),
            stock("BBB", "SZ"),
            stock("AAB", "BJ"),
        ]));
        assert_eq!(visible(&state), vec!["AAA", "BBB", "AAB"]);

        state.apply(DashboardAction::SetSearchTerm("aa".into()));
        assert_eq!(visible(&state), vec!["AAA", "AAB"]);

        state.apply(DashboardAction::SetMarketFilter(MarketSet::new(["BJ"])));
        assert_eq!(visible(&state), vec!["AAB"]);

        state.apply(DashboardAction::SetStocks(vec![stock("AAZ", "BJ")]));
        assert_eq!(visible(&state), vec!["AAZ"]);
    }

    #[test]
    fn unrelated_actions_leave_rows_alone() {
        let mut state = DashboardState::default();
        state.apply(DashboardAction::SetStocks(vec![stock("AAA", "SH")]));
        state.apply(DashboardAction::SetLoading(true));
        state.apply(DashboardAction::SetError(Some("No stock data available".into())));
        assert!(state.loading);
        assert_eq!(state.error.as_deref(), Some("No stock data available"));
        assert_eq!(visible(&state), vec!["AAA"]);
    }
}
