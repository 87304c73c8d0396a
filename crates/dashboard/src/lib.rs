use crate::error::DashboardError;
use crate::generation::{Generation, RequestGenerations};
use crate::state::{DashboardAction, DashboardState};
use api_client::error::ApiError;
use api_client::{
    DashboardApi, ExecuteRequest, ExecutionResults, HistoryQuery, ScriptSource, StockListQuery,
};
use configuration::DashboardConfig;
use core_types::{PricePoint, Script, ScriptDraft, ScriptId, Stock, StockField};
use std::sync::Arc;

// Declare the modules that make up this crate.
pub mod columns;
pub mod error;
pub mod filter;
pub mod format;
pub mod generation;
pub mod indicators;
pub mod selection;
pub mod session;
pub mod sort;
pub mod state;
pub mod table;
pub mod validation;

// --- Public API ---
pub use columns::{default_columns, visible_fields, ColumnSettingsStore};
pub use filter::{filter_funds, MarketSet, StockFilter};
pub use indicators::Indicators;
pub use selection::{ScriptLibrary, ScriptSelection};
pub use session::Session;
pub use sort::SortState;
pub use table::{build_table, ColumnKey, TableModel, Tone};
pub use validation::{validate_script, ScriptValidation, ValidationError};

const NO_STOCK_DATA: &str = "No stock data available";
const STOCK_LOAD_FAILED: &str = "Failed to load stock data";

/// Parameters sent with every stock list request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListSettings {
    pub page_size: u32,
    pub market_code: Option<String>,
    pub is_active: Option<bool>,
    pub offset: Option<u32>,
}

impl ListSettings {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            page_size: config.page_size,
            market_code: None,
            is_active: config.is_active,
            offset: None,
        }
    }
}

/// A stock list response together with the ticket of the request that
/// produced it.
#[derive(Debug)]
pub struct StockFetch {
    generation: Generation,
    result: Result<Vec<Stock>, ApiError>,
}

#[derive(Debug)]
pub struct LibraryFetch {
    generation: Generation,
    result: Result<Vec<Script>, ApiError>,
}

/// One stock with its recent history and the indicators derived from it.
#[derive(Debug, Clone, PartialEq)]
pub struct StockDetail {
    pub stock: Stock,
    pub history: Vec<PricePoint>,
    pub indicators: Indicators,
    pub rsi: rust_decimal::Decimal,
}

/// Owns everything the stock table needs: the API handle, the state
/// container, the script library and selection, and the request tickets that
/// keep stale responses out.
///
/// Loads are split into a `fetch_*` half that only borrows `self` and an
/// `apply_*` half that mutates it, so several loads can be in flight at once
/// and each response is checked against the newest ticket before it lands.
pub struct Dashboard {
    api: Arc<dyn DashboardApi>,
    state: DashboardState,
    selection: ScriptSelection,
    settings: ListSettings,
    stock_requests: RequestGenerations,
    library_requests: RequestGenerations,
}

impl Dashboard {
    pub fn new(api: Arc<dyn DashboardApi>, config: &DashboardConfig) -> Self {
        let mut state = DashboardState::default();
        state.apply(DashboardAction::SetMarketFilter(MarketSet::from_markets(
            &config.markets,
        )));
        Self {
            api,
            state,
            selection: ScriptSelection::default(),
            settings: ListSettings::from_config(config),
            stock_requests: RequestGenerations::new(),
            library_requests: RequestGenerations::new(),
        }
    }

    /// Starts with the given scripts selected, without loading anything.
    pub fn with_selection(mut self, selection: ScriptSelection) -> Self {
        self.selection = selection;
        self
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    pub fn selection(&self) -> &ScriptSelection {
        &self.selection
    }

    pub fn library(&self) -> &ScriptLibrary {
        &self.state.custom_scripts
    }

    pub fn settings_mut(&mut self) -> &mut ListSettings {
        &mut self.settings
    }

    /// Dispatches an action to the state container.
    pub fn dispatch(&mut self, action: DashboardAction) {
        self.state.apply(action);
    }

    pub fn stock_query(&self) -> StockListQuery {
        StockListQuery {
            market_code: self.settings.market_code.clone(),
            is_active: self.settings.is_active,
            limit: Some(self.settings.page_size),
            offset: self.settings.offset,
            script_ids: self.selection.ids().to_vec(),
        }
    }

    // --- Stock list ---

    pub async fn fetch_stocks(&self) -> StockFetch {
        let generation = self.stock_requests.begin();
        let query = self.stock_query();
        tracing::debug!(scripts = query.script_ids.len(), "Requesting stock list.");
        StockFetch {
            generation,
            result: self.api.list_stocks(&query).await,
        }
    }

    /// Applies a stock list response. Returns `Ok(false)` when a newer request
    /// has been issued since, in which case the state is left untouched.
    pub fn apply_stocks(&mut self, fetch: StockFetch) -> Result<bool, DashboardError> {
        if !self.stock_requests.is_current(fetch.generation) {
            tracing::debug!(generation = ?fetch.generation, "Dropping stale stock list response.");
            return Ok(false);
        }

        let outcome = match fetch.result {
            Ok(stocks) if stocks.is_empty() => {
                self.dispatch(DashboardAction::SetStocks(Vec::new()));
                Err(DashboardError::Load(NO_STOCK_DATA.to_string()))
            }
            Ok(stocks) => {
                tracing::info!(rows = stocks.len(), "Stock list loaded.");
                self.dispatch(DashboardAction::SetStocks(stocks));
                Ok(true)
            }
            Err(ApiError::Remote { .. }) => {
                Err(DashboardError::Load(STOCK_LOAD_FAILED.to_string()))
            }
            Err(e) => Err(DashboardError::Load(e.to_string())),
        };

        let error = outcome.as_ref().err().map(ToString::to_string);
        self.dispatch(DashboardAction::SetError(error));
        outcome
    }

    /// Fetches and applies the stock list with the current selection attached.
    pub async fn reload_stocks(&mut self) -> Result<bool, DashboardError> {
        self.dispatch(DashboardAction::SetLoading(true));
        let fetch = self.fetch_stocks().await;
        let outcome = self.apply_stocks(fetch);
        self.dispatch(DashboardAction::SetLoading(false));
        outcome
    }

    // --- Script library ---

    pub async fn fetch_library(&self) -> LibraryFetch {
        LibraryFetch {
            generation: self.library_requests.begin(),
            result: self.api.list_scripts().await,
        }
    }

    pub fn apply_library(&mut self, fetch: LibraryFetch) -> Result<bool, DashboardError> {
        if !self.library_requests.is_current(fetch.generation) {
            tracing::debug!(
                generation = ?fetch.generation,
                "Dropping stale script library response."
            );
            return Ok(false);
        }
        let scripts = fetch.result?;
        tracing::debug!(scripts = scripts.len(), "Script library loaded.");
        self.dispatch(DashboardAction::SetCustomScripts(ScriptLibrary::new(scripts)));
        Ok(true)
    }

    pub async fn reload_library(&mut self) -> Result<bool, DashboardError> {
        let fetch = self.fetch_library().await;
        self.apply_library(fetch)
    }

    /// Loads the library and the stock list concurrently.
    pub async fn refresh(&mut self) -> Result<(), DashboardError> {
        self.dispatch(DashboardAction::SetLoading(true));
        let (library, stocks) = futures::join!(self.fetch_library(), self.fetch_stocks());
        let library = self.apply_library(library);
        let stocks = self.apply_stocks(stocks);
        self.dispatch(DashboardAction::SetLoading(false));
        library?;
        stocks?;
        Ok(())
    }

    // --- Selection ---

    /// Replaces the selection. Any change to the id sequence, order included,
    /// refetches the stock list; returns whether a refetch happened.
    pub async fn set_selection(
        &mut self,
        selection: ScriptSelection,
    ) -> Result<bool, DashboardError> {
        if self.selection == selection {
            return Ok(false);
        }
        self.selection = selection;
        self.reload_stocks().await?;
        Ok(true)
    }

    pub async fn toggle_script(&mut self, id: ScriptId) -> Result<bool, DashboardError> {
        let mut selection = self.selection.clone();
        selection.toggle(id);
        self.set_selection(selection).await
    }

    // --- Script CRUD ---

    /// Deletes a script. The id leaves the selection before anything is
    /// reloaded, so no later request asks for it.
    pub async fn delete_script(&mut self, id: &ScriptId) -> Result<(), DashboardError> {
        self.api.delete_script(id).await?;
        tracing::info!(script = %id, "Script deleted.");
        let was_selected = self.selection.remove(id);
        self.reload_library().await?;
        if was_selected {
            self.reload_stocks().await?;
        }
        Ok(())
    }

    pub async fn create_script(&mut self, draft: &ScriptDraft) -> Result<Script, DashboardError> {
        validate_script(&draft.code).into_result()?;
        let script = self.api.create_script(draft).await?;
        tracing::info!(script = %script.id, "Script created.");
        self.reload_library().await?;
        Ok(script)
    }

    pub async fn update_script(
        &mut self,
        id: &ScriptId,
        draft: &ScriptDraft,
    ) -> Result<Script, DashboardError> {
        validate_script(&draft.code).into_result()?;
        let script = self.api.update_script(id, draft).await?;
        tracing::info!(script = %id, "Script updated.");
        self.reload_library().await?;
        Ok(script)
    }

    // --- Execution ---

    /// Runs unsaved source. Validation failures never reach the service.
    pub async fn execute_inline(
        &self,
        code: &str,
        column_name: &str,
        symbols: Vec<String>,
    ) -> Result<ExecutionResults, DashboardError> {
        validate_script(code).into_result()?;
        let request = ExecuteRequest::new(
            ScriptSource::Inline(code.to_string()),
            column_name,
            symbols,
        );
        Ok(self.api.execute_script(&request).await?)
    }

    pub async fn execute_stored(
        &self,
        id: &ScriptId,
        column_name: &str,
        symbols: Vec<String>,
    ) -> Result<ExecutionResults, DashboardError> {
        let request = ExecuteRequest::new(ScriptSource::Stored(id.clone()), column_name, symbols);
        Ok(self.api.execute_script(&request).await?)
    }

    // --- Views ---

    /// The render model for the filtered rows in the active sort order.
    pub fn table(&self, visible: &[StockField]) -> TableModel {
        build_table(
            &self.state.sorted_rows(),
            &self.selection,
            &self.state.custom_scripts,
            visible,
        )
    }

    /// Stock info plus history, fetched together, with indicators computed
    /// over the history sorted by trade date.
    pub async fn stock_detail(&self, query: &HistoryQuery) -> Result<StockDetail, DashboardError> {
        let (stock, history) = futures::join!(
            self.api.stock_info(&query.symbol),
            self.api.stock_history(query)
        );
        let stock = stock?;
        let mut history = history?;
        history.sort_by(|a, b| a.trade_date.cmp(&b.trade_date));

        let closes: Vec<_> = history.iter().filter_map(|p| p.close_price).collect();
        Ok(StockDetail {
            indicators: indicators::indicators(stock.close_price, &history),
            rsi: indicators::rsi(&closes, indicators::DEFAULT_RSI_PERIOD),
            stock,
            history,
        })
    }
}
