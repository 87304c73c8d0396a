use crate::error::ApiError;
use async_trait::async_trait;
use chrono::NaiveDate;
use configuration::ApiConfig;
use core_types::{Fund, Portfolio, PricePoint, Script, ScriptDraft, ScriptId, Stock, User};
use reqwest::{RequestBuilder, StatusCode, Url};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub mod error;
pub mod responses;
// --- Public API ---
pub use responses::{Envelope, ErrorBody, ExecutionResults, ListPayload, LoginResponse};

/// Column name used when an inline execution is submitted without one.
pub const DEFAULT_COLUMN_NAME: &str = "Custom Column";

const EXECUTION_FAILED: &str = "Script execution failed";

/// The generic, abstract interface for the dashboard's remote services.
/// Everything above this crate talks to this trait, so the HTTP client can be
/// swapped for a stub in tests.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Logs in with `use_cookie: true`; the session cookie is kept by the client.
    async fn login(&self, username: &str, password: &str) -> Result<Option<User>, ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;

    /// Authenticated ping against the users endpoint.
    async fn check_auth(&self) -> Result<(), ApiError>;

    async fn list_stocks(&self, query: &StockListQuery) -> Result<Vec<Stock>, ApiError>;

    async fn stock_info(&self, symbol: &str) -> Result<Stock, ApiError>;

    async fn stock_history(&self, query: &HistoryQuery) -> Result<Vec<PricePoint>, ApiError>;

    async fn execute_script(&self, request: &ExecuteRequest) -> Result<ExecutionResults, ApiError>;

    async fn list_scripts(&self) -> Result<Vec<Script>, ApiError>;

    async fn get_script(&self, id: &ScriptId) -> Result<Script, ApiError>;

    async fn create_script(&self, draft: &ScriptDraft) -> Result<Script, ApiError>;

    async fn update_script(&self, id: &ScriptId, draft: &ScriptDraft) -> Result<Script, ApiError>;

    async fn delete_script(&self, id: &ScriptId) -> Result<(), ApiError>;

    async fn list_funds(&self, search: Option<&str>) -> Result<Vec<Fund>, ApiError>;

    async fn list_portfolios(&self) -> Result<Vec<Portfolio>, ApiError>;
}

/// Query parameters of the stock list call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StockListQuery {
    pub market_code: Option<String>,
    pub is_active: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Scripts whose results should be attached to every row.
    pub script_ids: Vec<ScriptId>,
}

impl StockListQuery {
    /// Builds the query string pairs. Zero `limit`/`offset` are omitted and
    /// `script_ids` is sent comma-joined, only when non-empty.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(market) = self.market_code.as_deref().filter(|m| !m.is_empty()) {
            params.push(("market_code", market.to_string()));
        }
        if let Some(active) = self.is_active {
            params.push(("is_active", active.to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset.filter(|o| *o > 0) {
            params.push(("offset", offset.to_string()));
        }
        if !self.script_ids.is_empty() {
            let ids: Vec<&str> = self.script_ids.iter().map(ScriptId::as_str).collect();
            params.push(("script_ids", ids.join(",")));
        }
        params
    }
}

/// Query parameters of the per-symbol price history call.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryQuery {
    pub symbol: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl HistoryQuery {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            start_date: None,
            end_date: None,
            limit: None,
        }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("symbol", self.symbol.clone())];
        if let Some(start) = self.start_date {
            params.push(("start_date", start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = self.end_date {
            params.push(("end_date", end.format("%Y-%m-%d").to_string()));
        }
        if let Some(limit) = self.limit.filter(|l| *l > 0) {
            params.push(("limit", limit.to_string()));
        }
        params
    }
}

/// Which script to run: a stored one by id, or inline source.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptSource {
    Stored(ScriptId),
    Inline(String),
}

/// Body of the execute call.
///
/// Serializes to `{script_id, column_name, stock_symbols}` or
/// `{script, column_name, stock_symbols}` depending on the source; the two
/// forms can never appear together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecuteRequest {
    #[serde(flatten)]
    source: SourceField,
    column_name: String,
    stock_symbols: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
enum SourceField {
    #[serde(rename = "script_id")]
    Stored(ScriptId),
    #[serde(rename = "script")]
    Inline(String),
}

impl ExecuteRequest {
    /// An empty symbol list asks the executor for every stock.
    pub fn new(source: ScriptSource, column_name: &str, stock_symbols: Vec<String>) -> Self {
        let column_name = if column_name.trim().is_empty() {
            DEFAULT_COLUMN_NAME.to_string()
        } else {
            column_name.to_string()
        };
        let source = match source {
            ScriptSource::Stored(id) => SourceField::Stored(id),
            ScriptSource::Inline(code) => SourceField::Inline(code),
        };
        Self {
            source,
            column_name,
            stock_symbols,
        }
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }
}

/// The `reqwest` implementation of [`DashboardApi`].
///
/// Auth, users, funds and portfolios live under `base_url`; stock prices and
/// custom calculations live under `data_url`. Cookies live in a shared jar
/// that is written to the session file after every login and logout.
#[derive(Clone)]
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: Url,
    data_url: Url,
    cookies: Arc<CookieStoreMutex>,
    session_file: Option<PathBuf>,
}

impl HttpApiClient {
    /// A client whose cookies live only as long as the process.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        Self::build(config, CookieStore::default(), None)
    }

    /// A client whose cookie jar is loaded from, and saved to, `path`.
    ///
    /// A missing file starts an empty jar. An unreadable one is logged and
    /// replaced on the next save.
    pub fn with_session_file(
        config: &ApiConfig,
        path: impl Into<PathBuf>,
    ) -> Result<Self, ApiError> {
        let path = path.into();
        let store = match File::open(&path) {
            Ok(file) => match cookie_store::serde::json::load(BufReader::new(file)) {
                Ok(store) => store,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Ignoring unreadable session file."
                    );
                    CookieStore::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => CookieStore::default(),
            Err(e) => return Err(ApiError::Session(format!("{}: {e}", path.display()))),
        };
        Self::build(config, store, Some(path))
    }

    fn build(
        config: &ApiConfig,
        store: CookieStore,
        session_file: Option<PathBuf>,
    ) -> Result<Self, ApiError> {
        let cookies = Arc::new(CookieStoreMutex::new(store));
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: parse_root(&config.base_url)?,
            data_url: parse_root(&config.data_url)?,
            cookies,
            session_file,
        })
    }

    /// Writes the jar, session cookies included, to the session file.
    pub fn save_session(&self) -> Result<(), ApiError> {
        let Some(path) = &self.session_file else {
            return Ok(());
        };
        let store = self
            .cookies
            .lock()
            .map_err(|_| ApiError::Session("cookie jar lock poisoned".to_string()))?;
        let file = File::create(path)
            .map_err(|e| ApiError::Session(format!("{}: {e}", path.display())))?;
        let mut writer = BufWriter::new(file);
        cookie_store::serde::json::save_incl_expired_and_nonpersistent(&store, &mut writer)
            .map_err(|e| ApiError::Session(e.to_string()))?;
        tracing::debug!(path = %path.display(), "Session saved.");
        Ok(())
    }

    fn clear_cookies(&self) -> Result<(), ApiError> {
        self.cookies
            .lock()
            .map_err(|_| ApiError::Session("cookie jar lock poisoned".to_string()))?
            .clear();
        Ok(())
    }

    fn base(&self, segments: &[&str]) -> Url {
        join_segments(&self.base_url, segments)
    }

    fn data(&self, segments: &[&str]) -> Url {
        join_segments(&self.data_url, segments)
    }

    /// Sends a request to the same-origin API, where success is signalled by
    /// the HTTP status alone and the body is returned as-is.
    async fn send_plain(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(status = status.as_u16(), "Plain API response received.");

        if status.is_success() {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
        } else {
            let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
            let message = body.text().unwrap_or("API request failed");
            Err(ApiError::remote(Some(status.as_u16()), message))
        }
    }

    /// Sends a request to the stock/script service and unwraps its envelope.
    ///
    /// `accepted` lists the envelope codes that count as success; anything
    /// else, and any non-2xx status, becomes `ApiError::Remote` carrying the
    /// service's message or `fallback`.
    async fn send_envelope<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        accepted: &[i64],
        fallback: &str,
    ) -> Result<Option<T>, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        tracing::debug!(status = status.as_u16(), "Envelope API response received.");

        let envelope = match serde_json::from_str::<Envelope<T>>(&text) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => return Err(ApiError::Deserialization(e.to_string())),
            Err(_) => {
                let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
                return Err(ApiError::remote(
                    Some(status.as_u16()),
                    body.text().unwrap_or(fallback),
                ));
            }
        };

        if !status.is_success() || !accepted.contains(&envelope.code) {
            let message = envelope.failure_text().unwrap_or(fallback).to_string();
            return Err(ApiError::remote(Some(status.as_u16()), message));
        }
        Ok(envelope.data)
    }

    async fn send_envelope_data<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        accepted: &[i64],
        fallback: &str,
    ) -> Result<T, ApiError> {
        self.send_envelope(request, accepted, fallback)
            .await?
            .ok_or_else(|| ApiError::InvalidData("response envelope carried no data".to_string()))
    }

    /// Lists from the same-origin API may or may not be enveloped.
    fn plain_list<T: DeserializeOwned>(body: Value) -> Result<Vec<T>, ApiError> {
        let payload = match body {
            Value::Object(mut fields) if fields.contains_key("data") => {
                fields.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        };
        serde_json::from_value::<ListPayload<T>>(payload)
            .map(ListPayload::into_items)
            .map_err(|e| ApiError::Deserialization(e.to_string()))
    }
}

const OK: &[i64] = &[200];
const CREATED: &[i64] = &[200, 201];

#[async_trait]
impl DashboardApi for HttpApiClient {
    async fn login(&self, username: &str, password: &str) -> Result<Option<User>, ApiError> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            username: &'a str,
            password: &'a str,
            use_cookie: bool,
        }

        let payload = LoginPayload {
            username,
            password,
            use_cookie: true,
        };
        let body = self
            .send_plain(
                self.client
                    .post(self.base(&["auth", "login"]))
                    .json(&payload),
            )
            .await?;
        let response: LoginResponse = serde_json::from_value(body).unwrap_or_default();
        self.save_session()?;
        Ok(response.into_user())
    }

    /// The local jar is emptied and saved even when the service call fails.
    async fn logout(&self) -> Result<(), ApiError> {
        let result = self
            .send_plain(
                self.client
                    .post(self.base(&["auth", "logout"]))
                    .json(&serde_json::json!({})),
            )
            .await;
        self.clear_cookies()?;
        self.save_session()?;
        result.map(|_| ())
    }

    async fn check_auth(&self) -> Result<(), ApiError> {
        self.send_plain(self.client.get(self.base(&["users"]))).await?;
        Ok(())
    }

    async fn list_stocks(&self, query: &StockListQuery) -> Result<Vec<Stock>, ApiError> {
        let request = self
            .client
            .get(self.data(&["stock-price", "list"]))
            .query(&query.to_params());
        let payload: ListPayload<Stock> = self
            .send_envelope_data(request, OK, "Failed to load stock data")
            .await?;
        Ok(payload.into_items())
    }

    async fn stock_info(&self, symbol: &str) -> Result<Stock, ApiError> {
        let request = self
            .client
            .get(self.data(&["stock-price", "info", symbol]));
        self.send_envelope_data(request, OK, "Failed to load stock info")
            .await
    }

    async fn stock_history(&self, query: &HistoryQuery) -> Result<Vec<PricePoint>, ApiError> {
        let request = self
            .client
            .get(self.data(&["stock-price", "query"]))
            .query(&query.to_params());
        let payload: ListPayload<PricePoint> = self
            .send_envelope_data(request, OK, "Failed to load price history")
            .await?;
        Ok(payload.into_items())
    }

    async fn execute_script(&self, request: &ExecuteRequest) -> Result<ExecutionResults, ApiError> {
        tracing::debug!(column = %request.column_name(), "Executing script.");
        let http = self
            .client
            .post(self.data(&["custom-calculations", "execute"]))
            .json(request);
        let data: Value = self
            .send_envelope(http, OK, EXECUTION_FAILED)
            .await?
            .unwrap_or(Value::Null);
        if data.is_null() {
            return Ok(ExecutionResults::default());
        }
        ExecutionResults::from_value(data).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    async fn list_scripts(&self) -> Result<Vec<Script>, ApiError> {
        let request = self.client.get(self.data(&["custom-calculations", "scripts"]));
        let payload: ListPayload<Script> = self
            .send_envelope_data(request, OK, "Failed to load scripts")
            .await?;
        Ok(payload.into_items())
    }

    async fn get_script(&self, id: &ScriptId) -> Result<Script, ApiError> {
        let request = self
            .client
            .get(self.data(&["custom-calculations", "scripts", id.as_str()]));
        self.send_envelope_data(request, OK, "Failed to load script")
            .await
    }

    async fn create_script(&self, draft: &ScriptDraft) -> Result<Script, ApiError> {
        let request = self
            .client
            .post(self.data(&["custom-calculations", "scripts"]))
            .json(draft);
        self.send_envelope_data(request, CREATED, "Failed to create script")
            .await
    }

    async fn update_script(&self, id: &ScriptId, draft: &ScriptDraft) -> Result<Script, ApiError> {
        let request = self
            .client
            .put(self.data(&["custom-calculations", "scripts", id.as_str()]))
            .json(draft);
        self.send_envelope_data(request, OK, "Failed to update script")
            .await
    }

    async fn delete_script(&self, id: &ScriptId) -> Result<(), ApiError> {
        let request = self
            .client
            .delete(self.data(&["custom-calculations", "scripts", id.as_str()]));
        self.send_envelope::<Value>(request, OK, "Failed to delete script")
            .await?;
        Ok(())
    }

    async fn list_funds(&self, search: Option<&str>) -> Result<Vec<Fund>, ApiError> {
        let mut request = self.client.get(self.base(&["funds"]));
        if let Some(term) = search.filter(|t| !t.trim().is_empty()) {
            request = request.query(&[("search", term)]);
        }
        let body = self.send_plain(request).await?;
        Self::plain_list(body)
    }

    async fn list_portfolios(&self) -> Result<Vec<Portfolio>, ApiError> {
        let body = self.send_plain(self.client.get(self.base(&["portfolios"]))).await?;
        Self::plain_list(body)
    }
}

/// True when the error is an authentication rejection from the service.
pub fn is_unauthorized(error: &ApiError) -> bool {
    matches!(
        error,
        ApiError::Remote { status: Some(code), .. }
            if *code == StatusCode::UNAUTHORIZED.as_u16() || *code == StatusCode::FORBIDDEN.as_u16()
    )
}

fn parse_root(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ApiError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Appends path segments to a root URL, percent-encoding each one.
fn join_segments(root: &Url, segments: &[&str]) -> Url {
    let mut url = root.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
