use anyhow::{bail, Context, Result};
use api_client::{DashboardApi, HistoryQuery, HttpApiClient};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use configuration::{Config, LogLevel};
use core_types::{Market, ScriptDraft, ScriptId, SortDirection};
use dashboard::state::DashboardAction;
use dashboard::{
    filter_funds, validate_script, visible_fields, ColumnKey, ColumnSettingsStore, Dashboard,
    MarketSet, ScriptSelection, ScriptValidation, Session, SortState,
};
use indicatif::ProgressStyle;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Instrument;
use tracing_indicatif::span_ext::IndicatifSpanExt;

mod logging;
mod view;

/// The entry point for the qtfund stock dashboard.
#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is fine; every setting has a default.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Stock dashboard with custom calculation scripts.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file; environment variables prefixed `DASHBOARD_` override it.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides the configured log level.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and keep the session cookie for this run.
    Login(LoginArgs),
    /// End the session.
    Logout,
    /// Report whether the session is authenticated.
    Status,
    /// Show the stock table.
    Stocks(StocksArgs),
    /// Show a single stock.
    StockInfo {
        symbol: String,
    },
    /// Momentum, moving averages and RSI for a single stock.
    Indicators(IndicatorsArgs),
    /// Manage and run custom calculation scripts.
    #[command(subcommand)]
    Scripts(ScriptsCommand),
    /// Show or change which base columns the stock table shows.
    #[command(subcommand)]
    Columns(ColumnsCommand),
    /// List funds.
    Funds {
        /// Case-insensitive match on fund name or code.
        #[arg(long)]
        search: Option<String>,
    },
    /// List portfolios and their holdings.
    Portfolios,
}

#[derive(Args)]
struct LoginArgs {
    /// Defaults to `auth.username` from the configuration.
    #[arg(long)]
    username: Option<String>,
    /// Defaults to `auth.password` from the configuration.
    #[arg(long)]
    password: Option<String>,
}

#[derive(Args)]
struct StocksArgs {
    /// Case-insensitive match on symbol or name.
    #[arg(long)]
    search: Option<String>,
    /// Markets to show (SH, SZ, BJ). Repeatable; defaults to the configured set.
    #[arg(long = "market")]
    markets: Vec<Market>,
    /// Script ids whose results are added as columns, in order. Repeatable.
    #[arg(long = "script")]
    scripts: Vec<String>,
    /// Column to sort by: a field key such as `close_price`, or `script:<id>`.
    #[arg(long)]
    sort: Option<String>,
    /// Sort descending instead of ascending.
    #[arg(long, requires = "sort")]
    desc: bool,
    /// Number of rows requested from the service.
    #[arg(long)]
    limit: Option<u32>,
}

#[derive(Args)]
struct IndicatorsArgs {
    symbol: String,
    /// Start of the price history (format: YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,
    /// End of the price history (format: YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Number of history points to request.
    #[arg(long, default_value_t = 60)]
    limit: u32,
}

#[derive(Subcommand)]
enum ScriptsCommand {
    /// List saved scripts.
    List,
    /// Show one script with its source.
    Show { id: String },
    /// Save a new script.
    Create(ScriptWriteArgs),
    /// Replace a saved script.
    Update {
        id: String,
        #[command(flatten)]
        script: ScriptWriteArgs,
    },
    /// Delete a saved script.
    Delete { id: String },
    /// Check a script locally without running it.
    Validate(SourceArgs),
    /// Run a saved script by id, or unsaved source.
    Execute(ExecuteArgs),
}

#[derive(Args)]
struct SourceArgs {
    /// Script source given inline.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    code: Option<String>,
    /// File containing the script source.
    #[arg(long)]
    file: Option<PathBuf>,
}

impl SourceArgs {
    fn read(&self) -> Result<String> {
        match (&self.code, &self.file) {
            (Some(code), _) => Ok(code.clone()),
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read script file {}", path.display())),
            (None, None) => bail!("Provide the script with --code or --file"),
        }
    }
}

#[derive(Args)]
struct ScriptWriteArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    description: Option<String>,
    #[command(flatten)]
    source: SourceArgs,
}

impl ScriptWriteArgs {
    fn draft(&self) -> Result<ScriptDraft> {
        Ok(ScriptDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            code: self.source.read()?,
        })
    }
}

#[derive(Args)]
struct ExecuteArgs {
    /// Id of a saved script. Without it, --code or --file is run instead.
    #[arg(long, conflicts_with_all = ["code", "file"])]
    id: Option<String>,
    #[arg(long, conflicts_with = "file")]
    code: Option<String>,
    #[arg(long)]
    file: Option<PathBuf>,
    /// Name of the result column.
    #[arg(long, default_value = "")]
    column: String,
    /// Symbols to run against. Repeatable; defaults to every stock.
    #[arg(long = "symbol")]
    symbols: Vec<String>,
}

#[derive(Subcommand)]
enum ColumnsCommand {
    /// Show every base column and whether it is visible.
    Show,
    /// Flip one column's visibility.
    Toggle { key: String },
    /// Make every column visible.
    Reset,
}

// ==============================================================================
// Command Dispatch
// ==============================================================================

async fn run(cli: Cli) -> Result<()> {
    let mut config = configuration::load_config_from(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    let _log_guard = logging::init_tracing(&config.logging)?;

    let client = HttpApiClient::with_session_file(&config.api, &config.auth.session_file)
        .context("Failed to build the HTTP client")?;
    let api: Arc<dyn DashboardApi> = Arc::new(client);
    let mut session = Session::new(api.clone());

    match cli.command {
        Commands::Login(args) => handle_login(args, &config, &mut session).await,
        Commands::Logout => {
            session.logout().await;
            println!("Logged out.");
            Ok(())
        }
        Commands::Status => {
            if with_spinner("Checking session...", session.check()).await {
                println!("Authenticated.");
            } else {
                println!("Not authenticated.");
            }
            Ok(())
        }
        Commands::Columns(command) => handle_columns(command, &config),
        Commands::Stocks(args) => {
            require_session(&mut session, &config).await?;
            handle_stocks(args, &config, api).await
        }
        Commands::StockInfo { symbol } => {
            require_session(&mut session, &config).await?;
            let stock = with_spinner("Loading stock...", api.stock_info(&symbol)).await?;
            println!("{}", view::stock_info_table(&stock));
            Ok(())
        }
        Commands::Indicators(args) => {
            require_session(&mut session, &config).await?;
            handle_indicators(args, &config, api).await
        }
        Commands::Scripts(command) => {
            require_session(&mut session, &config).await?;
            handle_scripts(command, &config, api).await
        }
        Commands::Funds { search } => {
            require_session(&mut session, &config).await?;
            let funds = with_spinner("Loading funds...", api.list_funds(search.as_deref())).await?;
            let funds = filter_funds(&funds, search.as_deref().unwrap_or_default());
            println!("{}", view::funds_table(&funds));
            Ok(())
        }
        Commands::Portfolios => {
            require_session(&mut session, &config).await?;
            let portfolios = with_spinner("Loading portfolios...", api.list_portfolios()).await?;
            if portfolios.is_empty() {
                println!("No portfolios.");
            }
            for portfolio in &portfolios {
                println!("{}", view::portfolio_summary(portfolio));
                println!("{}", view::portfolio_table(portfolio));
            }
            Ok(())
        }
    }
}

/// The gate in front of every data command: a live session, or an automatic
/// login with the configured credentials.
async fn require_session(session: &mut Session, config: &Config) -> Result<()> {
    with_spinner("Checking session...", session.ensure(&config.auth)).await?;
    Ok(())
}

/// Runs a future under a spinner span; the spinner clears when it finishes.
async fn with_spinner<F: Future>(message: &'static str, future: F) -> F::Output {
    let span = tracing::info_span!("request");
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
        span.pb_set_style(&style);
    }
    span.pb_set_message(message);
    future.instrument(span).await
}

// ==============================================================================
// Command Handlers
// ==============================================================================

async fn handle_login(args: LoginArgs, config: &Config, session: &mut Session) -> Result<()> {
    let username = args.username.or_else(|| config.auth.username.clone());
    let password = args.password.or_else(|| config.auth.password.clone());
    let (Some(username), Some(password)) = (username, password) else {
        bail!("Username and password are required (flags or auth.* configuration)");
    };
    let user = with_spinner("Logging in...", session.login(&username, &password)).await?;
    println!("Logged in as {}.", user.username);
    Ok(())
}

async fn handle_stocks(
    args: StocksArgs,
    config: &Config,
    api: Arc<dyn DashboardApi>,
) -> Result<()> {
    let selection = ScriptSelection::new(args.scripts.iter().map(|id| ScriptId::new(id.as_str())));
    let mut dash = Dashboard::new(api, &config.dashboard).with_selection(selection);
    if let Some(limit) = args.limit {
        dash.settings_mut().page_size = limit;
    }
    if let [market] = args.markets.as_slice() {
        dash.settings_mut().market_code = Some(market.code().to_string());
    }

    with_spinner("Loading stocks...", dash.refresh()).await?;

    if !args.markets.is_empty() {
        dash.dispatch(DashboardAction::SetMarketFilter(MarketSet::from_markets(&args.markets)));
    }
    if let Some(term) = args.search {
        dash.dispatch(DashboardAction::SetSearchTerm(term));
    }
    if let Some(sort) = args.sort {
        let column: ColumnKey = sort.parse()?;
        let direction = if args.desc {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        dash.dispatch(DashboardAction::SetSort(SortState::new(column, direction)));
    }

    let settings = ColumnSettingsStore::new(&config.dashboard.column_config_path).load();
    let table = dash.table(&visible_fields(&settings));
    println!("{}", view::stock_table(&table, &dash.state().sort));
    println!(
        "Showing {} of {} stocks.",
        dash.state().filtered_stocks.len(),
        dash.state().stocks.len()
    );
    Ok(())
}

async fn handle_indicators(
    args: IndicatorsArgs,
    config: &Config,
    api: Arc<dyn DashboardApi>,
) -> Result<()> {
    let dash = Dashboard::new(api, &config.dashboard);
    let mut query = HistoryQuery::new(args.symbol);
    query.start_date = args.from;
    query.end_date = args.to;
    query.limit = Some(args.limit);

    let detail = with_spinner("Loading price history...", dash.stock_detail(&query)).await?;
    println!("{}", view::stock_info_table(&detail.stock));
    if detail.indicators.is_empty() {
        println!("Not enough price history for momentum or moving averages.");
    }
    println!("{}", view::indicator_table(&detail));
    Ok(())
}

async fn handle_scripts(
    command: ScriptsCommand,
    config: &Config,
    api: Arc<dyn DashboardApi>,
) -> Result<()> {
    let mut dash = Dashboard::new(api.clone(), &config.dashboard);
    match command {
        ScriptsCommand::List => {
            with_spinner("Loading scripts...", dash.reload_library()).await?;
            if dash.library().is_empty() {
                println!("No saved scripts.");
            } else {
                println!("{}", view::scripts_table(dash.library().scripts()));
            }
        }
        ScriptsCommand::Show { id } => {
            let id = ScriptId::new(id);
            let script = with_spinner("Loading script...", api.get_script(&id)).await?;
            println!("{}", view::script_detail(&script));
        }
        ScriptsCommand::Create(args) => {
            let draft = args.draft()?;
            let script = with_spinner("Saving script...", dash.create_script(&draft)).await?;
            println!("Created script {} ({}).", script.id, script.display_label());
        }
        ScriptsCommand::Update { id, script } => {
            let draft = script.draft()?;
            let id = ScriptId::new(id);
            let script = with_spinner("Saving script...", dash.update_script(&id, &draft)).await?;
            println!("Updated script {} ({}).", script.id, script.display_label());
        }
        ScriptsCommand::Delete { id } => {
            let id = ScriptId::new(id);
            with_spinner("Deleting script...", dash.delete_script(&id)).await?;
            println!("Deleted script {}.", id);
        }
        ScriptsCommand::Validate(source) => match validate_script(&source.read()?) {
            ScriptValidation::Valid => println!("Script is valid."),
            ScriptValidation::Invalid(reason) => bail!(reason),
        },
        ScriptsCommand::Execute(args) => {
            let results = match &args.id {
                Some(id) => {
                    let id = ScriptId::new(id.as_str());
                    with_spinner(
                        "Running script...",
                        dash.execute_stored(&id, &args.column, args.symbols.clone()),
                    )
                    .await?
                }
                None => {
                    let source = SourceArgs {
                        code: args.code.clone(),
                        file: args.file.clone(),
                    };
                    let code = source.read()?;
                    with_spinner(
                        "Running script...",
                        dash.execute_inline(&code, &args.column, args.symbols.clone()),
                    )
                    .await?
                }
            };
            println!("{}", view::results_table(&results, &args.column));
            let failed = results.failures().count();
            if failed > 0 {
                tracing::warn!(failed, "Script failed for some symbols.");
            }
        }
    }
    Ok(())
}

fn handle_columns(command: ColumnsCommand, config: &Config) -> Result<()> {
    let store = ColumnSettingsStore::new(&config.dashboard.column_config_path);
    let settings = match command {
        ColumnsCommand::Show => store.load(),
        ColumnsCommand::Toggle { key } => store.toggle(&key)?,
        ColumnsCommand::Reset => store.reset()?,
    };
    println!("{}", view::columns_table(&settings));
    Ok(())
}
