//! QuantAI Command-Line Client
//!
//! Terminal front end for the QuantAI backend.
//!
//! # Usage
//!
//! ```bash
//! quantai home
//! quantai quote AAPL
//! quantai chart AAPL --timeframe 1D
//! quantai search tesla
//! quantai analyze NVDA
//! quantai admin users
//! quantai admin set-pro <uid> true
//! ```
//!
//! # Environment Variables
//!
//! - `QUANTAI_API_URL`: Backend base URL (default: http://localhost:8000)
//! - `QUANTAI_ID_TOKEN`: Bearer ID token; unset runs signed out
//! - `QUANTAI_USER_ID`, `QUANTAI_USER_EMAIL`: Identity of the token holder
//! - `QUANTAI_ADMIN_EMAIL`: Allow-listed admin account
//! - `RUST_LOG`: Log filter (logs go to stderr)

use std::collections::BTreeSet;
use std::io::{IsTerminal, Write};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand};
use rust_decimal::Decimal;

use quantai_client::application::services::plan_counts;
use quantai_client::domain::view::{Theme, ThemeScope, ThemeSink};
use quantai_client::infrastructure::metrics::get_metrics_handle;
use quantai_client::{
    AdminConsole, AgentId, AnalysisOutcome, BackendClient, ClientConfig, IdentityProvider,
    SearchDebouncer, StaticIdentity, TickerCard, TickerOutcome, Timeframe, ViewController, ViewState,
    init_metrics, init_telemetry, load_landing,
};

type Controller = ViewController<BackendClient, StaticIdentity>;

/// QuantAI stock analysis from the terminal.
#[derive(Parser)]
#[command(name = "quantai", version, about = "QuantAI streaming analysis client")]
struct Cli {
    /// Print Prometheus metrics to stderr on exit
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the landing page cards
    Home,

    /// Show the quick-stats header for a ticker
    Quote {
        /// Ticker symbol
        ticker: String,
    },

    /// Print the chart series for a ticker
    Chart {
        /// Ticker symbol
        ticker: String,
        /// 1D, 1W, 1M, 3M, YTD, 1Y, 5Y or ALL
        #[arg(short, long, default_value = "1M")]
        timeframe: Timeframe,
    },

    /// Search symbols
    Search {
        /// Free-text query
        query: String,
    },

    /// Show the signed-in user's plan
    Profile,

    /// Stream the AI debate for a ticker
    Analyze {
        /// Ticker symbol
        ticker: String,
    },

    /// Admin console
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// List users, newest first
    Users,

    /// Set a user's Pro flag
    SetPro {
        /// User id
        uid: String,
        /// New Pro value
        #[arg(action = ArgAction::Set)]
        pro: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _ = dotenvy::dotenv();
    let _telemetry = init_telemetry().context("failed to initialize telemetry")?;
    if cli.metrics {
        init_metrics().context("failed to install metrics recorder")?;
    }

    let config = ClientConfig::from_env().context("invalid configuration")?;
    let backend = Arc::new(BackendClient::new(config.backend.clone())?);
    tracing::debug!(
        api = %backend.base_url(),
        signed_in = config.credentials.is_some(),
        "Configuration loaded"
    );
    let identity = Arc::new(StaticIdentity::new(config.credentials.clone()));

    let result = match cli.command {
        Commands::Home => home(&backend).await,
        Commands::Quote { ticker } => quote(&backend, &identity, &ticker).await,
        Commands::Chart { ticker, timeframe } => chart(&backend, &identity, &ticker, timeframe).await,
        Commands::Search { query } => search(&backend, &config, &query).await,
        Commands::Profile => profile(&backend, &identity).await,
        Commands::Analyze { ticker } => analyze(&backend, &identity, &ticker).await,
        Commands::Admin { command } => admin(backend, identity, &config, command).await,
    };

    if let Some(handle) = get_metrics_handle() {
        eprintln!("{}", handle.render());
    }
    result
}

// =============================================================================
// Commands
// =============================================================================

fn controller(backend: &Arc<BackendClient>, identity: &Arc<StaticIdentity>) -> Controller {
    ViewController::new(Arc::clone(backend), Arc::clone(identity))
}

async fn home(backend: &Arc<BackendClient>) -> Result<()> {
    let page = load_landing(backend.as_ref()).await;

    println!("Top Picks");
    for card in &page.top_picks {
        print_card(card);
    }
    println!();
    println!("Recent Scans");
    for card in &page.recent_scans {
        print_card(card);
    }
    Ok(())
}

async fn quote(backend: &Arc<BackendClient>, identity: &Arc<StaticIdentity>, ticker: &str) -> Result<()> {
    let controller = controller(backend, identity);
    controller.load_snapshot(ticker).await?;

    let state = controller.snapshot();
    if let Some(notice) = &state.notice {
        bail!("{notice}");
    }
    print_header(&state);

    if let Some(quote) = &state.quote {
        for (key, value) in &quote.metrics {
            println!("  {key:<12} {value}");
        }
        if let Some(cap) = quote.market_cap {
            println!("  {:<12} {cap:.0}", "market_cap");
        }
    }
    Ok(())
}

async fn chart(
    backend: &Arc<BackendClient>,
    identity: &Arc<StaticIdentity>,
    ticker: &str,
    timeframe: Timeframe,
) -> Result<()> {
    let controller = controller(backend, identity);
    controller.load_snapshot(ticker).await?;
    if let Some(notice) = controller.snapshot().notice {
        bail!("{notice}");
    }
    if timeframe != Timeframe::default() {
        controller.select_timeframe(timeframe).await?;
    }

    let state = controller.snapshot();
    print_header(&state);
    let series = state.display_chart(Utc::now());
    if series.is_empty() {
        println!("No chart data for {timeframe}");
        return Ok(());
    }

    for point in series.points() {
        match point.close {
            Some(close) => println!("{:>10}  {close}", point.time.to_string()),
            None => println!("{:>10}  -", point.time.to_string()),
        }
    }
    Ok(())
}

async fn search(backend: &Arc<BackendClient>, config: &ClientConfig, query: &str) -> Result<()> {
    let debouncer = SearchDebouncer::new(Arc::clone(backend), config.search_debounce);
    let mut results = debouncer.subscribe();
    debouncer.query(query);

    let hits = results
        .wait_for(|current| !current.loading)
        .await
        .context("search was cancelled")?
        .hits
        .clone();

    if hits.is_empty() {
        println!("No matches for {query:?}");
    }
    for hit in hits {
        println!("{:<10} {:<8} {}", hit.symbol, hit.exchange, hit.name);
    }
    Ok(())
}

async fn profile(backend: &Arc<BackendClient>, identity: &Arc<StaticIdentity>) -> Result<()> {
    let controller = controller(backend, identity);
    controller.resolve_auth().await?;

    let state = controller.snapshot();
    match (signed_in_label(identity), state.profile) {
        (None, _) => println!("Signed out"),
        (Some(who), None) => println!("{who}: Free (profile unavailable)"),
        (Some(who), Some(profile)) if profile.is_pro => {
            let auto = if profile.auto_analysis { "on" } else { "off" };
            println!("{who}: Pro, auto analysis {auto}, {} analyses run", profile.analysis_count);
        }
        (Some(who), Some(profile)) => {
            let left = profile.remaining_free().unwrap_or_default();
            println!("{who}: Free, {left} free analysis left");
        }
    }
    Ok(())
}

async fn analyze(backend: &Arc<BackendClient>, identity: &Arc<StaticIdentity>, ticker: &str) -> Result<()> {
    let controller = controller(backend, identity);
    controller.resolve_auth().await?;

    let _theme = std::io::stdout()
        .is_terminal()
        .then(|| ThemeScope::enter(Arc::new(AnsiTheme), &Theme::DASHBOARD));

    let mut renderer = Renderer::default();
    let mut updates = controller.subscribe();
    let analysis = controller.request_analysis(ticker);
    let interrupt = tokio::signal::ctrl_c();
    tokio::pin!(analysis, interrupt);

    let outcome = loop {
        tokio::select! {
            outcome = &mut analysis => break outcome?,
            Ok(()) = updates.changed() => {
                let state = updates.borrow_and_update().clone();
                renderer.render(&state);
            }
            _ = &mut interrupt => {
                tracing::info!("Interrupted");
                return Ok(());
            }
        }
    };
    renderer.render(&controller.snapshot());

    match outcome {
        TickerOutcome::Analysis(AnalysisOutcome::Completed(result)) => {
            println!();
            println!("{} {}  score {}", result.ticker, result.recommendation, fmt_score(result.score));
            if !result.summary.is_empty() {
                println!("{}", result.summary);
            }
            let drivers = &result.ai_analysis.xai_rationale;
            for driver in &drivers.top_positive_drivers {
                println!("  + {driver}");
            }
            for driver in &drivers.top_negative_drivers {
                println!("  - {driver}");
            }
            Ok(())
        }
        TickerOutcome::Analysis(AnalysisOutcome::Failed(message)) => bail!("analysis failed: {message}"),
        TickerOutcome::Analysis(AnalysisOutcome::TransportFailed(reason)) => {
            bail!("analysis stream failed: {reason}")
        }
        TickerOutcome::Analysis(AnalysisOutcome::Closed) => {
            println!("Stream ended without a result.");
            Ok(())
        }
        TickerOutcome::Analysis(AnalysisOutcome::AccessDenied)
        | TickerOutcome::Snapshot { paywall: true } => {
            println!("Upgrade to Pro to run the AI analysis (set QUANTAI_ID_TOKEN to sign in).");
            Ok(())
        }
        TickerOutcome::Analysis(AnalysisOutcome::Superseded)
        | TickerOutcome::Snapshot { paywall: false }
        | TickerOutcome::Queued => Ok(()),
    }
}

async fn admin(
    backend: Arc<BackendClient>,
    identity: Arc<StaticIdentity>,
    config: &ClientConfig,
    command: AdminCommands,
) -> Result<()> {
    let console = AdminConsole::open(backend, identity, config.admin_email.as_deref())?;

    match command {
        AdminCommands::Users => {
            let users = console.users().await?;
            let (pro, free) = plan_counts(&users);
            println!("{} users ({pro} pro, {free} free)", users.len());
            for user in &users {
                let plan = if user.is_pro { "PRO" } else { "free" };
                println!(
                    "{:<28} {:<4} {:>4}  {:<24} {}",
                    user.label(),
                    plan,
                    user.analysis_count,
                    user.created_at.as_deref().unwrap_or("-"),
                    user.uid
                );
            }
        }
        AdminCommands::SetPro { uid, pro } => {
            console.set_pro(&uid, pro).await?;
            println!("{uid}: pro = {pro}");
        }
    }
    Ok(())
}

// =============================================================================
// Rendering
// =============================================================================

/// Incremental debate printer: each status line and agent text once.
#[derive(Default)]
struct Renderer {
    status: Option<String>,
    spoken: BTreeSet<AgentId>,
    header: bool,
}

impl Renderer {
    fn render(&mut self, state: &ViewState) {
        if !self.header && state.quote.is_some() {
            print_header(state);
            self.header = true;
        }

        let status = state.status_line();
        if status.is_some() && status != self.status {
            if let Some(line) = &status {
                println!("… {line}");
            }
            self.status = status;
        }

        for (agent, text) in &state.debate.agents {
            if !text.is_empty() && self.spoken.insert(agent.clone()) {
                println!();
                println!("[{}]", agent.as_str().to_uppercase());
                println!("{text}");
            }
        }
        let _ = std::io::stdout().flush();
    }
}

fn print_card(card: &TickerCard) {
    let price = card
        .price
        .map_or_else(|| "-".to_string(), |p| format!("{:.2}", p.round_dp(2)));
    let trend = match (card.sparkline.first(), card.sparkline.last()) {
        (Some(first), Some(last)) if last > first => "up",
        (Some(first), Some(last)) if last < first => "down",
        (Some(_), Some(_)) => "flat",
        _ => "",
    };
    println!(
        "  {:<6} {:<20} {:>10} {:>8}  {:<11} {:>3.0}  {trend}",
        card.ticker,
        card.name,
        price,
        fmt_change(card.change_percent),
        card.signal,
        card.score
    );
}

fn fmt_change(change: Decimal) -> String {
    let sign = if change.is_sign_negative() { "" } else { "+" };
    format!("{sign}{:.2}%", change.round_dp(2))
}

fn print_header(state: &ViewState) {
    let ticker = state.ticker.as_deref().unwrap_or("?");
    let name = state.display_name().unwrap_or_default();
    let price = state
        .display_price()
        .map_or_else(|| "-".to_string(), |p| format!("{:.2}", p.round_dp(2)));
    let change = state
        .display_change_percent()
        .map_or_else(|| "-".to_string(), fmt_change);

    let line = format!("{ticker}  {name}  {price}  {change}");
    if std::io::stdout().is_terminal() {
        let (r, g, b) = state.trend().rgb();
        println!("\x1b[38;2;{r};{g};{b}m{line}\x1b[39m");
    } else {
        println!("{line}");
    }
}

fn fmt_score(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{s:.0}"))
}

/// Dashboard colors as ANSI escapes.
struct AnsiTheme;

impl ThemeSink for AnsiTheme {
    fn apply(&self, theme: &Theme) {
        if let (Some((br, bg, bb)), Some((fr, fg, fb))) = (hex_rgb(theme.background), hex_rgb(theme.foreground)) {
            print!("\x1b[48;2;{br};{bg};{bb}m\x1b[38;2;{fr};{fg};{fb}m");
        }
    }

    fn reset(&self) {
        print!("\x1b[0m");
        let _ = std::io::stdout().flush();
    }
}

fn hex_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

/// Email of the signed-in user, or the uid.
fn signed_in_label(identity: &StaticIdentity) -> Option<String> {
    identity.current().map(|who| who.email.unwrap_or(who.uid))
}
