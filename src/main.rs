//! Sportsbook moneyline arbitrage scanner entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sportsbook_arb::api::{create_router, AppState};
use sportsbook_arb::arbitrage::{
    scan_events, BestPriceSelector, Opportunity, OpportunityCollection, ScanReport, Scanner,
};
use sportsbook_arb::config::Config;
use sportsbook_arb::metrics;
use sportsbook_arb::notify::{dispatch, render_html, LogNotifier, MailgunNotifier, Notifier};
use sportsbook_arb::odds::OddsApiClient;
use sportsbook_arb::storage::BatchStore;
use sportsbook_arb::utils::{rfc3339, shutdown_signal};

const RULE: &str = "======================================================================";
const THIN_RULE: &str = "----------------------------------------------------------------------";

/// Two-way sportsbook moneyline arbitrage scanner.
#[derive(Parser, Debug)]
#[command(name = "sportsbook-arb")]
#[command(about = "Finds two-way moneyline arbitrage across sportsbooks")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one scan over all configured sports (default).
    Scan {
        /// Do not write a batch file.
        #[arg(long)]
        no_save: bool,

        /// Do not send alerts.
        #[arg(long)]
        no_notify: bool,
    },

    /// Scan repeatedly and serve health/status/metrics over HTTP.
    Watch {
        /// Seconds between scans (defaults to SCAN_INTERVAL_S).
        #[arg(short, long)]
        interval: Option<u64>,

        /// HTTP server port (defaults to PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Evaluate a saved odds API response offline.
    Evaluate {
        /// JSON file holding an array of events.
        file: PathBuf,

        /// Sport key for events that carry none.
        #[arg(long)]
        sport: Option<String>,
    },

    /// Show a saved opportunity batch.
    Report {
        /// Batch file (newest in OUTPUT_DIR when omitted).
        file: Option<PathBuf>,

        /// Also write the alert e-mail HTML to this path.
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// List sports known to the odds API.
    Sports,

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("sportsbook_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Handle subcommands
    match args.command {
        Some(Command::Scan { no_save, no_notify }) => cmd_scan(!no_save, !no_notify).await,
        Some(Command::Watch { interval, port }) => cmd_watch(interval, port).await,
        Some(Command::Evaluate { file, sport }) => cmd_evaluate(file, sport),
        Some(Command::Report { file, html }) => cmd_report(file, html),
        Some(Command::Sports) => cmd_sports().await,
        Some(Command::CheckConfig) => cmd_check_config(),
        None => cmd_scan(true, true).await,
    }
}

/// Load and validate configuration, logging failures.
fn load_config() -> anyhow::Result<Config> {
    info!("Loading configuration...");
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    Ok(config)
}

/// Configuration for offline commands, which need no API key.
fn load_config_or_defaults() -> Config {
    Config::load().unwrap_or_else(|e| {
        warn!("Configuration not loaded ({}), using defaults", e);
        Config::with_api_key("")
    })
}

fn build_notifiers(config: &Config) -> Vec<Box<dyn Notifier>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = vec![Box::new(LogNotifier)];

    if config.email_enabled() {
        match MailgunNotifier::from_config(config) {
            Ok(mailgun) => notifiers.push(Box::new(mailgun)),
            Err(e) => warn!("E-mail alerts disabled: {}", e),
        }
    }

    notifiers
}

/// One scan, then persist and notify.
async fn run_scan(
    scanner: &Scanner<OddsApiClient>,
    store: Option<&BatchStore>,
    notifiers: &[Box<dyn Notifier>],
) -> (ScanReport, Option<PathBuf>, OffsetDateTime) {
    let report = scanner.scan().await;
    let generated_at = OffsetDateTime::now_utc();

    let saved = store.and_then(|store| store.try_save_at(&report.opportunities, generated_at));

    dispatch(notifiers, &report.opportunities, generated_at).await;

    (report, saved, generated_at)
}

/// Run one scan.
async fn cmd_scan(save: bool, notify: bool) -> anyhow::Result<()> {
    let config = load_config()?;
    info!(
        sports = config.sports.len(),
        books = config.books.len(),
        markets = ?config.markets,
        "Configuration loaded successfully"
    );

    let scanner = Scanner::from_config(OddsApiClient::new(&config)?, &config);
    let store = BatchStore::new(&config.output_dir);
    let notifiers = if notify { build_notifiers(&config) } else { Vec::new() };

    let (report, saved, generated_at) =
        run_scan(&scanner, save.then_some(&store), &notifiers).await;

    print_collection(&report.opportunities, generated_at);
    println!(
        "Sports: {} scanned, {} failed | Events: {} scanned, {} rejected",
        report.stats.sports_scanned,
        report.stats.sports_failed,
        report.stats.events_scanned,
        report.stats.events_rejected,
    );
    if let Some(path) = saved {
        println!("Saved: {}", path.display());
    }
    println!("{RULE}");

    if report.stats.sports_scanned == 0 && report.stats.sports_failed > 0 {
        return Err(anyhow::anyhow!("Every sport failed to fetch"));
    }

    Ok(())
}

/// Scan on an interval while serving the HTTP API.
async fn cmd_watch(interval: Option<u64>, port: Option<u16>) -> anyhow::Result<()> {
    let config = load_config()?;
    let interval = Duration::from_secs(interval.unwrap_or(config.scan_interval_s).max(1));
    let port = port.unwrap_or(config.port);

    // Metrics exporter and app state
    let app_state = AppState::new().with_prometheus(metrics::install_prometheus());

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());
    let _server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    let scanner = Scanner::from_config(OddsApiClient::new(&config)?, &config);
    let store = BatchStore::new(&config.output_dir);
    let notifiers = build_notifiers(&config);

    info!(
        interval_s = interval.as_secs(),
        sports = config.sports.len(),
        "Starting scan loop..."
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut scan_count = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        scan_count += 1;
        let (report, saved, generated_at) = run_scan(&scanner, Some(&store), &notifiers).await;
        info!(
            scan = scan_count,
            opportunities = report.opportunities.len(),
            saved = saved.is_some(),
            "Scan published"
        );
        let saved = saved.map(|p| p.display().to_string());
        app_state.record_scan(&report, generated_at, saved).await;
    }

    info!(scans = scan_count, "Stopped");
    Ok(())
}

/// Evaluate a saved odds array without network access.
fn cmd_evaluate(file: PathBuf, sport: Option<String>) -> anyhow::Result<()> {
    let config = load_config_or_defaults();
    let selector = BestPriceSelector::from_config(&config);

    let payloads: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&file)?)?;
    let scan = scan_events(sport.as_deref().unwrap_or_default(), payloads, &selector);
    let collection: OpportunityCollection = scan.opportunities.into_iter().collect();

    print_collection(&collection, OffsetDateTime::now_utc());
    println!(
        "Events: {} scanned, {} rejected | Markets: {} missing a side, {} without edge",
        scan.stats.events_scanned,
        scan.stats.events_rejected,
        scan.stats.markets_missing_side,
        scan.stats.markets_without_edge,
    );
    println!("{RULE}");

    Ok(())
}

/// Print a saved batch.
fn cmd_report(file: Option<PathBuf>, html: Option<PathBuf>) -> anyhow::Result<()> {
    let path = match file {
        Some(path) => path,
        None => BatchStore::new(load_config_or_defaults().output_dir).latest()?,
    };

    let batch = BatchStore::load(&path)?;
    println!("Batch: {}", batch.path.display());
    print_collection(&batch.opportunities, batch.generated_at);
    println!("{RULE}");

    if let Some(out) = html {
        std::fs::write(&out, render_html(&batch.opportunities, batch.generated_at)?)?;
        println!("HTML written to {}", out.display());
    }

    Ok(())
}

/// List sports from the odds API.
async fn cmd_sports() -> anyhow::Result<()> {
    let config = load_config()?;
    let client = OddsApiClient::new(&config)?;

    println!("{RULE}");
    println!("SPORTSBOOK ARB - SPORTS");
    println!("{RULE}");

    let sports = client.list_sports().await?;
    for sport in &sports {
        let tracked = if config.sports.contains(&sport.key) { "*" } else { " " };
        let active = if sport.active { "active" } else { "inactive" };
        println!("{} {:<32} {:<28} {}", tracked, sport.key, sport.title, active);
    }
    println!("{THIN_RULE}");
    println!("{} sports, * = tracked", sports.len());
    println!("{RULE}");

    Ok(())
}

/// Check configuration validity.
fn cmd_check_config() -> anyhow::Result<()> {
    println!("{RULE}");
    println!("SPORTSBOOK ARB - CONFIGURATION CHECK");
    println!("{RULE}");

    // Load configuration
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Show configuration summary
    println!("{THIN_RULE}");
    println!("Configuration Summary:");
    println!("  Odds API: {}", config.odds_api_url);
    println!("  Sportsbooks: {}", config.books.join(", "));
    println!("  Sports: {}", config.sports.join(", "));
    println!("  Markets: {}", config.markets.join(", "));
    println!("  Regions: {}", config.regions.join(", "));
    println!("  Links: {}", if config.include_links { "Enabled" } else { "Disabled" });
    println!("  Retries: {} (wait {}s, max {}s)", config.max_retries, config.retry_wait_s, config.retry_max_wait_s);
    println!("  Output Dir: {}", config.output_dir);
    match &config.alert_email {
        Some(to) if config.email_enabled() => println!("  E-mail Alerts: {}", to),
        _ => println!("  E-mail Alerts: Disabled"),
    }
    println!("  Scan Interval: {}s", config.scan_interval_s);
    println!("{RULE}");
    println!("CONFIGURATION CHECK PASSED");
    println!("{RULE}");

    Ok(())
}

fn print_collection(collection: &OpportunityCollection, generated_at: OffsetDateTime) {
    println!("{RULE}");
    println!(
        "SPORTSBOOK ARB - {} OPPORTUNITIES ({})",
        collection.len(),
        rfc3339(generated_at)
    );
    println!("{RULE}");

    for opp in collection.sorted_by_profit() {
        print_opportunity(opp);
    }
}

fn print_opportunity(opp: &Opportunity) {
    let plan = opp.plan();
    println!("{} [{} {}]", opp.label(), opp.sport_key(), opp.market());
    println!(
        "  Home: {:<24} @ {:<6} {:<12} stake ${} (${})",
        opp.home().team,
        opp.home().price,
        opp.home().sportsbook,
        plan.home_stake,
        plan.home_stake_rounded
    );
    println!(
        "  Away: {:<24} @ {:<6} {:<12} stake ${} (${})",
        opp.away().team,
        opp.away().price,
        opp.away().sportsbook,
        plan.away_stake,
        plan.away_stake_rounded
    );
    println!(
        "  Profit: {}% exact, ${} on ${} rounded{}",
        plan.profit_pct.round_dp(2),
        plan.min_profit_rounded.round_dp(2),
        plan.rounded_total_stake,
        if plan.survives_rounding() { "" } else { " (lost to rounding)" }
    );
    println!("{THIN_RULE}");
}
