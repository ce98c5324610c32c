use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;
use zdte_analyzer::api_server::{self, AppState};
use zdte_analyzer::auth::EnvTokenProvider;
use zdte_analyzer::broker_client::{BrokerClient, ChainSource};
use zdte_analyzer::collector::Collector;
use zdte_analyzer::config::{self, CollectorConfig};
use zdte_analyzer::scorer::{HttpScorer, Scorer, UnconfiguredScorer};
use zdte_analyzer::store::{MemoryStore, Store};
use zdte_analyzer::atm::{self, AtmConfig};
use zdte_analyzer::spreads::{self, SpreadConfig};
use zdte_analyzer::{logging, max_pain, models};

fn build_state() -> Result<AppState> {
    let tokens = Arc::new(EnvTokenProvider::new());
    let source: Arc<dyn ChainSource> = Arc::new(BrokerClient::new(tokens)?);
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());

    let scorer: Arc<dyn Scorer> = match HttpScorer::from_env()? {
        Some(http) => Arc::new(http),
        None => {
            println!("{} No ranking service configured - candidates will carry failed scores", "⚠".yellow());
            Arc::new(UnconfiguredScorer)
        }
    };

    let cfg = CollectorConfig::from_env();
    let collector = Collector::new(Arc::clone(&source), Arc::clone(&store), cfg);

    Ok(AppState {
        collector,
        source,
        store,
        scorer,
        top_spreads: config::get_top_spreads(),
    })
}

/// Run API server mode
async fn run_server(port: u16) -> Result<()> {
    println!("{}", "=".repeat(60).blue());
    println!("{}", "0DTE Analyzer API Server".green().bold());
    println!("{}", "=".repeat(60).blue());
    println!();

    let state = build_state()?;
    api_server::start_server(port, state).await
}

/// Run one collection cycle over the tracked symbols and exit
async fn run_collect() -> Result<()> {
    println!("{}", "=".repeat(60).blue());
    println!("{}", "0DTE One-Shot Collection".green().bold());
    println!("{}", "=".repeat(60).blue());
    println!();

    let state = build_state()?;
    let status = state.collector.status().await;

    println!("{} Symbols: {}", "→".cyan(), status.symbols.join(", ").yellow());
    println!("{} Naked threshold: {}", "→".cyan(), status.naked_threshold);
    println!();

    state.collector.collect_once().await;

    for symbol in &status.symbols {
        match state.store.latest_summary(symbol).await? {
            Some(summary) => {
                println!(
                    "{} {}: {} contracts, spot {:.2}, max pain {}",
                    "✓".green(),
                    symbol.yellow(),
                    summary.contract_count,
                    summary.underlying_price,
                    summary
                        .max_pain
                        .map(|p| format!("{:.2}", p))
                        .unwrap_or_else(|| "n/a".to_string()),
                );
            }
            None => println!("{} {}: no data collected", "✗".red(), symbol.yellow()),
        }
    }

    println!();
    println!("{}", "Done!".green().bold());
    Ok(())
}

/// Fetch and analyze a single symbol, printing spreads and ATM signals
async fn run_single(symbol: &str) -> Result<()> {
    println!("{}", "=".repeat(60).blue());
    println!("{}", "0DTE Single Symbol Analysis".green().bold());
    println!("{}", "=".repeat(60).blue());
    println!();

    let state = build_state()?;

    println!("{} Fetching 0DTE chain for {}...", "→".cyan(), symbol.yellow());
    let chain = match state.source.fetch(symbol).await {
        Ok(chain) => chain,
        Err(e) => {
            println!("{} Fetch failed: {}", "✗".red(), e);
            return Ok(());
        }
    };

    println!("{} Contracts: {}", "✓".green(), chain.contract_count());
    println!("{} Spot: {:.2}", "✓".green(), chain.underlying_price);

    if let Some(pain) = max_pain::compute(&chain.calls(), &chain.puts()) {
        println!("{} Max pain: {:.2}", "✓".green(), pain);
    }

    let contracts: Vec<_> = chain.contracts.iter().collect();
    for side in [models::OptionSide::Call, models::OptionSide::Put] {
        let candidates =
            spreads::enumerate(&contracts, side, chain.underlying_price, &SpreadConfig::from_env());
        println!();
        println!("{} Top {} credit spreads:", "ℹ".blue(), side);
        for c in candidates.iter().take(5) {
            println!(
                "   {}/{} credit {:.2} width {:.0} r/r {:.3}",
                c.short_leg.strike, c.long_leg.strike, c.credit, c.width, c.risk_reward
            );
        }
        if candidates.is_empty() {
            println!("   none within bounds");
        }
    }

    let selection = atm::select(
        &chain.calls(),
        &chain.puts(),
        chain.underlying_price,
        &AtmConfig::from_env(),
    );
    println!();
    println!(
        "{} ATM: {} calls, {} puts within 2% of spot",
        "ℹ".blue(),
        selection.calls.len(),
        selection.puts.len()
    );

    println!();
    println!("{}", "Done!".green().bold());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let mode = config::get_execution_mode();
    let port = config::get_port();

    match mode.as_str() {
        "server" => run_server(port).await?,
        "collect" => run_collect().await?,
        "single" => run_single(&config::get_single_symbol()).await?,
        _ => {
            eprintln!("Invalid mode '{}'. Use 'server', 'collect', or 'single'", mode);
            eprintln!("Set ZDTE_MODE environment variable to control execution mode");
            eprintln!("Examples:");
            eprintln!("  ZDTE_MODE=server ZDTE_PORT=3001 cargo run   # Start API server on port 3001");
            eprintln!("  ZDTE_MODE=collect cargo run                  # Run one collection cycle");
            eprintln!("  ZDTE_MODE=single ZDTE_SYMBOL=SPY cargo run   # Analyze one symbol");
            std::process::exit(1);
        }
    }

    Ok(())
}
