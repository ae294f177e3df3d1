use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{info, warn};

use solvanity::config::Config;
use solvanity::engine::{SearchEngine, SearchOutcome};
use solvanity::error::VanityError;
use solvanity::output::CsvSink;
use solvanity::pattern::VanityPattern;
use solvanity::utils;
use solvanity::wallet::MnemonicWalletDeriver;

/// Parallel Solana vanity wallet generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Number of matching wallets to collect (overrides config)
    #[arg(short, long)]
    target: Option<u64>,

    /// Worker thread count (overrides config)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Literal address prefix to search for (overrides config pattern)
    #[arg(short, long)]
    prefix: Option<String>,

    /// Output CSV path (overrides config)
    #[arg(short, long)]
    output: Option<String>,

    /// Write a default config file and exit
    #[arg(long)]
    init_config: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose)?;

    if args.init_config {
        Config::save_default(&args.config)?;
        info!("Wrote default configuration to {}", args.config);
        return Ok(());
    }

    display_banner();

    let mut config = if Path::new(&args.config).exists() {
        let config = Config::load(&args.config)?;
        info!("Configuration loaded from: {}", args.config);
        config
    } else {
        info!("No config file at {}, using defaults", args.config);
        Config::default()
    };

    // CLI overrides
    if let Some(target) = args.target {
        config.search.target_count = target;
    }
    if let Some(workers) = args.workers {
        config.search.worker_count = workers;
    }
    if let Some(prefix) = args.prefix {
        config.pattern = VanityPattern::Prefix { value: prefix };
    }
    if let Some(output) = args.output {
        config.output.csv_path = output;
    }
    config.validate()?;

    info!("Pattern: {}", config.pattern);
    info!(
        "Derivation: {} ({} words)",
        config.derivation.derivation_path, config.derivation.word_count
    );
    info!(
        "Target: {} wallet(s) | Workers: {}",
        config.search.target_count, config.search.worker_count
    );

    let deriver = MnemonicWalletDeriver::new(&config.derivation)?;
    let engine = SearchEngine::new(
        config.search.clone(),
        config.progress.clone(),
        config.pattern.clone(),
    );

    let outcome = engine.run(|_| deriver.clone());

    // Persist whatever was found, also on the failure path
    let sink = CsvSink::new(&config.output.csv_path);
    let written = sink.persist(&outcome.matches)?;

    report_summary(&config, &outcome, written, &sink);

    if outcome.exhausted {
        return Err(VanityError::WorkerExhaustion {
            found: outcome.matches.len() as u64,
            target: config.search.target_count,
        }
        .into());
    }

    Ok(())
}

fn display_banner() {
    println!(
        "
╔═══════════════════════════════════════════════════════════╗
║                                                           ║
║   🎯 SOLANA VANITY WALLET GENERATOR                      ║
║   BIP39 mnemonic search, Phantom-compatible derivation    ║
║                                                           ║
╚═══════════════════════════════════════════════════════════╝
    "
    );
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    Ok(())
}

fn report_summary(config: &Config, outcome: &SearchOutcome, written: usize, sink: &CsvSink) {
    let saved_path = std::fs::canonicalize(sink.path())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| config.output.csv_path.clone());

    info!("═══════════════════════════════════════════════");
    if outcome.reached_target() {
        info!("SEARCH COMPLETE");
    } else {
        warn!("SEARCH FAILED: workers exhausted before reaching target");
    }
    info!(
        "Found: {}/{}",
        outcome.matches.len(),
        config.search.target_count
    );
    info!("Attempts: {}", utils::format_number(outcome.attempts));
    info!(
        "Elapsed: {}",
        utils::format_duration(outcome.elapsed.as_secs_f64())
    );
    info!("Rate: {:.2} wallets/s", outcome.overall_rate());
    info!("Saved {} row(s) to: {}", written, saved_path);
    for found in &outcome.matches {
        info!("  {}", found.address);
    }
    info!("═══════════════════════════════════════════════");
}
