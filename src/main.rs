//! FitFi Catalog CLI
//!
//! Operates the product cache over a SQLite database, runs the quiz
//! confidence analyzer and filter pipeline on JSON files, and syncs the
//! device-local style profile with the shared profile tables.
//!
//! ```text
//! fitfi seed products.json
//! fitfi lookup --gender female --max-price 100 --category dresses
//! fitfi sweep
//! fitfi analyze answers.json
//! fitfi profile record answers.json --archetype minimalist
//! fitfi profile push --user 6f1c2a90
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fitfi_catalog::adapters::{LoggingEventPublisher, SqliteStore};
use fitfi_catalog::quiz::{
    analyze_quiz_confidence, confidence_banner, get_confidence_badge,
    should_show_ambiguity_warning, QuizAnswers,
};
use fitfi_catalog::{
    filter_products, FilterCriteria, FitfiConfig, Gender, Product, ProductCache, ProfileSync,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// FitFi catalog core - product cache and quiz confidence tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "FITFI_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path (overrides the configuration file)
    #[arg(long, env = "FITFI_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load products from a JSON array into the product table
    Seed { file: PathBuf },

    /// Look up products through the cache
    Lookup(CriteriaArgs),

    /// Drop the cached result for one set of criteria
    Invalidate(CriteriaArgs),

    /// Delete expired cache rows
    Sweep,

    /// Delete every cache row
    Purge,

    /// Print cache statistics
    Stats {
        /// Prometheus text format instead of JSON
        #[arg(long)]
        prometheus: bool,
    },

    /// Score quiz answers from a JSON object
    Analyze { file: PathBuf },

    /// Run the filter pipeline over a JSON array of products
    Filter {
        file: PathBuf,

        #[command(flatten)]
        criteria: CriteriaArgs,

        /// Product id to exclude (repeatable)
        #[arg(long = "exclude")]
        exclude: Vec<String>,
    },

    /// Sync the local style profile with the shared profile tables
    Profile {
        /// Signed-in user id (overrides the configuration file)
        #[arg(long, env = "FITFI_USER_ID")]
        user: Option<String>,

        #[command(subcommand)]
        action: ProfileCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileCommand {
    /// Store completed quiz answers locally and mark them pending
    Record {
        file: PathBuf,

        #[arg(long)]
        archetype: Option<String>,
    },

    /// Push the local profile
    Push,

    /// Print the current profile, preferring the shared copy
    Pull,

    /// Push pending changes or refresh a stale copy
    Check,

    /// Print the sync status
    Status,

    /// Drop the local profile
    Clear,
}

#[derive(clap::Args, Debug, Clone)]
struct CriteriaArgs {
    #[arg(long)]
    gender: Option<Gender>,

    #[arg(long)]
    min_price: Option<f64>,

    #[arg(long)]
    max_price: Option<f64>,

    /// Category (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,

    /// Brand (repeatable)
    #[arg(long = "brand")]
    brands: Vec<String>,

    #[arg(long)]
    min_rating: Option<f64>,
}

impl CriteriaArgs {
    fn to_criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::new()
            .with_categories(self.categories.iter().cloned())
            .with_brands(self.brands.iter().cloned());
        criteria.gender = self.gender;
        if self.min_price.is_some() || self.max_price.is_some() {
            criteria = criteria.with_budget(self.min_price, self.max_price);
        }
        criteria.min_rating = self.min_rating;
        criteria
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    let mut config = match &args.config {
        Some(path) => FitfiConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => FitfiConfig::default(),
    };
    if let Some(db_path) = &args.db_path {
        config.database_path = db_path.clone();
    }

    match &args.command {
        Command::Analyze { file } => analyze(file),
        Command::Filter {
            file,
            criteria,
            exclude,
        } => filter(file, criteria, exclude),
        Command::Profile { user, action } => {
            run_profile_command(&config, user.clone(), action).await
        }
        command => run_cache_command(&config, command).await,
    }
}

async fn run_cache_command(config: &FitfiConfig, command: &Command) -> Result<()> {
    let store = SqliteStore::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;
    info!(path = %config.database_path.display(), "Opened catalog database");

    let cache = ProductCache::builder()
        .config(config.cache.clone())
        .cache_store(Arc::new(store.clone()))
        .product_store(Arc::new(store.clone()))
        .events(Arc::new(LoggingEventPublisher::info_level()))
        .build()?;

    match command {
        Command::Seed { file } => {
            let products: Vec<Product> = read_json(file)?;
            let inserted = store.insert_products(products).await?;
            println!("Inserted {} products", inserted);
        }
        Command::Lookup(criteria) => {
            let result = cache.lookup(&criteria.to_criteria()).await;
            if let Some(reason) = &result.degraded {
                eprintln!("warning: results may be incomplete ({})", reason);
            }
            println!("{}", serde_json::to_string_pretty(&result.products)?);
            eprintln!(
                "{} products from {} tier in {:?}",
                result.products.len(),
                result.tier,
                result.latency
            );
        }
        Command::Invalidate(criteria) => {
            let removed = cache.clear_key(&criteria.to_criteria()).await;
            println!("{}", if removed { "Invalidated" } else { "Not cached" });
        }
        Command::Sweep => {
            let rows = cache.sweep_expired().await;
            println!("Removed {} expired rows", rows);
        }
        Command::Purge => {
            let summary = cache.purge_all().await;
            println!("Removed {} cache rows", summary.database_rows);
        }
        Command::Stats { prometheus } => {
            let snapshot = cache.metrics();
            if *prometheus {
                print!("{}", snapshot.to_prometheus_text()?);
            } else {
                let rows = store.cache_row_count().await?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "databaseRows": rows,
                        "memory": cache.get_stats(),
                        "metrics": snapshot,
                    }))?
                );
            }
        }
        Command::Analyze { .. } | Command::Filter { .. } | Command::Profile { .. } => {}
    }

    Ok(())
}

async fn run_profile_command(
    config: &FitfiConfig,
    user: Option<String>,
    action: &ProfileCommand,
) -> Result<()> {
    let local_path = &config.sync.local_database_path;
    let local = SqliteStore::open(local_path)
        .with_context(|| format!("failed to open local database {}", local_path.display()))?;
    let remote = SqliteStore::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;

    let mut sync = ProfileSync::new(Arc::new(local))
        .with_remote(Arc::new(remote))
        .with_freshness(config.sync.freshness());
    if let Some(user) = user.or_else(|| config.sync.user_id.clone()) {
        sync = sync.with_user(user);
    }

    match action {
        ProfileCommand::Record { file, archetype } => {
            let answers: QuizAnswers = read_json(file)?;
            let archetype = archetype.clone().map(serde_json::Value::String);
            sync.record_quiz(answers, archetype, None).await?;
            println!("Recorded quiz answers ({})", sync.sync_status().await);
        }
        ProfileCommand::Push => {
            let pushed = sync.sync_local_to_remote().await;
            println!("{}", if pushed { "Synced" } else { "Not synced" });
        }
        ProfileCommand::Pull => match sync.get_profile().await {
            Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
            None => println!("No profile"),
        },
        ProfileCommand::Check => {
            sync.check_and_sync().await;
            println!("{}", sync.sync_status().await);
        }
        ProfileCommand::Status => println!("{}", sync.sync_status().await),
        ProfileCommand::Clear => {
            sync.clear_cache().await?;
            println!("Cleared local profile");
        }
    }

    Ok(())
}

fn analyze(file: &Path) -> Result<()> {
    let answers: QuizAnswers = read_json(file)?;
    let analysis = analyze_quiz_confidence(&answers);

    let output = serde_json::json!({
        "analysis": analysis,
        "badge": get_confidence_badge(analysis.overall_confidence),
        "showAmbiguityWarning": should_show_ambiguity_warning(&analysis),
        "banner": confidence_banner(&analysis),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn filter(file: &Path, criteria: &CriteriaArgs, exclude: &[String]) -> Result<()> {
    let products: Vec<Product> = read_json(file)?;
    let report = filter_products(products, &criteria.to_criteria(), exclude);
    println!("{}", report.summary());
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("failed to parse {}", path.display()))
}

// =============================================================================
// Logging
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    // logs go to stderr so command output stays parseable
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
