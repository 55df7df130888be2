use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};
use trailmap_core::data::Database;
use trailmap_core::report::{ReportFormat, generate_report, save_report};
use trailmap_core::{AnalyticsResult, SessionMetrics, VisitorSession, prepare};
use url::Url;

// Re-export crawl types and functions from trailmap-core
pub use trailmap_core::crawl::{
    CrawlOptions, CrawlProgressCallback, execute_crawl, extract_url_path, generate_crawl_report,
};

pub const DEFAULT_CONFIG_DIR: &str = "~/.config/trailmap/";
pub const DATABASE_FILE: &str = "trailmap.db";

/// Expand a leading `~` to the user's home directory.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Database file from `--db`, or the default inside the config directory.
pub fn resolve_db_path(db: Option<&PathBuf>) -> PathBuf {
    match db {
        Some(path) => expand_path(&path.to_string_lossy()),
        None => expand_path(DEFAULT_CONFIG_DIR).join(DATABASE_FILE),
    }
}

/// Default website id for a crawl: the root URL's host, with its port when explicit.
pub fn website_id_from_url(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => url.as_str().to_string(),
    }
}

/// Load a JSON array of visitor sessions, as exported by the collector
pub fn load_sessions_from_file(path: &Path) -> Result<Vec<VisitorSession>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read sessions file {}", path.display()))?;

    let sessions: Vec<VisitorSession> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of sessions", path.display()))?;

    debug!("Loaded {} sessions from {}", sessions.len(), path.display());
    Ok(sessions)
}

/// Open an existing database. Creating one is `init`'s job.
pub fn open_database(path: &Path) -> Result<Database> {
    if !Database::exists(path) {
        bail!(
            "No database at {}. Run `trailmap init` first.",
            path.display()
        );
    }
    Database::new(path).with_context(|| format!("Failed to open database {}", path.display()))
}

/// Store every session from `input`. Returns how many were written.
pub fn ingest_sessions(db: &mut Database, input: &Path) -> Result<usize> {
    let sessions = load_sessions_from_file(input)?;
    let written = db
        .insert_sessions(&sessions)
        .context("Failed to store sessions")?;
    info!("Ingested {} sessions from {}", written, input.display());
    Ok(written)
}

/// Outcome of one stored analytics run.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub result_id: String,
    pub site_map_id: String,
    pub result: AnalyticsResult,
    pub metrics: SessionMetrics,
}

/// Weight the website's latest site map with every stored session and persist the result.
pub fn run_analysis(db: &Database, website_id: &str) -> Result<AnalysisRun> {
    let latest = db.latest_site_map(website_id)?;
    let sessions = db.load_sessions()?;
    let metrics = SessionMetrics::from_sessions(&sessions);

    let result = prepare(&sessions, latest.as_ref().map(|(_, tree)| tree))
        .with_context(|| format!("Cannot analyze website '{}'", website_id))?;

    let site_map_id = latest
        .map(|(id, _)| id)
        .context("Site map vanished during analysis")?;
    let result_id = db.store_result(&site_map_id, &result)?;

    Ok(AnalysisRun {
        result_id,
        site_map_id,
        result,
        metrics,
    })
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

fn print_prompt(msg: &str) -> io::Result<String> {
    print!("{} ", msg.bright_cyan().bold());
    io::stdout().flush()?;
    let mut response = String::new();
    io::stdin().read_line(&mut response)?;
    Ok(response.trim().to_lowercase())
}

pub fn handle_init(args: &ArgMatches) -> Result<()> {
    let config_arg = args
        .get_one::<String>("PATH")
        .map(String::as_str)
        .unwrap_or(DEFAULT_CONFIG_DIR);
    let force = args.get_flag("force");
    let config_dir = expand_path(config_arg);
    let db_path = config_dir.join(DATABASE_FILE);

    print_divider();
    println!("{}", "  TRAILMAP INITIALIZATION".bright_white().bold());
    print_divider();
    println!();
    println!(
        "{} Target: {}",
        "→".blue(),
        config_dir.display().to_string().bright_white()
    );
    println!();

    fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    if Database::exists(&db_path) {
        if !force {
            println!("{}", "⚠ WARNING".yellow().bold());
            println!("Database already exists at:");
            println!(
                "  {} {}",
                "•".yellow(),
                db_path.display().to_string().bright_white()
            );
            println!();

            let response = print_prompt("Would you like to overwrite it? [y/N]:")?;
            println!();

            if response != "y" && response != "yes" {
                println!("{} Keeping existing database", "→".blue());
                return Ok(());
            }
        }

        Database::drop(&db_path)
            .with_context(|| format!("Failed to remove {}", db_path.display()))?;
        println!("{} Existing database removed", "✓".green().bold());
    }

    println!("{} Creating database...", "→".blue());
    Database::new(&db_path)
        .with_context(|| format!("Failed to create database {}", db_path.display()))?;

    println!();
    print_divider();
    println!("{}", "  INITIALIZATION COMPLETE".green().bold());
    print_divider();
    println!();
    println!(
        "{} Config directory: {}",
        "✓".green().bold(),
        config_dir.display().to_string().bright_white()
    );
    println!(
        "{} Database: {}",
        "✓".green().bold(),
        db_path.display().to_string().bright_white()
    );
    println!();
    Ok(())
}

pub async fn handle_crawl(sub_matches: &ArgMatches) -> Result<()> {
    let url = sub_matches
        .get_one::<Url>("url")
        .context("--url is required")?;
    let website_id = sub_matches
        .get_one::<String>("website-id")
        .cloned()
        .unwrap_or_else(|| website_id_from_url(url));
    let max_depth = *sub_matches.get_one::<usize>("depth").unwrap_or(&1);
    let threads = *sub_matches.get_one::<usize>("threads").unwrap_or(&10);
    let timeout_secs = *sub_matches.get_one::<u64>("timeout").unwrap_or(&10);
    let output = sub_matches.get_one::<PathBuf>("output");
    let quiet = sub_matches.get_flag("quiet");

    // Fail before crawling if there is nowhere to store the result
    let db = open_database(&resolve_db_path(sub_matches.get_one::<PathBuf>("db")))?;

    println!("\n{} Crawling {}", "→".blue().bold(), url.as_str().bright_white());
    println!("Website: {}", website_id);
    println!("Workers: {}", threads);
    println!("Max depth: {}\n", max_depth);

    let cancel_flag = Arc::new(AtomicBool::new(false));
    let signal_flag = cancel_flag.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_flag.store(true, Ordering::Relaxed);
        }
    });

    let mut options = CrawlOptions::new(url.as_str());
    options.max_depth = max_depth;
    options.workers = threads;
    options.timeout_secs = timeout_secs;
    options.show_progress_bars = !quiet;
    options.cancel_flag = Some(cancel_flag);

    let report = execute_crawl(options, None)
        .await
        .with_context(|| format!("Crawl of {} failed", url))?;

    if report.cancelled {
        println!(
            "{} Crawl interrupted, storing the partial hierarchy",
            "⚠".yellow().bold()
        );
    }

    let map_id = db.store_site_map(&website_id, &report.tree)?;

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report.tree)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write hierarchy to {}", path.display()))?;
        println!(
            "{} Hierarchy written to {}",
            "✓".green().bold(),
            path.display()
        );
    }

    print!("{}", generate_crawl_report(&report));
    println!(
        "\n{} Site map {} stored for website {}",
        "✓".green().bold(),
        map_id.bright_black(),
        website_id.bright_white()
    );
    Ok(())
}

pub fn handle_ingest(sub_matches: &ArgMatches) -> Result<()> {
    let input = sub_matches
        .get_one::<PathBuf>("input")
        .context("--input is required")?;
    let mut db = open_database(&resolve_db_path(sub_matches.get_one::<PathBuf>("db")))?;

    let written = ingest_sessions(&mut db, input)?;
    println!(
        "{} Imported {} sessions from {}",
        "✓".green().bold(),
        written.to_string().cyan(),
        input.display()
    );
    Ok(())
}

pub fn handle_analyze(sub_matches: &ArgMatches) -> Result<()> {
    let website_id = sub_matches
        .get_one::<String>("website-id")
        .context("--website-id is required")?;
    let format_name = sub_matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    let format = ReportFormat::from_str(format_name)
        .with_context(|| format!("Unsupported report format '{}'", format_name))?;
    let output = sub_matches.get_one::<PathBuf>("output");

    let db = open_database(&resolve_db_path(sub_matches.get_one::<PathBuf>("db")))?;
    let run = run_analysis(&db, website_id)?;
    info!(
        "Stored analytics result {} for site map {}",
        run.result_id, run.site_map_id
    );

    let report = generate_report(&run.result, Some(&run.metrics), format)?;
    match output {
        Some(path) => {
            save_report(&report, path)
                .with_context(|| format!("Failed to save report to {}", path.display()))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display()
            );
        }
        None => print!("{}", report),
    }
    Ok(())
}
