//! ttscrape CLI - Command-line interface for the table tennis collectors

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ttscrape::collector::{
    match_players_document, matches_document, rankings_document, ranking_pages_document,
    verify_games_file, MasterCollector, ProfileCollector, TtblCollector,
};
use ttscrape::core::{parse_years, year_range};
use ttscrape::data::output::players_envelope;
use ttscrape::data::{write_json, OutputLayout};
use ttscrape::error::{validate_id_range, validate_years};
use ttscrape::scraper::fabrik::{ProbeSummary, KNOWN_LIST_IDS};
use ttscrape::scraper::rankings_pages::VERIFY_SAMPLE_SIZE;
use ttscrape::scraper::{
    FabrikClient, FabrikConfig, HttpClient, RankingPagesScraper, ScraperConfig, TtblConfig, WttClient,
};

/// Default output directory (relative to the working directory)
const DEFAULT_OUT_DIR: &str = "data";

#[derive(Parser)]
#[command(name = "ttscrape")]
#[command(author, version, about = "Table tennis data collector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Root directory for JSON output
    #[arg(long, global = true, default_value = DEFAULT_OUT_DIR)]
    out_dir: PathBuf,

    /// Minimum delay between requests in milliseconds
    #[arg(long, global = true, default_value = "1000")]
    delay_ms: u64,

    /// Request timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    timeout: u64,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print current rankings of one player
    Player {
        /// ITTF player id
        id: String,
    },

    /// Fetch rankings for a comma-separated list of ids
    Batch {
        /// ITTF player ids (e.g. 121558,101919)
        ids: String,
    },

    /// Probe an id range against the rankings gateway
    Discover {
        /// First id (inclusive)
        start: u64,

        /// Last id (inclusive)
        end: u64,

        /// Delay between probes in milliseconds (overrides --delay-ms)
        #[arg(long)]
        delay: Option<u64>,
    },

    /// Collect player ids from the ITTF ranking pages
    RankingPages,

    /// Scrape Fabrik matches for one or more years
    Matches {
        /// Year to scrape; repeat for several
        #[arg(short, long, required = true)]
        year: Vec<i32>,

        /// Stop after this many matches per year
        #[arg(long, default_value = "1000")]
        max_matches: usize,
    },

    /// Build the consolidated players/matches dataset
    Master {
        /// Comma-separated years (e.g. 2025,2024)
        #[arg(long)]
        years: Option<String>,

        /// Start year (inclusive)
        #[arg(long)]
        start_year: Option<i32>,

        /// End year (inclusive)
        #[arg(long)]
        end_year: Option<i32>,

        /// Rows per Fabrik page
        #[arg(long, default_value = "500")]
        page_size: usize,

        /// Page limit per year
        #[arg(long, default_value = "500")]
        max_pages: usize,

        /// Delay between page requests in seconds (overrides --delay-ms)
        #[arg(long)]
        sleep: Option<f64>,
    },

    /// Build ranking profiles from a seed file and enrich them from match data
    Collect {
        /// JSON file with a `players` list of `IttfId`s
        #[arg(long)]
        seed_file: Option<PathBuf>,

        /// Comma-separated years to scan for matches
        #[arg(long)]
        years: Option<String>,
    },

    /// Check which Fabrik lists are publicly readable
    ProbeFabrik {
        /// List id to probe; repeat for several
        #[arg(long, default_values = KNOWN_LIST_IDS)]
        list_id: Vec<String>,

        /// Year used for the filtered request
        #[arg(long, default_value = "2025")]
        year: i32,
    },

    /// Scrape a TTBL season
    Ttbl {
        /// Season label as used in the schedule URLs
        #[arg(long, default_value = "2025-2026")]
        season: String,

        /// Number of gamedays to walk
        #[arg(long, default_value = "18")]
        gamedays: u32,
    },

    /// Check TTBL games data for rating readiness
    VerifyTtbl,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    println!("{}", format!("ttscrape v{}", env!("CARGO_PKG_VERSION")).cyan().bold());
    println!();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let base_config = ScraperConfig {
        delay_ms: cli.delay_ms,
        timeout_secs: cli.timeout,
        ..Default::default()
    };
    let layout = OutputLayout::new(&cli.out_dir);

    match cli.command {
        Commands::Player { id } => run_player(&rt, base_config, &id)?,
        Commands::Batch { ids } => run_batch(&rt, base_config, &layout, &ids)?,
        Commands::Discover { start, end, delay } => {
            let config = ScraperConfig {
                delay_ms: delay.unwrap_or(base_config.delay_ms),
                ..base_config
            };
            run_discover(&rt, config, &layout, start, end)?;
        }
        Commands::RankingPages => run_ranking_pages(&rt, base_config, &layout)?,
        Commands::Matches { year, max_matches } => {
            run_matches(&rt, base_config, &layout, &year, Some(max_matches))?
        }
        Commands::Master {
            years,
            start_year,
            end_year,
            page_size,
            max_pages,
            sleep,
        } => {
            let years = resolve_years(years.as_deref(), start_year, end_year)?;
            let config = ScraperConfig {
                delay_ms: sleep
                    .map(|s| (s.max(0.0) * 1000.0) as u64)
                    .unwrap_or(base_config.delay_ms),
                ..base_config
            };
            let fabrik = FabrikConfig {
                page_size,
                max_pages,
                ..Default::default()
            };
            run_master(&rt, config, fabrik, &layout, &years)?;
        }
        Commands::Collect { seed_file, years } => {
            let years = match years {
                Some(csv) => parse_years(&csv).with_context(|| format!("Invalid --years: {}", csv))?,
                None => Vec::new(),
            };
            run_collect(&rt, base_config, &layout, seed_file.as_deref(), &years)?;
        }
        Commands::ProbeFabrik { list_id, year } => {
            run_probe_fabrik(&rt, base_config, &layout, &list_id, year)?
        }
        Commands::Ttbl { season, gamedays } => {
            let ttbl = TtblConfig {
                season,
                gamedays,
                ..Default::default()
            };
            run_ttbl(&rt, base_config, &layout, ttbl)?;
        }
        Commands::VerifyTtbl => run_verify_ttbl(&layout)?,
    }

    Ok(())
}

/// Install the fmt subscriber; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;
    Ok(())
}

/// Years from `--years`, else the start/end range (current year by default)
fn resolve_years(csv: Option<&str>, start: Option<i32>, end: Option<i32>) -> Result<Vec<i32>> {
    let years = match csv {
        Some(csv) => parse_years(csv).with_context(|| format!("Invalid --years: {}", csv))?,
        None => {
            let now_year = chrono::Datelike::year(&chrono::Utc::now());
            year_range(start.unwrap_or(now_year), end.unwrap_or(now_year))
        }
    };
    validate_years(&years)?;
    Ok(years)
}

fn spinner(msg: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb.set_message(msg);
    pb
}

fn http_client(config: ScraperConfig) -> Result<HttpClient> {
    HttpClient::new(config).context("Failed to build HTTP client")
}

fn save(path: &Path, value: &serde_json::Value) -> Result<()> {
    write_json(path, value).with_context(|| format!("Failed to write {:?}", path))?;
    println!("{}: {:?}", "Saved".green(), path);
    Ok(())
}

fn timestamp() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

fn run_player(rt: &Runtime, config: ScraperConfig, id: &str) -> Result<()> {
    let http = http_client(config)?;
    let wtt = WttClient::new(&http);

    println!("{}: {}", "Fetching rankings for".green(), id);
    match rt.block_on(wtt.get_player_rankings(id)) {
        Some(entries) if !entries.is_empty() => {
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        _ => println!("{}", "No rankings found.".yellow()),
    }
    Ok(())
}

fn run_batch(rt: &Runtime, config: ScraperConfig, layout: &OutputLayout, ids: &str) -> Result<()> {
    let ids: Vec<String> = ids
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        anyhow::bail!("No player ids given");
    }

    let http = http_client(config)?;
    let wtt = WttClient::new(&http);

    let pb = spinner(format!("Fetching rankings for {} players...", ids.len()));
    let rankings = rt.block_on(wtt.batch_fetch_rankings(&ids));
    pb.finish_and_clear();

    let doc = rankings_document(&rankings, &chrono::Utc::now().to_rfc3339());
    println!("Players with rankings: {}/{}", doc["summary"]["players_with_rankings"], ids.len());
    save(&layout.rankings().join(format!("rankings_{}.json", timestamp())), &doc)
}

fn run_discover(rt: &Runtime, config: ScraperConfig, layout: &OutputLayout, start: u64, end: u64) -> Result<()> {
    let total = validate_id_range(start, end)?;

    let http = http_client(config)?;
    let wtt = WttClient::new(&http);

    println!("{}: ids {}-{}", "Discovering".green(), start, end);
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let mut discovered = Vec::new();
    for id in start..=end {
        pb.set_message(id.to_string());
        let found = rt.block_on(wtt.discover_brute_force(id, id));
        for player in &found {
            pb.println(format!(
                "{} {} ({})",
                "Found".green(),
                player.name.as_deref().unwrap_or("Unknown"),
                player.ittf_id
            ));
        }
        discovered.extend(found);
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!("{}: {} players", "Complete".green(), discovered.len());
    let doc = players_envelope(&discovered, &chrono::Utc::now().to_rfc3339());
    save(&layout.players().join("discovered_players.json"), &doc)
}

fn run_ranking_pages(rt: &Runtime, config: ScraperConfig, layout: &OutputLayout) -> Result<()> {
    let http = http_client(config)?;
    let scraper = RankingPagesScraper::new(&http);

    let pb = spinner("Scraping ranking pages...".to_string());
    let db = rt.block_on(scraper.scrape_all());
    pb.finish_and_clear();

    println!("{}", "Ranking pages:".yellow().bold());
    for (category, ids) in &db.per_category {
        println!("  {:<30} {:>6}", category, ids.len());
    }
    println!(
        "  Total: {} ({} men, {} women)",
        db.all_ids.len(),
        db.men_ids.len(),
        db.women_ids.len()
    );

    let sample: Vec<String> = db.all_ids.iter().take(VERIFY_SAMPLE_SIZE).cloned().collect();
    let pb = spinner(format!("Verifying {} sample ids...", sample.len()));
    let verified = rt.block_on(WttClient::new(&http).verify_ids(&sample, "rankings_page"));
    pb.finish_and_clear();
    println!(
        "  Sample verified: {}/{}",
        verified.iter().filter(|v| v.verified).count(),
        verified.len()
    );

    let doc = ranking_pages_document(&db, &verified, &chrono::Utc::now().to_rfc3339());
    save(&layout.root().join("complete_player_database.json"), &doc)
}

fn run_matches(
    rt: &Runtime,
    config: ScraperConfig,
    layout: &OutputLayout,
    years: &[i32],
    max_matches: Option<usize>,
) -> Result<()> {
    validate_years(years)?;

    let http = http_client(config)?;
    let fabrik = FabrikClient::new(
        &http,
        FabrikConfig {
            max_matches,
            ..Default::default()
        },
    );

    for &year in years {
        let pb = spinner(format!("Scraping {} matches...", year));
        let matches = rt.block_on(fabrik.scrape_year(year));
        pb.finish_and_clear();

        if matches.is_empty() {
            println!("{} {}: no matches", "Warning".yellow(), year);
            continue;
        }

        let now = chrono::Utc::now().to_rfc3339();
        println!("{} {}: {} matches", "Scraped".green(), year, matches.len());
        save(
            &layout.matches().join(format!("matches_{}.json", year)),
            &matches_document(&matches, &now),
        )?;
        save(
            &layout.players().join(format!("players_from_matches_{}.json", year)),
            &match_players_document(&matches, &now),
        )?;
    }
    Ok(())
}

fn run_master(
    rt: &Runtime,
    config: ScraperConfig,
    fabrik: FabrikConfig,
    layout: &OutputLayout,
    years: &[i32],
) -> Result<()> {
    let http = http_client(config)?;
    let collector = MasterCollector::new(&http, fabrik, layout.clone());

    println!("{}: years {:?}", "Master scrape".green(), years);
    let pb = spinner("Scraping Fabrik matches...".to_string());
    let dataset = rt.block_on(collector.run(years));
    pb.finish_and_clear();
    let dataset = dataset.context("Master scrape failed")?;

    println!("Players: {}", dataset.metadata.players);
    println!("Matches: {}", dataset.metadata.matches);
    println!("{}: {:?}", "Saved".green(), layout.root().join("dataset.json"));
    Ok(())
}

fn run_collect(
    rt: &Runtime,
    config: ScraperConfig,
    layout: &OutputLayout,
    seed_file: Option<&Path>,
    years: &[i32],
) -> Result<()> {
    if !years.is_empty() {
        validate_years(years)?;
    }

    let http = http_client(config)?;
    let collector = ProfileCollector::new(&http, WttClient::new(&http), FabrikConfig::default(), layout.clone());

    let pb = spinner("Collecting player profiles...".to_string());
    let report = rt.block_on(collector.run(seed_file, years));
    pb.finish_and_clear();
    let report = report.context("Collection failed")?;

    println!("{}", "Collection complete".green().bold());
    println!("{}", report.summary);
    println!("Matches: {}", report.data_sources.matches_scraped);
    println!("Data saved to: {:?}", layout.root());
    Ok(())
}

fn run_probe_fabrik(
    rt: &Runtime,
    config: ScraperConfig,
    layout: &OutputLayout,
    list_ids: &[String],
    year: i32,
) -> Result<()> {
    let http = http_client(config)?;
    let fabrik = FabrikClient::new(&http, FabrikConfig::default());

    let probes = rt.block_on(fabrik.probe_lists(list_ids, year));
    for probe in &probes {
        let status = if probe.success {
            format!("json, {} items", probe.item_count.unwrap_or(0)).green()
        } else {
            probe.error.clone().unwrap_or_default().red()
        };
        println!("  {:<24} {}", probe.key(), status);
    }

    let summary = ProbeSummary::from_probes(&probes);
    println!("\n{}", "=== Fabrik list access ===".bold());
    println!("Working:       {}", summary.working_endpoints.len());
    println!("Access denied: {}", summary.access_denied.len());
    println!("Auth required: {}", summary.auth_required.len());
    println!("Other errors:  {}", summary.unknown_errors.len());

    let tested: Vec<String> = probes.iter().map(|p| p.key()).collect();
    let doc = serde_json::json!({
        "scraped_at": chrono::Utc::now().to_rfc3339(),
        "tested_listids": tested,
        "summary": summary,
        "results": probes,
    });
    save(&layout.root().join("fabrik_probe.json"), &doc)
}

fn ttbl_layout(layout: &OutputLayout) -> OutputLayout {
    OutputLayout::new(layout.root().join("ttbl"))
}

fn run_ttbl(rt: &Runtime, config: ScraperConfig, layout: &OutputLayout, ttbl: TtblConfig) -> Result<()> {
    let http = http_client(config)?;
    let out = ttbl_layout(layout);

    println!("{}: season {} ({} gamedays)", "TTBL".green(), ttbl.season, ttbl.gamedays);
    let collector = TtblCollector::new(&http, ttbl, out.clone());

    let pb = spinner("Scraping TTBL...".to_string());
    let metadata = rt.block_on(collector.run());
    pb.finish_and_clear();
    let metadata = metadata.context("TTBL scrape failed")?;

    println!("{}", serde_json::to_string_pretty(&metadata)?);
    println!("Data saved to: {:?}", out.root());
    Ok(())
}

fn run_verify_ttbl(layout: &OutputLayout) -> Result<()> {
    let games_file = ttbl_layout(layout).stats().join("games_data.json");
    if !games_file.exists() {
        anyhow::bail!("{:?} not found", games_file);
    }

    let readiness = verify_games_file(&games_file).with_context(|| format!("Failed to read {:?}", games_file))?;

    println!("{}", "Valid games for ELO calculation:".yellow().bold());
    println!("  Valid for ELO:     {}", readiness.valid_games);
    println!("  Total in dataset:  {}", readiness.total_games);
    println!("  Excluded:          {}", readiness.excluded());
    println!();
    if readiness.is_ready() {
        println!("{}", "STATUS: ELO data is ready!".green().bold());
    } else {
        println!("{}", "STATUS: No valid games for ELO!".red().bold());
    }
    Ok(())
}
