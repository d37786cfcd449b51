use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use place_scraper::config::{CategoryTable, DEFAULT_CATEGORY};
use place_scraper::runner::{self, StoreSummary};
use place_scraper::{fetch, parser, search};

#[derive(Parser)]
#[command(name = "place_scraper", about = "Nearby restaurant menus, prices and hours from Naver place pages")]
struct Cli {
    /// TOML category table (defaults to the built-in table)
    #[arg(long, global = true, env = "PLACE_SCRAPER_CATEGORIES")]
    categories: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search around a point and extract every store with a menu
    Search {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Category label, e.g. 카페, 한식
        #[arg(short, long, default_value = DEFAULT_CATEGORY)]
        category: String,
        /// Print full records (menu, hours, rating) instead of the summary list
        #[arg(long)]
        full: bool,
        /// Max stores to fetch
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Run the extraction pipeline on a saved store page
    Extract {
        file: PathBuf,
        /// Store id the page belongs to
        #[arg(long)]
        id: String,
        #[arg(short, long, default_value = DEFAULT_CATEGORY)]
        category: String,
        /// Source URL to record (defaults to the store's menu page)
        #[arg(long)]
        url: Option<String>,
    },
    /// Show the active category table
    Categories,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let table = match &cli.categories {
        Some(path) => CategoryTable::load(path)?,
        None => CategoryTable::builtin(),
    };

    match cli.command {
        Commands::Search {
            lat,
            lng,
            category,
            full,
            limit,
        } => {
            let category = table.get(&category)?;
            let client = fetch::client().context("Failed to build HTTP client")?;
            let output = runner::run(&client, lat, lng, category, limit).await?;

            if full {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                let summaries: Vec<StoreSummary> = output.stores.iter().map(|s| s.summary()).collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            }
            eprintln!("Done in {}", format_duration(t0.elapsed()));
        }
        Commands::Extract {
            file,
            id,
            category,
            url,
        } => {
            let category = table.get(&category)?;
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let url = url.unwrap_or_else(|| search::store_url(&id));

            match parser::extract_store(&html, &url, &id, category)? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => eprintln!("No record: store is closed today or has no menu within {} won.", category.price_ceiling),
            }
        }
        Commands::Categories => {
            println!("{:<12} | {:<16} | {:>8}", "Category", "Search type", "Ceiling");
            println!("{}", "-".repeat(42));
            for c in table.iter() {
                println!("{:<12} | {:<16} | {:>8}", c.label, c.type_code, c.price_ceiling);
            }
        }
    }

    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
