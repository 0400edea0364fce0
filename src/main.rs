mod db;
mod export;
mod fetch;
mod parser;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tracing::warn;

use crate::parser::richtext;

#[derive(Parser)]
#[command(name = "trust_scraper", about = "BG-Wiki FFXI trust scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the Category:Trust page into the local DB
    Fetch,
    /// Parse the latest fetched page into trust records
    Process,
    /// Write trustInformation.json from stored records
    Export {
        /// Output path
        #[arg(short, long, default_value = "data/trustInformation.json")]
        output: PathBuf,
    },
    /// Fetch + process + export in one pipeline
    Run {
        #[arg(short, long, default_value = "data/trustInformation.json")]
        output: PathBuf,
    },
    /// Trusts overview table
    List {
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show pipeline statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Fetch => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            fetch_page(&conn).await.map(|_| ())
        }
        Commands::Process => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            match db::latest_unprocessed(&conn)? {
                Some((page_id, html)) => process_page(&conn, page_id, &html).map(|_| ()),
                None => {
                    println!("No unprocessed page. Run 'fetch' first.");
                    Ok(())
                }
            }
        }
        Commands::Export { output } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let records = db::fetch_trusts(&conn)?;
            if records.is_empty() {
                println!("No trusts stored. Run 'process' first.");
                return Ok(());
            }
            export::write_information_json(&records, &output)?;
            println!("Exported {} trusts to {}", records.len(), output.display());
            Ok(())
        }
        Commands::Run { output } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let Some((page_id, html)) = fetch_page(&conn).await? else {
                return Ok(());
            };
            let count = process_page(&conn, page_id, &html)?;
            if count == 0 {
                println!("No trusts parsed; nothing to export.");
                return Ok(());
            }
            let records = db::fetch_trusts(&conn)?;
            export::write_information_json(&records, &output)?;
            println!("Exported {} trusts to {}", records.len(), output.display());
            Ok(())
        }
        Commands::List { limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let records = db::fetch_trusts(&conn)?;
            if records.is_empty() {
                println!("No trusts stored. Run 'process' first.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<24} | {:<20} | {:>6} | {:>4} | {:>3}",
                "#", "Trust", "Job", "Spells", "Abil", "WS"
            );
            println!("{}", "-".repeat(75));

            for (i, r) in records.iter().take(limit).enumerate() {
                let job = r
                    .job
                    .as_deref()
                    .map(richtext::lines_to_text)
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:>3} | {:<24} | {:<20} | {:>6} | {:>4} | {:>3}",
                    i + 1,
                    truncate(&r.name, 24),
                    truncate(&job, 20),
                    line_count(&r.spells),
                    line_count(&r.abilities),
                    line_count(&r.weapon_skills),
                );
            }

            println!("\n{} trusts stored", records.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Pages fetched: {}", s.pages);
            println!("Fetch errors:  {}", s.fetch_errors);
            println!("Unprocessed:   {}", s.unprocessed);
            println!("Trusts:        {}", s.trusts);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Fetch and store the category page; returns its id and html on success.
async fn fetch_page(conn: &Connection) -> Result<Option<(i64, String)>> {
    let row = fetch::fetch_category_page().await?;
    let page_id = db::insert_page(conn, &row)?;
    match row.html {
        Some(html) => {
            println!("Fetched page ({} bytes)", html.len());
            Ok(Some((page_id, html)))
        }
        None => {
            warn!("Fetch failed: {}", row.error.as_deref().unwrap_or("unknown"));
            println!("Fetch failed; see pages table for details.");
            Ok(None)
        }
    }
}

fn process_page(conn: &Connection, page_id: i64, html: &str) -> Result<usize> {
    let table_count = parser::tables::split_tables(html).len();

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Parsing {} tables...", table_count));
    pb.enable_steady_tick(Duration::from_millis(100));

    let records = parser::parse_category_page(html);
    pb.finish_and_clear();

    let saved = db::save_trusts(conn, page_id, &records)?;
    db::mark_processed(conn, page_id)?;
    println!("Parsed {} trusts from {} tables ({} saved).", records.len(), table_count, saved);
    Ok(records.len())
}

fn line_count(field: &Option<Vec<richtext::Line>>) -> usize {
    field.as_deref().map(|lines| lines.len()).unwrap_or(0)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
