use clap::{Parser, Subcommand};
use tracing::{error, info, warn};

use profile_scraper::config::Config;
use profile_scraper::constants;
use profile_scraper::fetch;
use profile_scraper::logging;
use profile_scraper::pipeline::Pipeline;
use profile_scraper::sources::{
    BilibiliSource, DoubanRssSource, DoubanSource, JianshuSource, YoutubeSource,
};
use profile_scraper::types::ProfileSource;

#[derive(Parser)]
#[command(name = "profile_scraper")]
#[command(about = "Public profile page and feed scraper")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape sources and write per-source JSON snapshots
    Run {
        /// Specific sources to run (comma-separated). Available: bilibili, douban, douban_rss, jianshu, youtube
        #[arg(long)]
        sources: Option<String>,
        /// Directory for output JSON files (defaults to the configured one)
        #[arg(long)]
        output_dir: Option<String>,
    },
    /// List the supported sources
    ListSources,
}

fn create_source(
    source_name: &str,
    config: &Config,
    client: &reqwest::Client,
) -> Option<Box<dyn ProfileSource>> {
    match source_name {
        constants::BILIBILI_SOURCE => Some(Box::new(BilibiliSource::new(
            client.clone(),
            config.bilibili.clone(),
        ))),
        constants::DOUBAN_SOURCE => Some(Box::new(DoubanSource::new(
            client.clone(),
            config.douban.clone(),
        ))),
        constants::DOUBAN_RSS_SOURCE => Some(Box::new(DoubanRssSource::new(
            client.clone(),
            config.douban.clone(),
        ))),
        constants::JIANSHU_SOURCE => Some(Box::new(JianshuSource::new(
            client.clone(),
            config.jianshu.clone(),
        ))),
        constants::YOUTUBE_SOURCE => Some(Box::new(YoutubeSource::new(
            client.clone(),
            config.youtube.clone(),
        ))),
        _ => None,
    }
}

async fn run_sources(
    source_names: &[String],
    config: &Config,
    output_dir: &str,
) -> anyhow::Result<()> {
    let client = fetch::build_client(config.http.timeout_seconds)?;

    for source_name in source_names {
        let span = tracing::info_span!("Running source", source = %source_name);
        let _enter = span.enter();

        if let Some(source) = create_source(source_name, config, &client) {
            info!("Starting pipeline");
            match Pipeline::run_for_source(source, output_dir).await {
                Ok(result) => {
                    info!("Pipeline finished");
                    println!("\n📊 Pipeline Results for {}:", source_name);
                    println!("   Total items: {}", result.total_items);
                    println!("   Written: {}", result.written_items);
                    println!("   Skipped: {}", result.skipped_items);
                    println!("   Duplicates: {}", result.duplicate_items);
                    println!("   Unparsed dates: {}", result.unparsed_dates);
                    println!("   Errors: {}", result.errors.len());
                    println!("   Output file: {}", result.output_file);

                    if !result.errors.is_empty() {
                        warn!("{} errors encountered during pipeline run", result.errors.len());
                        println!("\n⚠️  Errors encountered:");
                        for error in &result.errors {
                            println!("   - {}", error);
                        }
                    }
                }
                Err(e) => {
                    error!("Pipeline failed: {}", e);
                    println!("❌ Pipeline failed for {}: {}", source_name, e);
                }
            }
        } else {
            warn!("Unknown source specified");
            println!("⚠️  Unknown source: {}", source_name);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Initialize logging
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load_or_default();

    match cli.command {
        Commands::Run { sources, output_dir } => {
            println!("🚀 Running scraper pipeline...");

            let source_names: Vec<String> = if let Some(source_list) = sources {
                source_list.split(',').map(|s| s.trim().to_string()).collect()
            } else {
                constants::get_supported_sources()
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            };

            let output_dir = output_dir.unwrap_or_else(|| config.output.dir.clone());
            run_sources(&source_names, &config, &output_dir).await?;
        }
        Commands::ListSources => {
            println!("Supported sources:");
            for source in constants::get_supported_sources() {
                println!("  - {source}");
            }
        }
    }
    Ok(())
}
