use crate::constants::output_file_for_source;
use crate::error::Result;
use crate::types::{ItemRecord, ProfileSource, SourceDocument};
use chrono::Utc;
use metrics::{counter, histogram};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, error, info, instrument};

/// Result of a complete pipeline run
#[derive(Debug, Serialize)]
pub struct PipelineResult {
    pub source: String,
    pub total_items: usize,
    pub written_items: usize,
    pub skipped_items: usize,
    pub duplicate_items: usize,
    pub unparsed_dates: usize,
    pub errors: Vec<String>,
    pub output_file: String,
}

pub struct Pipeline;

impl Pipeline {
    /// Run the complete pipeline for one source: fetch, skip-filter,
    /// build records, dedupe by URL, sort newest first, write the run
    /// document.
    #[instrument(skip(source), fields(source_name = %source.source_name()))]
    pub async fn run_for_source(
        source: Box<dyn ProfileSource>,
        output_dir: &str,
    ) -> Result<PipelineResult> {
        let source_name = source.source_name().to_string();
        info!("🚀 Starting pipeline for {}", source_name);
        println!("🚀 Starting pipeline for {}", source_name);
        counter!("scraper_pipeline_runs_total", "source" => source_name.clone()).increment(1);
        let t_pipeline = std::time::Instant::now();

        // Step 1: Fetch raw items
        info!("📡 Fetching items from {}...", source_name);
        println!("📡 Fetching items from {}...", source_name);
        let t_fetch = std::time::Instant::now();
        let raw_items = source.fetch_items().await?;
        let fetch_secs = t_fetch.elapsed().as_secs_f64();
        histogram!("scraper_fetch_duration_seconds", "source" => source_name.clone())
            .record(fetch_secs);
        info!("✅ Fetched {} raw items", raw_items.len());
        println!("✅ Fetched {} raw items", raw_items.len());
        histogram!("scraper_raw_items_per_run", "source" => source_name.clone())
            .record(raw_items.len() as f64);

        // Step 2: Build records; one reference instant for the whole run
        info!("🔧 Building records...");
        println!("🔧 Building records...");
        let now = Utc::now();
        let mut records: Vec<ItemRecord> = Vec::new();
        let mut errors = Vec::new();
        let mut skipped = 0;
        let mut duplicates = 0;
        let mut seen_urls = HashSet::new();

        for (i, raw_item) in raw_items.iter().enumerate() {
            let (should_skip, skip_reason) = source.should_skip(raw_item);
            if should_skip {
                debug!("Skipping item: {}", skip_reason);
                println!("   Skipping item: {skip_reason}");
                skipped += 1;
                continue;
            }

            match source.item_record(raw_item, now) {
                Ok(record) => {
                    if seen_urls.insert(record.url.clone()) {
                        records.push(record);
                    } else {
                        debug!("Dropping duplicate url: {}", record.url);
                        duplicates += 1;
                    }
                }
                Err(e) => {
                    let error_msg = format!("Failed to build record for item {i}: {e}");
                    error!("Record build failed for item {}: {}", i, e);
                    errors.push(error_msg);
                }
            }
        }

        let unparsed_dates = records
            .iter()
            .filter(|record| record.published_raw.is_some() && record.published_at.is_none())
            .count();

        Self::sort_newest_first(&mut records);

        info!(
            "✅ Built {} records ({} skipped, {} duplicates, {} unparsed dates, {} errors)",
            records.len(),
            skipped,
            duplicates,
            unparsed_dates,
            errors.len()
        );
        println!(
            "✅ Built {} records ({} skipped, {} duplicates, {} unparsed dates, {} errors)",
            records.len(),
            skipped,
            duplicates,
            unparsed_dates,
            errors.len()
        );
        counter!("scraper_items_written_total", "source" => source_name.clone())
            .increment(records.len() as u64);
        counter!("scraper_items_skipped_total", "source" => source_name.clone())
            .increment(skipped as u64);
        counter!("scraper_duplicate_items_total", "source" => source_name.clone())
            .increment(duplicates as u64);
        counter!("scraper_unparsed_dates_total", "source" => source_name.clone())
            .increment(unparsed_dates as u64);
        counter!("scraper_item_errors_total", "source" => source_name.clone())
            .increment(errors.len() as u64);

        // Step 3: Persist the run document
        let written_items = records.len();
        let document = SourceDocument {
            source: source_name.clone(),
            subject: source.subject(),
            total_items: written_items,
            fetched_at: now,
            items: records,
        };
        let output_file = Self::persist_to_json(&document, output_dir)?;
        info!("💾 Saved {} items to {}", written_items, output_file);
        println!("💾 Saved {} items to {}", written_items, output_file);

        let total_secs = t_pipeline.elapsed().as_secs_f64();
        histogram!("scraper_pipeline_duration_seconds", "source" => source_name.clone())
            .record(total_secs);

        Ok(PipelineResult {
            source: source_name,
            total_items: raw_items.len(),
            written_items,
            skipped_items: skipped,
            duplicate_items: duplicates,
            unparsed_dates,
            errors,
            output_file,
        })
    }

    /// Newest first by normalized instant. Items without one go last and
    /// keep their fetch order among themselves.
    fn sort_newest_first(records: &mut [ItemRecord]) {
        records.sort_by(|a, b| match (a.published_at, b.published_at) {
            (Some(a), Some(b)) => b.instant.cmp(&a.instant),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });
    }

    /// Persist the run document to its fixed per-source JSON file
    fn persist_to_json(document: &SourceDocument, output_dir: &str) -> Result<String> {
        // Ensure output directory exists
        fs::create_dir_all(output_dir)?;

        let filename = output_file_for_source(&document.source);
        let filepath = Path::new(output_dir).join(filename);

        // Serialize and write
        let json_content = serde_json::to_string_pretty(document)?;
        fs::write(&filepath, json_content)?;

        Ok(filepath.to_string_lossy().to_string())
    }
}
