use crate::config::BilibiliConfig;
use crate::constants::BILIBILI_SOURCE;
use crate::error::{Result, ScraperError};
use crate::fetch::{fetch_json, fetch_text};
use crate::timestamp::{normalize_epoch, Vocabulary};
use crate::types::{ItemRecord, ProfileSource, RawItem, Subject};
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

const SPACE_REFERER: &str = "https://space.bilibili.com/";

/// Scrapes a user's uploaded videos. The space API is the primary path;
/// when it fails or comes back empty the space page markup is probed
/// instead, where dates are relative phrases rather than epochs.
pub struct BilibiliSource {
    client: reqwest::Client,
    config: BilibiliConfig,
}

impl BilibiliSource {
    pub fn new(client: reqwest::Client, config: BilibiliConfig) -> Self {
        Self { client, config }
    }

    fn api_url(&self) -> String {
        format!(
            "https://api.bilibili.com/x/space/arc/search?mid={}&pn=1&ps={}&order=pubdate",
            self.config.uid, self.config.max_items
        )
    }

    fn space_url(&self) -> String {
        format!("https://space.bilibili.com/{}/video", self.config.uid)
    }

    async fn fetch_from_api(&self) -> Result<Vec<RawItem>> {
        let response = fetch_json(&self.client, &self.api_url(), Some(SPACE_REFERER)).await?;
        self.extract_api_items(&response)
    }

    /// Pull the upload list out of the arc/search response.
    fn extract_api_items(&self, response: &Value) -> Result<Vec<RawItem>> {
        let code = response["code"].as_i64().unwrap_or(-1);
        if code != 0 {
            let message = response["message"].as_str().unwrap_or("unknown");
            return Err(ScraperError::Source {
                message: format!("bilibili api returned code {code}: {message}"),
            });
        }

        let vlist = response["data"]["list"]["vlist"]
            .as_array()
            .ok_or_else(|| ScraperError::MissingField("data.list.vlist not found".into()))?;

        Ok(vlist
            .iter()
            .take(self.config.max_items)
            .map(|video| {
                json!({
                    "title": video["title"],
                    "bvid": video["bvid"],
                    "created": video["created"],
                    "play": video["play"],
                    "pic": video["pic"],
                    "author": video["author"],
                })
            })
            .collect())
    }

    /// Probe the space page for video cards. Selector chain in fidelity
    /// order; the card class names shift between page rollouts.
    fn extract_cards_from_html(&self, html: &str) -> Vec<RawItem> {
        let document = Html::parse_document(html);

        let card_selectors = [".bili-video-card", ".video-card", "[class*='video']"];
        let mut cards = Vec::new();
        for selector_str in &card_selectors {
            let selector = Selector::parse(selector_str).unwrap();
            cards = document.select(&selector).collect::<Vec<_>>();
            if !cards.is_empty() {
                debug!("Matched {} cards with selector {}", cards.len(), selector_str);
                break;
            }
        }

        let title_selector = Selector::parse(".bili-video-card__info--tit").unwrap();
        let date_selector = Selector::parse(".bili-video-card__info--date").unwrap();
        let play_selector = Selector::parse(".bili-video-card__stats--item").unwrap();
        let link_selector = Selector::parse("a[href]").unwrap();
        let img_selector = Selector::parse("img").unwrap();

        cards
            .iter()
            .take(self.config.max_items)
            .map(|card| {
                let title = card
                    .select(&title_selector)
                    .next()
                    .map(|el| {
                        el.value()
                            .attr("title")
                            .map(|t| t.to_string())
                            .unwrap_or_else(|| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
                    })
                    .unwrap_or_default();

                let date_text = card
                    .select(&date_selector)
                    .next()
                    .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string());

                let play_text = card
                    .select(&play_selector)
                    .next()
                    .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string());

                let url = card
                    .select(&link_selector)
                    .next()
                    .and_then(|el| el.value().attr("href"))
                    .map(absolute_url);

                let cover = card
                    .select(&img_selector)
                    .next()
                    .and_then(|el| el.value().attr("src"))
                    .map(absolute_url);

                json!({
                    "title": title,
                    "url": url,
                    "date_text": date_text,
                    "play_text": play_text,
                    "pic": cover,
                })
            })
            .collect()
    }

    fn api_record(&self, raw: &RawItem, now: DateTime<Utc>) -> Result<ItemRecord> {
        let title = raw["title"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("title not found".into()))?;
        let bvid = raw["bvid"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("bvid not found".into()))?;

        let created = raw["created"].as_i64();
        let published_at = created.and_then(|secs| normalize_epoch(secs).ok());
        let formatted_date = published_at
            .map(|normalized| Vocabulary::chinese().format_relative(normalized.instant, now));

        let mut extra = Map::new();
        extra.insert(
            "play_count".into(),
            Value::String(raw["play"].as_i64().unwrap_or(0).to_string()),
        );
        extra.insert(
            "cover_url".into(),
            Value::String(raw["pic"].as_str().unwrap_or("").to_string()),
        );
        extra.insert(
            "author".into(),
            Value::String(raw["author"].as_str().unwrap_or("").to_string()),
        );

        Ok(ItemRecord {
            title: title.to_string(),
            url: format!("https://www.bilibili.com/video/{bvid}"),
            published_raw: created.map(|secs| secs.to_string()),
            published_at,
            formatted_date,
            fetched_at: now,
            extra,
        })
    }

    fn card_record(&self, raw: &RawItem, now: DateTime<Utc>) -> Result<ItemRecord> {
        let title = raw["title"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("title not found".into()))?;
        let url = raw["url"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("url not found".into()))?;

        let published_raw = raw["date_text"].as_str().map(|s| s.to_string());
        let vocabulary = Vocabulary::chinese();
        let published_at = published_raw
            .as_deref()
            .and_then(|text| vocabulary.normalize_str(text, now).ok());
        let formatted_date =
            published_at.map(|normalized| vocabulary.format_relative(normalized.instant, now));

        let mut extra = Map::new();
        extra.insert(
            "play_count".into(),
            Value::String(raw["play_text"].as_str().unwrap_or("0").to_string()),
        );
        extra.insert(
            "cover_url".into(),
            Value::String(raw["pic"].as_str().unwrap_or("").to_string()),
        );

        Ok(ItemRecord {
            title: title.to_string(),
            url: url.to_string(),
            published_raw,
            published_at,
            formatted_date,
            fetched_at: now,
            extra,
        })
    }
}

/// Space cards link with protocol-relative hrefs.
fn absolute_url(href: &str) -> String {
    if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else {
        href.to_string()
    }
}

#[async_trait::async_trait]
impl ProfileSource for BilibiliSource {
    fn source_name(&self) -> &'static str {
        BILIBILI_SOURCE
    }

    fn subject(&self) -> Subject {
        Subject::new(self.config.uid.clone())
    }

    #[instrument(skip(self))]
    async fn fetch_items(&self) -> Result<Vec<RawItem>> {
        debug!("Starting bilibili fetch for uid {}", self.config.uid);

        match self.fetch_from_api().await {
            Ok(items) if !items.is_empty() => {
                info!("Fetched {} videos from bilibili api", items.len());
                return Ok(items);
            }
            Ok(_) => warn!("bilibili api returned no videos, trying the space page"),
            Err(e) => warn!("bilibili api fetch failed ({}), trying the space page", e),
        }

        let html = fetch_text(&self.client, &self.space_url(), Some(SPACE_REFERER)).await?;
        let items = self.extract_cards_from_html(&html);
        info!("Extracted {} video cards from bilibili space page", items.len());
        Ok(items)
    }

    fn item_record(&self, raw: &RawItem, now: DateTime<Utc>) -> Result<ItemRecord> {
        if raw["bvid"].is_string() {
            self.api_record(raw, now)
        } else {
            self.card_record(raw, now)
        }
    }

    fn should_skip(&self, raw: &RawItem) -> (bool, String) {
        let title = raw["title"].as_str().unwrap_or("");
        if title.trim().is_empty() {
            return (true, "Skipping card without a title".to_string());
        }
        (false, String::new())
    }
}
