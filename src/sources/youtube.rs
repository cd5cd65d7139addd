use crate::config::YoutubeConfig;
use crate::constants::YOUTUBE_SOURCE;
use crate::error::{Result, ScraperError};
use crate::fetch::fetch_text;
use crate::timestamp::Vocabulary;
use crate::types::{ItemRecord, ProfileSource, RawItem, Subject};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Map};
use tracing::{debug, info, instrument, warn};

const DESCRIPTION_LIMIT: usize = 200;

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
    published: Option<String>,
    author: Option<Author>,
    #[serde(rename = "media:group")]
    media_group: Option<MediaGroup>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MediaGroup {
    #[serde(rename = "media:thumbnail")]
    thumbnail: Option<Thumbnail>,
    #[serde(rename = "media:description")]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    #[serde(rename = "@url")]
    url: Option<String>,
}

static CANONICAL_CHANNEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<link rel="canonical" href="https://www\.youtube\.com/channel/([^"]+)""#).unwrap()
});
static CHANNEL_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r#""channelId":"([^"]+)""#).unwrap());

/// Resolve a channel id out of a channel page: the canonical link holds
/// it, with the embedded player config as a fallback.
fn extract_channel_id(html: &str) -> Option<String> {
    CANONICAL_CHANNEL
        .captures(html)
        .or_else(|| CHANNEL_ID.captures(html))
        .map(|captures| captures[1].to_string())
}

/// Fetches a channel's uploads via the public Atom feed. The handle is
/// resolved to a channel id first; when that fails the legacy user feed
/// URL is tried instead.
pub struct YoutubeSource {
    client: reqwest::Client,
    config: YoutubeConfig,
}

impl YoutubeSource {
    pub fn new(client: reqwest::Client, config: YoutubeConfig) -> Self {
        Self { client, config }
    }

    fn channel_name(&self) -> &str {
        self.config
            .handle
            .strip_prefix('@')
            .unwrap_or(&self.config.handle)
    }

    async fn resolve_channel_id(&self) -> Option<String> {
        let url = format!("https://www.youtube.com/@{}", self.channel_name());
        debug!("Resolving youtube channel id from {}", url);
        match fetch_text(&self.client, &url, None).await {
            Ok(html) => extract_channel_id(&html),
            Err(e) => {
                warn!("Failed to fetch youtube channel page: {}", e);
                None
            }
        }
    }

    fn parse_feed(&self, xml: &str) -> Result<Vec<RawItem>> {
        let feed: Feed = from_str(xml)?;

        Ok(feed
            .entries
            .into_iter()
            .take(self.config.max_items)
            .map(|entry| {
                let video_id = entry.video_id.unwrap_or_default();
                let url = entry
                    .links
                    .iter()
                    .find_map(|link| link.href.clone())
                    .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={video_id}"));

                let (thumbnail, description) = match entry.media_group {
                    Some(group) => (
                        group.thumbnail.and_then(|t| t.url),
                        group.description.unwrap_or_default(),
                    ),
                    None => (None, String::new()),
                };

                let channel_name = entry
                    .author
                    .and_then(|author| author.name)
                    .unwrap_or_else(|| self.channel_name().to_string());

                json!({
                    "title": entry.title,
                    "video_id": video_id,
                    "url": url,
                    "published": entry.published,
                    "description": description.chars().take(DESCRIPTION_LIMIT).collect::<String>(),
                    "thumbnail_url": thumbnail,
                    "channel_name": channel_name,
                })
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl ProfileSource for YoutubeSource {
    fn source_name(&self) -> &'static str {
        YOUTUBE_SOURCE
    }

    fn subject(&self) -> Subject {
        Subject::new(self.config.handle.clone())
    }

    #[instrument(skip(self))]
    async fn fetch_items(&self) -> Result<Vec<RawItem>> {
        let feed_url = match self.resolve_channel_id().await {
            Some(channel_id) => {
                info!("Resolved youtube channel id {}", channel_id);
                format!("https://www.youtube.com/feeds/videos.xml?channel_id={channel_id}")
            }
            None => {
                warn!(
                    "Could not resolve channel id for @{}, trying the user feed",
                    self.channel_name()
                );
                format!(
                    "https://www.youtube.com/feeds/videos.xml?user={}",
                    self.channel_name()
                )
            }
        };

        debug!("Fetching youtube feed: {}", feed_url);
        let xml = fetch_text(&self.client, &feed_url, None).await?;
        let items = self.parse_feed(&xml)?;
        info!("Parsed {} videos from youtube feed", items.len());
        Ok(items)
    }

    fn item_record(&self, raw: &RawItem, now: DateTime<Utc>) -> Result<ItemRecord> {
        let title = raw["title"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("title not found".into()))?;
        let url = raw["url"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("url not found".into()))?;

        let published_raw = raw["published"].as_str().map(|s| s.to_string());
        let vocabulary = Vocabulary::chinese();
        let published_at = published_raw
            .as_deref()
            .and_then(|text| vocabulary.normalize_str(text, now).ok());
        let formatted_date =
            published_at.map(|normalized| vocabulary.format_relative(normalized.instant, now));

        let mut extra = Map::new();
        for key in ["video_id", "description", "thumbnail_url", "channel_name"] {
            extra.insert(key.into(), raw[key].clone());
        }

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
