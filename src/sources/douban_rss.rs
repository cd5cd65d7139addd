use crate::config::DoubanConfig;
use crate::constants::DOUBAN_RSS_SOURCE;
use crate::error::{Result, ScraperError};
use crate::fetch::fetch_text;
use crate::timestamp::Vocabulary;
use crate::types::{ItemRecord, ProfileSource, RawItem, Subject};
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// Scrapes a user's interests feed (RSS 2.0). `pubDate` is feed-style
/// RFC 822 with a named zone, e.g. `Fri, 04 Jul 2025 16:44:07 GMT`.
pub struct DoubanRssSource {
    client: reqwest::Client,
    config: DoubanConfig,
}

impl DoubanRssSource {
    pub fn new(client: reqwest::Client, config: DoubanConfig) -> Self {
        Self { client, config }
    }

    fn feed_url(&self) -> String {
        format!(
            "https://www.douban.com/feed/people/{}/interests",
            self.config.uid
        )
    }

    fn parse_feed(&self, xml: &str) -> Result<Vec<RawItem>> {
        let rss: Rss = from_str(xml)?;

        Ok(rss
            .channel
            .items
            .into_iter()
            .take(self.config.max_items)
            .map(|item| {
                json!({
                    "title": item.title,
                    "url": item.link,
                    "published": item.pub_date,
                    "description": item.description,
                })
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl ProfileSource for DoubanRssSource {
    fn source_name(&self) -> &'static str {
        DOUBAN_RSS_SOURCE
    }

    fn subject(&self) -> Subject {
        Subject::with_nickname(self.config.uid.clone(), self.config.nickname.clone())
    }

    #[instrument(skip(self))]
    async fn fetch_items(&self) -> Result<Vec<RawItem>> {
        let url = self.feed_url();
        debug!("Fetching douban interests feed: {}", url);
        let xml = fetch_text(&self.client, &url, None).await?;
        let items = self.parse_feed(&xml)?;
        info!("Parsed {} items from douban interests feed", items.len());
        Ok(items)
    }

    fn item_record(&self, raw: &RawItem, now: DateTime<Utc>) -> Result<ItemRecord> {
        let title = raw["title"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("title not found".into()))?;
        let url = raw["url"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("link not found".into()))?;

        let published_raw = raw["published"].as_str().map(|s| s.to_string());
        let vocabulary = Vocabulary::chinese();
        let published_at = published_raw
            .as_deref()
            .and_then(|text| vocabulary.normalize_str(text, now).ok());
        let formatted_date =
            published_at.map(|normalized| vocabulary.format_relative(normalized.instant, now));

        let mut extra = Map::new();
        extra.insert("type".into(), Value::String("interest".to_string()));
        extra.insert("rating".into(), Value::String(String::new()));
        extra.insert("author".into(), Value::String(String::new()));
        extra.insert(
            "description".into(),
            Value::String(raw["description"].as_str().unwrap_or("").to_string()),
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

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> DoubanRssSource {
        DoubanRssSource::new(reqwest::Client::new(), DoubanConfig::default())
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0">
          <channel>
            <title>Saai 的收藏</title>
            <item>
              <title>想读小王子</title>
              <link>https://book.douban.com/subject/1084336/</link>
              <pubDate>Fri, 04 Jul 2025 16:44:07 GMT</pubDate>
              <description>&lt;p&gt;经典&lt;/p&gt;</description>
            </item>
            <item>
              <title>看过肖申克的救赎</title>
              <link>https://movie.douban.com/subject/1292052/</link>
              <pubDate>Mon, 30 Jun 2025 08:00:00 GMT</pubDate>
            </item>
          </channel>
        </rss>"#;

    #[test]
    fn parses_feed_items() {
        let items = source().parse_feed(FEED).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["title"], "想读小王子");
        assert_eq!(items[0]["published"], "Fri, 04 Jul 2025 16:44:07 GMT");
        assert_eq!(items[1]["url"], "https://movie.douban.com/subject/1292052/");
    }

    #[test]
    fn record_normalizes_feed_timestamp() {
        let items = source().parse_feed(FEED).unwrap();
        let now = at("2025-07-06T00:00:00Z");
        let record = source().item_record(&items[0], now).unwrap();

        assert_eq!(record.published_raw.as_deref(), Some("Fri, 04 Jul 2025 16:44:07 GMT"));
        assert_eq!(
            record.published_at.unwrap().to_iso_string(),
            "2025-07-04T16:44:07Z"
        );
        // 1 elapsed day from the reference instant
        assert_eq!(record.formatted_date.as_deref(), Some("昨天"));
        assert_eq!(record.extra["type"], "interest");
    }

    #[test]
    fn record_without_pub_date_keeps_null_published_at() {
        let raw = json!({
            "title": "想读小王子",
            "url": "https://book.douban.com/subject/1084336/",
            "published": null,
            "description": null
        });
        let record = source().item_record(&raw, Utc::now()).unwrap();
        assert!(record.published_raw.is_none());
        assert!(record.published_at.is_none());
        assert!(record.formatted_date.is_none());
    }

    #[test]
    fn empty_channel_parses_to_no_items() {
        let xml = r#"<rss version="2.0"><channel><title>empty</title></channel></rss>"#;
        let items = source().parse_feed(xml).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(source().parse_feed("<rss><channel>").is_err());
    }
}
