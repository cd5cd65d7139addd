use crate::config::JianshuConfig;
use crate::constants::JIANSHU_SOURCE;
use crate::error::{Result, ScraperError};
use crate::fetch::fetch_text;
use crate::timestamp::Vocabulary;
use crate::types::{ItemRecord, ProfileSource, RawItem, Subject};
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Scrapes a user's articles. Article links come off the profile page;
/// the published time comes from each article's detail page through an
/// ordered chain of markup locations.
pub struct JianshuSource {
    client: reqwest::Client,
    config: JianshuConfig,
}

impl JianshuSource {
    pub fn new(client: reqwest::Client, config: JianshuConfig) -> Self {
        Self { client, config }
    }

    fn profile_url(&self) -> String {
        format!("https://www.jianshu.com/u/{}", self.config.uid)
    }

    /// Collect article links from the profile page markup, deduplicating
    /// while collecting; the same article link repeats across the page.
    fn extract_article_links(&self, html: &str) -> Vec<RawItem> {
        let document = Html::parse_document(html);
        let link_selector = Selector::parse(r#"a[href^="/p/"]"#).unwrap();

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for element in document.select(&link_selector) {
            if items.len() >= self.config.max_items {
                break;
            }
            let href = match element.value().attr("href") {
                Some(href) => href,
                None => continue,
            };
            let title = element.text().collect::<Vec<_>>().join(" ").trim().to_string();
            if title.is_empty() {
                continue;
            }

            let url = if href.starts_with("http") {
                href.to_string()
            } else {
                format!("https://www.jianshu.com{href}")
            };
            if !seen.insert(url.clone()) {
                continue;
            }

            let slug = href.split("/p/").last().unwrap_or("").to_string();
            items.push(json!({
                "title": title,
                "url": url,
                "slug": slug,
            }));
        }
        items
    }

    /// Pull the published time text out of an article page. Chain:
    /// `time[datetime]` attribute, `time` element text, the published
    /// meta tag, then a `publish-time` span.
    fn extract_published_text(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);

        let time_selector = Selector::parse("time").unwrap();
        if let Some(element) = document.select(&time_selector).next() {
            if let Some(datetime) = element.value().attr("datetime") {
                if !datetime.trim().is_empty() {
                    return Some(datetime.trim().to_string());
                }
            }
            let text = element.text().collect::<Vec<_>>().join(" ").trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }

        let meta_selector = Selector::parse(r#"meta[property="article:published_time"]"#).unwrap();
        if let Some(element) = document.select(&meta_selector).next() {
            if let Some(content) = element.value().attr("content") {
                if !content.trim().is_empty() {
                    return Some(content.trim().to_string());
                }
            }
        }

        let span_selector = Selector::parse("span.publish-time").unwrap();
        if let Some(element) = document.select(&span_selector).next() {
            let text = element.text().collect::<Vec<_>>().join(" ").trim().to_string();
            if !text.is_empty() {
                return Some(text);
            }
        }

        None
    }
}

/// Article pages prefix times with publish wording, e.g.
/// `发表于 2024年5月1日 12:30`. Strip it before normalization.
fn tidy_time_text(text: &str) -> String {
    let trimmed = text.trim();
    trimmed.strip_prefix("发表于").unwrap_or(trimmed).trim().to_string()
}

#[async_trait::async_trait]
impl ProfileSource for JianshuSource {
    fn source_name(&self) -> &'static str {
        JIANSHU_SOURCE
    }

    fn subject(&self) -> Subject {
        Subject::new(self.config.uid.clone())
    }

    #[instrument(skip(self))]
    async fn fetch_items(&self) -> Result<Vec<RawItem>> {
        let profile_url = self.profile_url();
        debug!("Fetching jianshu profile: {}", profile_url);
        let html = fetch_text(&self.client, &profile_url, None).await?;
        let mut items = self.extract_article_links(&html);
        info!("Found {} article links on jianshu profile", items.len());

        // Detail pages hold the publish time; one failure should not
        // lose the article itself
        for item in &mut items {
            let url = item["url"].as_str().unwrap_or_default().to_string();
            if url.is_empty() {
                continue;
            }
            match fetch_text(&self.client, &url, Some(&profile_url)).await {
                Ok(article_html) => {
                    if let Some(time_text) = self.extract_published_text(&article_html) {
                        item["time_text"] = Value::String(time_text);
                    }
                }
                Err(e) => warn!("Failed to fetch article page {}: {}", url, e),
            }
        }

        Ok(items)
    }

    fn item_record(&self, raw: &RawItem, now: DateTime<Utc>) -> Result<ItemRecord> {
        let title = raw["title"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("title not found".into()))?;
        let url = raw["url"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("url not found".into()))?;

        let published_raw = raw["time_text"].as_str().map(|s| s.to_string());
        let vocabulary = Vocabulary::chinese();
        let published_at = published_raw
            .as_deref()
            .and_then(|text| vocabulary.normalize_str(&tidy_time_text(text), now).ok());
        let formatted_date =
            published_at.map(|normalized| vocabulary.format_relative(normalized.instant, now));

        let mut extra = Map::new();
        extra.insert(
            "slug".into(),
            Value::String(raw["slug"].as_str().unwrap_or("").to_string()),
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

    fn should_skip(&self, raw: &RawItem) -> (bool, String) {
        let title = raw["title"].as_str().unwrap_or("");
        if title.trim().is_empty() {
            return (true, "Skipping article link without text".to_string());
        }
        (false, String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> JianshuSource {
        JianshuSource::new(reqwest::Client::new(), JianshuConfig::default())
    }

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn extracts_and_deduplicates_article_links() {
        let html = r#"
            <ul>
                <li><a href="/p/abc123">第一篇文章</a></li>
                <li><a href="/p/abc123">第一篇文章</a></li>
                <li><a href="/p/def456">第二篇文章</a></li>
                <li><a href="/p/ghi789"></a></li>
                <li><a href="/u/other">不是文章</a></li>
            </ul>
        "#;
        let items = source().extract_article_links(html);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["url"], "https://www.jianshu.com/p/abc123");
        assert_eq!(items[0]["slug"], "abc123");
        assert_eq!(items[1]["title"], "第二篇文章");
    }

    #[test]
    fn time_datetime_attribute_wins() {
        let html = r#"
            <article>
                <time datetime="2024-05-01T10:30:00">2024年5月1日</time>
                <meta property="article:published_time" content="2020-01-01T00:00:00">
            </article>
        "#;
        let text = source().extract_published_text(html).unwrap();
        assert_eq!(text, "2024-05-01T10:30:00");
    }

    #[test]
    fn falls_back_to_meta_then_span() {
        let meta_only = r#"<head><meta property="article:published_time" content="2024-05-01T10:30:00+08:00"></head>"#;
        assert_eq!(
            source().extract_published_text(meta_only).unwrap(),
            "2024-05-01T10:30:00+08:00"
        );

        let span_only = r#"<div><span class="publish-time">发表于 2024年5月1日 12:30</span></div>"#;
        assert_eq!(
            source().extract_published_text(span_only).unwrap(),
            "发表于 2024年5月1日 12:30"
        );

        assert!(source().extract_published_text("<div>nothing</div>").is_none());
    }

    #[test]
    fn record_strips_publish_prefix_before_normalizing() {
        let raw = json!({
            "title": "第一篇文章",
            "url": "https://www.jianshu.com/p/abc123",
            "slug": "abc123",
            "time_text": "发表于 2024年5月1日 12:30"
        });
        let record = source().item_record(&raw, at("2024-05-03T00:00:00Z")).unwrap();
        assert_eq!(record.published_raw.as_deref(), Some("发表于 2024年5月1日 12:30"));
        assert_eq!(
            record.published_at.unwrap().to_iso_string(),
            "2024-05-01T12:30:00Z"
        );
        assert_eq!(record.extra["slug"], "abc123");
    }

    #[test]
    fn record_without_time_text_keeps_the_article() {
        let raw = json!({
            "title": "第一篇文章",
            "url": "https://www.jianshu.com/p/abc123",
            "slug": "abc123"
        });
        let record = source().item_record(&raw, Utc::now()).unwrap();
        assert!(record.published_raw.is_none());
        assert!(record.published_at.is_none());
    }

    #[test]
    fn iso_datetime_attr_normalizes_at_second_precision() {
        let raw = json!({
            "title": "第一篇文章",
            "url": "https://www.jianshu.com/p/abc123",
            "slug": "abc123",
            "time_text": "2024-05-01T10:30:00"
        });
        let record = source().item_record(&raw, at("2024-05-04T00:00:00Z")).unwrap();
        assert_eq!(
            record.published_at.unwrap().to_iso_string(),
            "2024-05-01T10:30:00Z"
        );
        assert_eq!(record.formatted_date.as_deref(), Some("2天前"));
    }
}
