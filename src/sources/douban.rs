use crate::config::DoubanConfig;
use crate::constants::DOUBAN_SOURCE;
use crate::error::{Result, ScraperError};
use crate::fetch::fetch_text;
use crate::types::{ItemRecord, ProfileSource, RawItem, Subject};
use chrono::{DateTime, Utc};
use scraper::{Html, Selector};
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

const BOOK_CATEGORY: &str = "book";
const MOVIE_CATEGORY: &str = "movie";

/// Scrapes a user's book and movie collections from their profile.
/// Collection pages carry no timestamps, so published fields stay null.
pub struct DoubanSource {
    client: reqwest::Client,
    config: DoubanConfig,
}

impl DoubanSource {
    pub fn new(client: reqwest::Client, config: DoubanConfig) -> Self {
        Self { client, config }
    }

    fn base_url(&self) -> String {
        format!("https://www.douban.com/people/{}/", self.config.uid)
    }

    fn category_url(&self, category: &str) -> String {
        match category {
            MOVIE_CATEGORY => format!("{}movie", self.base_url()),
            _ => format!("{}collect", self.base_url()),
        }
    }

    /// Parse `.item` entries off a collection page. Ratings and bylines
    /// fall back to the profile page's own placeholder wording.
    fn extract_collection_items(&self, html: &str, category: &str) -> Vec<RawItem> {
        let document = Html::parse_document(html);
        let item_selector = Selector::parse(".item").unwrap();
        let link_selector = Selector::parse("a").unwrap();
        let rating_selector = Selector::parse(".rating_nums").unwrap();
        let byline_selector = Selector::parse(".pub").unwrap();

        document
            .select(&item_selector)
            .take(self.config.items_per_category)
            .filter_map(|item| {
                let link = item.select(&link_selector).next()?;
                let title = link
                    .value()
                    .attr("title")
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| link.text().collect::<Vec<_>>().join(" "));
                let url = link.value().attr("href")?.to_string();

                let rating = item
                    .select(&rating_selector)
                    .next()
                    .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
                    .unwrap_or_else(|| "暂无评分".to_string());

                let byline_fallback = if category == MOVIE_CATEGORY {
                    "未知导演"
                } else {
                    "未知作者"
                };
                let byline = item
                    .select(&byline_selector)
                    .next()
                    .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
                    .unwrap_or_else(|| byline_fallback.to_string());

                let mut raw = json!({
                    "title": title.trim(),
                    "url": url,
                    "type": category,
                    "rating": rating,
                });
                let byline_key = if category == MOVIE_CATEGORY {
                    "director"
                } else {
                    "author"
                };
                raw[byline_key] = Value::String(byline);
                Some(raw)
            })
            .collect()
    }

    async fn fetch_category(&self, category: &str) -> Result<Vec<RawItem>> {
        let url = self.category_url(category);
        debug!("Fetching douban {} collection: {}", category, url);
        let html = fetch_text(&self.client, &url, Some(&self.base_url())).await?;
        Ok(self.extract_collection_items(&html, category))
    }
}

#[async_trait::async_trait]
impl ProfileSource for DoubanSource {
    fn source_name(&self) -> &'static str {
        DOUBAN_SOURCE
    }

    fn subject(&self) -> Subject {
        Subject::with_nickname(self.config.uid.clone(), self.config.nickname.clone())
    }

    #[instrument(skip(self))]
    async fn fetch_items(&self) -> Result<Vec<RawItem>> {
        debug!("Starting douban fetch for uid {}", self.config.uid);
        let mut items = Vec::new();

        // One category failing should not take down the other
        for category in [BOOK_CATEGORY, MOVIE_CATEGORY] {
            match self.fetch_category(category).await {
                Ok(found) => {
                    info!("Found {} douban {} items", found.len(), category);
                    items.extend(found);
                }
                Err(e) => warn!("Failed to fetch douban {} collection: {}", category, e),
            }
        }

        items.truncate(self.config.max_items);
        Ok(items)
    }

    fn item_record(&self, raw: &RawItem, now: DateTime<Utc>) -> Result<ItemRecord> {
        let title = raw["title"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("title not found".into()))?;
        let url = raw["url"]
            .as_str()
            .ok_or_else(|| ScraperError::MissingField("url not found".into()))?;

        let mut extra = Map::new();
        for key in ["type", "rating", "author", "director"] {
            if let Some(value) = raw[key].as_str() {
                extra.insert(key.into(), Value::String(value.to_string()));
            }
        }

        Ok(ItemRecord {
            title: title.to_string(),
            url: url.to_string(),
            published_raw: None,
            published_at: None,
            formatted_date: None,
            fetched_at: now,
            extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> DoubanSource {
        DoubanSource::new(reqwest::Client::new(), DoubanConfig::default())
    }

    const BOOK_PAGE: &str = r#"
        <div class="item">
            <a href="https://book.douban.com/subject/1084336/" title="小王子">小王子</a>
            <span class="rating_nums">9.1</span>
            <div class="pub">圣埃克苏佩里 / 人民文学出版社</div>
        </div>
        <div class="item">
            <a href="https://book.douban.com/subject/1770782/">追风筝的人</a>
        </div>
    "#;

    #[test]
    fn extracts_books_with_placeholder_fallbacks() {
        let items = source().extract_collection_items(BOOK_PAGE, BOOK_CATEGORY);
        assert_eq!(items.len(), 2);

        assert_eq!(items[0]["title"], "小王子");
        assert_eq!(items[0]["rating"], "9.1");
        assert_eq!(items[0]["author"], "圣埃克苏佩里 / 人民文学出版社");

        // Second item is missing both rating and byline
        assert_eq!(items[1]["rating"], "暂无评分");
        assert_eq!(items[1]["author"], "未知作者");
    }

    #[test]
    fn movie_items_use_director_fallback() {
        let html = r#"
            <div class="item">
                <a href="https://movie.douban.com/subject/1292052/" title="肖申克的救赎">肖申克的救赎</a>
            </div>
        "#;
        let items = source().extract_collection_items(html, MOVIE_CATEGORY);
        assert_eq!(items[0]["type"], "movie");
        assert_eq!(items[0]["director"], "未知导演");
        assert!(items[0]["author"].is_null());
    }

    #[test]
    fn truncates_to_items_per_category() {
        let mut html = String::new();
        for i in 0..8 {
            html.push_str(&format!(
                r#"<div class="item"><a href="https://book.douban.com/subject/{i}/" title="book {i}">book {i}</a></div>"#
            ));
        }
        let items = source().extract_collection_items(&html, BOOK_CATEGORY);
        assert_eq!(items.len(), 5);
    }

    #[test]
    fn record_has_null_published_fields() {
        let raw = json!({
            "title": "小王子",
            "url": "https://book.douban.com/subject/1084336/",
            "type": "book",
            "rating": "9.1",
            "author": "圣埃克苏佩里"
        });
        let now = Utc::now();
        let record = source().item_record(&raw, now).unwrap();
        assert!(record.published_raw.is_none());
        assert!(record.published_at.is_none());
        assert!(record.formatted_date.is_none());
        assert_eq!(record.extra["rating"], "9.1");
        assert_eq!(record.extra["type"], "book");
    }

    #[test]
    fn items_without_links_are_dropped() {
        let html = r#"<div class="item"><span>no link here</span></div>"#;
        let items = source().extract_collection_items(html, BOOK_CATEGORY);
        assert!(items.is_empty());
    }
}
