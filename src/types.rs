use crate::error::Result;
use crate::timestamp::NormalizedInstant;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Raw item data as returned from platform pages, APIs, and feeds
pub type RawItem = serde_json::Value;

/// The profile a source is scraping
#[derive(Debug, Clone, Serialize)]
pub struct Subject {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nickname: None,
        }
    }

    pub fn with_nickname(id: impl Into<String>, nickname: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            nickname: Some(nickname.into()),
        }
    }
}

/// One extracted item, ready for the run document.
///
/// `published_raw` keeps the time text exactly as scraped; when it does
/// not normalize, `published_at` and `formatted_date` stay null and the
/// item is kept. Per-source fields (play counts, ratings, video ids...)
/// ride along in `extra`.
#[derive(Debug, Clone, Serialize)]
pub struct ItemRecord {
    pub title: String,
    pub url: String,
    pub published_raw: Option<String>,
    pub published_at: Option<NormalizedInstant>,
    pub formatted_date: Option<String>,
    pub fetched_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Per-source run document, written as one JSON file per run
#[derive(Debug, Serialize)]
pub struct SourceDocument {
    pub source: String,
    pub subject: Subject,
    pub total_items: usize,
    pub fetched_at: DateTime<Utc>,
    pub items: Vec<ItemRecord>,
}

/// Core trait that all profile sources must implement
#[async_trait::async_trait]
pub trait ProfileSource: Send + Sync {
    /// Unique identifier for this source
    fn source_name(&self) -> &'static str;

    /// The profile subject this source is configured for
    fn subject(&self) -> Subject;

    /// Fetch all raw items from this source
    async fn fetch_items(&self) -> Result<Vec<RawItem>>;

    /// Build the output record for one raw item
    fn item_record(&self, raw: &RawItem, now: DateTime<Utc>) -> Result<ItemRecord>;

    /// Determine if an item should be skipped
    fn should_skip(&self, _raw: &RawItem) -> (bool, String) {
        (false, String::new())
    }
}
