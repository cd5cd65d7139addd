#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use profile_scraper::config::{BilibiliConfig, DoubanConfig, JianshuConfig, YoutubeConfig};
    use profile_scraper::error::ScraperError;
    use profile_scraper::sources::{
        BilibiliSource, DoubanRssSource, DoubanSource, JianshuSource, YoutubeSource,
    };
    use profile_scraper::types::ProfileSource;
    use serde_json::json;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn all_sources() -> Vec<Box<dyn ProfileSource>> {
        let client = reqwest::Client::new();
        vec![
            Box::new(BilibiliSource::new(client.clone(), BilibiliConfig::default())),
            Box::new(DoubanSource::new(client.clone(), DoubanConfig::default())),
            Box::new(DoubanRssSource::new(client.clone(), DoubanConfig::default())),
            Box::new(JianshuSource::new(client.clone(), JianshuConfig::default())),
            Box::new(YoutubeSource::new(client, YoutubeConfig::default())),
        ]
    }

    #[test]
    fn test_source_names_and_subjects() {
        let sources = all_sources();
        let names: Vec<&str> = sources.iter().map(|s| s.source_name()).collect();
        assert_eq!(
            names,
            vec!["bilibili", "douban", "douban_rss", "jianshu", "youtube"]
        );

        assert_eq!(sources[0].subject().id, "472773672");
        let douban_subject = sources[1].subject();
        assert_eq!(douban_subject.id, "284853052");
        assert_eq!(douban_subject.nickname.as_deref(), Some("Saai"));
        assert_eq!(sources[3].subject().id, "763ffbb1b873");
        assert_eq!(sources[4].subject().id, "saai-saai");
    }

    #[test]
    fn test_bilibili_api_item_mapping() {
        let source = BilibiliSource::new(reqwest::Client::new(), BilibiliConfig::default());
        let raw = json!({
            "title": "测试视频",
            "bvid": "BV1xx411c7mD",
            "created": 1700000000,
            "play": 4321,
            "pic": "https://i1.hdslb.com/cover.jpg",
            "author": "Saai"
        });

        let record = source.item_record(&raw, at("2023-11-16T00:00:00Z")).unwrap();
        assert_eq!(record.title, "测试视频");
        assert_eq!(record.url, "https://www.bilibili.com/video/BV1xx411c7mD");
        assert_eq!(record.published_raw.as_deref(), Some("1700000000"));
        assert_eq!(
            record.published_at.unwrap().to_iso_string(),
            "2023-11-14T22:13:20Z"
        );
        assert_eq!(record.formatted_date.as_deref(), Some("昨天"));
        assert_eq!(record.extra["play_count"], "4321");
        assert_eq!(record.extra["author"], "Saai");
    }

    #[test]
    fn test_unparseable_published_keeps_item_in_every_source() {
        let now = at("2024-01-10T00:00:00Z");
        let client = reqwest::Client::new();

        let fixtures: Vec<(Box<dyn ProfileSource>, serde_json::Value)> = vec![
            (
                Box::new(BilibiliSource::new(client.clone(), BilibiliConfig::default())),
                json!({"title": "t", "url": "https://b.example/v/1", "date_text": "弹幕1000"}),
            ),
            (
                Box::new(DoubanRssSource::new(client.clone(), DoubanConfig::default())),
                json!({"title": "t", "url": "https://d.example/1", "published": "someday soon"}),
            ),
            (
                Box::new(JianshuSource::new(client.clone(), JianshuConfig::default())),
                json!({"title": "t", "url": "https://j.example/p/1", "slug": "1", "time_text": "置顶"}),
            ),
            (
                Box::new(YoutubeSource::new(client, YoutubeConfig::default())),
                json!({"title": "t", "url": "https://y.example/w/1", "published": "premiere pending"}),
            ),
        ];

        for (source, raw) in fixtures {
            let record = source.item_record(&raw, now).unwrap();
            assert!(
                record.published_at.is_none(),
                "{} should keep a null published_at",
                source.source_name()
            );
            assert!(record.formatted_date.is_none());
            assert!(record.published_raw.is_some());
        }
    }

    #[test]
    fn test_douban_records_have_no_published_fields() {
        let source = DoubanSource::new(reqwest::Client::new(), DoubanConfig::default());
        let raw = json!({
            "title": "小王子",
            "url": "https://book.douban.com/subject/1084336/",
            "type": "book",
            "rating": "9.1",
            "author": "圣埃克苏佩里"
        });
        let record = source.item_record(&raw, Utc::now()).unwrap();
        assert!(record.published_raw.is_none());
        assert!(record.published_at.is_none());
        assert_eq!(record.extra["type"], "book");
    }

    #[test]
    fn test_missing_title_is_a_missing_field_error() {
        let now = Utc::now();
        for source in all_sources() {
            let raw = json!({"url": "https://example.com/item"});
            let err = source.item_record(&raw, now).unwrap_err();
            assert!(
                matches!(err, ScraperError::MissingField(_)),
                "{} returned {:?}",
                source.source_name(),
                err
            );
        }
    }

    #[test]
    fn test_record_serialization_shape() {
        let source = JianshuSource::new(reqwest::Client::new(), JianshuConfig::default());
        let raw = json!({
            "title": "第一篇文章",
            "url": "https://www.jianshu.com/p/abc123",
            "slug": "abc123",
            "time_text": "2024-05-01"
        });
        let record = source.item_record(&raw, at("2024-05-10T00:00:00Z")).unwrap();
        let value = serde_json::to_value(&record).unwrap();

        // Day-precision instants serialize as bare dates
        assert_eq!(value["published_at"], "2024-05-01");
        assert_eq!(value["published_raw"], "2024-05-01");
        assert_eq!(value["formatted_date"], "1周前");
        // Flattened extras sit at the top level
        assert_eq!(value["slug"], "abc123");
    }
}
