/// Source name constants to ensure consistency across the codebase
/// These constants define the mapping between CLI source names and output files

// Source names (used in CLI and as `source` in run documents)
pub const BILIBILI_SOURCE: &str = "bilibili";
pub const DOUBAN_SOURCE: &str = "douban";
pub const DOUBAN_RSS_SOURCE: &str = "douban_rss";
pub const JIANSHU_SOURCE: &str = "jianshu";
pub const YOUTUBE_SOURCE: &str = "youtube";

// Per-source output file names (fixed, overwritten each run)
pub const BILIBILI_OUTPUT: &str = "bilibili_videos.json";
pub const DOUBAN_OUTPUT: &str = "douban_collections.json";
pub const DOUBAN_RSS_OUTPUT: &str = "douban_rss.json";
pub const JIANSHU_OUTPUT: &str = "jianshu_articles.json";
pub const YOUTUBE_OUTPUT: &str = "youtube_videos.json";

// Browser-like headers shared by every crawler; some hosts serve a
// stripped page (or none at all) to unknown agents
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const ACCEPT_LANGUAGE: &str = "zh-CN,zh;q=0.9,en;q=0.8";

/// Output file name for a source, `{source}.json` for unknown names
pub fn output_file_for_source(source: &str) -> String {
    match source {
        BILIBILI_SOURCE => BILIBILI_OUTPUT.to_string(),
        DOUBAN_SOURCE => DOUBAN_OUTPUT.to_string(),
        DOUBAN_RSS_SOURCE => DOUBAN_RSS_OUTPUT.to_string(),
        JIANSHU_SOURCE => JIANSHU_OUTPUT.to_string(),
        YOUTUBE_SOURCE => YOUTUBE_OUTPUT.to_string(),
        other => format!("{other}.json"),
    }
}

/// Get all supported source names
pub fn get_supported_sources() -> Vec<&'static str> {
    vec![
        BILIBILI_SOURCE,
        DOUBAN_SOURCE,
        DOUBAN_RSS_SOURCE,
        JIANSHU_SOURCE,
        YOUTUBE_SOURCE,
    ]
}
