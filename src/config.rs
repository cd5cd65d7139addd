use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub bilibili: BilibiliConfig,
    #[serde(default)]
    pub douban: DoubanConfig,
    #[serde(default)]
    pub jianshu: JianshuConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BilibiliConfig {
    #[serde(default = "default_bilibili_uid")]
    pub uid: String,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoubanConfig {
    #[serde(default = "default_douban_uid")]
    pub uid: String,
    #[serde(default = "default_douban_nickname")]
    pub nickname: String,
    #[serde(default = "default_douban_per_category")]
    pub items_per_category: usize,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JianshuConfig {
    #[serde(default = "default_jianshu_uid")]
    pub uid: String,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct YoutubeConfig {
    #[serde(default = "default_youtube_handle")]
    pub handle: String,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

fn default_timeout_seconds() -> u64 {
    15
}

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_max_items() -> usize {
    10
}

fn default_bilibili_uid() -> String {
    "472773672".to_string()
}

fn default_douban_uid() -> String {
    "284853052".to_string()
}

fn default_douban_nickname() -> String {
    "Saai".to_string()
}

fn default_douban_per_category() -> usize {
    5
}

fn default_jianshu_uid() -> String {
    "763ffbb1b873".to_string()
}

fn default_youtube_handle() -> String {
    "saai-saai".to_string()
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl Default for BilibiliConfig {
    fn default() -> Self {
        Self {
            uid: default_bilibili_uid(),
            max_items: default_max_items(),
        }
    }
}

impl Default for DoubanConfig {
    fn default() -> Self {
        Self {
            uid: default_douban_uid(),
            nickname: default_douban_nickname(),
            items_per_category: default_douban_per_category(),
            max_items: default_max_items(),
        }
    }
}

impl Default for JianshuConfig {
    fn default() -> Self {
        Self {
            uid: default_jianshu_uid(),
            max_items: default_max_items(),
        }
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            handle: default_youtube_handle(),
            max_items: default_max_items(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            output: OutputConfig::default(),
            bilibili: BilibiliConfig::default(),
            douban: DoubanConfig::default(),
            jianshu: JianshuConfig::default(),
            youtube: YoutubeConfig::default(),
        }
    }
}

impl Config {
    /// Load from `config.toml` (or `PROFILE_SCRAPER_CONFIG` when set)
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PROFILE_SCRAPER_CONFIG")
            .unwrap_or_else(|_| "config.toml".to_string());
        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ScraperError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path, e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }

    /// Load the config file when present, built-in defaults otherwise
    pub fn load_or_default() -> Self {
        let config_path = std::env::var("PROFILE_SCRAPER_CONFIG")
            .unwrap_or_else(|_| "config.toml".to_string());
        if Path::new(&config_path).exists() {
            match Self::load() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(error = %e, "Config file unreadable, using defaults");
                    Config::default()
                }
            }
        } else {
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_known_subjects() {
        let config = Config::default();
        assert_eq!(config.bilibili.uid, "472773672");
        assert_eq!(config.douban.uid, "284853052");
        assert_eq!(config.douban.items_per_category, 5);
        assert_eq!(config.jianshu.uid, "763ffbb1b873");
        assert_eq!(config.youtube.handle, "saai-saai");
        assert_eq!(config.output.dir, "output");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [bilibili]
            uid = "123"

            [output]
            dir = "snapshots"
            "#,
        )
        .unwrap();
        assert_eq!(config.bilibili.uid, "123");
        assert_eq!(config.bilibili.max_items, 10);
        assert_eq!(config.output.dir, "snapshots");
        assert_eq!(config.douban.nickname, "Saai");
    }
}
