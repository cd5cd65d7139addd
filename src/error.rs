use thiserror::Error;

/// Crate-wide error type; fetch, decode, and extraction failures all
/// funnel through here.
#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Feed decode failed: {0}")]
    Feed(#[from] quick_xml::DeError),

    #[error("Config parse failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("File I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad configuration: {0}")]
    Config(String),

    #[error("Required field missing: {0}")]
    MissingField(String),

    #[error("Source failed: {message}")]
    Source { message: String },

    #[error("Missing environment variable: {0}")]
    Env(#[from] std::env::VarError),
}

pub type Result<T> = std::result::Result<T, ScraperError>;
