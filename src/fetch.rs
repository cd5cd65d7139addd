use crate::constants::{ACCEPT_LANGUAGE, USER_AGENT};
use crate::error::{Result, ScraperError};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE as ACCEPT_LANGUAGE_HEADER, REFERER};
use std::time::Duration;
use tracing::debug;

/// Build the HTTP client shared by all sources. Browser-like defaults;
/// several of the scraped hosts refuse or strip pages for unknown agents.
pub fn build_client(timeout_seconds: u64) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE_HEADER, HeaderValue::from_static(ACCEPT_LANGUAGE));

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(Duration::from_secs(timeout_seconds))
        .gzip(true)
        .build()?;
    Ok(client)
}

/// GET a page/feed body as text, failing on non-2xx statuses.
pub async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
    referer: Option<&str>,
) -> Result<String> {
    debug!("GET {}", url);
    let mut request = client.get(url);
    if let Some(referer) = referer {
        request = request.header(REFERER, referer);
    }
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::Source {
            message: format!("GET {url} returned {status}"),
        });
    }
    Ok(response.text().await?)
}

/// GET a JSON endpoint and deserialize the body.
pub async fn fetch_json(
    client: &reqwest::Client,
    url: &str,
    referer: Option<&str>,
) -> Result<serde_json::Value> {
    let body = fetch_text(client, url, referer).await?;
    Ok(serde_json::from_str(&body)?)
}
