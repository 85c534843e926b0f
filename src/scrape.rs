use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::input::{InputPart, MAX_TEXT_CHARS};

/// Total budget for the page fetch, connect included
pub const SCRAPE_TIMEOUT_SECS: u64 = 10;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const CONTENT_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p";

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Could not reach {url}: {source}")]
    Unreachable { url: String, source: reqwest::Error },

    #[error("Request to {url} returned HTTP {status}")]
    NonSuccessStatus { url: String, status: u16 },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Visible text pulled from a fetched page
#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub url: String,
    pub text: String,
}

impl ScrapedPage {
    pub fn into_part(self) -> InputPart {
        InputPart::text(self.text)
    }
}

/// Fetches pages with a browser-like identity and reduces them to visible text
#[derive(Debug, Clone)]
pub struct ScrapeClient {
    client: Client,
}

impl ScrapeClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .use_rustls_tls()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(SCRAPE_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(SCRAPE_TIMEOUT_SECS))
            .build()
            .map_err(ScrapeError::NetworkError)?;

        Ok(Self { client })
    }

    /// Fetch a page and reduce it to heading and paragraph text
    pub async fn fetch(&self, url: &str) -> Result<ScrapedPage> {
        let url = normalize_url(url);

        debug!("Fetching {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::NonSuccessStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&url, e))?;
        let text = extract_visible_text(&body);

        info!("Scraped {} characters from {}", text.chars().count(), url);

        Ok(ScrapedPage { url, text })
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> ScrapeError {
    if err.is_timeout() {
        ScrapeError::Timeout(SCRAPE_TIMEOUT_SECS)
    } else {
        ScrapeError::Unreachable {
            url: url.to_string(),
            source: err,
        }
    }
}

/// Prefix bare hostnames with https; anything already carrying a scheme passes through
pub fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// Visible text of heading and paragraph elements, single-space separated,
/// capped at MAX_TEXT_CHARS characters
fn extract_visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let selector = match Selector::parse(CONTENT_SELECTOR) {
        Ok(selector) => selector,
        Err(e) => {
            warn!("Failed to parse content selector: {}", e);
            return String::new();
        }
    };

    let mut pieces = Vec::new();
    for element in document.select(&selector) {
        for text in element.text() {
            let text = text.trim();
            if !text.is_empty() {
                pieces.push(text.to_string());
            }
        }
    }

    let combined = pieces.join(" ");
    let normalized = combined.split_whitespace().collect::<Vec<&str>>().join(" ");
    normalized.chars().take(MAX_TEXT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_normalize_url_adds_scheme() {
        assert_eq!(normalize_url("example.com"), "https://example.com");
        assert_eq!(
            normalize_url("example.com/pricing"),
            "https://example.com/pricing"
        );
    }

    #[test]
    fn test_normalize_url_keeps_existing_scheme() {
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
    }

    #[test]
    fn test_normalize_url_trims_whitespace() {
        assert_eq!(normalize_url("  example.com  "), "https://example.com");
    }

    #[test]
    fn test_extract_visible_text_keeps_headings_and_paragraphs() {
        let html = r#"<html><body>
            <h1>Acme Plumbing</h1>
            <p>Serving the metro area since 1985.</p>
            <h2>Services</h2>
            <p>Drain cleaning and repairs.</p>
        </body></html>"#;

        let text = extract_visible_text(html);
        assert_eq!(
            text,
            "Acme Plumbing Serving the metro area since 1985. Services Drain cleaning and repairs."
        );
    }

    #[test]
    fn test_extract_visible_text_drops_scripts_and_chrome() {
        let html = r#"<html><head>
            <style>body { color: red; }</style>
            <script>var tracking = "secret";</script>
        </head><body>
            <div>navigation link soup</div>
            <p>Real content.</p>
        </body></html>"#;

        let text = extract_visible_text(html);
        assert_eq!(text, "Real content.");
    }

    #[test]
    fn test_extract_visible_text_collapses_whitespace() {
        let html = "<p>Hello\n\n   spaced    <b>world</b></p>";
        let text = extract_visible_text(html);
        assert_eq!(text, "Hello spaced world");
    }

    #[test]
    fn test_extract_visible_text_respects_char_budget() {
        let paragraph = "word ".repeat(2000);
        let html = format!("<p>{}</p>", paragraph);

        let text = extract_visible_text(&html);
        assert!(text.chars().count() <= MAX_TEXT_CHARS);
        assert_eq!(text.chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn test_non_success_status_names_url_and_code() {
        let err = ScrapeError::NonSuccessStatus {
            url: "https://example.com".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "Request to https://example.com returned HTTP 404"
        );
    }

    #[tokio::test]
    async fn test_fetch_maps_non_success_status() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n")
                .await
                .unwrap();
        });

        let client = ScrapeClient::new().unwrap();
        let result = client.fetch(&format!("http://{}", addr)).await;

        match result {
            Err(ScrapeError::NonSuccessStatus { status, .. }) => assert_eq!(status, 404),
            other => panic!("Expected NonSuccessStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_times_out_within_bound() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            // Hold the connection open without ever answering
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(SCRAPE_TIMEOUT_SECS + 30)).await;
        });

        let client = ScrapeClient::new().unwrap();
        let started = std::time::Instant::now();
        let result = client.fetch(&format!("http://{}", addr)).await;

        assert!(matches!(
            result,
            Err(ScrapeError::Timeout(SCRAPE_TIMEOUT_SECS))
        ));
        assert!(started.elapsed() < Duration::from_secs(SCRAPE_TIMEOUT_SECS + 5));
    }

    #[test]
    fn test_scraped_page_into_part() {
        let page = ScrapedPage {
            url: "https://example.com".to_string(),
            text: "About us".to_string(),
        };
        match page.into_part() {
            InputPart::Text(text) => assert_eq!(text, "About us"),
            InputPart::Image(_) => panic!("Expected text part"),
        }
    }
}
