use std::time::Instant;

use anyhow::{Context, Result};
use tracing::info;

use crate::db::PageRow;

pub const CATEGORY_URL: &str = "https://www.bg-wiki.com/ffxi/Category:Trust";

// The wiki rejects requests without a browser-ish User-Agent.
const USER_AGENT: &str = "Mozilla/5.0 (compatible; trust_scraper/0.1)";

/// Download the Category:Trust page. Fetch failures are recorded on the row
/// rather than bubbled, so the attempt still lands in the pages table.
pub async fn fetch_category_page() -> Result<PageRow> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")?;

    info!("Fetching {}", CATEGORY_URL);
    let start = Instant::now();
    let response = client.get(CATEGORY_URL).send().await;
    let elapsed = start.elapsed().as_millis() as i64;

    match response {
        Ok(resp) => {
            let status = resp.status().as_u16() as i32;
            if !resp.status().is_success() {
                return Ok(PageRow {
                    url: CATEGORY_URL.to_string(),
                    html: None,
                    status: Some(status),
                    error: Some(format!("HTTP {}", status)),
                    latency_ms: Some(elapsed),
                });
            }
            let html = resp.text().await.context("Failed to read response body")?;
            info!("Fetched {} bytes in {}ms", html.len(), elapsed);
            Ok(PageRow {
                url: CATEGORY_URL.to_string(),
                html: Some(html),
                status: Some(status),
                error: None,
                latency_ms: Some(elapsed),
            })
        }
        Err(e) => Ok(PageRow {
            url: CATEGORY_URL.to_string(),
            html: None,
            status: None,
            error: Some(e.to_string()),
            latency_ms: Some(elapsed),
        }),
    }
}
