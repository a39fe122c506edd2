//! Download of a ridership CSV published over HTTP.
//!
//! The bytes are handed to the loader unchanged; decoding and parsing happen
//! there exactly as for a local file.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Result, bail};
use tracing::debug;

/// Returns `true` when `source` should be fetched instead of read from disk.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    if !status.is_success() {
        bail!("GET {url} returned status {status}");
    }

    let bytes = resp.bytes().await?.to_vec();
    debug!(url, bytes = bytes.len(), "Source downloaded");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.org/data.csv"));
        assert!(is_remote("http://localhost/data.csv"));
        assert!(!is_remote("지하철데이터.csv"));
        assert!(!is_remote("/mnt/data/http.csv"));
    }
}
