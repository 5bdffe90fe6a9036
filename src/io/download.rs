use crate::types::{DivinerError, DivinerResult};
use reqwest::Url;
use std::path::Path;

/// Fetches a remote file to a local path
pub trait Retriever {
    fn retrieve(&self, url: &Url, dest: &Path) -> DivinerResult<()>;
}

/// Plain HTTP(S) retrieval with a blocking reqwest client
pub struct HttpRetriever {
    client: reqwest::blocking::Client,
}

impl HttpRetriever {
    pub fn new() -> DivinerResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("diviner/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DivinerError::Download(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl Retriever for HttpRetriever {
    fn retrieve(&self, url: &Url, dest: &Path) -> DivinerResult<()> {
        log::info!("Downloading {} to {}", url, dest.display());

        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| DivinerError::Download(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(DivinerError::Download(format!(
                "HTTP {} {}: {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or(""),
                url
            )));
        }

        let content = response
            .bytes()
            .map_err(|e| DivinerError::Download(format!("Failed to read response body: {}", e)))?;
        log::debug!("Downloaded {} bytes", content.len());

        std::fs::write(dest, &content)?;
        Ok(())
    }
}
