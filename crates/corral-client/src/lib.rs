//! corral-client — HTTP client for the orchestrator REST API.
//!
//! Every list endpoint answers with the same envelope,
//! `{"data": [...], "pagination": {"next": "..."}}`, where `next` is a
//! complete URL for the following page. [`Client::get_all`] follows it
//! until exhausted.
//!
//! A failed or undecodable GET is logged and answered with an **empty
//! page** rather than an error: the exporter keeps scraping through
//! partial API outages, and a missing page simply means the affected
//! subtree is not refreshed this cycle.

mod raw;

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub use raw::{RawGenericObject, RawHost, RawInstance, RawProject, RawService, RawStack};
pub use reqwest::StatusCode;

/// Errors surfaced by [`Client`]. GETs swallow these into empty pages;
/// POSTs return them so the caller can decide.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Connection settings for the orchestrator API.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL, e.g. `http://orchestrator:8080/v2-beta`.
    pub base_url: String,
    /// Basic-auth access key.
    pub access_key: String,
    /// Basic-auth secret key.
    pub secret_key: String,
    /// Per-request timeout. `Duration::ZERO` disables the timeout.
    pub timeout: Duration,
}

/// One page of a list response.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub next: Option<String>,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            pagination: None,
        }
    }

    /// The URL of the next page, if the server announced one.
    fn next_url(&self) -> Option<&str> {
        self.pagination
            .as_ref()
            .and_then(|p| p.next.as_deref())
            .filter(|next| !next.is_empty())
    }
}

/// Basic-auth HTTP client for the orchestrator API. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    cfg: ClientConfig,
}

impl Client {
    pub fn new(cfg: ClientConfig) -> Result<Self, ClientError> {
        let mut builder = reqwest::Client::builder();
        if !cfg.timeout.is_zero() {
            builder = builder.timeout(cfg.timeout);
        }
        Ok(Self {
            http: builder.build()?,
            cfg,
        })
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url, path)
    }

    /// GET one page. Any transport or decode failure yields an empty page.
    pub async fn get_page<T: DeserializeOwned>(&self, url: &str) -> Page<T> {
        match self.try_get(url).await {
            Ok(page) => page,
            Err(error) => {
                warn!(%url, %error, "request failed, treating as empty page");
                Page::empty()
            }
        }
    }

    /// GET all pages starting at `url`, following `pagination.next`.
    pub async fn get_all<T: DeserializeOwned>(&self, url: &str) -> Vec<T> {
        let mut items = Vec::new();
        let mut current = url.to_string();
        loop {
            let page: Page<T> = self.get_page(&current).await;
            let next = page.next_url().map(|next| next.to_string());
            items.extend(page.data);
            match next {
                Some(next) => current = next,
                None => break,
            }
        }
        items
    }

    async fn try_get<T: DeserializeOwned>(&self, url: &str) -> Result<Page<T>, ClientError> {
        let response = self
            .http
            .get(url)
            .basic_auth(&self.cfg.access_key, Some(&self.cfg.secret_key))
            .send()
            .await?;
        Ok(response.json().await?)
    }

    /// POST an optional JSON body; the HTTP status is returned verbatim.
    pub async fn post(
        &self,
        url: &str,
        body: Option<String>,
    ) -> Result<StatusCode, ClientError> {
        let mut request = self
            .http
            .post(url)
            .basic_auth(&self.cfg.access_key, Some(&self.cfg.secret_key));
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }
        Ok(request.send().await?.status())
    }
}
