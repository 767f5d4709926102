// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Plain HTTP page fetcher

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::error::{GraphmindError, Result};

use super::collaborators::WebFetch;
use super::ensure_http_success;

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .user_agent(concat!("graphmind/", env!("CARGO_PKG_VERSION")))
                .build()?,
        })
    }
}

/// Only absolute http(s) URLs are fetched
fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| GraphmindError::InvalidInput(format!("invalid URL '{}': {}", url, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(GraphmindError::InvalidInput(format!(
            "unsupported URL scheme '{}'",
            other
        ))),
    }
}

#[async_trait]
impl WebFetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let url = parse_url(url)?;
        tracing::debug!(target: "graphmind.tools.fetch", %url, "fetching page");
        let response = ensure_http_success(self.client.get(url).send().await?).await?;
        Ok(response.text().await?)
    }
}
