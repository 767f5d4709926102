// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Response};

use crate::error::{ApiError, GraphmindError, Result};

/// Build the HTTP client used by a driver.
pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

/// Parse numeric Retry-After header (seconds).
pub(crate) fn parse_retry_after_seconds(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}

/// Pull `error.message` (or a top-level `message`) out of a JSON error
/// body, falling back to the raw body.
pub(crate) fn error_message_from_body(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.trim().to_string();
    };
    value["error"]["message"]
        .as_str()
        .or_else(|| value["message"].as_str())
        .or_else(|| value["error"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Classify a non-success response by status code.
pub(crate) fn classify(status: u16, body: &str, retry_after: Option<u64>) -> GraphmindError {
    GraphmindError::Api(ApiError::from_status(
        status,
        &error_message_from_body(body),
        retry_after,
    ))
}

/// Map a failed `send()` to a network error.
pub(crate) fn network_error(err: reqwest::Error) -> GraphmindError {
    if err.is_timeout() {
        return GraphmindError::Api(ApiError::Network("request timed out".to_string()));
    }
    GraphmindError::Api(ApiError::Network(err.to_string()))
}

/// Pass successful responses through; turn the rest into an error using
/// `parse_error`.
pub(crate) async fn ensure_success(
    response: Response,
    parse_error: impl Fn(u16, &str, Option<u64>) -> GraphmindError,
) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    // Extract Retry-After header before consuming response body
    let retry_after = parse_retry_after_seconds(response.headers());
    let body = response.text().await.unwrap_or_default();
    Err(parse_error(status, &body, retry_after))
}
