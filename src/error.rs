// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for graphmind
//!
//! This module defines all error types used throughout the crate.
//! Protocol and tool failures are usually absorbed close to where they
//! happen; only configuration and transport errors abort a turn.

use thiserror::Error;

/// Main error type for graphmind operations
#[derive(Error, Debug)]
pub enum GraphmindError {
    /// API-related errors (transport failures and non-success HTTP statuses)
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Configuration errors, raised before any network call
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stream frame or tool call that could not be interpreted
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Tool execution errors
    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    /// The user stopped generation
    #[error("Generation cancelled")]
    Cancelled,

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// API-specific error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Authentication failed (invalid API key)
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Endpoint or model does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API
    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u32),

    /// The server failed (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Any other non-success status
    #[error("Request rejected ({status}): {message}")]
    ClientError { status: u16, message: String },

    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid response from API
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Streaming error
    #[error("Streaming error: {0}")]
    StreamError(String),
}

/// Result type alias for graphmind operations
pub type Result<T> = std::result::Result<T, GraphmindError>;

impl ApiError {
    /// Classify a non-success HTTP status.
    ///
    /// `retry_after` is the parsed `Retry-After` header, if any.
    pub fn from_status(status: u16, body: &str, retry_after: Option<u64>) -> Self {
        match status {
            401 | 403 => ApiError::AuthenticationFailed,
            404 => ApiError::NotFound(body.to_string()),
            429 => ApiError::RateLimited(retry_after.unwrap_or(10) as u32),
            s if s >= 500 => ApiError::ServerError {
                status: s,
                message: body.to_string(),
            },
            s => ApiError::ClientError {
                status: s,
                message: body.to_string(),
            },
        }
    }

    /// HTTP status this error was classified from, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AuthenticationFailed => Some(401),
            ApiError::NotFound(_) => Some(404),
            ApiError::RateLimited(_) => Some(429),
            ApiError::ServerError { status, .. } | ApiError::ClientError { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl GraphmindError {
    /// Short plain-language explanation shown to the user.
    pub fn user_message(&self) -> String {
        match self {
            GraphmindError::Api(ApiError::AuthenticationFailed) => {
                "Authentication failed: check the API key".to_string()
            }
            GraphmindError::Api(ApiError::NotFound(_)) => {
                "The API endpoint or model was not found: check the API URL and model name"
                    .to_string()
            }
            GraphmindError::Api(ApiError::RateLimited(secs)) => {
                format!("Too many requests: try again in {} seconds", secs)
            }
            GraphmindError::Api(ApiError::ServerError { status, .. }) => {
                format!("The API server failed (HTTP {}): try again later", status)
            }
            GraphmindError::Api(ApiError::ClientError { status, message }) => {
                format!("The API rejected the request (HTTP {}): {}", status, message)
            }
            GraphmindError::Api(ApiError::Network(msg)) => {
                format!("Could not reach the API: {}", msg)
            }
            GraphmindError::Api(ApiError::StreamError(msg)) => {
                format!("The API reported an error while responding: {}", msg)
            }
            GraphmindError::Http(e) if e.is_timeout() => "The request timed out".to_string(),
            GraphmindError::Http(e) => format!("Could not reach the API: {}", e),
            GraphmindError::Config(msg) => format!("Configuration incomplete: {}", msg),
            GraphmindError::Cancelled => "Generation stopped".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether this represents a user stop rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GraphmindError::Cancelled)
    }
}
