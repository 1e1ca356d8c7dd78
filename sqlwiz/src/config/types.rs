// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

pub const CONFIG_VERSION: &str = "v1";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_QUERY_PATH: &str = "/api/query";
pub const DEFAULT_UPLOAD_PATH: &str = "/api/upload";

/// Parsed and validated sqlwiz config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Contract version. Always "v1".
    pub version: String,
    pub api: ApiConfig,
    pub stream: StreamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION.to_string(),
            api: ApiConfig::default(),
            stream: StreamConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Service endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Scheme and authority, no trailing slash.
    pub base_url: String,
    pub query_path: String,
    pub upload_path: String,
    /// For queries, bounds connecting and receiving the response headers;
    /// the streamed body is governed by `stream.idle_timeout_ms`. For
    /// uploads, bounds the whole request including the reply body.
    pub connect_timeout_ms: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            query_path: DEFAULT_QUERY_PATH.to_string(),
            upload_path: DEFAULT_UPLOAD_PATH.to_string(),
            connect_timeout_ms: None,
        }
    }
}

impl ApiConfig {
    pub fn query_url(&self) -> String {
        join_url(&self.base_url, &self.query_path)
    }

    pub fn upload_url(&self) -> String {
        join_url(&self.base_url, &self.upload_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamConfig {
    /// Longest gap between body chunks before the query fails as stalled.
    /// `None` waits indefinitely.
    pub idle_timeout_ms: Option<u64>,
}

impl StreamConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }
}
