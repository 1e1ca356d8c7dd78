// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML shape. Everything optional except the version so a minimal file
// is just `sqlwiz: v1`; defaults and validation happen in the loader.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub sqlwiz: String,
    pub api: Option<RawApiConfig>,
    pub stream: Option<RawStreamConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawApiConfig {
    pub base_url: Option<String>,
    pub query_path: Option<String>,
    pub upload_path: Option<String>,
    pub connect_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStreamConfig {
    pub idle_timeout_ms: Option<u64>,
}
