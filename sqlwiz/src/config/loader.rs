// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

use super::error::ConfigError;
use super::interpolation::resolve_opt;
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate a sqlwiz config from the given source.
///
/// Steps:
/// 1. Read raw YAML from source
/// 2. Parse into raw deserialization types
/// 3. Check the contract version
/// 4. Resolve `${VAR}` references in string fields
/// 5. Fill defaults and validate values
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.sqlwiz != CONFIG_VERSION {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"{CONFIG_VERSION}\"",
            raw.sqlwiz
        )));
    }

    let config = Config {
        version: raw.sqlwiz,
        api: build_api_config(raw.api)?,
        stream: build_stream_config(raw.stream)?,
    };

    tracing::debug!(
        source = %source.describe(),
        base_url = %config.api.base_url,
        idle_timeout_ms = ?config.stream.idle_timeout_ms,
        "config loaded"
    );
    Ok(config)
}

fn build_api_config(raw: Option<raw::RawApiConfig>) -> Result<ApiConfig, ConfigError> {
    let defaults = ApiConfig::default();
    let Some(raw) = raw else {
        return Ok(defaults);
    };

    let base_url = resolve_opt(raw.base_url)?.unwrap_or(defaults.base_url);
    let base_url = base_url.trim().trim_end_matches('/').to_string();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "api.base_url must start with http:// or https://, got \"{base_url}\""
        )));
    }

    let query_path = validate_path(
        "api.query_path",
        resolve_opt(raw.query_path)?.unwrap_or(defaults.query_path),
    )?;
    let upload_path = validate_path(
        "api.upload_path",
        resolve_opt(raw.upload_path)?.unwrap_or(defaults.upload_path),
    )?;

    Ok(ApiConfig {
        base_url,
        query_path,
        upload_path,
        connect_timeout_ms: validate_timeout("api.connect_timeout_ms", raw.connect_timeout_ms)?,
    })
}

fn build_stream_config(raw: Option<raw::RawStreamConfig>) -> Result<StreamConfig, ConfigError> {
    let idle_timeout_ms = match raw {
        Some(raw) => validate_timeout("stream.idle_timeout_ms", raw.idle_timeout_ms)?,
        None => None,
    };
    Ok(StreamConfig { idle_timeout_ms })
}

fn validate_path(field: &str, path: String) -> Result<String, ConfigError> {
    if !path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "{field} must start with '/', got \"{path}\""
        )));
    }
    Ok(path)
}

fn validate_timeout(field: &str, value: Option<u64>) -> Result<Option<u64>, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::Validation(format!(
            "{field} must be greater than 0 (omit it to disable)"
        ))),
        other => Ok(other),
    }
}
