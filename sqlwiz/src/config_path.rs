// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

// Config file resolution for the `sqlwiz` binary.
//
// Resolution order:
//   1. `--config <path>`
//   2. `$SQLWIZ_CONFIG` environment variable
//   3. `~/.sqlwiz/sqlwiz.yaml` (platform default)
//
// An explicit path must exist. A missing default file means built-in
// defaults.

use std::path::PathBuf;

use crate::config::{load_config, Config, ConfigError, FileSource};

pub const CONFIG_ENV: &str = "SQLWIZ_CONFIG";

/// Where the config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    Flag(PathBuf),
    Env(PathBuf),
    Default(PathBuf),
}

impl ConfigLocation {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigLocation::Flag(p) | ConfigLocation::Env(p) | ConfigLocation::Default(p) => p,
        }
    }

    fn is_explicit(&self) -> bool {
        !matches!(self, ConfigLocation::Default(_))
    }
}

/// Resolve which config file to read.
///
/// Returns `None` only if no home directory can be determined and neither
/// override is set.
pub fn resolve_config_path(cli_path: Option<&str>) -> Option<ConfigLocation> {
    if let Some(path) = cli_path {
        return Some(ConfigLocation::Flag(PathBuf::from(path)));
    }

    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(ConfigLocation::Env(PathBuf::from(path)));
        }
    }

    dirs::home_dir().map(|h| ConfigLocation::Default(h.join(".sqlwiz").join("sqlwiz.yaml")))
}

/// Resolve and load the config the binary should use.
pub fn load_resolved(cli_path: Option<&str>) -> Result<Config, ConfigError> {
    let Some(location) = resolve_config_path(cli_path) else {
        tracing::debug!("no home directory; using built-in config defaults");
        return Ok(Config::default());
    };

    if !location.is_explicit() && !location.path().exists() {
        tracing::debug!(path = %location.path().display(), "no config file; using defaults");
        return Ok(Config::default());
    }

    load_config(&FileSource {
        path: location.path().clone(),
    })
}
