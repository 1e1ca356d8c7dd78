// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::error::ConfigError;

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("variable pattern is valid")
});

/// Substitute `${NAME}` references from the environment.
///
/// Text that does not form a valid reference (`${`, `${}`, `${1X}`) is kept
/// literally. A well-formed reference to an unset variable is an error.
pub fn resolve_variables(input: &str) -> Result<String, ConfigError> {
    if !input.contains("${") {
        return Ok(input.to_string());
    }

    let mut missing = None;
    let resolved = VARIABLE.replace_all(input, |caps: &Captures| {
        let name = &caps[1];
        match std::env::var(name) {
            Ok(value) => value,
            Err(_) => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    match missing {
        Some(name) => Err(ConfigError::UndefinedVariable { name }),
        None => Ok(resolved.into_owned()),
    }
}

/// Resolve an optional string field.
pub fn resolve_opt(input: Option<String>) -> Result<Option<String>, ConfigError> {
    input.map(|s| resolve_variables(&s)).transpose()
}
