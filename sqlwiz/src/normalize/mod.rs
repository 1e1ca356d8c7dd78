// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

// SQL text normalization
//
// The generator is asked to wrap its answer in a ```sql fence. Display wants
// the bare statement, and it wants it while the buffer is still growing, so
// normalization is a pure function of the whole buffer that only looks at
// its start and end. Re-running it after every append is always safe.

use regex::Regex;
use std::sync::LazyLock;

/// Buffers that start with this token are error messages, not SQL, and are
/// shown verbatim.
pub const ERROR_PREFIX: &str = "ERROR:";

const FENCE: &str = "```";

/// Three backticks, an optional language tag, optional whitespace.
static FENCE_OPENER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[A-Za-z0-9_+\-]*\s*").expect("fence pattern is valid"));

// ---------------------------------------------------------------------------
// Trait: Normalizer
// ---------------------------------------------------------------------------

/// Pure string transform applied to the sql buffer on every change.
pub trait Normalizer: Send + Sync {
    fn normalize(&self, input: &str) -> String;
}

/// Strips one optional code fence around generated SQL.
#[derive(Debug, Default, Clone, Copy)]
pub struct FenceNormalizer;

impl Normalizer for FenceNormalizer {
    fn normalize(&self, input: &str) -> String {
        normalize_sql(input)
    }
}

/// Normalize a (possibly partial) sql buffer for display.
///
/// - Trimmed input starting with [`ERROR_PREFIX`] is returned unchanged.
/// - Otherwise one leading fence opener and one trailing fence closer are
///   stripped, independently, and the rest is trimmed.
/// - Fewer than three backticks never count as a fence.
pub fn normalize_sql(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with(ERROR_PREFIX) {
        return input.to_string();
    }

    let body = match FENCE_OPENER.find(trimmed) {
        Some(opener) => &trimmed[opener.end()..],
        None => trimmed,
    };
    let body = body.strip_suffix(FENCE).unwrap_or(body);
    body.trim().to_string()
}
