// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

// Stream types
//
// Framing markers, sections, parser states and the events the
// demultiplexer reports for every fragment it consumes.

use std::fmt;

// ---------------------------------------------------------------------------
// Framing markers
// ---------------------------------------------------------------------------

/// Ends the generated SQL. The result section starts right after it.
pub const SQL_END: &str = "--SQL-END--";

/// Opens the error section. Valid before `SQL_END` (generation failed) or
/// after it (execution failed while results were streaming).
pub const ERROR_START: &str = "--ERROR--";

/// An in-band sentinel. Marker text is always structural, never content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    SqlEnd,
    ErrorStart,
}

impl Marker {
    pub const fn literal(self) -> &'static str {
        match self {
            Marker::SqlEnd => SQL_END,
            Marker::ErrorStart => ERROR_START,
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// One of the three logical regions of a response stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Sql,
    Result,
    Error,
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SectionKind::Sql => "sql",
            SectionKind::Result => "result",
            SectionKind::Error => "error",
        };
        f.write_str(name)
    }
}

/// Append-only section buffers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sections {
    pub sql: String,
    pub result: String,
    pub error: String,
}

impl Sections {
    pub(crate) fn push(&mut self, kind: SectionKind, text: &str) {
        let buffer = match kind {
            SectionKind::Sql => &mut self.sql,
            SectionKind::Result => &mut self.result,
            SectionKind::Error => &mut self.error,
        };
        buffer.push_str(text);
    }
}

// ---------------------------------------------------------------------------
// Parser state machine
// ---------------------------------------------------------------------------

/// Which section is live, and which markers can still end it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Initial state. The sql section is open.
    AwaitingSqlEnd,
    /// `SQL_END` seen. The result section is open.
    AwaitingResult,
    /// `ERROR_START` seen. Everything that follows is error text.
    InError,
    /// Stream ended. Terminal.
    Done,
}

impl ParserState {
    /// The section that receives plain text in this state.
    pub fn open_section(self) -> Option<SectionKind> {
        match self {
            ParserState::AwaitingSqlEnd => Some(SectionKind::Sql),
            ParserState::AwaitingResult => Some(SectionKind::Result),
            ParserState::InError => Some(SectionKind::Error),
            ParserState::Done => None,
        }
    }

    /// Markers still recognized in this state, highest priority first.
    pub fn watched_markers(self) -> &'static [Marker] {
        match self {
            ParserState::AwaitingSqlEnd => &[Marker::SqlEnd, Marker::ErrorStart],
            ParserState::AwaitingResult => &[Marker::ErrorStart],
            ParserState::InError | ParserState::Done => &[],
        }
    }

    /// Transition taken when `marker` is found in this state.
    pub fn on_marker(self, marker: Marker) -> ParserState {
        match (self, marker) {
            (ParserState::AwaitingSqlEnd, Marker::SqlEnd) => ParserState::AwaitingResult,
            (ParserState::AwaitingSqlEnd | ParserState::AwaitingResult, Marker::ErrorStart) => {
                ParserState::InError
            }
            (state, _) => state,
        }
    }

    /// Where the text in front of `marker` goes. `None` discards it: an
    /// early error drops whatever partial SQL shared its fragment.
    pub fn section_before(self, marker: Marker) -> Option<SectionKind> {
        match (self, marker) {
            (ParserState::AwaitingSqlEnd, Marker::SqlEnd) => Some(SectionKind::Sql),
            (ParserState::AwaitingResult, Marker::ErrorStart) => Some(SectionKind::Result),
            _ => None,
        }
    }

    pub fn is_done(self) -> bool {
        self == ParserState::Done
    }
}

impl fmt::Display for ParserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParserState::AwaitingSqlEnd => "awaiting_sql_end",
            ParserState::AwaitingResult => "awaiting_result",
            ParserState::InError => "in_error",
            ParserState::Done => "done",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Something the demultiplexer did while consuming a fragment.
///
/// Events are reported in the order they happened; buffers are already
/// updated by the time the caller sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxEvent {
    /// Non-empty text was appended to a section.
    Appended(SectionKind),
    /// The parser changed state.
    Transition { from: ParserState, to: ParserState },
}
