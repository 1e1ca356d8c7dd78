// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

// Incremental demultiplexer
//
// Routes decoded text into the sql / result / error sections while the
// response is still arriving. Markers are searched in the carried-over
// residual plus the new fragment; a trailing piece that could be the start
// of a marker is held back until the next fragment settles it.

use super::types::{DemuxEvent, Marker, ParserState, SectionKind, Sections};

/// Splits one marker-framed response into its sections.
///
/// The demultiplexer never fails: every byte is opaque text and ends up in
/// exactly one section, in the residual, or (for an early error) discarded.
#[derive(Debug)]
pub struct Demultiplexer {
    state: ParserState,
    sections: Sections,
    /// Tail of the last fragment that may be a marker prefix.
    residual: String,
    sql_closed: bool,
    error_opened: bool,
}

impl Default for Demultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Demultiplexer {
    pub fn new() -> Self {
        Self {
            state: ParserState::AwaitingSqlEnd,
            sections: Sections::default(),
            residual: String::new(),
            sql_closed: false,
            error_opened: false,
        }
    }

    pub fn state(&self) -> ParserState {
        self.state
    }

    pub fn sections(&self) -> &Sections {
        &self.sections
    }

    /// Text withheld because it might begin a marker.
    pub fn residual(&self) -> &str {
        &self.residual
    }

    /// Whether `SQL_END` was seen, i.e. the sql section is final.
    pub fn sql_closed(&self) -> bool {
        self.sql_closed
    }

    /// Whether `ERROR_START` was seen.
    pub fn error_opened(&self) -> bool {
        self.error_opened
    }

    /// Consume the next decoded fragment.
    ///
    /// Returns the events produced, in order. Input after `Done` is ignored.
    pub fn feed(&mut self, fragment: &str) -> Vec<DemuxEvent> {
        let mut events = Vec::new();
        if self.state.is_done() {
            tracing::trace!(len = fragment.len(), "input after end of stream ignored");
            return events;
        }

        let mut text = std::mem::take(&mut self.residual);
        text.push_str(fragment);
        let mut rest: &str = &text;

        while let Some((pos, marker)) = find_marker(self.state, rest) {
            let before = &rest[..pos];
            match self.state.section_before(marker) {
                Some(kind) => self.append(kind, before, &mut events),
                None if !before.is_empty() => {
                    tracing::debug!(discarded = before.len(), "partial sql dropped by early error");
                }
                None => {}
            }
            let next = self.state.on_marker(marker);
            self.transition(next, &mut events);
            rest = &rest[pos + marker.literal().len()..];
        }

        let held = held_back_len(rest, self.state.watched_markers());
        let (emit, hold) = rest.split_at(rest.len() - held);
        if let Some(kind) = self.state.open_section() {
            self.append(kind, emit, &mut events);
        }
        self.residual = hold.to_string();

        events
    }

    /// Signal end of stream: flush the residual into the open section and
    /// move to `Done`.
    pub fn finish(&mut self) -> Vec<DemuxEvent> {
        let mut events = Vec::new();
        if self.state.is_done() {
            return events;
        }
        let residual = std::mem::take(&mut self.residual);
        if let Some(kind) = self.state.open_section() {
            self.append(kind, &residual, &mut events);
        }
        self.transition(ParserState::Done, &mut events);
        events
    }

    fn append(&mut self, kind: SectionKind, text: &str, events: &mut Vec<DemuxEvent>) {
        if text.is_empty() {
            return;
        }
        self.sections.push(kind, text);
        events.push(DemuxEvent::Appended(kind));
    }

    fn transition(&mut self, to: ParserState, events: &mut Vec<DemuxEvent>) {
        let from = self.state;
        if from == to {
            return;
        }
        match to {
            ParserState::AwaitingResult => self.sql_closed = true,
            ParserState::InError => self.error_opened = true,
            _ => {}
        }
        self.state = to;
        tracing::trace!(%from, %to, "parser transition");
        events.push(DemuxEvent::Transition { from, to });
    }
}

/// Find the marker that closes the open section.
///
/// While awaiting `SQL_END`, an `SQL_END` anywhere in `text` wins over an
/// `ERROR_START`, even one that occurs earlier in the same text.
fn find_marker(state: ParserState, text: &str) -> Option<(usize, Marker)> {
    state
        .watched_markers()
        .iter()
        .find_map(|&marker| text.find(marker.literal()).map(|pos| (pos, marker)))
}

/// Length of the longest suffix of `text` that is a proper prefix of one of
/// `markers`.
///
/// Markers are ASCII, so the split point is always a char boundary.
fn held_back_len(text: &str, markers: &[Marker]) -> usize {
    markers
        .iter()
        .map(|marker| {
            let literal = marker.literal();
            let longest = (literal.len() - 1).min(text.len());
            (1..=longest)
                .rev()
                .find(|&n| text.ends_with(&literal[..n]))
                .unwrap_or(0)
        })
        .max()
        .unwrap_or(0)
}
