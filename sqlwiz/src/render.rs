// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

// Partial render policy
//
// Turns demultiplexer events into view updates for whatever is presenting
// the query: the SQL view appears as soon as there is SQL and is frozen at
// `SQL_END`; the result and error views appear as soon as they have text;
// at the end exactly one outcome is authoritative.

use crate::client::QueryError;
use crate::normalize::Normalizer;
use crate::stream::{DemuxEvent, Demultiplexer, ParserState, SectionKind};

// ---------------------------------------------------------------------------
// View model
// ---------------------------------------------------------------------------

/// A change the presentation layer should apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewUpdate {
    /// SQL view visible with this (normalized, possibly partial) text.
    Sql(String),
    /// SQL view frozen with its final text.
    SqlFinalized(String),
    /// Result view shows the result text received so far.
    Result(String),
    /// Error view shows the error text received so far.
    Error(String),
    /// A partial SQL view that never finalized must be hidden.
    SqlSuppressed,
    /// Result content is discarded in favor of an error.
    ResultSuppressed,
    /// Terminal outcome. No updates follow.
    Finished(Outcome),
}

/// How a query ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// SQL ran and returned content, already passed through the renderer.
    Rows { sql: String, result: String },
    /// SQL ran and returned nothing.
    EmptyResult { sql: String },
    /// Anything else. `sql` is kept only if it was finalized before the
    /// failure.
    Failed {
        sql: Option<String>,
        error: QueryError,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Outcome::Failed { .. })
    }

    pub fn sql(&self) -> Option<&str> {
        match self {
            Outcome::Rows { sql, .. } | Outcome::EmptyResult { sql } => Some(sql),
            Outcome::Failed { sql, .. } => sql.as_deref(),
        }
    }

    pub fn error(&self) -> Option<&QueryError> {
        match self {
            Outcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Short label for structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Rows { .. } => "rows",
            Outcome::EmptyResult { .. } => "empty_result",
            Outcome::Failed { error, .. } => error.kind(),
        }
    }
}

// ---------------------------------------------------------------------------
// Interfaces
// ---------------------------------------------------------------------------

/// Receives view updates. The demultiplexer knows nothing about this.
pub trait ViewObserver: Send {
    fn on_update(&mut self, update: &ViewUpdate);
}

/// Collects every update; handy for tests and batch callers.
impl ViewObserver for Vec<ViewUpdate> {
    fn on_update(&mut self, update: &ViewUpdate) {
        self.push(update.clone());
    }
}

/// Turns the finalized result text into its display form. Called once per
/// query, only when there is a result to show.
pub trait ResultRenderer: Send + Sync {
    fn render(&self, result: &str) -> String;
}

/// Shows result text as received.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughRenderer;

impl ResultRenderer for PassthroughRenderer {
    fn render(&self, result: &str) -> String {
        result.to_string()
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

const EMPTY_ERROR_MESSAGE: &str = "the service reported an error without details";

/// Per-query render state. Consumed by [`RenderPolicy::finish`] or
/// [`RenderPolicy::fail`], so nothing can be emitted after the outcome.
pub struct RenderPolicy<'a> {
    observer: &'a mut dyn ViewObserver,
    normalizer: &'a dyn Normalizer,
    renderer: &'a dyn ResultRenderer,
    sql_view: Option<String>,
    sql_final: Option<String>,
    result_visible: bool,
}

impl<'a> RenderPolicy<'a> {
    pub fn new(
        observer: &'a mut dyn ViewObserver,
        normalizer: &'a dyn Normalizer,
        renderer: &'a dyn ResultRenderer,
    ) -> Self {
        Self {
            observer,
            normalizer,
            renderer,
            sql_view: None,
            sql_final: None,
            result_visible: false,
        }
    }

    /// React to the events of one `feed`/`finish` call.
    pub fn apply(&mut self, demux: &Demultiplexer, events: &[DemuxEvent]) {
        let sections = demux.sections();
        for event in events {
            match *event {
                DemuxEvent::Appended(SectionKind::Sql) => self.show_sql(&sections.sql),
                DemuxEvent::Appended(SectionKind::Result) => {
                    self.result_visible = true;
                    self.emit(ViewUpdate::Result(sections.result.clone()));
                }
                DemuxEvent::Appended(SectionKind::Error) => {
                    self.emit(ViewUpdate::Error(sections.error.clone()));
                }
                DemuxEvent::Transition {
                    to: ParserState::AwaitingResult,
                    ..
                } => self.finalize_sql(&sections.sql),
                DemuxEvent::Transition { .. } => {}
            }
        }
    }

    /// Settle the outcome of a stream that reached its end.
    pub fn finish(mut self, demux: &Demultiplexer) -> Outcome {
        let sections = demux.sections();
        let outcome = if demux.error_opened() {
            let message = sections.error.trim();
            let message = if message.is_empty() {
                EMPTY_ERROR_MESSAGE
            } else {
                message
            };
            Outcome::Failed {
                sql: self.sql_final.clone(),
                error: QueryError::InStream(message.to_string()),
            }
        } else if let Some(sql) = self.sql_final.clone() {
            if sections.result.trim().is_empty() {
                Outcome::EmptyResult { sql }
            } else {
                Outcome::Rows {
                    sql,
                    result: self.renderer.render(&sections.result),
                }
            }
        } else {
            Outcome::Failed {
                sql: None,
                error: QueryError::Truncated,
            }
        };
        self.conclude(outcome)
    }

    /// Settle the outcome of a query that could not run to the end of its
    /// stream: transport failure, stall, cancellation, rejected request.
    pub fn fail(mut self, error: QueryError) -> Outcome {
        let outcome = Outcome::Failed {
            sql: self.sql_final.clone(),
            error,
        };
        self.conclude(outcome)
    }

    fn show_sql(&mut self, raw: &str) {
        if self.sql_final.is_some() || raw.is_empty() {
            return;
        }
        let normalized = self.normalizer.normalize(raw);
        if self.sql_view.as_deref() == Some(normalized.as_str()) {
            return;
        }
        self.sql_view = Some(normalized.clone());
        self.emit(ViewUpdate::Sql(normalized));
    }

    fn finalize_sql(&mut self, raw: &str) {
        let normalized = self.normalizer.normalize(raw);
        self.sql_view = Some(normalized.clone());
        self.sql_final = Some(normalized.clone());
        self.emit(ViewUpdate::SqlFinalized(normalized));
    }

    fn conclude(&mut self, outcome: Outcome) -> Outcome {
        if !outcome.is_success() {
            if self.sql_final.is_none() && self.sql_view.is_some() {
                self.emit(ViewUpdate::SqlSuppressed);
            }
            if self.result_visible {
                self.emit(ViewUpdate::ResultSuppressed);
            }
        }
        self.emit(ViewUpdate::Finished(outcome.clone()));
        outcome
    }

    fn emit(&mut self, update: ViewUpdate) {
        self.observer.on_update(&update);
    }
}
