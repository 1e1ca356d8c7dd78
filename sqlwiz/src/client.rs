// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

// Stream lifecycle controller
//
// Responsibilities:
// - Post the natural-language query
// - Reject non-2xx responses with the payload's detail
// - Read the body chunk by chunk: decode, demultiplex, render
// - Map transport errors, stalls and cancellation to a final outcome
// - Keep at most one query in flight per session

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::Method;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Config;
use crate::http::{
    error_detail, ByteStream, HttpError, HttpRequest, HttpSender, ReqwestHttpSender, RequestBody,
};
use crate::normalize::{FenceNormalizer, Normalizer};
use crate::render::{Outcome, PassthroughRenderer, RenderPolicy, ResultRenderer, ViewObserver};
use crate::stream::{Demultiplexer, Utf8Decoder};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a query did not produce a result. Every variant is terminal; nothing
/// is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("query must not be empty")]
    EmptyQuery,

    /// Non-2xx status before any streaming.
    #[error("request rejected (HTTP {status}): {detail}")]
    Request { status: u16, detail: String },

    /// The service sent `ERROR_START` followed by this text.
    #[error("{0}")]
    InStream(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("stream stalled: no data received for {}ms", .0.as_millis())]
    Stalled(Duration),

    #[error("query cancelled")]
    Cancelled,

    /// Stream ended without `SQL_END` and without an error marker.
    #[error("response ended before the generated SQL was complete")]
    Truncated,
}

impl QueryError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::EmptyQuery => "empty_query",
            QueryError::Request { .. } => "request_failed",
            QueryError::InStream(_) => "in_stream_error",
            QueryError::Transport(_) => "transport_error",
            QueryError::Stalled(_) => "stalled",
            QueryError::Cancelled => "cancelled",
            QueryError::Truncated => "truncated",
        }
    }
}

impl From<HttpError> for QueryError {
    fn from(e: HttpError) -> Self {
        QueryError::Transport(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Query client
// ---------------------------------------------------------------------------

/// Runs natural-language queries against the service and streams the
/// framed response into a [`ViewObserver`].
pub struct QueryClient {
    http: Arc<dyn HttpSender>,
    normalizer: Arc<dyn Normalizer>,
    renderer: Arc<dyn ResultRenderer>,
    query_url: String,
    connect_timeout_ms: Option<u64>,
    idle_timeout: Option<Duration>,
}

impl QueryClient {
    pub fn new(http: Arc<dyn HttpSender>, config: &Config) -> Self {
        Self {
            http,
            normalizer: Arc::new(FenceNormalizer),
            renderer: Arc::new(PassthroughRenderer),
            query_url: config.api.query_url(),
            connect_timeout_ms: config.api.connect_timeout_ms,
            idle_timeout: config.stream.idle_timeout(),
        }
    }

    /// Client backed by a fresh `reqwest` connection pool.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(ReqwestHttpSender::default()), config)
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ResultRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Run one query to completion, cancellation or failure.
    ///
    /// Every view update goes to `observer`; the last one is always
    /// `Finished` carrying the returned outcome. Once `cancel` fires, no
    /// further chunk is read or applied.
    pub async fn run(
        &self,
        query: &str,
        observer: &mut dyn ViewObserver,
        cancel: &CancellationToken,
    ) -> Outcome {
        let query_id = Uuid::new_v4();
        let started = Instant::now();
        let policy = RenderPolicy::new(observer, self.normalizer.as_ref(), self.renderer.as_ref());

        let outcome = self.drive(query_id, query, policy, cancel).await;

        match outcome.error() {
            None => tracing::info!(
                %query_id,
                outcome = outcome.label(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "query finished"
            ),
            Some(error) => tracing::warn!(
                %query_id,
                outcome = outcome.label(),
                sql_finalized = outcome.sql().is_some(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                error = %error,
                "query failed"
            ),
        }
        outcome
    }

    async fn drive(
        &self,
        query_id: Uuid,
        query: &str,
        policy: RenderPolicy<'_>,
        cancel: &CancellationToken,
    ) -> Outcome {
        let query = query.trim();
        if query.is_empty() {
            return policy.fail(QueryError::EmptyQuery);
        }

        tracing::info!(
            %query_id,
            url = %self.query_url,
            query = %preview(query),
            "submitting query"
        );

        let request = HttpRequest {
            method: Method::POST,
            url: self.query_url.clone(),
            body: RequestBody::Json(serde_json::json!({ "query": query })),
            timeout_ms: self.connect_timeout_ms,
            stream: true,
        };

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return policy.fail(QueryError::Cancelled),
            response = self.http.send(request) => response,
        };
        let response = match response {
            Ok(r) => r,
            Err(e) => return policy.fail(e.into()),
        };

        if !response.status.is_success() {
            let status = response.status;
            let body = match response.body.collect().await {
                Ok(body) => body,
                Err(e) => return policy.fail(e.into()),
            };
            let detail = error_detail(status, &body);
            tracing::warn!(%query_id, status = status.as_u16(), %detail, "query rejected");
            return policy.fail(QueryError::Request {
                status: status.as_u16(),
                detail,
            });
        }

        tracing::debug!(%query_id, status = response.status.as_u16(), "response stream open");
        self.consume(query_id, response.body.into_stream(), policy, cancel)
            .await
    }

    /// The read loop. The only suspension point is waiting for the next
    /// chunk, and cancellation is checked before every chunk is applied.
    async fn consume(
        &self,
        query_id: Uuid,
        mut body: ByteStream,
        mut policy: RenderPolicy<'_>,
        cancel: &CancellationToken,
    ) -> Outcome {
        let mut decoder = Utf8Decoder::new();
        let mut demux = Demultiplexer::new();
        let mut chunks = 0usize;
        let mut bytes = 0usize;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(%query_id, chunks, bytes, state = %demux.state(), "stream cancelled");
                    return policy.fail(QueryError::Cancelled);
                }
                next = next_chunk(&mut body, self.idle_timeout) => next,
            };

            match next {
                Ok(Some(chunk)) => {
                    chunks += 1;
                    bytes += chunk.len();
                    let before = demux.state();
                    let events = demux.feed(&decoder.decode(&chunk));
                    policy.apply(&demux, &events);
                    if demux.state() != before {
                        tracing::debug!(%query_id, from = %before, to = %demux.state(), "section changed");
                    }
                }
                Ok(None) => break,
                Err(e) => return policy.fail(e),
            }
        }

        let tail = decoder.finish();
        if !tail.is_empty() {
            let events = demux.feed(&tail);
            policy.apply(&demux, &events);
        }
        let events = demux.finish();
        policy.apply(&demux, &events);

        tracing::debug!(%query_id, chunks, bytes, "response stream complete");
        policy.finish(&demux)
    }
}

/// Wait for the next chunk, bounded by the idle deadline when one is set.
async fn next_chunk(
    body: &mut ByteStream,
    idle: Option<Duration>,
) -> Result<Option<Bytes>, QueryError> {
    let item = match idle {
        Some(limit) => tokio::time::timeout(limit, body.next())
            .await
            .map_err(|_| QueryError::Stalled(limit))?,
        None => body.next().await,
    };
    item.transpose().map_err(QueryError::from)
}

/// First 100 characters of the query, for logs.
fn preview(query: &str) -> String {
    const LIMIT: usize = 100;
    match query.char_indices().nth(LIMIT) {
        Some((cut, _)) => format!("{}...", &query[..cut]),
        None => query.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Session: single in-flight query
// ---------------------------------------------------------------------------

/// Owns at most one in-flight query. Submitting a new query cancels the
/// previous one before the new request is sent, so two responses never
/// feed the same view.
pub struct Session {
    client: Arc<QueryClient>,
    in_flight: Mutex<Option<InFlight>>,
    next_id: AtomicU64,
}

struct InFlight {
    id: u64,
    token: CancellationToken,
}

/// Clears the session's slot when its query ends, unless a newer query has
/// already taken it. Runs on drop so an abandoned `submit` future clears it
/// too.
struct InFlightGuard<'a> {
    session: &'a Session,
    id: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.session.lock_slot();
        if slot.as_ref().is_some_and(|current| current.id == self.id) {
            *slot = None;
        }
    }
}

impl Session {
    pub fn new(client: Arc<QueryClient>) -> Self {
        Self {
            client,
            in_flight: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<InFlight>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cancel whatever is in flight and register a token for the next query.
    fn begin(&self) -> (InFlightGuard<'_>, CancellationToken) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        let previous = self.lock_slot().replace(InFlight {
            id,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            if !previous.token.is_cancelled() {
                tracing::info!("cancelling previous in-flight query");
                previous.token.cancel();
            }
        }
        (InFlightGuard { session: self, id }, token)
    }

    /// Whether a query is currently running.
    pub fn is_busy(&self) -> bool {
        self.lock_slot().is_some()
    }

    /// Cancel the in-flight query, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.lock_slot().take() {
            previous.token.cancel();
        }
    }

    pub async fn submit(&self, query: &str, observer: &mut dyn ViewObserver) -> Outcome {
        let (_guard, token) = self.begin();
        self.client.run(query, observer, &token).await
    }
}
