// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

// HTTP transport
//
// The query and upload clients talk to the service through `HttpSender` so
// tests can swap the network for in-memory bodies. `ReqwestHttpSender` is
// the production implementation.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{Stream, TryStreamExt};
use reqwest::{Method, StatusCode};
use std::pin::Pin;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Transport types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    /// A single multipart file part.
    File {
        field: String,
        file_name: String,
        content: Bytes,
    },
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,
    /// For a streamed request, bounds connecting and receiving the response
    /// headers; body reads are left to the caller's idle deadline. For a
    /// full-body request, bounds the whole exchange.
    pub timeout_ms: Option<u64>,
    pub stream: bool,
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

pub enum HttpBody {
    Full(Bytes),
    Stream(ByteStream),
}

impl HttpBody {
    /// Buffer the whole body. Used for error payloads.
    pub async fn collect(self) -> Result<Bytes, HttpError> {
        match self {
            HttpBody::Full(bytes) => Ok(bytes),
            HttpBody::Stream(stream) => {
                let chunks: Vec<Bytes> = stream.try_collect().await?;
                Ok(Bytes::from(chunks.concat()))
            }
        }
    }

    /// View the body as a chunk stream.
    pub fn into_stream(self) -> ByteStream {
        match self {
            HttpBody::Full(bytes) => {
                Box::pin(futures_util::stream::iter([Ok::<_, HttpError>(bytes)]))
            }
            HttpBody::Stream(stream) => stream,
        }
    }
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub body: HttpBody,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("request timed out: {0}")]
    Timeout(String),
}

// ---------------------------------------------------------------------------
// Interface
// ---------------------------------------------------------------------------

/// Sends HTTP requests to the text-to-SQL service.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

// ---------------------------------------------------------------------------
// Reqwest HTTP sender
// ---------------------------------------------------------------------------

pub struct ReqwestHttpSender {
    client: reqwest::Client,
}

impl ReqwestHttpSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestHttpSender {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

fn map_reqwest_error(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout(e.to_string())
    } else {
        HttpError::Transport(e.to_string())
    }
}

#[async_trait]
impl HttpSender for ReqwestHttpSender {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut req = self.client.request(request.method, &request.url);

        req = match request.body {
            RequestBody::Json(value) => req.json(&value),
            RequestBody::File {
                field,
                file_name,
                content,
            } => {
                let part = reqwest::multipart::Part::bytes(content.to_vec()).file_name(file_name);
                req.multipart(reqwest::multipart::Form::new().part(field, part))
            }
        };

        let limit = request.timeout_ms.map(Duration::from_millis);
        if !request.stream {
            if let Some(limit) = limit {
                req = req.timeout(limit);
            }
        }

        // reqwest's per-request timeout also covers the body, so a streamed
        // request is bounded only up to its response headers.
        let sent = match limit.filter(|_| request.stream) {
            Some(limit) => tokio::time::timeout(limit, req.send())
                .await
                .map_err(|_| {
                    HttpError::Timeout(format!(
                        "no response headers within {}ms",
                        limit.as_millis()
                    ))
                })?,
            None => req.send().await,
        };
        let resp = sent.map_err(map_reqwest_error)?;
        let status = resp.status();

        if request.stream {
            tracing::debug!(
                %status,
                content_type = ?resp.headers().get(reqwest::header::CONTENT_TYPE),
                "response headers received"
            );
            let stream = resp.bytes_stream().map_err(map_reqwest_error);
            Ok(HttpResponse {
                status,
                body: HttpBody::Stream(Box::pin(stream)),
            })
        } else {
            let body = resp.bytes().await.map_err(map_reqwest_error)?;
            Ok(HttpResponse {
                status,
                body: HttpBody::Full(body),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Error payloads
// ---------------------------------------------------------------------------

/// Extract a human-readable message from a non-2xx response body.
///
/// The service answers request-level failures with `{"detail": ...}`. A
/// string detail is used as-is, any other JSON detail is rendered compactly,
/// a non-JSON body is used verbatim, and an empty body falls back to the
/// status reason.
pub fn error_detail(status: StatusCode, body: &[u8]) -> String {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        match json.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            Some(detail) => return detail.to_string(),
            None => {}
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        text.to_string()
    }
}
