// Copyright 2026 The Sqlwiz Project
// SPDX-License-Identifier: Apache-2.0

// Document upload
//
// Sends one schema or reference document to the service's retrieval index.
// Type and emptiness are checked locally so obviously bad files never leave
// the machine; the service repeats both checks.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::Method;
use serde::Deserialize;

use crate::config::Config;
use crate::http::{error_detail, HttpError, HttpRequest, HttpSender, ReqwestHttpSender, RequestBody};

/// Lowercase extensions the service can ingest.
pub const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "txt", "docx"];

/// Multipart field the service reads the document from.
const FILE_FIELD: &str = "file";

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("unsupported file type \"{extension}\" (allowed: .pdf, .txt, .docx)")]
    UnsupportedType { extension: String },

    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("{path} is empty")]
    EmptyFile { path: String },

    #[error("upload rejected (HTTP {status}): {detail}")]
    Request { status: u16, detail: String },

    #[error("transport error: {0}")]
    Transport(#[from] HttpError),

    #[error("unexpected upload response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    chunks_added: usize,
}

/// Check that `path` has an allowed extension, case-insensitively.
pub fn check_extension(path: &Path) -> Result<(), UploadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(())
    } else {
        Err(UploadError::UnsupportedType { extension })
    }
}

pub struct UploadClient {
    http: Arc<dyn HttpSender>,
    upload_url: String,
    timeout_ms: Option<u64>,
}

impl UploadClient {
    pub fn new(http: Arc<dyn HttpSender>, config: &Config) -> Self {
        Self {
            http,
            upload_url: config.api.upload_url(),
            timeout_ms: config.api.connect_timeout_ms,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(ReqwestHttpSender::default()), config)
    }

    /// Upload one document. Returns how many chunks the service indexed.
    pub async fn upload(&self, path: &Path) -> Result<usize, UploadError> {
        check_extension(path)?;

        let display = path.display().to_string();
        let content = tokio::fs::read(path).await.map_err(|source| UploadError::Read {
            path: display.clone(),
            source,
        })?;
        if content.is_empty() {
            return Err(UploadError::EmptyFile { path: display });
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| display.clone());
        tracing::info!(file = %file_name, bytes = content.len(), url = %self.upload_url, "uploading document");

        let response = self
            .http
            .send(HttpRequest {
                method: Method::POST,
                url: self.upload_url.clone(),
                body: RequestBody::File {
                    field: FILE_FIELD.to_string(),
                    file_name: file_name.clone(),
                    content: Bytes::from(content),
                },
                timeout_ms: self.timeout_ms,
                stream: false,
            })
            .await?;

        let status = response.status;
        let body = response.body.collect().await?;
        if !status.is_success() {
            let detail = error_detail(status, &body);
            tracing::warn!(file = %file_name, status = status.as_u16(), %detail, "upload rejected");
            return Err(UploadError::Request {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: UploadResponse = serde_json::from_slice(&body)
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
        tracing::info!(file = %file_name, chunks_added = parsed.chunks_added, "document indexed");
        Ok(parsed.chunks_added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpBody, HttpResponse};
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::io::Write;
    use std::sync::Mutex;

    struct FixedSender {
        status: StatusCode,
        body: &'static str,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl FixedSender {
        fn new(status: StatusCode, body: &'static str) -> Arc<Self> {
            Arc::new(Self {
                status,
                body,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HttpSender for FixedSender {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
            self.seen.lock().unwrap().push(request);
            Ok(HttpResponse {
                status: self.status,
                body: HttpBody::Full(Bytes::from_static(self.body.as_bytes())),
            })
        }
    }

    fn temp_file(suffix: &str, content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[test]
    fn extension_check_is_case_insensitive() {
        assert!(check_extension(Path::new("schema.PDF")).is_ok());
        assert!(check_extension(Path::new("notes.txt")).is_ok());
        assert!(check_extension(Path::new("a/b/model.docx")).is_ok());
    }

    #[test]
    fn other_extensions_rejected() {
        match check_extension(Path::new("dump.sql")) {
            Err(UploadError::UnsupportedType { extension }) => assert_eq!(extension, "sql"),
            other => panic!("expected UnsupportedType, got {other:?}"),
        }
        assert!(check_extension(Path::new("README")).is_err());
    }

    #[tokio::test]
    async fn upload_sends_multipart_file_and_returns_chunk_count() {
        let sender = FixedSender::new(StatusCode::OK, r#"{"chunks_added": 7}"#);
        let file = temp_file(".txt", b"CREATE TABLE users (id int);");
        let client = UploadClient::new(sender.clone(), &Config::default());

        let chunks = client.upload(file.path()).await.unwrap();
        assert_eq!(chunks, 7);

        let seen = sender.seen.lock().unwrap();
        assert_eq!(seen[0].url, "http://localhost:8000/api/upload");
        assert!(!seen[0].stream);
        match &seen[0].body {
            RequestBody::File {
                field,
                file_name,
                content,
            } => {
                assert_eq!(field, "file");
                assert!(file_name.ends_with(".txt"));
                assert_eq!(&content[..], b"CREATE TABLE users (id int);");
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsupported_file_never_sent() {
        let sender = FixedSender::new(StatusCode::OK, r#"{"chunks_added": 1}"#);
        let file = temp_file(".csv", b"a,b");
        let client = UploadClient::new(sender.clone(), &Config::default());

        let err = client.upload(file.path()).await.unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType { .. }));
        assert!(sender.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_file_rejected_locally() {
        let sender = FixedSender::new(StatusCode::OK, r#"{"chunks_added": 1}"#);
        let file = temp_file(".pdf", b"");
        let client = UploadClient::new(sender.clone(), &Config::default());

        let err = client.upload(file.path()).await.unwrap_err();
        assert!(matches!(err, UploadError::EmptyFile { .. }));
        assert!(sender.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn service_rejection_carries_detail() {
        let sender = FixedSender::new(
            StatusCode::BAD_REQUEST,
            r#"{"detail":"Uploaded file cannot be empty."}"#,
        );
        let file = temp_file(".txt", b"x");
        let client = UploadClient::new(sender, &Config::default());

        match client.upload(file.path()).await {
            Err(UploadError::Request { status, detail }) => {
                assert_eq!(status, 400);
                assert_eq!(detail, "Uploaded file cannot be empty.");
            }
            other => panic!("expected Request error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_success_body_is_invalid_response() {
        let sender = FixedSender::new(StatusCode::OK, "ok");
        let file = temp_file(".txt", b"x");
        let client = UploadClient::new(sender, &Config::default());

        let err = client.upload(file.path()).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidResponse(_)));
    }
}
