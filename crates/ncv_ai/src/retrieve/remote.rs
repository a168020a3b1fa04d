use std::sync::Arc;
use std::time::Duration;

use ncv_core::error::{AppError, RETRIEVAL_UNAVAILABLE};
use serde::{Deserialize, Serialize};

use crate::pacing::Pacer;

/// Client for an index query service: `POST {query, k, filter?}` returning an ordered
/// list of `{text, metadata}`.
#[derive(Debug, Clone)]
pub struct RemoteIndexClient {
    url: String,
    timeout: Duration,
    pacer: Option<Arc<Pacer>>,
}

#[derive(Debug, Clone, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    k: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RemoteHit {
    pub text: String,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl RemoteHit {
    /// Document identity from metadata: `document_id`, else the file stem of `path`.
    pub fn document_id(&self) -> String {
        if let Some(id) = self.metadata.get("document_id").and_then(|v| v.as_str()) {
            return id.to_string();
        }
        self.metadata
            .get("path")
            .and_then(|v| v.as_str())
            .and_then(|p| std::path::Path::new(p).file_stem())
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    }
}

impl RemoteIndexClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, AppError> {
        let url = url.trim().to_string();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::new("RETRIEVAL_URL_INVALID", "Index service URL must be http(s)")
                .with_details(format!("url={url}")));
        }
        Ok(Self {
            url,
            timeout,
            pacer: None,
        })
    }

    /// Pace queries against a clock shared with the other external calls.
    pub fn with_pacer(mut self, pacer: Arc<Pacer>) -> Self {
        self.pacer = Some(pacer);
        self
    }

    pub fn query(&self, query: &str, k: i64, filter: Option<&str>) -> Result<Vec<RemoteHit>, AppError> {
        let req = QueryRequest { query, k, filter };
        let body = serde_json::to_value(req).map_err(|e| {
            AppError::new(RETRIEVAL_UNAVAILABLE, "Failed to encode index query").with_details(e.to_string())
        })?;
        if let Some(pacer) = &self.pacer {
            pacer.wait_turn();
        }
        let resp = ureq::post(&self.url).timeout(self.timeout).send_json(body);

        match resp {
            Ok(r) if (200..300).contains(&r.status()) => r.into_json().map_err(|e| {
                AppError::new(RETRIEVAL_UNAVAILABLE, "Failed to decode index query response")
                    .with_details(e.to_string())
            }),
            Ok(r) => Err(AppError::new(RETRIEVAL_UNAVAILABLE, "Index query failed")
                .with_details(format!("status={}", r.status()))
                .with_retryable(true)),
            Err(e) => Err(AppError::new(RETRIEVAL_UNAVAILABLE, "Failed to call index query service")
                .with_details(e.to_string())
                .with_retryable(true)),
        }
    }
}
