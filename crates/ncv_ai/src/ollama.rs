use std::time::{Duration, Instant};

use ncv_core::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;

const LOOPBACK: &str = "http://127.0.0.1";

#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    timeout: Duration,
}

impl OllamaClient {
    /// Create a client for Ollama. This is strictly limited to `127.0.0.1`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        validate_loopback_url(&base_url)?;
        Ok(Self { base_url, timeout })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// POST `body` to `path` and decode the JSON reply. Errors carry `code`; transport
    /// failures, timeouts, 429 and 5xx replies are marked retryable.
    pub(crate) fn post_json<B, R>(&self, path: &str, body: &B, code: &str) -> Result<R, AppError>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        let payload = serde_json::to_value(body)
            .map_err(|e| AppError::new(code, "Failed to encode request").with_details(e.to_string()))?;

        let started = Instant::now();
        let resp = ureq::post(&url).timeout(self.timeout).send_json(payload);
        tracing::debug!(path, elapsed_ms = started.elapsed().as_millis() as u64, "ollama call");

        match resp {
            Ok(r) => r.into_json::<R>().map_err(|e| {
                AppError::new(code, "Failed to decode response").with_details(format!("path={path}; err={e}"))
            }),
            Err(ureq::Error::Status(status, _)) => Err(AppError::new(code, "Request rejected by Ollama")
                .with_details(format!("path={path}; status={status}"))
                .with_retryable(status == 429 || status >= 500)),
            Err(e) => Err(AppError::new(code, "Failed to reach Ollama on 127.0.0.1")
                .with_details(format!("path={path}; err={e}"))
                .with_retryable(true)),
        }
    }

    pub fn health_check(&self) -> Result<(), AppError> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = ureq::get(&url).timeout(Duration::from_millis(800)).call();

        match resp {
            Ok(r) if r.status() == 200 => Ok(()),
            Ok(r) => Err(AppError::new("LLM_UNHEALTHY", "Ollama health check failed")
                .with_details(format!("status={}", r.status()))),
            Err(e) => Err(
                AppError::new("LLM_UNREACHABLE", "Failed to reach Ollama on 127.0.0.1")
                    .with_details(e.to_string())
                    .with_retryable(true),
            ),
        }
    }
}

fn validate_loopback_url(base_url: &str) -> Result<(), AppError> {
    let rejected = || {
        AppError::new(
            "LLM_REMOTE_NOT_ALLOWED",
            "Ollama base URL must be http://127.0.0.1[:port]",
        )
        .with_details(format!("base_url={base_url}"))
    };

    let rest = base_url.strip_prefix(LOOPBACK).ok_or_else(rejected)?;
    if rest.is_empty() {
        return Ok(());
    }
    let port = rest.strip_prefix(':').ok_or_else(rejected)?;
    match port.parse::<u16>() {
        Ok(p) if p > 0 && port.chars().all(|c| c.is_ascii_digit()) => Ok(()),
        _ => Err(rejected()),
    }
}
