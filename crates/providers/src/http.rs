//! Shared HTTP plumbing: client construction and status classification.

use serde::Deserialize;
use stepwise_core::error::{ProviderError, looks_transient};
use std::time::Duration;

/// Used when a 429 carries no `Retry-After` header.
pub(crate) const DEFAULT_RETRY_AFTER_SECS: u64 = 10;

/// Build the HTTP client used by every provider.
pub(crate) fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Map a transport failure onto the provider taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

/// Error envelope used by both Google and OpenAI-style APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: Option<String>,
    /// Google's canonical status, e.g. `RESOURCE_EXHAUSTED`.
    #[serde(default)]
    status: Option<String>,
}

/// Classify a non-200 response.
///
/// Structured signals come first (HTTP status, the body's canonical
/// status). The text fallback only applies to bodies we cannot parse.
pub(crate) fn error_from_status(
    status_code: u16,
    retry_after: Option<u64>,
    body: &str,
) -> ProviderError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| body.to_string());
    let canonical = detail.as_ref().and_then(|d| d.status.as_deref());

    if status_code == 429 {
        return ProviderError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        };
    }

    if canonical == Some("RESOURCE_EXHAUSTED") {
        return ProviderError::ResourceExhausted(message);
    }

    if status_code == 401
        || status_code == 403
        || canonical == Some("UNAUTHENTICATED")
        || message.contains("API key not valid")
    {
        return ProviderError::AuthenticationFailed(message);
    }

    if detail.is_none() && looks_transient(body) {
        return ProviderError::ResourceExhausted(message);
    }

    ProviderError::ApiError {
        status_code,
        message,
    }
}

/// Read `Retry-After` (seconds form only).
pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
pub(crate) mod test_server {
    //! A one-shot HTTP server for exercising providers without the network.

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve exactly one response; the handle yields the raw request.
    pub async fn serve_once(
        status: u16,
        extra_headers: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + len {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status} Test\r\ncontent-type: application/json\r\n{extra_headers}content-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            String::from_utf8_lossy(&buf).to_string()
        });

        (format!("http://{addr}"), handle)
    }
}
