use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

const EXPONENTIAL_BACKOFF_BASE: u32 = 2;
const DEFAULT_BACKOFF: Duration = Duration::from_millis(1000);
pub(crate) const MAX_RETRY_ATTEMPTS: u32 = 10;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Blocking JSON-over-HTTP client shared by the embedding and chat clients.
#[derive(Debug, Clone)]
pub(crate) struct JsonClient {
    agent: ureq::Agent,
    retry_attempts: u32,
    backoff: Duration,
}

impl JsonClient {
    pub(crate) fn new(timeout: Duration, retry_attempts: u32) -> Self {
        Self {
            agent: build_agent(timeout),
            retry_attempts: retry_attempts.clamp(1, MAX_RETRY_ATTEMPTS),
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.agent = build_agent(timeout);
    }

    pub(crate) fn set_retry_attempts(&mut self, attempts: u32) {
        self.retry_attempts = attempts.clamp(1, MAX_RETRY_ATTEMPTS);
    }

    pub(crate) fn set_backoff(&mut self, backoff: Duration) {
        self.backoff = backoff;
    }

    pub(crate) fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// POST `body` to `url` and return the response text of a 2xx reply.
    ///
    /// 429, 5xx and transport failures are retried with exponential backoff;
    /// any other status fails immediately.
    pub(crate) fn post(
        &self,
        url: &Url,
        bearer: Option<&str>,
        body: &str,
    ) -> Result<String, HttpError> {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("POST {} attempt {}/{}", url, attempt, self.retry_attempts);

            let mut request = self
                .agent
                .post(url.as_str())
                .header("Content-Type", "application/json");
            if let Some(token) = bearer {
                request = request.header("Authorization", format!("Bearer {}", token));
            }

            let outcome = request.send(body).and_then(|mut resp| {
                let status = resp.status().as_u16();
                resp.body_mut()
                    .read_to_string()
                    .map(|text| (status, text))
            });

            let error = match outcome {
                Ok((status, text)) if (200..300).contains(&status) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(text);
                }
                Ok((status, text)) => {
                    let error = HttpError::Status { status, body: text };
                    if status == 429 || status >= 500 {
                        warn!(
                            "Server error (status {}), attempt {}/{}",
                            status, attempt, self.retry_attempts
                        );
                        error
                    } else {
                        warn!("Client error (status {}), not retrying", status);
                        return Err(error);
                    }
                }
                Err(
                    e @ (ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_)),
                ) => {
                    warn!(
                        "Transport error: {}, attempt {}/{}",
                        e, attempt, self.retry_attempts
                    );
                    HttpError::Transport(e.to_string())
                }
                Err(e) => {
                    warn!("Non-retryable error: {}", e);
                    return Err(HttpError::Transport(e.to_string()));
                }
            };
            last_error = Some(error);

            if attempt < self.retry_attempts {
                let delay = self
                    .backoff
                    .saturating_mul(EXPONENTIAL_BACKOFF_BASE.saturating_pow(attempt - 1));
                debug!("Waiting {:?} before retry", delay);
                std::thread::sleep(delay);
            }
        }

        error!("All retry attempts failed for request to {}", url);
        Err(last_error
            .unwrap_or_else(|| HttpError::Transport("request failed after retries".to_string())))
    }
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Resolve `path` beneath `base`, keeping every segment of `base`.
pub(crate) fn endpoint(base: &str, path: &str) -> Result<Url, HttpError> {
    let mut normalized = base.trim_end_matches('/').to_string();
    normalized.push('/');
    Url::parse(&normalized)
        .and_then(|url| url.join(path))
        .map_err(|e| HttpError::InvalidUrl(format!("{}: {}", base, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_keeps_version_segment() {
        let url = endpoint("https://api.openai.com/v1", "embeddings").expect("valid url");
        assert_eq!(url.as_str(), "https://api.openai.com/v1/embeddings");

        let url = endpoint("http://localhost:11434/v1/", "chat/completions").expect("valid url");
        assert_eq!(url.as_str(), "http://localhost:11434/v1/chat/completions");
    }

    #[test]
    fn endpoint_rejects_garbage() {
        assert!(matches!(
            endpoint("not a url", "embeddings"),
            Err(HttpError::InvalidUrl(_))
        ));
    }

    #[test]
    fn retry_attempts_are_bounded() {
        let mut client = JsonClient::new(Duration::from_secs(1), 0);
        assert_eq!(client.retry_attempts(), 1);
        client.set_retry_attempts(4);
        assert_eq!(client.retry_attempts(), 4);
        client.set_retry_attempts(u32::MAX);
        assert_eq!(client.retry_attempts(), MAX_RETRY_ATTEMPTS);
        assert_eq!(
            JsonClient::new(Duration::from_secs(1), 1_000).retry_attempts(),
            MAX_RETRY_ATTEMPTS
        );
    }
}
