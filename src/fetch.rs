use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::FetchError;

/// Store pages only render the embedded state for mobile browsers.
pub const USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_1 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) CriOS/107.0.5304.101 Mobile/15E148 Safari/604.1";

const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 2000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub fn client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()
}

/// GET a page, retrying rate limits and server errors with exponential backoff.
pub async fn fetch_with_retry(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let mut attempt = 0;
    loop {
        match fetch_page(client, url).await {
            Ok(body) => return Ok(body),
            Err(e) if e.is_retryable() && attempt < MAX_RETRIES => {
                let backoff = backoff(attempt);
                warn!(
                    "{} failed: {} (attempt {}/{}), backing off {:.1}s",
                    url,
                    e,
                    attempt + 1,
                    MAX_RETRIES,
                    backoff.as_secs_f64()
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Single GET. Any non-2xx status is a failure; the body is decoded lossily.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
    let start = Instant::now();
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let bytes = response.bytes().await?;
    debug!("{} fetched in {}ms", url, start.elapsed().as_millis());
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn backoff(attempt: u32) -> Duration {
    Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        assert_eq!(backoff(0), Duration::from_secs(2));
        assert_eq!(backoff(1), Duration::from_secs(4));
        assert_eq!(backoff(2), Duration::from_secs(8));
    }

    #[test]
    fn retryable_statuses() {
        assert!(FetchError::Status(429).is_retryable());
        assert!(FetchError::Status(503).is_retryable());
        assert!(!FetchError::Status(404).is_retryable());
        assert!(!FetchError::Status(403).is_retryable());
        assert!(FetchError::Network("reset".into()).is_retryable());
    }
}
