//! Package Index Retry Logic and Error Classification
//!
//! リトライロジックとエラー分類

pub const MAX_RETRIES: u32 = 3;
pub const INITIAL_RETRY_DELAY_MS: u64 = 500;
pub const MAX_RETRY_DELAY_MS: u64 = 8000;

/// Calculate retry delay with exponential backoff
pub fn calculate_retry_delay(retry_count: u32) -> u64 {
    let shift = retry_count.saturating_sub(1).min(16);
    std::cmp::min(INITIAL_RETRY_DELAY_MS << shift, MAX_RETRY_DELAY_MS)
}

/// Convert error chain to string including all causes
pub fn error_chain_to_string(e: &anyhow::Error) -> String {
    e.chain()
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Server-side statuses worth another attempt
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Check if an error message points at a broken or refused connection
pub fn is_connection_error(error_msg: &str) -> bool {
    let lower = error_msg.to_ascii_lowercase();
    lower.contains("broken pipe")
        || lower.contains("connection reset")
        || lower.contains("connection refused")
        || lower.contains("connection error")
        || lower.contains("error sending request")
        || lower.contains("unexpected end of file")
}

/// Check if a transport error can be retried as is
pub fn is_retryable_error(error: &reqwest::Error) -> bool {
    if error.is_connect() || error.is_timeout() {
        return true;
    }
    if let Some(status) = error.status() {
        return is_retryable_status(status.as_u16());
    }
    is_connection_error(&error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_retry_delay_first_retry() {
        assert_eq!(calculate_retry_delay(1), INITIAL_RETRY_DELAY_MS);
    }

    #[test]
    fn test_calculate_retry_delay_doubles() {
        assert_eq!(calculate_retry_delay(2), 1000);
        assert_eq!(calculate_retry_delay(3), 2000);
        assert_eq!(calculate_retry_delay(4), 4000);
    }

    #[test]
    fn test_calculate_retry_delay_capped() {
        assert_eq!(calculate_retry_delay(5), MAX_RETRY_DELAY_MS);
        assert_eq!(calculate_retry_delay(40), MAX_RETRY_DELAY_MS);
    }

    #[test]
    fn test_is_retryable_status() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(503));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn test_is_connection_error() {
        assert!(is_connection_error("broken pipe (os error 32)"));
        assert!(is_connection_error("Connection reset by peer"));
        assert!(is_connection_error("Connection refused"));
        assert!(is_connection_error("error sending request for url"));
        assert!(!is_connection_error("503 Service Unavailable"));
        assert!(!is_connection_error("invalid JSON"));
    }

    #[test]
    fn test_error_chain_to_string() {
        use anyhow::Context;

        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "Connection reset");
        let error = Err::<(), _>(inner)
            .context("index request failed")
            .unwrap_err();

        let msg = error_chain_to_string(&error);
        assert!(msg.contains("index request failed"));
        assert!(msg.contains("Connection reset"));
        assert!(is_connection_error(&msg));
    }
}
