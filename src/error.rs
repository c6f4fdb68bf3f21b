//! Error taxonomy shared across the sync job and the read path.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TickerError {
    /// The raw ridership feed or station directory was unreachable or
    /// returned a non-success status. Aborts the current sync run.
    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(String),

    /// A persistence batch failed after every allowed retry. Batches that
    /// were already flushed stay committed.
    #[error("batch write exhausted after {attempts} attempts: {message}")]
    WriteExhausted { attempts: u32, message: String },

    /// No record exists for the requested day. The read path reports this
    /// as "no data", not as an internal error.
    #[error("no data found for {0}")]
    NotFound(String),

    /// Malformed read-path parameter. Surfaced immediately, never retried.
    #[error("invalid parameter: {0}")]
    Validation(String),

    /// Key-value store call failed for any other reason.
    #[error("store error: {0}")]
    Store(String),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TickerError {
    /// HTTP-style status code used by the read-path response envelope.
    pub fn status_code(&self) -> u16 {
        match self {
            TickerError::Validation(_) => 400,
            TickerError::NotFound(_) => 404,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_upstream_fetch() {
        let err = TickerError::UpstreamFetch("status 503".into());
        assert_eq!(err.to_string(), "upstream fetch failed: status 503");
    }

    #[test]
    fn display_write_exhausted() {
        let err = TickerError::WriteExhausted {
            attempts: 3,
            message: "throughput exceeded".into(),
        };
        assert_eq!(
            err.to_string(),
            "batch write exhausted after 3 attempts: throughput exceeded"
        );
    }

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(TickerError::Validation("top".into()).status_code(), 400);
        assert_eq!(TickerError::NotFound("Wed".into()).status_code(), 404);
        assert_eq!(TickerError::Store("boom".into()).status_code(), 500);
        assert_eq!(TickerError::UpstreamFetch("x".into()).status_code(), 500);
    }
}
