//! Batched persistence writer: fixed-size batches with a bounded,
//! fixed-delay retry per batch.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::TickerError;
use crate::store::{RidershipStore, StoreRecord};

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Bounded retry: up to `max_attempts` tries per batch with a fixed delay
/// between them. Attempts reset after every successful batch.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

/// Writes `records` to the store in batches of `batch_size`.
///
/// A batch that exhausts its attempts fails the run with
/// [`TickerError::WriteExhausted`]; batches flushed before it stay
/// committed. Since every record is a whole-key overwrite, re-running the
/// write wholesale is always safe.
pub async fn write_records<S: RidershipStore + ?Sized>(
    store: &S,
    records: &[StoreRecord],
    batch_size: usize,
    policy: &RetryPolicy,
) -> Result<(), TickerError> {
    let batches = records.chunks(batch_size.max(1));
    let total = batches.len();

    for (index, batch) in batches.enumerate() {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match store.put_batch(batch).await {
                Ok(()) => break,
                Err(e) if attempt < policy.max_attempts => {
                    warn!(
                        batch = index + 1,
                        attempt,
                        error = %e,
                        delay_ms = policy.delay.as_millis() as u64,
                        "Batch write failed, retrying"
                    );
                    tokio::time::sleep(policy.delay).await;
                }
                Err(e) => {
                    error!(
                        batch = index + 1,
                        of = total,
                        attempts = attempt,
                        error = %e,
                        "Batch write exhausted its attempts"
                    );
                    return Err(TickerError::WriteExhausted {
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    info!(records = records.len(), batches = total, "Write complete");
    Ok(())
}
