//! Shared startup-connect backoff: 1, 2, 4, 8, 16s across five attempts,
//! used identically by the database pool, cache client, and bus connection.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

const DELAYS_SECONDS: [u64; 5] = [1, 2, 4, 8, 16];

/// Retry `connect` up to five times with the fixed backoff schedule. Returns
/// the last error if every attempt fails — callers treat that as an
/// unrecoverable startup failure.
pub async fn connect_with_backoff<F, Fut, T, E>(what: &str, mut connect: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = DELAYS_SECONDS.len();
    for (i, delay) in DELAYS_SECONDS.iter().enumerate() {
        match connect().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                let attempt = i + 1;
                if attempt == attempts {
                    return Err(e);
                }
                warn!(target: "startup", what, attempt, error = %e, "connect attempt failed, retrying");
                tokio::time::sleep(Duration::from_secs(*delay)).await;
            }
        }
    }
    unreachable!("DELAYS_SECONDS is non-empty")
}
