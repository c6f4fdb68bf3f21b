mod basic;
mod client;
mod token;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use token::AppToken;

use serde::de::DeserializeOwned;

use crate::error::TickerError;

/// Fetches `url` and deserializes the JSON body, turning any transport
/// failure or non-success status into an [`TickerError::UpstreamFetch`].
pub async fn fetch_json<C: HttpClient, T: DeserializeOwned>(
    client: &C,
    url: &str,
) -> Result<T, TickerError> {
    let parsed = url
        .parse()
        .map_err(|e| TickerError::UpstreamFetch(format!("invalid url {url}: {e}")))?;
    let req = reqwest::Request::new(reqwest::Method::GET, parsed);

    let resp = client
        .execute(req)
        .await
        .map_err(|e| TickerError::UpstreamFetch(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(TickerError::UpstreamFetch(format!(
            "status {status}: {body}"
        )));
    }

    resp.json::<T>()
        .await
        .map_err(|e| TickerError::UpstreamFetch(format!("malformed response body: {e}")))
}
