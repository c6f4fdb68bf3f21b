use async_trait::async_trait;
use reqwest::header::HeaderValue;

use super::client::HttpClient;

/// An [`HttpClient`] wrapper that injects a Socrata application token as the
/// `X-App-Token` header. Anonymous clients share a throttled request pool,
/// so production syncs should always carry one.
pub struct AppToken<C> {
    inner: C,
    token: HeaderValue,
}

impl<C> AppToken<C> {
    pub fn new(inner: C, token: &str) -> Option<Self> {
        let token = HeaderValue::from_str(token).ok()?;
        Some(Self { inner, token })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for AppToken<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut().insert("X-App-Token", self.token.clone());
        self.inner.execute(req).await
    }
}
