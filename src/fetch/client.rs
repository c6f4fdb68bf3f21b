use async_trait::async_trait;
use reqwest::{Request, Response};

/// Seam between the feed client and the network, so tests can substitute
/// canned responses without a live endpoint.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
