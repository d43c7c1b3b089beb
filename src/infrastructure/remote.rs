//! Remote quote endpoint client.
//!
//! The endpoint serves a list of posts; each post's `title` becomes a quote
//! in the fixed "Server" category. New quotes are posted back as JSON.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::domain::{AppError, Quote, Result, SyncConfig, SERVER_CATEGORY};

/// Transport used by the sync service to talk to the remote endpoint.
#[async_trait]
pub trait QuoteTransport: Send + Sync {
    /// Fetch the current remote snapshot.
    ///
    /// Items are returned in endpoint order and are not yet validated.
    async fn fetch_quotes(&self) -> Result<Vec<Quote>>;

    /// Replicate a single quote to the remote endpoint.
    async fn push_quote(&self, quote: &Quote) -> Result<()>;
}

/// Item returned by the remote endpoint.
#[derive(Debug, Deserialize)]
struct RemotePost {
    #[serde(default)]
    title: String,
}

impl From<RemotePost> for Quote {
    fn from(post: RemotePost) -> Self {
        Self {
            text: post.title,
            category: SERVER_CATEGORY.to_string(),
        }
    }
}

/// HTTP transport backed by `reqwest`.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    max_items: usize,
}

impl HttpTransport {
    /// Create a transport from sync configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::transport("Failed to build HTTP client", e))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            max_items: config.max_remote_items,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::transport(format!("Request to {} timed out", self.endpoint), e)
        } else {
            AppError::transport(format!("Request to {} failed", self.endpoint), e)
        }
    }
}

#[async_trait]
impl QuoteTransport for HttpTransport {
    async fn fetch_quotes(&self) -> Result<Vec<Quote>> {
        debug!(endpoint = %self.endpoint, "Fetching remote quotes");

        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?
            .error_for_status()
            .map_err(|e| AppError::transport("Remote endpoint returned an error status", e))?;

        let posts: Vec<RemotePost> = response
            .json()
            .await
            .map_err(|e| AppError::transport("Failed to decode remote quotes", e))?;

        Ok(snapshot_from_posts(posts, self.max_items))
    }

    async fn push_quote(&self, quote: &Quote) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(quote)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?
            .error_for_status()
            .map_err(|e| AppError::transport("Remote endpoint rejected quote", e))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        debug!(status = %status, body = %body, "Quote posted to server");

        Ok(())
    }
}

/// Map remote posts to quotes, keeping at most `max_items`.
fn snapshot_from_posts(posts: Vec<RemotePost>, max_items: usize) -> Vec<Quote> {
    posts.into_iter().take(max_items).map(Quote::from).collect()
}
