//! Snapshot sources – where poll results come from.
//!
//! [`HttpSnapshotSource`] polls the local live-map API:
//!
//! | Group   | Request                 |
//! |---------|-------------------------|
//! | players | `GET /playerlocations`  |
//! | npcs    | `GET /npcs`             |
//! | garages | `GET /garages`          |

use crate::protocol::{decode_snapshot, Snapshot, SnapshotError};
use crate::types::CategoryGroup;
use bytes::Bytes;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("endpoint answered HTTP {0}")]
    Http(u16),
    #[error(transparent)]
    Decode(#[from] SnapshotError),
}

/// Anything that can produce a snapshot for a category group.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch(
        &self,
        group: CategoryGroup,
    ) -> impl Future<Output = Result<Snapshot, FeedError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSnapshotSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn url_for(&self, group: CategoryGroup) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), group.endpoint())
    }
}

impl SnapshotSource for HttpSnapshotSource {
    fn fetch(
        &self,
        group: CategoryGroup,
    ) -> impl Future<Output = Result<Snapshot, FeedError>> + Send {
        let request = self.client.get(self.url_for(group));
        async move {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FeedError::Http(status.as_u16()));
            }
            let body: Bytes = response.bytes().await?;
            Ok(decode_snapshot(group, &body)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_and_endpoint() {
        let src = HttpSnapshotSource::new("http://localhost:8000/", Duration::from_secs(1))
            .expect("client builds");
        assert_eq!(
            src.url_for(CategoryGroup::Players),
            "http://localhost:8000/playerlocations"
        );
        assert_eq!(src.url_for(CategoryGroup::Garages), "http://localhost:8000/garages");
    }
}
