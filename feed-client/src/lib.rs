mod error;
mod http_client;

pub use error::FeedClientError;
pub use http_client::FeedClientHttp;

use serde::{Deserialize, Serialize};

/// One feed entry as served by the API. `confidence` is only present
/// on the submission response, never on the feed listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub storage_key: String,
    pub label: String,
    pub timestamp: String,
    pub username: String,
    pub caption: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}
