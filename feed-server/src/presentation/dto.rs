use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::post::PostRecord;

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub posts: Vec<PostRecord>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}
