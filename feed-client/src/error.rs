use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedClientError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("not found")]
    NotFound,
    #[error("server returned {status}: {body}")]
    Server {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl FeedClientError {
    pub(crate) async fn from_http_response(resp: reqwest::Response) -> Self {
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return FeedClientError::NotFound;
        }
        let body = resp.text().await.unwrap_or_default();
        FeedClientError::Server { status, body }
    }
}
