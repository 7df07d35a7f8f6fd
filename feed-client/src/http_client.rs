use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;

use crate::PostRecord;
use crate::error::FeedClientError;

#[derive(Clone)]
pub struct FeedClientHttp {
    client: Arc<Client>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    posts: Vec<PostRecord>,
}

impl FeedClientHttp {
    pub fn connect(endpoint: &str) -> Result<Self, FeedClientError> {
        let base_url = endpoint.trim_end_matches('/').to_string();
        Ok(Self {
            client: Arc::new(Client::builder().build()?),
            base_url,
        })
    }

    pub async fn submit_post(
        &self,
        image: Vec<u8>,
        filename: &str,
        username: Option<String>,
        caption: Option<String>,
    ) -> Result<PostRecord, FeedClientError> {
        let part = reqwest::multipart::Part::bytes(image).file_name(filename.to_string());
        let mut form = reqwest::multipart::Form::new().part("image", part);
        if let Some(username) = username {
            form = form.text("username", username);
        }
        if let Some(caption) = caption {
            form = form.text("caption", caption);
        }

        let resp = self
            .client
            .post(format!("{}/api/posts", self.base_url))
            .multipart(form)
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(resp.json::<PostRecord>().await?)
        } else {
            Err(FeedClientError::from_http_response(resp).await)
        }
    }

    pub async fn list_posts(&self) -> Result<Vec<PostRecord>, FeedClientError> {
        let resp = self
            .client
            .get(format!("{}/api/posts", self.base_url))
            .send()
            .await?;

        if resp.status().is_success() {
            let feed: FeedResponse = resp.json().await?;
            Ok(feed.posts)
        } else {
            Err(FeedClientError::from_http_response(resp).await)
        }
    }

    pub async fn fetch_image(&self, storage_key: &str) -> Result<Vec<u8>, FeedClientError> {
        let resp = self
            .client
            .get(format!("{}/api/posts/{}/image", self.base_url, storage_key))
            .send()
            .await?;

        if resp.status().is_success() {
            Ok(resp.bytes().await?.to_vec())
        } else {
            Err(FeedClientError::from_http_response(resp).await)
        }
    }
}
