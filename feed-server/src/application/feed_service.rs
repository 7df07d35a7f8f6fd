use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use crate::data::feed_store::FeedStore;
use crate::domain::error::DomainError;
use crate::domain::post::{self, PostMeta, PostRecord};
use crate::infrastructure::classifier::ImageClassifier;

#[derive(Clone)]
pub struct FeedService<S: FeedStore + 'static, C: ImageClassifier + 'static> {
    store: Arc<S>,
    classifier: Arc<C>,
}

impl<S, C> FeedService<S, C>
where
    S: FeedStore + 'static,
    C: ImageClassifier + 'static,
{
    pub fn new(store: Arc<S>, classifier: Arc<C>) -> Self {
        Self { store, classifier }
    }

    /// Write path: artifact, then classification, then sidecar, in that
    /// order. A classifier failure aborts the submission and leaves the
    /// artifact orphaned; the read path renders orphans as "Unknown".
    #[instrument(skip(self, image, caption))]
    pub async fn submit_post(
        &self,
        image: Vec<u8>,
        original_filename: &str,
        username: Option<String>,
        caption: Option<String>,
    ) -> Result<PostRecord, DomainError> {
        if image.is_empty() {
            return Err(DomainError::InvalidUpload("image payload is empty".into()));
        }
        if post::accepted_extension(original_filename).is_none() {
            return Err(DomainError::UnsupportedImageType(
                original_filename.to_string(),
            ));
        }

        let now = Utc::now();
        let timestamp = now.format(post::DISPLAY_TIMESTAMP_FORMAT).to_string();
        let storage_key = post::storage_key(now, original_filename);

        let artifact = self.store.put_artifact(&storage_key, &image).await?;

        let classification = self
            .classifier
            .classify(&image)
            .await
            .map_err(|e| DomainError::ClassificationFailed(e.to_string()))?;

        let username = username
            .map(|u| post::sanitize_field(&u))
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| post::DEFAULT_USERNAME.to_string());
        let caption = caption
            .map(|c| post::sanitize_field(&c))
            .unwrap_or_default();

        let meta = PostMeta {
            label: post::sanitize_field(&classification.label),
            timestamp,
            username,
            caption,
        };
        self.store.put_sidecar(&storage_key, &meta).await?;

        info!(storage_key = %storage_key, label = %meta.label, "post submitted");

        let mut record = PostRecord::from_meta(storage_key, artifact, meta);
        record.confidence = classification.confidence;
        Ok(record)
    }

    pub async fn list_posts(&self) -> Result<Vec<PostRecord>, DomainError> {
        self.store.list_posts().await
    }

    pub async fn artifact(&self, storage_key: &str) -> Result<PathBuf, DomainError> {
        self.store.artifact(storage_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::feed_store::FsFeedStore;
    use crate::infrastructure::classifier::{Classification, ClassifierError};
    use async_trait::async_trait;

    struct StubClassifier {
        label: &'static str,
        confidence: Option<f64>,
    }

    #[async_trait]
    impl ImageClassifier for StubClassifier {
        async fn classify(&self, _image: &[u8]) -> Result<Classification, ClassifierError> {
            Ok(Classification {
                label: self.label.to_string(),
                confidence: self.confidence,
            })
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl ImageClassifier for FailingClassifier {
        async fn classify(&self, _image: &[u8]) -> Result<Classification, ClassifierError> {
            Err(ClassifierError::Status(
                reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }

    fn service_with(
        dir: &tempfile::TempDir,
        classifier: impl ImageClassifier + 'static,
    ) -> FeedService<FsFeedStore, impl ImageClassifier + 'static> {
        let store = FsFeedStore::open(dir.path()).unwrap();
        FeedService::new(Arc::new(store), Arc::new(classifier))
    }

    #[tokio::test]
    async fn submit_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(
            &dir,
            StubClassifier {
                label: "fake",
                confidence: Some(97.5),
            },
        );

        let bytes = b"\x89PNG...".to_vec();
        let record = service
            .submit_post(bytes.clone(), "cat.png", None, None)
            .await
            .unwrap();

        assert!(record.storage_key.ends_with("_cat.png"));
        assert_eq!(record.label, "Fake");
        assert_eq!(record.username, "anonymous");
        assert_eq!(record.caption, "");
        assert_eq!(record.confidence, Some(97.5));

        // Full-schema sidecar: label|timestamp|anonymous| with an empty
        // caption still positionally present.
        let sidecar = std::fs::read_to_string(
            dir.path().join(format!("{}.meta", record.storage_key)),
        )
        .unwrap();
        assert_eq!(sidecar, format!("fake|{}|anonymous|", record.timestamp));

        let posts = service.list_posts().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].storage_key, record.storage_key);
        assert_eq!(posts[0].label, "Fake");
        assert_eq!(posts[0].timestamp, record.timestamp);
        assert_eq!(posts[0].confidence, None);
        assert_eq!(std::fs::read(&posts[0].artifact).unwrap(), bytes);
    }

    #[tokio::test]
    async fn submit_keeps_username_and_caption() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(
            &dir,
            StubClassifier {
                label: "real",
                confidence: None,
            },
        );

        let record = service
            .submit_post(
                b"jpeg".to_vec(),
                "selfie.JPG",
                Some("meryn".into()),
                Some("holiday pic".into()),
            )
            .await
            .unwrap();

        assert_eq!(record.username, "meryn");
        assert_eq!(record.caption, "holiday pic");

        let posts = service.list_posts().await.unwrap();
        assert_eq!(posts[0].username, "meryn");
        assert_eq!(posts[0].caption, "holiday pic");
    }

    #[tokio::test]
    async fn submit_sanitizes_delimiter_in_fields() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(
            &dir,
            StubClassifier {
                label: "real",
                confidence: None,
            },
        );

        let record = service
            .submit_post(
                b"png".to_vec(),
                "shot.png",
                Some("bad|user".into()),
                Some("cap|tion".into()),
            )
            .await
            .unwrap();

        assert_eq!(record.username, "bad user");
        assert_eq!(record.caption, "cap tion");

        let posts = service.list_posts().await.unwrap();
        assert_eq!(posts[0].username, "bad user");
        assert_eq!(posts[0].caption, "cap tion");
    }

    #[tokio::test]
    async fn classifier_failure_aborts_and_leaves_orphan() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(&dir, FailingClassifier);

        let err = service
            .submit_post(b"png".to_vec(), "cat.png", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ClassificationFailed(_)));

        // The artifact stays behind without a sidecar and surfaces as
        // an Unknown entry.
        let posts = service.list_posts().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].label, "Unknown");
    }

    #[tokio::test]
    async fn rejects_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(
            &dir,
            StubClassifier {
                label: "real",
                confidence: None,
            },
        );

        let err = service
            .submit_post(b"gif".to_vec(), "anim.gif", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::UnsupportedImageType(_)));
        assert!(service.list_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_empty_payload() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(
            &dir,
            StubClassifier {
                label: "real",
                confidence: None,
            },
        );

        let err = service
            .submit_post(Vec::new(), "cat.png", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidUpload(_)));
    }

    #[tokio::test]
    async fn feed_orders_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_with(
            &dir,
            StubClassifier {
                label: "real",
                confidence: None,
            },
        );

        service
            .submit_post(b"one".to_vec(), "first.png", None, None)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        let second = service
            .submit_post(b"two".to_vec(), "second.png", None, None)
            .await
            .unwrap();

        let posts = service.list_posts().await.unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].storage_key, second.storage_key);
    }
}
