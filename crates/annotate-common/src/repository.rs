/// Persistence collaborator for documents and annotations.
///
/// Documents and assignments always come from the workspace seed. Annotations are
/// kept either in process memory or in Redis, keyed by `(user, document)`.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{AnnotateError, Result};
use crate::model::{Annotation, Document, DocumentId, PersistedAnnotation, UserId};
use crate::redis::RedisCache;
use crate::seed::Workspace;

const KEY_PREFIX: &str = "annotate:v1:";

#[async_trait]
pub trait AnnotationRepository: Send + Sync {
    async fn fetch_assigned_documents(&self, user: &str) -> Result<Vec<Document>>;

    async fn fetch_annotations(&self, user: &str) -> Result<HashMap<DocumentId, PersistedAnnotation>>;

    /// Upsert the annotation of `document_id` by `user`.
    async fn save_annotation(&self, user: &str, document_id: &str, annotation: &Annotation) -> Result<()>;
}

fn check_assigned(workspace: &Workspace, user: &str, document_id: &str) -> Result<()> {
    if workspace.is_assigned(user, document_id) {
        Ok(())
    } else {
        Err(AnnotateError::DocumentNotFound(format!(
            "{document_id} (not assigned to {user})"
        )))
    }
}

pub struct MemoryRepository {
    workspace: Arc<Workspace>,
    annotations: RwLock<HashMap<(UserId, DocumentId), Annotation>>,
}

impl MemoryRepository {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self {
            workspace,
            annotations: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AnnotationRepository for MemoryRepository {
    async fn fetch_assigned_documents(&self, user: &str) -> Result<Vec<Document>> {
        Ok(self.workspace.assigned_documents(user))
    }

    async fn fetch_annotations(&self, user: &str) -> Result<HashMap<DocumentId, PersistedAnnotation>> {
        let annotations = self.annotations.read().await;
        Ok(annotations
            .iter()
            .filter(|((owner, _), _)| owner == user)
            .map(|((_, doc), a)| (doc.clone(), PersistedAnnotation::from(a)))
            .collect())
    }

    async fn save_annotation(&self, user: &str, document_id: &str, annotation: &Annotation) -> Result<()> {
        check_assigned(&self.workspace, user, document_id)?;
        self.annotations
            .write()
            .await
            .insert((user.to_string(), document_id.to_string()), annotation.clone());
        Ok(())
    }
}

/// Annotations stored as JSON in one Redis hash per user:
/// `annotate:v1:annotations:{user}` with the document id as field.
pub struct RedisRepository {
    workspace: Arc<Workspace>,
    redis: RedisCache,
}

impl RedisRepository {
    pub fn new(workspace: Arc<Workspace>, redis: RedisCache) -> Self {
        Self { workspace, redis }
    }
}

fn annotations_key(user: &str) -> String {
    format!("{KEY_PREFIX}annotations:{user}")
}

#[async_trait]
impl AnnotationRepository for RedisRepository {
    async fn fetch_assigned_documents(&self, user: &str) -> Result<Vec<Document>> {
        Ok(self.workspace.assigned_documents(user))
    }

    async fn fetch_annotations(&self, user: &str) -> Result<HashMap<DocumentId, PersistedAnnotation>> {
        let key = annotations_key(user);
        let raw = self
            .redis
            .hgetall(&key)
            .await
            .ok_or_else(|| AnnotateError::Persistence(format!("could not read {key}")))?;

        raw.into_iter()
            .map(|(document_id, json)| {
                let parsed = serde_json::from_str::<PersistedAnnotation>(&json).map_err(|e| {
                    AnnotateError::MalformedRecord {
                        document_id: document_id.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Ok((document_id, parsed))
            })
            .collect()
    }

    async fn save_annotation(&self, user: &str, document_id: &str, annotation: &Annotation) -> Result<()> {
        check_assigned(&self.workspace, user, document_id)?;
        let json = serde_json::to_string(annotation)
            .map_err(|e| AnnotateError::Persistence(format!("cannot encode annotation: {e}")))?;
        let key = annotations_key(user);
        if self.redis.hset(&key, document_id, &json).await {
            Ok(())
        } else {
            Err(AnnotateError::Persistence(format!(
                "could not write {key} field {document_id}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::RatingDimension;
    use crate::seed::tests::SEED;

    fn workspace() -> Arc<Workspace> {
        Arc::new(Workspace::from_json(SEED).unwrap())
    }

    #[tokio::test]
    async fn memory_repository_upserts_per_user() {
        let repo = MemoryRepository::new(workspace());
        let mut a = Annotation::default();
        a.set_rating(RatingDimension::Usefulness, 3).unwrap();
        repo.save_annotation("ann", "b", &a).await.unwrap();
        a.set_rating(RatingDimension::Usefulness, 4).unwrap();
        repo.save_annotation("ann", "b", &a).await.unwrap();

        let mine = repo.fetch_annotations("ann").await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine["b"].usefulness, Some(4));
        assert!(repo.fetch_annotations("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saving_unassigned_document_is_not_found() {
        let repo = MemoryRepository::new(workspace());
        let err = repo
            .save_annotation("bob", "b", &Annotation::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn redis_repository_without_redis_reports_persistence_failure() {
        let repo = RedisRepository::new(workspace(), RedisCache::new(None));
        let err = repo
            .save_annotation("ann", "a", &Annotation::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        let err = repo.fetch_annotations("ann").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(repo.fetch_assigned_documents("bob").await.unwrap().len(), 2);
    }
}
