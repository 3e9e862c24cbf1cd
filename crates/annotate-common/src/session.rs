/// Session controller: navigation over the assigned documents plus the edits an
/// annotator makes to the current one.
///
/// Every edit is applied to local state first and then queued for saving. The save
/// queue runs on a background task, writes in order, and only logs failures: local
/// state stays authoritative for the rest of the session.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::auth::AuthProvider;
use crate::book::{reconcile_with_persisted, AnnotationBook, Progress};
use crate::category::{Category, Palette};
use crate::error::{AnnotateError, Result};
use crate::labels::{LabelChange, LabelStore};
use crate::model::{Annotation, Document, DocumentId, Label, RatingDimension, User, UserId};
use crate::render::{HighlightRenderer, Rendering};
use crate::repository::AnnotationRepository;
use crate::span::locate;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMode {
    Annotating,
    /// Read-only view of another user's work.
    Reviewing { reviewer: UserId },
}

enum SaveCommand {
    Save {
        document_id: DocumentId,
        annotation: Annotation,
    },
    Flush(oneshot::Sender<()>),
}

struct SaveQueue {
    tx: mpsc::UnboundedSender<SaveCommand>,
    failures: Arc<AtomicU64>,
}

impl SaveQueue {
    fn spawn(repo: Arc<dyn AnnotationRepository>, user: UserId) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let failures = Arc::new(AtomicU64::new(0));
        tokio::spawn(run_save_queue(repo, user, rx, Arc::clone(&failures)));
        Self { tx, failures }
    }
}

async fn run_save_queue(
    repo: Arc<dyn AnnotationRepository>,
    user: UserId,
    mut rx: mpsc::UnboundedReceiver<SaveCommand>,
    failures: Arc<AtomicU64>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            SaveCommand::Save {
                document_id,
                annotation,
            } => match repo.save_annotation(&user, &document_id, &annotation).await {
                Ok(()) => debug!(user = %user, document_id = %document_id, "annotation saved"),
                Err(e) => {
                    failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        error = %e,
                        user = %user,
                        document_id = %document_id,
                        "annotation save failed, keeping local state"
                    );
                }
            },
            SaveCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

pub struct AnnotationSession {
    /// Owner of the annotations on display.
    user: User,
    mode: SessionMode,
    documents: Vec<Document>,
    book: AnnotationBook,
    current: usize,
    palette: Palette,
    saves: Option<SaveQueue>,
}

impl AnnotationSession {
    /// Open the current user's own assignments for editing.
    pub async fn open(
        repo: Arc<dyn AnnotationRepository>,
        auth: &dyn AuthProvider,
        palette: Palette,
    ) -> Result<Self> {
        let user = auth.current_user().ok_or(AnnotateError::Unauthenticated)?;
        let (documents, book) = load(repo.as_ref(), &user.id).await?;
        info!(user = %user.id, documents = documents.len(), "annotation session opened");

        let saves = Some(SaveQueue::spawn(repo, user.id.clone()));
        Ok(Self {
            user,
            mode: SessionMode::Annotating,
            documents,
            book,
            current: 0,
            palette,
            saves,
        })
    }

    /// Open a read-only snapshot of `subject`'s work. The current user must be an admin.
    pub async fn open_review(
        repo: Arc<dyn AnnotationRepository>,
        auth: &dyn AuthProvider,
        palette: Palette,
        subject: &str,
    ) -> Result<Self> {
        let reviewer = auth.current_user().ok_or(AnnotateError::Unauthenticated)?;
        if !auth.is_admin(&reviewer.id) {
            return Err(AnnotateError::Forbidden(format!(
                "{} may not review other users",
                reviewer.id
            )));
        }
        let user = auth
            .list_users(&reviewer.id)?
            .into_iter()
            .find(|u| u.id == subject)
            .ok_or_else(|| AnnotateError::UserNotFound(subject.to_string()))?;

        let (documents, book) = load(repo.as_ref(), &user.id).await?;
        info!(
            reviewer = %reviewer.id,
            subject = %user.id,
            documents = documents.len(),
            "review session opened"
        );
        Ok(Self {
            user,
            mode: SessionMode::Reviewing {
                reviewer: reviewer.id,
            },
            documents,
            book,
            current: 0,
            palette,
            saves: None,
        })
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn mode(&self) -> &SessionMode {
        &self.mode
    }

    pub fn is_read_only(&self) -> bool {
        self.saves.is_none()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_document(&self) -> Option<&Document> {
        self.documents.get(self.current)
    }

    pub fn current_annotation(&self) -> Annotation {
        self.book.get_or_default(self.current)
    }

    /// Annotations of every document in session order.
    pub fn annotations(&self) -> Vec<Annotation> {
        self.book.to_sequence()
    }

    pub fn progress(&self) -> Progress {
        self.book.progress()
    }

    /// Saves that failed since the session opened.
    pub fn failed_saves(&self) -> u64 {
        self.saves
            .as_ref()
            .map_or(0, |q| q.failures.load(Ordering::Relaxed))
    }

    pub fn render_current(&self) -> Result<Rendering> {
        let document = self.require_document()?;
        let annotation = self.current_annotation();
        Ok(HighlightRenderer::new(&self.palette).render(&document.summary, &annotation.labels))
    }

    // --- Navigation ---

    pub fn next(&mut self) -> usize {
        self.current = (self.current + 1).min(self.documents.len().saturating_sub(1));
        self.current
    }

    pub fn previous(&mut self) -> usize {
        self.current = self.current.saturating_sub(1);
        self.current
    }

    pub fn go_to(&mut self, index: usize) -> Result<usize> {
        if index >= self.documents.len() {
            return Err(AnnotateError::IndexOutOfRange {
                index,
                len: self.documents.len(),
            });
        }
        self.current = index;
        Ok(index)
    }

    // --- Edits on the current document ---

    /// Label the selected text. Selecting an already labeled spot again changes
    /// that label's category instead of adding a second label.
    pub fn select(&mut self, selected_text: &str, selection_start_hint: usize, category: Category) -> Result<LabelChange> {
        self.edit_labels(|store, summary| {
            let span = locate(summary, selected_text, selection_start_hint)?;
            store.upsert(summary, Label::new(selected_text.trim(), category, span))
        })
    }

    pub fn delete_label(&mut self, index: usize) -> Result<Vec<Label>> {
        self.edit_labels(|store, _| store.delete_at(index).map(<[Label]>::to_vec))
    }

    pub fn relabel(&mut self, index: usize, category: Category) -> Result<Vec<Label>> {
        self.edit_labels(|store, _| store.set_category(index, category).map(<[Label]>::to_vec))
    }

    pub fn correct_label(&mut self, index: usize, corrected_text: Option<String>) -> Result<Vec<Label>> {
        self.edit_labels(|store, _| store.set_correction(index, corrected_text).map(<[Label]>::to_vec))
    }

    pub fn clear_labels(&mut self) -> Result<()> {
        self.edit_labels(|store, _| {
            store.clear();
            Ok(())
        })
    }

    pub fn set_rating(&mut self, dimension: RatingDimension, value: i64) -> Result<Annotation> {
        self.ensure_writable()?;
        self.require_document()?;
        let mut updated = self.book.get_or_default(self.current);
        updated.set_rating(dimension, value)?;
        self.book.set_at(self.current, updated.clone())?;
        self.persist_current();
        Ok(updated)
    }

    pub fn clear_rating(&mut self, dimension: RatingDimension) -> Result<Annotation> {
        self.ensure_writable()?;
        self.require_document()?;
        let mut updated = self.book.get_or_default(self.current);
        updated.clear_rating(dimension);
        self.book.set_at(self.current, updated.clone())?;
        self.persist_current();
        Ok(updated)
    }

    /// Wait until every save queued so far has been attempted.
    pub async fn flush(&self) {
        let Some(queue) = &self.saves else {
            return;
        };
        let (done, wait) = oneshot::channel();
        if queue.tx.send(SaveCommand::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.is_read_only() {
            return Err(AnnotateError::ReadOnly);
        }
        Ok(())
    }

    fn require_document(&self) -> Result<&Document> {
        self.documents
            .get(self.current)
            .ok_or(AnnotateError::IndexOutOfRange {
                index: self.current,
                len: self.documents.len(),
            })
    }

    /// Run a label edit against the current document. The label sequence is only
    /// replaced and saved when the edit succeeds.
    fn edit_labels<T>(&mut self, edit: impl FnOnce(&mut LabelStore, &str) -> Result<T>) -> Result<T> {
        self.ensure_writable()?;
        let index = self.current;
        let document = self.documents.get(index).ok_or(AnnotateError::IndexOutOfRange {
            index,
            len: self.documents.len(),
        })?;
        let mut store = LabelStore::from_labels(self.book.get_or_default(index).labels);
        let value = edit(&mut store, &document.summary)?;
        self.book.entry_mut(index)?.labels = store.into_labels();

        self.persist_current();
        Ok(value)
    }

    fn persist_current(&self) {
        let (Some(queue), Some(document_id)) = (&self.saves, self.book.document_id(self.current)) else {
            return;
        };
        let command = SaveCommand::Save {
            document_id: document_id.clone(),
            annotation: self.book.get_or_default(self.current),
        };
        if queue.tx.send(command).is_err() {
            warn!(document_id = %document_id, "save queue closed, annotation not saved");
        }
    }
}

async fn load(repo: &dyn AnnotationRepository, user: &str) -> Result<(Vec<Document>, AnnotationBook)> {
    let documents = repo.fetch_assigned_documents(user).await?;
    let persisted = repo.fetch_annotations(user).await?;
    let book = reconcile_with_persisted(&documents, &persisted)?;
    Ok((documents, book))
}
