/// Per-session annotation state, keyed by document id and ordered by the
/// session's document list.
use std::collections::HashMap;

use schemars::JsonSchema;
use serde::Serialize;
use tracing::debug;

use crate::error::{AnnotateError, Result};
use crate::model::{
    Annotation, Document, DocumentId, Label, PersistedAnnotation, RATING_MAX, RatingDimension,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Progress {
    /// Documents with all four ratings set.
    pub complete: usize,
    /// Documents with any rating or label.
    pub started: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationBook {
    order: Vec<DocumentId>,
    entries: HashMap<DocumentId, Annotation>,
}

impl AnnotationBook {
    pub fn new(documents: &[Document]) -> Self {
        Self {
            order: documents.iter().map(|d| d.id.clone()).collect(),
            entries: HashMap::new(),
        }
    }

    pub fn document_id(&self, index: usize) -> Option<&DocumentId> {
        self.order.get(index)
    }

    /// Stored annotation for the document at `index`, or the default one.
    pub fn get_or_default(&self, index: usize) -> Annotation {
        self.order
            .get(index)
            .and_then(|id| self.entries.get(id))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_at(&mut self, index: usize, value: Annotation) -> Result<()> {
        let id = self.id_at(index)?.clone();
        self.entries.insert(id, value);
        Ok(())
    }

    /// Mutable slot for the document at `index`, created with defaults on first use.
    pub fn entry_mut(&mut self, index: usize) -> Result<&mut Annotation> {
        let id = self.id_at(index)?.clone();
        Ok(self.entries.entry(id).or_default())
    }

    pub fn to_sequence(&self) -> Vec<Annotation> {
        (0..self.order.len()).map(|i| self.get_or_default(i)).collect()
    }

    pub fn progress(&self) -> Progress {
        let mut progress = Progress {
            total: self.order.len(),
            ..Progress::default()
        };
        for annotation in self.order.iter().filter_map(|id| self.entries.get(id)) {
            if annotation.is_complete() {
                progress.complete += 1;
            }
            if annotation.is_started() {
                progress.started += 1;
            }
        }
        progress
    }

    fn id_at(&self, index: usize) -> Result<&DocumentId> {
        self.order.get(index).ok_or(AnnotateError::IndexOutOfRange {
            index,
            len: self.order.len(),
        })
    }
}

/// Merge persisted annotations into a fresh book for `documents`.
///
/// Missing ratings default to 0 and missing labels to an empty list; values
/// outside the stored schema reject the whole merge.
pub fn reconcile_with_persisted(
    documents: &[Document],
    persisted: &HashMap<DocumentId, PersistedAnnotation>,
) -> Result<AnnotationBook> {
    let mut book = AnnotationBook::new(documents);
    for document in documents {
        if let Some(stored) = persisted.get(&document.id) {
            let annotation = merge_persisted(&document.id, stored)?;
            book.entries.insert(document.id.clone(), annotation);
        }
    }
    for id in persisted.keys() {
        if !book.entries.contains_key(id) {
            debug!(document_id = %id, "ignoring persisted annotation for unassigned document");
        }
    }
    Ok(book)
}

fn merge_persisted(document_id: &str, stored: &PersistedAnnotation) -> Result<Annotation> {
    let malformed = |reason: String| AnnotateError::MalformedRecord {
        document_id: document_id.to_string(),
        reason,
    };
    let rating = |dimension: RatingDimension, value: Option<i64>| -> Result<u8> {
        let value = value.unwrap_or(0);
        u8::try_from(value)
            .ok()
            .filter(|v| *v <= RATING_MAX)
            .ok_or_else(|| malformed(format!("{dimension} rating {value} outside 0..=5")))
    };

    let labels: Vec<Label> = stored.labels.clone().unwrap_or_default();
    for (i, label) in labels.iter().enumerate() {
        if label.text.is_empty() || label.start_index >= label.end_index {
            return Err(malformed(format!("label {i} has an empty or inverted span")));
        }
    }

    Ok(Annotation {
        comprehensiveness: rating(RatingDimension::Comprehensiveness, stored.comprehensiveness)?,
        layness: rating(RatingDimension::Layness, stored.layness)?,
        factuality: rating(RatingDimension::Factuality, stored.factuality)?,
        usefulness: rating(RatingDimension::Usefulness, stored.usefulness)?,
        labels,
    })
}
