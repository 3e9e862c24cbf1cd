/// Ordered label sequence for one document.
///
/// Position is identity: deletion and positional edits address the index the
/// caller currently displays, and nothing here ever reorders the sequence.
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::error::{AnnotateError, Result};
use crate::model::Label;
use crate::span::TextIndex;

/// Outcome of [`LabelStore::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "change", content = "index", rename_all = "lowercase")]
pub enum LabelChange {
    Added(usize),
    Updated(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelStore {
    labels: Vec<Label>,
}

impl LabelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_labels(labels: Vec<Label>) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn into_labels(self) -> Vec<Label> {
        self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Append after checking the label against `summary`. Duplicates are allowed.
    pub fn add(&mut self, summary: &str, label: Label) -> Result<&[Label]> {
        validate_span(summary, &label)?;
        self.labels.push(label);
        Ok(&self.labels)
    }

    /// Index of the first label with exactly `text` whose stored start lies in
    /// `[hint_start - len(text), hint_start]`.
    pub fn find_match(&self, text: &str, hint_start: usize) -> Option<usize> {
        let window_start = hint_start.saturating_sub(text.chars().count());
        self.labels.iter().position(|l| {
            l.text == text && (window_start..=hint_start).contains(&l.start_index)
        })
    }

    /// Rewrite the category of the label matched by [`Self::find_match`].
    pub fn update_at(&mut self, text: &str, hint_start: usize, category: Category) -> Option<&[Label]> {
        let index = self.find_match(text, hint_start)?;
        self.labels[index].category = category;
        Some(&self.labels)
    }

    /// Recategorize a label placed at the same spot again, otherwise append.
    pub fn upsert(&mut self, summary: &str, label: Label) -> Result<LabelChange> {
        if let Some(index) = self.find_match(&label.text, label.start_index) {
            self.labels[index].category = label.category;
            return Ok(LabelChange::Updated(index));
        }
        self.add(summary, label)?;
        Ok(LabelChange::Added(self.labels.len() - 1))
    }

    pub fn delete_at(&mut self, index: usize) -> Result<&[Label]> {
        self.check_index(index)?;
        self.labels.remove(index);
        Ok(&self.labels)
    }

    pub fn set_category(&mut self, index: usize, category: Category) -> Result<&[Label]> {
        self.check_index(index)?;
        self.labels[index].category = category;
        Ok(&self.labels)
    }

    /// Blank corrections are stored as no correction.
    pub fn set_correction(&mut self, index: usize, corrected: Option<String>) -> Result<&[Label]> {
        self.check_index(index)?;
        self.labels[index].corrected_text = corrected.filter(|c| !c.trim().is_empty());
        Ok(&self.labels)
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.labels.len() {
            return Err(AnnotateError::IndexOutOfRange {
                index,
                len: self.labels.len(),
            });
        }
        Ok(())
    }
}

/// `0 <= start < end <= len(summary)` and the summary text at the span equals
/// the label text.
pub fn validate_span(summary: &str, label: &Label) -> Result<()> {
    let invalid = |reason: &str| AnnotateError::InvalidSpan {
        text: label.text.clone(),
        start: label.start_index,
        end: label.end_index,
        reason: reason.to_string(),
    };

    if label.start_index >= label.end_index {
        return Err(invalid("start must be before end"));
    }
    let index = TextIndex::new(summary);
    if label.end_index > index.len() {
        return Err(invalid("span runs past the end of the summary"));
    }
    match index.slice(label.span()) {
        Some(actual) if actual == label.text => Ok(()),
        _ => Err(invalid("summary text at span does not match label text")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::Span;
    use crate::span::locate;

    const DOC: &str = "The cat sat on the mat.";

    fn label_at(text: &str, hint: usize, category: Category) -> Label {
        let span = locate(DOC, text, hint).unwrap();
        Label::new(text, category, span)
    }

    #[test]
    fn add_keeps_creation_invariant() {
        let mut store = LabelStore::new();
        let labels = store.add(DOC, label_at("cat", 4, Category::EntityErrors)).unwrap();
        assert_eq!(
            labels[0],
            Label::new("cat", Category::EntityErrors, Span { start: 4, end: 7 })
        );
        let index = TextIndex::new(DOC);
        for l in store.labels() {
            assert_eq!(index.slice(l.span()), Some(l.text.as_str()));
        }
    }

    #[test]
    fn add_rejects_mismatched_spans_without_touching_state() {
        let mut store = LabelStore::new();
        store.add(DOC, label_at("cat", 4, Category::Omission)).unwrap();
        let before = store.clone();

        let wrong_text = Label::new("dog", Category::Omission, Span { start: 4, end: 7 });
        let inverted = Label::new("cat", Category::Omission, Span { start: 7, end: 4 });
        let past_end = Label::new("mat.", Category::Omission, Span { start: 19, end: 40 });
        for bad in [wrong_text, inverted, past_end] {
            let err = store.add(DOC, bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(store, before);
    }

    #[test]
    fn duplicates_are_appended() {
        let mut store = LabelStore::new();
        store.add(DOC, label_at("cat", 4, Category::Omission)).unwrap();
        store.add(DOC, label_at("cat", 4, Category::Omission)).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn delete_is_positional() {
        let l0 = label_at("cat", 4, Category::EntityErrors);
        let l1 = label_at("mat", 19, Category::Contradiction);

        let mut store = LabelStore::from_labels(vec![l0.clone(), l1.clone()]);
        assert_eq!(store.delete_at(0).unwrap(), &[l1.clone()]);

        let mut store = LabelStore::from_labels(vec![l0.clone(), l1.clone()]);
        assert_eq!(store.delete_at(1).unwrap(), &[l0.clone()]);

        let mut store = LabelStore::from_labels(vec![l0, l1]);
        let err = store.delete_at(2).unwrap_err();
        assert!(matches!(err, AnnotateError::IndexOutOfRange { index: 2, len: 2 }));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn delete_leaves_other_labels_untouched() {
        let labels = vec![
            label_at("The", 0, Category::Omission),
            label_at("cat", 4, Category::EntityErrors),
            label_at("sat", 8, Category::Contradiction),
            label_at("mat", 19, Category::Misinterpretation),
        ];
        for i in 0..labels.len() {
            let mut store = LabelStore::from_labels(labels.clone());
            store.delete_at(i).unwrap();
            let mut expected = labels.clone();
            expected.remove(i);
            assert_eq!(store.labels(), expected.as_slice());
        }
    }

    #[test]
    fn update_at_matches_text_near_hint() {
        let mut store = LabelStore::new();
        store.add(DOC, label_at("at", 5, Category::Omission)).unwrap();
        store.add(DOC, label_at("at", 20, Category::Omission)).unwrap();

        // Within [hint - len, hint] of the second label only.
        let labels = store.update_at("at", 21, Category::Contradiction).unwrap();
        assert_eq!(labels[0].category, Category::Omission);
        assert_eq!(labels[1].category, Category::Contradiction);

        assert!(store.update_at("at", 12, Category::Contradiction).is_none());
        assert!(store.update_at("cat", 4, Category::Contradiction).is_none());
    }

    #[test]
    fn upsert_recategorizes_same_selection() {
        let mut store = LabelStore::new();
        let first = store.upsert(DOC, label_at("cat", 4, Category::Omission)).unwrap();
        let again = store.upsert(DOC, label_at("cat", 4, Category::EntityErrors)).unwrap();
        let other = store.upsert(DOC, label_at("mat", 19, Category::Omission)).unwrap();

        assert_eq!(first, LabelChange::Added(0));
        assert_eq!(again, LabelChange::Updated(0));
        assert_eq!(other, LabelChange::Added(1));
        assert_eq!(store.labels()[0].category, Category::EntityErrors);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn positional_edits_check_bounds() {
        let mut store = LabelStore::from_labels(vec![label_at("cat", 4, Category::Omission)]);
        store.set_category(0, Category::IncorrectSynonyms).unwrap();
        store.set_correction(0, Some("dog".to_string())).unwrap();
        assert_eq!(store.labels()[0].category, Category::IncorrectSynonyms);
        assert_eq!(store.labels()[0].corrected_text.as_deref(), Some("dog"));

        store.set_correction(0, Some("  ".to_string())).unwrap();
        assert_eq!(store.labels()[0].corrected_text, None);

        assert!(store.set_category(1, Category::Omission).is_err());
        assert!(store.set_correction(3, None).is_err());
    }
}
