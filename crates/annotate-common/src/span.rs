/// Resolution of user selections to character spans.
///
/// All offsets in this crate are character offsets (Unicode scalar values), so a
/// selection hint reported by a client counts characters, not bytes.
use crate::error::{AnnotateError, Result};
use crate::model::Span;

/// Character-offset view over a string.
pub struct TextIndex<'a> {
    text: &'a str,
    /// Byte offset of every char, plus `text.len()` as a sentinel.
    boundaries: Vec<usize>,
}

impl<'a> TextIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());
        Self { text, boundaries }
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.boundaries.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn byte_offset(&self, char_offset: usize) -> Option<usize> {
        self.boundaries.get(char_offset).copied()
    }

    fn char_offset(&self, byte_offset: usize) -> usize {
        // match_indices only yields char boundaries, so the search always hits.
        self.boundaries
            .binary_search(&byte_offset)
            .unwrap_or_else(|i| i)
    }

    /// Substring for a char span; `None` when the span is out of bounds or inverted.
    pub fn slice(&self, span: Span) -> Option<&'a str> {
        if span.start > span.end {
            return None;
        }
        let start = self.byte_offset(span.start)?;
        let end = self.byte_offset(span.end)?;
        Some(&self.text[start..end])
    }

    /// First occurrence of `needle` starting at or after `char_from`.
    pub fn find_from(&self, needle: &str, char_from: usize) -> Option<usize> {
        if needle.is_empty() {
            return None;
        }
        let from = self.byte_offset(char_from)?;
        self.text[from..]
            .find(needle)
            .map(|i| self.char_offset(from + i))
    }

    /// Start offsets of every occurrence of `needle`, overlapping ones included.
    pub fn occurrences(&self, needle: &str) -> Vec<usize> {
        let mut out = Vec::new();
        let mut from = 0;
        while let Some(start) = self.find_from(needle, from) {
            out.push(start);
            from = start + 1;
        }
        out
    }
}

/// Resolve a selection to a span of `document`.
///
/// `selection_start_hint` is the char offset at which the raw (untrimmed)
/// selection starts. The occurrence that starts exactly there wins; a selection
/// whose text exists elsewhere but not at the hint is rejected rather than
/// guessed.
pub fn locate(document: &str, selected_text: &str, selection_start_hint: usize) -> Result<Span> {
    let trimmed = selected_text.trim();
    if trimmed.is_empty() {
        return Err(AnnotateError::EmptySelection);
    }
    let leading = selected_text.chars().count() - selected_text.trim_start().chars().count();
    let hint = selection_start_hint.checked_add(leading).ok_or_else(|| {
        AnnotateError::SelectionHintMismatch {
            text: trimmed.to_string(),
            hint: selection_start_hint,
        }
    })?;

    let index = TextIndex::new(document);
    let occurrences = index.occurrences(trimmed);
    if occurrences.is_empty() {
        return Err(AnnotateError::SelectionNotFound(trimmed.to_string()));
    }

    let start = occurrences
        .into_iter()
        .find(|&start| start == hint)
        .ok_or_else(|| AnnotateError::SelectionHintMismatch {
            text: trimmed.to_string(),
            hint,
        })?;

    Ok(Span {
        start,
        end: start + trimmed.chars().count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const DOC: &str = "The cat sat on the mat.";

    #[test]
    fn locates_unique_word() {
        let span = locate(DOC, "cat", 4).unwrap();
        assert_eq!(span, Span { start: 4, end: 7 });
    }

    #[test]
    fn repeated_text_resolves_to_the_hinted_occurrence() {
        // "at" occurs in cat, sat and mat.
        assert_eq!(locate(DOC, "at", 5).unwrap(), Span { start: 5, end: 7 });
        assert_eq!(locate(DOC, "at", 9).unwrap(), Span { start: 9, end: 11 });
        assert_eq!(locate(DOC, "at", 20).unwrap(), Span { start: 20, end: 22 });
    }

    #[test]
    fn hint_that_matches_no_occurrence_is_rejected() {
        let err = locate(DOC, "at", 6).unwrap_err();
        assert!(matches!(err, AnnotateError::SelectionHintMismatch { hint: 6, .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn leading_whitespace_shifts_the_hint() {
        // Raw selection " cat " starts at the space before "cat".
        assert_eq!(locate(DOC, " cat ", 3).unwrap(), Span { start: 4, end: 7 });
    }

    #[test]
    fn hint_near_usize_max_is_rejected_not_overflowed() {
        let err = locate(DOC, " cat", usize::MAX).unwrap_err();
        assert!(matches!(err, AnnotateError::SelectionHintMismatch { hint: usize::MAX, .. }));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(locate(DOC, "cat", usize::MAX).is_err());
    }

    #[test]
    fn empty_and_missing_selections_fail() {
        assert!(matches!(locate(DOC, "  \n", 0), Err(AnnotateError::EmptySelection)));
        let err = locate(DOC, "dog", 0).unwrap_err();
        assert!(matches!(err, AnnotateError::SelectionNotFound(ref t) if t == "dog"));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn offsets_count_chars_not_bytes() {
        let doc = "Crème brûlée is sweet.";
        let span = locate(doc, "brûlée", 6).unwrap();
        assert_eq!(span, Span { start: 6, end: 12 });
        assert_eq!(TextIndex::new(doc).slice(span), Some("brûlée"));
    }

    #[test]
    fn text_index_finds_overlapping_occurrences() {
        let index = TextIndex::new("aaaa");
        assert_eq!(index.occurrences("aa"), vec![0, 1, 2]);
        assert_eq!(index.find_from("aa", 3), None);
        assert_eq!(index.find_from("a", 4), None);
        assert_eq!(index.find_from("a", 5), None);
        assert_eq!(index.len(), 4);
    }
}
