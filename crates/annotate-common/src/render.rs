/// Highlight rendering: turns a summary and its labels into a flat run of plain
/// and labeled segments that covers the summary exactly once.
///
/// A label whose stored span still reads its own text is drawn at that span. A
/// label whose span went stale (the summary changed under it) falls back to
/// searching for its text from the current cursor. Labels that would overlap an
/// already drawn label are not drawn and are reported in `hidden`.
use schemars::JsonSchema;
use serde::Serialize;

use crate::category::{Category, Palette};
use crate::model::{Label, Span};
use crate::span::TextIndex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Segment {
    Plain {
        text: String,
    },
    Labeled {
        text: String,
        category: Category,
        color: String,
        /// Position of the label in the document's label sequence.
        label_index: usize,
    },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Segment::Plain { text } | Segment::Labeled { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct Rendering {
    pub segments: Vec<Segment>,
    /// Sequence indices of labels that could not be drawn, ascending.
    pub hidden: Vec<usize>,
}

impl Rendering {
    /// Concatenation of all segment texts; always equals the rendered document.
    pub fn text(&self) -> String {
        self.segments.iter().map(Segment::text).collect()
    }
}

struct Candidate<'l> {
    label: &'l Label,
    index: usize,
    /// Stored start for fresh labels, first occurrence for stale ones.
    sort_key: usize,
    fresh: bool,
}

pub struct HighlightRenderer<'p> {
    palette: &'p Palette,
}

impl<'p> HighlightRenderer<'p> {
    pub fn new(palette: &'p Palette) -> Self {
        Self { palette }
    }

    pub fn render(&self, document: &str, labels: &[Label]) -> Rendering {
        let text = TextIndex::new(document);
        let mut hidden = Vec::new();

        let mut candidates: Vec<Candidate<'_>> = Vec::with_capacity(labels.len());
        for (index, label) in labels.iter().enumerate() {
            let fresh = !label.text.is_empty() && text.slice(label.span()) == Some(label.text.as_str());
            let sort_key = if fresh {
                Some(label.start_index)
            } else {
                text.find_from(&label.text, 0)
            };
            match sort_key {
                Some(sort_key) => candidates.push(Candidate {
                    label,
                    index,
                    sort_key,
                    fresh,
                }),
                None => hidden.push(index),
            }
        }
        candidates.sort_by(|a, b| {
            a.sort_key
                .cmp(&b.sort_key)
                .then_with(|| a.label.text.chars().count().cmp(&b.label.text.chars().count()))
                .then_with(|| a.index.cmp(&b.index))
        });

        let mut segments = Vec::new();
        let mut cursor = 0;
        for candidate in candidates {
            let start = if candidate.fresh {
                Some(candidate.label.start_index)
            } else {
                text.find_from(&candidate.label.text, cursor)
            };
            let Some(start) = start.filter(|&s| s >= cursor) else {
                hidden.push(candidate.index);
                continue;
            };
            let end = start + candidate.label.text.chars().count();

            if start > cursor {
                push_plain(&mut segments, &text, cursor, start);
            }
            segments.push(Segment::Labeled {
                text: slice(&text, start, end),
                category: candidate.label.category,
                color: self.palette.color(candidate.label.category).to_string(),
                label_index: candidate.index,
            });
            cursor = end;
        }
        if cursor < text.len() {
            push_plain(&mut segments, &text, cursor, text.len());
        }

        hidden.sort_unstable();
        Rendering { segments, hidden }
    }
}

fn push_plain(segments: &mut Vec<Segment>, text: &TextIndex<'_>, start: usize, end: usize) {
    segments.push(Segment::Plain {
        text: slice(text, start, end),
    });
}

fn slice(text: &TextIndex<'_>, start: usize, end: usize) -> String {
    text.slice(Span { start, end })
        .map(str::to_string)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelStore;
    use crate::span::locate;

    const DOC: &str = "The cat sat on the mat.";

    fn label(text: &str, hint: usize, category: Category) -> Label {
        Label::new(text, category, locate(DOC, text, hint).unwrap())
    }

    fn plain(text: &str) -> Segment {
        Segment::Plain {
            text: text.to_string(),
        }
    }

    fn labeled(text: &str, category: Category, label_index: usize) -> Segment {
        Segment::Labeled {
            text: text.to_string(),
            category,
            color: Palette::default().color(category).to_string(),
            label_index,
        }
    }

    #[test]
    fn renders_single_label_between_plain_runs() {
        let palette = Palette::default();
        let labels = vec![label("cat", 4, Category::EntityErrors)];
        let rendering = HighlightRenderer::new(&palette).render(DOC, &labels);
        assert_eq!(
            rendering.segments,
            vec![
                plain("The "),
                labeled("cat", Category::EntityErrors, 0),
                plain(" sat on the mat."),
            ]
        );
        assert!(rendering.hidden.is_empty());
        assert_eq!(palette.color(Category::EntityErrors), "#FFE4BA");
    }

    #[test]
    fn no_labels_is_one_plain_run() {
        let palette = Palette::default();
        let rendering = HighlightRenderer::new(&palette).render(DOC, &[]);
        assert_eq!(rendering.segments, vec![plain(DOC)]);
        let empty = HighlightRenderer::new(&palette).render("", &[]);
        assert!(empty.segments.is_empty());
    }

    #[test]
    fn labels_render_in_document_order_regardless_of_sequence_order() {
        let palette = Palette::default();
        let labels = vec![
            label("mat", 19, Category::Omission),
            label("The", 0, Category::Contradiction),
            label("sat", 8, Category::Misinterpretation),
        ];
        let rendering = HighlightRenderer::new(&palette).render(DOC, &labels);
        assert_eq!(
            rendering.segments,
            vec![
                labeled("The", Category::Contradiction, 1),
                plain(" cat "),
                labeled("sat", Category::Misinterpretation, 2),
                plain(" on the "),
                labeled("mat", Category::Omission, 0),
                plain("."),
            ]
        );
    }

    #[test]
    fn adjacent_labels_have_no_gap() {
        let palette = Palette::default();
        let labels = vec![
            label("cat", 4, Category::Omission),
            Label::new(" sat", Category::Omission, Span { start: 7, end: 11 }),
        ];
        let rendering = HighlightRenderer::new(&palette).render(DOC, &labels);
        assert_eq!(
            rendering.segments,
            vec![
                plain("The "),
                labeled("cat", Category::Omission, 0),
                labeled(" sat", Category::Omission, 1),
                plain(" on the mat."),
            ]
        );
    }

    #[test]
    fn shorter_label_wins_at_same_start_and_overlap_is_hidden() {
        let palette = Palette::default();
        let labels = vec![
            label("cat sat", 4, Category::Omission),
            label("cat", 4, Category::EntityErrors),
            label("at sat on", 5, Category::Contradiction),
        ];
        let rendering = HighlightRenderer::new(&palette).render(DOC, &labels);
        assert_eq!(
            rendering.segments,
            vec![
                plain("The "),
                labeled("cat", Category::EntityErrors, 1),
                plain(" sat on the mat."),
            ]
        );
        assert_eq!(rendering.hidden, vec![0, 2]);
    }

    #[test]
    fn stale_label_falls_back_to_search_from_cursor() {
        let palette = Palette::default();
        // Offsets recorded against an older summary text.
        let stale = Label::new("mat", Category::Omission, Span { start: 2, end: 5 });
        let gone = Label::new("dog", Category::Omission, Span { start: 0, end: 3 });
        let labels = vec![label("cat", 4, Category::EntityErrors), stale, gone];
        let rendering = HighlightRenderer::new(&palette).render(DOC, &labels);
        assert_eq!(
            rendering.segments,
            vec![
                plain("The "),
                labeled("cat", Category::EntityErrors, 0),
                plain(" sat on the "),
                labeled("mat", Category::Omission, 1),
                plain("."),
            ]
        );
        assert_eq!(rendering.hidden, vec![2]);
    }

    #[test]
    fn deleting_one_label_keeps_every_other_label_drawn() {
        let palette = Palette::default();
        let labels = vec![
            label("The", 0, Category::Omission),
            label("cat", 4, Category::EntityErrors),
            label("sat", 8, Category::Contradiction),
            label("mat", 19, Category::Misinterpretation),
        ];
        for i in 0..labels.len() {
            let mut store = LabelStore::from_labels(labels.clone());
            store.delete_at(i).unwrap();
            let rendering = HighlightRenderer::new(&palette).render(DOC, store.labels());

            let drawn: Vec<(&str, Category, usize)> = rendering
                .segments
                .iter()
                .filter_map(|s| match s {
                    Segment::Labeled {
                        text,
                        category,
                        label_index,
                        ..
                    } => Some((text.as_str(), *category, *label_index)),
                    Segment::Plain { .. } => None,
                })
                .collect();
            let expected: Vec<(&str, Category, usize)> = labels
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, l)| (l.text.as_str(), l.category, if j > i { j - 1 } else { j }))
                .collect();

            assert_eq!(drawn, expected, "after deleting label {i}");
            assert!(rendering.hidden.is_empty());
            assert_eq!(rendering.text(), DOC);
        }
    }

    #[test]
    fn segments_reconstruct_the_document() {
        let palette = Palette::default();
        let doc = "Ünïcode at the start, at the end: at";
        let mut labels = Vec::new();
        for start in [8, 22, 34] {
            labels.push(Label::new("at", Category::Omission, locate(doc, "at", start).unwrap()));
        }
        labels.push(Label::new("Ünïcode", Category::Contradiction, locate(doc, "Ünïcode", 0).unwrap()));
        labels.push(Label::new("the start", Category::Omission, Span { start: 1, end: 10 }));

        let rendering = HighlightRenderer::new(&palette).render(doc, &labels);
        assert_eq!(rendering.text(), doc);
        assert!(rendering
            .segments
            .iter()
            .all(|s| !s.text().is_empty()));
    }
}
