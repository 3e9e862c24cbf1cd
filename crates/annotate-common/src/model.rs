use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::error::AnnotateError;

pub type DocumentId = String;
pub type UserId = String;

/// A source text with its generated summary. Labels always point into `summary`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Document {
    pub id: DocumentId,
    /// Source text the summary was generated from.
    pub text: String,
    /// Summary under review.
    pub summary: String,
    /// Free-form metadata carried through from the workspace seed.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Half-open character range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A categorized span of a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Label {
    pub text: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub start_index: usize,
    pub end_index: usize,
    /// Annotator-supplied replacement for the labeled text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_text: Option<String>,
}

impl Label {
    pub fn new(text: impl Into<String>, category: Category, span: Span) -> Self {
        Self {
            text: text.into(),
            category,
            start_index: span.start,
            end_index: span.end,
            corrected_text: None,
        }
    }

    pub fn span(&self) -> Span {
        Span {
            start: self.start_index,
            end: self.end_index,
        }
    }
}

/// The four rated quality dimensions of a summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RatingDimension {
    Comprehensiveness,
    Layness,
    Factuality,
    Usefulness,
}

impl RatingDimension {
    pub const ALL: [RatingDimension; 4] = [
        RatingDimension::Comprehensiveness,
        RatingDimension::Layness,
        RatingDimension::Factuality,
        RatingDimension::Usefulness,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RatingDimension::Comprehensiveness => "comprehensiveness",
            RatingDimension::Layness => "layness",
            RatingDimension::Factuality => "factuality",
            RatingDimension::Usefulness => "usefulness",
        }
    }
}

impl fmt::Display for RatingDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub const RATING_UNSET: u8 = 0;
pub const RATING_MIN: u8 = 1;
pub const RATING_MAX: u8 = 5;

/// One annotator's judgment of one summary. A rating of `0` means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Annotation {
    pub comprehensiveness: u8,
    pub layness: u8,
    pub factuality: u8,
    pub usefulness: u8,
    pub labels: Vec<Label>,
}

impl Annotation {
    pub fn rating(&self, dimension: RatingDimension) -> u8 {
        match dimension {
            RatingDimension::Comprehensiveness => self.comprehensiveness,
            RatingDimension::Layness => self.layness,
            RatingDimension::Factuality => self.factuality,
            RatingDimension::Usefulness => self.usefulness,
        }
    }

    /// Sets a final rating; only `1..=5` is accepted.
    pub fn set_rating(&mut self, dimension: RatingDimension, value: i64) -> Result<(), AnnotateError> {
        let value = u8::try_from(value)
            .ok()
            .filter(|v| (RATING_MIN..=RATING_MAX).contains(v))
            .ok_or_else(|| AnnotateError::InvalidRating {
                dimension: dimension.to_string(),
                value,
            })?;
        *self.rating_mut(dimension) = value;
        Ok(())
    }

    pub fn clear_rating(&mut self, dimension: RatingDimension) {
        *self.rating_mut(dimension) = RATING_UNSET;
    }

    fn rating_mut(&mut self, dimension: RatingDimension) -> &mut u8 {
        match dimension {
            RatingDimension::Comprehensiveness => &mut self.comprehensiveness,
            RatingDimension::Layness => &mut self.layness,
            RatingDimension::Factuality => &mut self.factuality,
            RatingDimension::Usefulness => &mut self.usefulness,
        }
    }

    /// All four ratings set.
    pub fn is_complete(&self) -> bool {
        RatingDimension::ALL
            .into_iter()
            .all(|d| self.rating(d) != RATING_UNSET)
    }

    /// Any rating set or any label placed.
    pub fn is_started(&self) -> bool {
        !self.labels.is_empty()
            || RatingDimension::ALL
                .into_iter()
                .any(|d| self.rating(d) != RATING_UNSET)
    }
}

/// Annotation as read back from storage. Every field may be missing; unknown
/// fields are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersistedAnnotation {
    #[serde(default)]
    pub comprehensiveness: Option<i64>,
    #[serde(default)]
    pub layness: Option<i64>,
    #[serde(default)]
    pub factuality: Option<i64>,
    #[serde(default)]
    pub usefulness: Option<i64>,
    #[serde(default)]
    pub labels: Option<Vec<Label>>,
}

impl From<&Annotation> for PersistedAnnotation {
    fn from(a: &Annotation) -> Self {
        Self {
            comprehensiveness: Some(a.comprehensiveness.into()),
            layness: Some(a.layness.into()),
            factuality: Some(a.factuality.into()),
            usefulness: Some(a.usefulness.into()),
            labels: Some(a.labels.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_uses_camel_case_wire_names() {
        let label = Label::new("cat", Category::EntityErrors, Span { start: 4, end: 7 });
        let json = serde_json::to_value(&label).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "text": "cat",
                "type": "Entity errors",
                "startIndex": 4,
                "endIndex": 7,
            })
        );
    }

    #[test]
    fn set_rating_rejects_out_of_range_and_keeps_previous() {
        let mut a = Annotation::default();
        a.set_rating(RatingDimension::Layness, 4).unwrap();
        assert!(a.set_rating(RatingDimension::Layness, 0).is_err());
        assert!(a.set_rating(RatingDimension::Layness, 6).is_err());
        assert!(a.set_rating(RatingDimension::Layness, -1).is_err());
        assert_eq!(a.layness, 4);
    }

    #[test]
    fn complete_requires_all_four() {
        let mut a = Annotation::default();
        assert!(!a.is_started());
        for (i, d) in RatingDimension::ALL.into_iter().enumerate() {
            assert!(!a.is_complete());
            a.set_rating(d, 3).unwrap();
            assert!(a.is_started(), "started after {i} ratings");
        }
        assert!(a.is_complete());
        a.clear_rating(RatingDimension::Factuality);
        assert!(!a.is_complete());
    }

    #[test]
    fn persisted_shape_rejects_unknown_fields() {
        let raw = r#"{"comprehensiveness": 2, "laymanFriendliness": 3}"#;
        assert!(serde_json::from_str::<PersistedAnnotation>(raw).is_err());

        let raw = r#"{"layness": 3, "labels": null}"#;
        let parsed: PersistedAnnotation = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.layness, Some(3));
        assert!(parsed.labels.is_none());
        assert!(parsed.factuality.is_none());
    }
}
