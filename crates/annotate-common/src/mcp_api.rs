use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::book::Progress;
use crate::category::Category;
use crate::labels::LabelChange;
use crate::model::{Annotation, Label, RatingDimension, User};
use crate::render::Rendering;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct NavigateParams {
    /// Step one document forward or back. Ignored when `index` is given.
    pub direction: Option<Direction>,
    /// Jump to this zero-based document position.
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SelectTextParams {
    /// The selected summary text, as the client saw it.
    pub text: String,
    /// Character offset in the summary where the selection starts.
    pub start: usize,
    /// Category display name, e.g. "Entity errors".
    pub category: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RelabelParams {
    /// Position of the label in the current document's label list.
    pub index: usize,
    pub category: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CorrectLabelParams {
    pub index: usize,
    /// Replacement text; omit or leave blank to remove the correction.
    pub corrected_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteLabelParams {
    pub index: usize,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SetRatingParams {
    pub dimension: RatingDimension,
    /// 1..=5, or 0 to unset.
    pub value: i64,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ReviewUserParams {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DocumentSummary {
    pub index: usize,
    pub id: String,
    pub started: bool,
    pub complete: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DocumentListResponse {
    pub current_index: usize,
    pub documents: Vec<DocumentSummary>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DocumentView {
    pub index: usize,
    pub total: usize,
    pub document_id: String,
    pub text: String,
    pub summary: String,
    pub annotation: Annotation,
    pub rendering: Rendering,
    pub read_only: bool,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SelectTextResponse {
    pub change: LabelChange,
    pub labels: Vec<Label>,
    pub rendering: Rendering,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct LabelsResponse {
    pub labels: Vec<Label>,
    pub rendering: Rendering,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AnnotationResponse {
    pub annotation: Annotation,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ProgressResponse {
    pub progress: Progress,
    /// Saves that failed since the session opened; local state was kept.
    pub failed_saves: u64,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct UserListResponse {
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ReviewedDocument {
    pub document_id: String,
    pub annotation: Annotation,
    pub rendering: Rendering,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ReviewResponse {
    pub user: User,
    pub progress: Progress,
    pub documents: Vec<ReviewedDocument>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CategoryInfo {
    pub category: Category,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CategoryListResponse {
    pub categories: Vec<CategoryInfo>,
}
