/// MCP server exposing one annotation session.
///
/// Annotator tools act on the current document of the session. `review_user` opens a
/// separate read-only snapshot of another user's work and never writes.
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tokio::sync::Mutex;
use tracing::info;

use annotate_common::auth::AuthProvider;
use annotate_common::category::{Category, Palette};
use annotate_common::error::AnnotateError;
use annotate_common::mcp_api::{
    AnnotationResponse, CategoryInfo, CategoryListResponse, CorrectLabelParams, DeleteLabelParams,
    Direction, DocumentListResponse, DocumentSummary, DocumentView, LabelsResponse, NavigateParams,
    ProgressResponse, RelabelParams, ReviewResponse, ReviewUserParams, ReviewedDocument,
    SelectTextParams, SelectTextResponse, SetRatingParams, UserListResponse,
};
use annotate_common::model::{Label, RATING_UNSET};
use annotate_common::render::HighlightRenderer;
use annotate_common::repository::AnnotationRepository;
use annotate_common::session::AnnotationSession;

#[derive(Clone)]
pub struct AnnotateServer {
    session: Arc<Mutex<AnnotationSession>>,
    repo: Arc<dyn AnnotationRepository>,
    auth: Arc<dyn AuthProvider>,
    palette: Palette,
    tool_router: ToolRouter<AnnotateServer>,
}

impl AnnotateServer {
    pub fn new(
        session: AnnotationSession,
        repo: Arc<dyn AnnotationRepository>,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        let palette = session.palette().clone();
        Self {
            session: Arc::new(Mutex::new(session)),
            repo,
            auth,
            palette,
            tool_router: Self::tool_router(),
        }
    }

    /// Wait for queued saves; called on shutdown.
    pub async fn flush(&self) {
        self.session.lock().await.flush().await;
    }
}

fn tool_err(e: AnnotateError) -> String {
    e.to_string()
}

fn parse_category(name: &str) -> Result<Category, String> {
    name.parse::<Category>().map_err(tool_err)
}

fn view(session: &AnnotationSession) -> Result<DocumentView, String> {
    let document = session
        .current_document()
        .ok_or_else(|| "no documents are assigned to this session".to_string())?;
    Ok(DocumentView {
        index: session.current_index(),
        total: session.documents().len(),
        document_id: document.id.clone(),
        text: document.text.clone(),
        summary: document.summary.clone(),
        annotation: session.current_annotation(),
        rendering: session.render_current().map_err(tool_err)?,
        read_only: session.is_read_only(),
    })
}

fn labels_response(session: &AnnotationSession, labels: Vec<Label>) -> Result<LabelsResponse, String> {
    Ok(LabelsResponse {
        labels,
        rendering: session.render_current().map_err(tool_err)?,
    })
}

#[tool_router]
impl AnnotateServer {
    #[tool(description = "List the documents assigned to this session with their annotation state.")]
    async fn list_documents(&self) -> Result<Json<DocumentListResponse>, String> {
        let session = self.session.lock().await;
        let documents = session
            .documents()
            .iter()
            .zip(session.annotations())
            .enumerate()
            .map(|(index, (doc, annotation))| DocumentSummary {
                index,
                id: doc.id.clone(),
                started: annotation.is_started(),
                complete: annotation.is_complete(),
            })
            .collect();
        Ok(Json(DocumentListResponse {
            current_index: session.current_index(),
            documents,
        }))
    }

    #[tool(description = "Show the current document: source text, summary, ratings, labels and the highlighted summary segments.")]
    async fn show_document(&self) -> Result<Json<DocumentView>, String> {
        let session = self.session.lock().await;
        Ok(Json(view(&session)?))
    }

    #[tool(description = "Move to the next or previous document, or jump to a zero-based index. Returns the new current document.")]
    async fn navigate(
        &self,
        Parameters(params): Parameters<NavigateParams>,
    ) -> Result<Json<DocumentView>, String> {
        let mut session = self.session.lock().await;
        match (params.index, params.direction) {
            (Some(index), _) => {
                session.go_to(index).map_err(tool_err)?;
            }
            (None, Some(Direction::Next)) => {
                session.next();
            }
            (None, Some(Direction::Previous)) => {
                session.previous();
            }
            (None, None) => return Err("either direction or index is required".to_string()),
        }
        Ok(Json(view(&session)?))
    }

    #[tool(description = "Label selected summary text with an error category. `start` is the character offset where the selection begins; selecting an already labeled spot again changes its category.")]
    async fn select_text(
        &self,
        Parameters(params): Parameters<SelectTextParams>,
    ) -> Result<Json<SelectTextResponse>, String> {
        let category = parse_category(&params.category)?;
        let mut session = self.session.lock().await;
        let change = session
            .select(&params.text, params.start, category)
            .map_err(tool_err)?;
        Ok(Json(SelectTextResponse {
            change,
            labels: session.current_annotation().labels,
            rendering: session.render_current().map_err(tool_err)?,
        }))
    }

    #[tool(description = "Change the category of the label at `index` in the current document.")]
    async fn relabel(
        &self,
        Parameters(params): Parameters<RelabelParams>,
    ) -> Result<Json<LabelsResponse>, String> {
        let category = parse_category(&params.category)?;
        let mut session = self.session.lock().await;
        let labels = session.relabel(params.index, category).map_err(tool_err)?;
        Ok(Json(labels_response(&session, labels)?))
    }

    #[tool(description = "Attach or remove corrected text on the label at `index` in the current document.")]
    async fn correct_label(
        &self,
        Parameters(params): Parameters<CorrectLabelParams>,
    ) -> Result<Json<LabelsResponse>, String> {
        let mut session = self.session.lock().await;
        let labels = session
            .correct_label(params.index, params.corrected_text)
            .map_err(tool_err)?;
        Ok(Json(labels_response(&session, labels)?))
    }

    #[tool(description = "Delete the label at `index` (its position in the current label list).")]
    async fn delete_label(
        &self,
        Parameters(params): Parameters<DeleteLabelParams>,
    ) -> Result<Json<LabelsResponse>, String> {
        let mut session = self.session.lock().await;
        let labels = session.delete_label(params.index).map_err(tool_err)?;
        Ok(Json(labels_response(&session, labels)?))
    }

    #[tool(description = "Remove every label from the current document.")]
    async fn clear_labels(&self) -> Result<Json<LabelsResponse>, String> {
        let mut session = self.session.lock().await;
        session.clear_labels().map_err(tool_err)?;
        Ok(Json(labels_response(&session, Vec::new())?))
    }

    #[tool(description = "Rate the current summary on one dimension (comprehensiveness, layness, factuality, usefulness) from 1 to 5; 0 unsets the rating.")]
    async fn set_rating(
        &self,
        Parameters(params): Parameters<SetRatingParams>,
    ) -> Result<Json<AnnotationResponse>, String> {
        let mut session = self.session.lock().await;
        let result = if params.value == i64::from(RATING_UNSET) {
            session.clear_rating(params.dimension)
        } else {
            session.set_rating(params.dimension, params.value)
        };
        let annotation = result.map_err(tool_err)?;
        Ok(Json(AnnotationResponse { annotation }))
    }

    #[tool(description = "Count documents that are fully rated and documents that have been started.")]
    async fn get_progress(&self) -> Result<Json<ProgressResponse>, String> {
        let session = self.session.lock().await;
        Ok(Json(ProgressResponse {
            progress: session.progress(),
            failed_saves: session.failed_saves(),
        }))
    }

    #[tool(description = "List the error categories and their highlight colors.")]
    async fn list_categories(&self) -> Result<Json<CategoryListResponse>, String> {
        let categories = Category::ALL
            .into_iter()
            .map(|category| CategoryInfo {
                category,
                color: self.palette.color(category).to_string(),
            })
            .collect();
        Ok(Json(CategoryListResponse { categories }))
    }

    #[tool(description = "List all users (admin only).")]
    async fn list_users(&self) -> Result<Json<UserListResponse>, String> {
        let requester = self
            .auth
            .current_user()
            .ok_or_else(|| tool_err(AnnotateError::Unauthenticated))?;
        let users = self.auth.list_users(&requester.id).map_err(tool_err)?;
        Ok(Json(UserListResponse { users }))
    }

    #[tool(description = "Read-only snapshot of another user's annotations with rendered summaries (admin only).")]
    async fn review_user(
        &self,
        Parameters(params): Parameters<ReviewUserParams>,
    ) -> Result<Json<ReviewResponse>, String> {
        let subject = params.user_id.trim().to_string();
        if subject.is_empty() {
            return Err("user_id must not be empty".to_string());
        }
        info!(subject = %subject, "review_user tool invoked");

        let review = AnnotationSession::open_review(
            Arc::clone(&self.repo),
            self.auth.as_ref(),
            self.palette.clone(),
            &subject,
        )
        .await
        .map_err(tool_err)?;

        let renderer = HighlightRenderer::new(review.palette());
        let documents = review
            .documents()
            .iter()
            .zip(review.annotations())
            .map(|(doc, annotation)| ReviewedDocument {
                document_id: doc.id.clone(),
                rendering: renderer.render(&doc.summary, &annotation.labels),
                annotation,
            })
            .collect();

        Ok(Json(ReviewResponse {
            user: review.user().clone(),
            progress: review.progress(),
            documents,
        }))
    }
}

#[tool_handler]
impl ServerHandler for AnnotateServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "annotate-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Summary annotation MCP server. Use list_documents and navigate to move between \
                 assigned documents, show_document to read the source and summary, set_rating for \
                 the four quality ratings, and select_text / relabel / correct_label / delete_label \
                 to mark error spans in the summary. Admins can use list_users and review_user for \
                 a read-only view of another annotator's work."
                    .to_string(),
            ),
        }
    }
}
