use annotate_common::error::AnnotateError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Annotate(#[from] AnnotateError),

    #[error("config error: {0}")]
    Config(String),
}
