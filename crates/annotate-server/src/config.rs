use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded explicitly from environment variables.
///
/// Redis URL is optional; without a reachable Redis, annotations live in process
/// memory for the lifetime of the server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Redis connection URL (e.g. "redis://127.0.0.1:6379"). `None` keeps annotations in memory.
    pub redis_url: Option<String>,
    /// Workspace seed file with users, documents and assignments.
    pub workspace_path: PathBuf,
    /// Id of the user this server annotates as.
    pub session_user: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `ANNOTATE_WORKSPACE_PATH`: path to the workspace seed JSON
    /// - `ANNOTATE_USER`: session user id, must be listed in the seed
    ///
    /// Optional:
    /// - `REDIS_URL`: Redis connection string (omit to keep annotations in memory)
    pub fn from_env() -> Result<Self, AppError> {
        let workspace_path = std::env::var("ANNOTATE_WORKSPACE_PATH").map_err(|_| {
            AppError::Config("ANNOTATE_WORKSPACE_PATH environment variable is required".to_string())
        })?;
        let workspace_path = PathBuf::from(workspace_path);
        if !workspace_path.is_file() {
            return Err(AppError::Config(format!(
                "workspace seed not found at {}",
                workspace_path.display()
            )));
        }

        let session_user = std::env::var("ANNOTATE_USER")
            .ok()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| AppError::Config("ANNOTATE_USER environment variable is required".to_string()))?;

        let redis_url = std::env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty());

        Ok(Self {
            redis_url,
            workspace_path,
            session_user,
        })
    }
}
