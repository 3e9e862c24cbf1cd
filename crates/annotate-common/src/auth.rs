/// Auth/session collaborator. Cookie handling lives outside this crate; the
/// provider only answers who the session user is and who may review.
use std::sync::Arc;

use crate::error::{AnnotateError, Result};
use crate::model::User;
use crate::seed::Workspace;

pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<User>;

    fn is_admin(&self, user_id: &str) -> bool;

    /// Every known user. Only admins may ask.
    fn list_users(&self, requester: &str) -> Result<Vec<User>>;
}

/// Auth backed by the workspace seed with a fixed session user.
pub struct StaticAuth {
    workspace: Arc<Workspace>,
    session_user: Option<String>,
}

impl StaticAuth {
    pub fn new(workspace: Arc<Workspace>, session_user: Option<String>) -> Self {
        Self {
            workspace,
            session_user,
        }
    }
}

impl AuthProvider for StaticAuth {
    fn current_user(&self) -> Option<User> {
        self.session_user
            .as_deref()
            .and_then(|id| self.workspace.user(id))
    }

    fn is_admin(&self, user_id: &str) -> bool {
        self.workspace
            .users()
            .iter()
            .any(|u| u.id == user_id && u.admin)
    }

    fn list_users(&self, requester: &str) -> Result<Vec<User>> {
        if !self.is_admin(requester) {
            return Err(AnnotateError::Forbidden(format!(
                "{requester} may not list users"
            )));
        }
        Ok(self
            .workspace
            .users()
            .iter()
            .map(|u| User {
                id: u.id.clone(),
                name: u.name.clone(),
            })
            .collect())
    }
}
