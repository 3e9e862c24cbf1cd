/// Workspace seed: users, documents, assignments and palette overrides loaded
/// from one JSON file at startup.
use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::category::Palette;
use crate::error::{AnnotateError, Result};
use crate::model::{Document, DocumentId, User, UserId};

#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedFile {
    users: Vec<SeedUser>,
    documents: Vec<Document>,
    #[serde(default)]
    assignments: HashMap<UserId, Vec<DocumentId>>,
    #[serde(default)]
    palette: HashMap<String, String>,
}

/// Validated seed contents.
#[derive(Debug, Clone)]
pub struct Workspace {
    users: Vec<SeedUser>,
    documents: Vec<Document>,
    assignments: HashMap<UserId, Vec<DocumentId>>,
    palette: Palette,
}

impl Workspace {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AnnotateError::Seed(format!("cannot read {}: {e}", path.display())))?;
        let workspace = Self::from_json(&raw)?;
        info!(
            path = %path.display(),
            users = workspace.users.len(),
            documents = workspace.documents.len(),
            "workspace seed loaded"
        );
        Ok(workspace)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let seed: SeedFile =
            serde_json::from_str(raw).map_err(|e| AnnotateError::Seed(format!("invalid seed JSON: {e}")))?;

        let mut doc_ids = HashSet::new();
        for doc in &seed.documents {
            if !doc_ids.insert(doc.id.as_str()) {
                return Err(AnnotateError::Seed(format!("duplicate document id: {}", doc.id)));
            }
        }
        let mut user_ids = HashSet::new();
        for user in &seed.users {
            if !user_ids.insert(user.id.as_str()) {
                return Err(AnnotateError::Seed(format!("duplicate user id: {}", user.id)));
            }
        }
        for (user, assigned) in &seed.assignments {
            if !user_ids.contains(user.as_str()) {
                return Err(AnnotateError::Seed(format!("assignments for unknown user: {user}")));
            }
            if let Some(missing) = assigned.iter().find(|id| !doc_ids.contains(id.as_str())) {
                return Err(AnnotateError::Seed(format!(
                    "user {user} is assigned unknown document {missing}"
                )));
            }
        }

        let palette = Palette::with_overrides(&seed.palette)?;
        Ok(Self {
            users: seed.users,
            documents: seed.documents,
            assignments: seed.assignments,
            palette,
        })
    }

    pub fn users(&self) -> &[SeedUser] {
        &self.users
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.users.iter().find(|u| u.id == id).map(|u| User {
            id: u.id.clone(),
            name: u.name.clone(),
        })
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Documents assigned to `user` in assignment order. Users without an
    /// assignment list get every document; unknown users get none.
    pub fn assigned_documents(&self, user: &str) -> Vec<Document> {
        if self.user(user).is_none() {
            return Vec::new();
        }
        match self.assignments.get(user) {
            Some(ids) => ids
                .iter()
                .filter_map(|id| self.documents.iter().find(|d| &d.id == id))
                .cloned()
                .collect(),
            None => self.documents.clone(),
        }
    }

    pub fn is_assigned(&self, user: &str, document_id: &str) -> bool {
        if self.user(user).is_none() {
            return false;
        }
        match self.assignments.get(user) {
            Some(ids) => ids.iter().any(|id| id == document_id),
            None => self.documents.iter().any(|d| d.id == document_id),
        }
    }
}
