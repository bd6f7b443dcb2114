use serde::{Deserialize, Serialize};

use super::WorkspaceMember;

/// Slug of the workspace auto-created with every organization. It is the
/// organization's permanent anchor and can never be deleted on its own.
pub const DEFAULT_WORKSPACE_SLUG: &str = "default";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    /// Unique within the parent organization, not globally.
    pub slug: String,
    pub description: Option<String>,
    pub settings: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Workspace {
    pub fn is_default(&self) -> bool {
        self.slug == DEFAULT_WORKSPACE_SLUG
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkspace {
    #[serde(rename = "organizationId")]
    pub organization_id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateWorkspace {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub settings: Option<serde_json::Value>,
}

/// Aggregate counts sourced from collaborator subsystems.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WorkspaceCounts {
    pub complaints: i64,
    pub projects: i64,
    pub members: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceWithDetails {
    #[serde(flatten)]
    pub workspace: Workspace,
    pub members: Vec<WorkspaceMember>,
    #[serde(rename = "_count")]
    pub counts: WorkspaceCounts,
}
