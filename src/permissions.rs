//! Permission evaluator: pure membership/role lookups.
//!
//! Every mutating operation declares its own explicit allowed-role set;
//! there is no implied hierarchy and no caching. Each check re-reads the
//! membership row so a revoked role takes effect on the next request.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{OrgMember, OrgRole, WorkspaceMember, WorkspaceRole};

/// Fetch the actor's organization membership and require one of the
/// allowed roles. No membership row means deny.
pub fn require_org_role(
    conn: &Connection,
    user_id: &str,
    organization_id: &str,
    allowed: &[OrgRole],
) -> Result<OrgMember> {
    let member = queries::get_org_member(conn, organization_id, user_id)?;
    match member {
        Some(member) if allowed.contains(&member.role) => Ok(member),
        Some(member) => {
            tracing::warn!(
                user_id,
                organization_id,
                role = member.role.as_ref(),
                "insufficient organization role"
            );
            Err(AppError::Forbidden("Insufficient permissions".into()))
        }
        None => {
            tracing::warn!(user_id, organization_id, "no organization membership");
            Err(AppError::Forbidden("Access denied".into()))
        }
    }
}

/// Require any organization membership, regardless of role.
pub fn require_org_membership(
    conn: &Connection,
    user_id: &str,
    organization_id: &str,
) -> Result<OrgMember> {
    queries::get_org_member(conn, organization_id, user_id)?
        .ok_or_else(|| AppError::Forbidden("Access denied".into()))
}

/// Fetch the actor's workspace membership and require one of the
/// allowed roles.
pub fn require_workspace_role(
    conn: &Connection,
    user_id: &str,
    workspace_id: &str,
    allowed: &[WorkspaceRole],
) -> Result<WorkspaceMember> {
    let member = queries::get_workspace_member(conn, workspace_id, user_id)?;
    match member {
        Some(member) if allowed.contains(&member.role) => Ok(member),
        Some(member) => {
            tracing::warn!(
                user_id,
                workspace_id,
                role = member.role.as_ref(),
                "insufficient workspace role"
            );
            Err(AppError::Forbidden("Insufficient permissions".into()))
        }
        None => {
            tracing::warn!(user_id, workspace_id, "no workspace membership");
            Err(AppError::Forbidden("Access denied".into()))
        }
    }
}

/// True when the user holds any membership in the workspace.
pub fn is_workspace_member(
    conn: &Connection,
    user_id: &str,
    workspace_id: &str,
) -> Result<bool> {
    Ok(queries::get_workspace_member(conn, workspace_id, user_id)?.is_some())
}
