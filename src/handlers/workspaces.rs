use axum::extract::{Extension, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::middleware::SessionContext;
use crate::models::{
    CreateWorkspace, OrgRole, UpdateWorkspace, Workspace, WorkspaceRole, WorkspaceWithDetails,
};
use crate::permissions;
use crate::response::ApiResponse;
use crate::validate::{validate_create_workspace, validate_update_workspace};

#[derive(Debug, Deserialize)]
pub struct ListWorkspacesQuery {
    #[serde(rename = "organizationId")]
    pub organization_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WorkspaceIdQuery {
    pub id: Option<String>,
}

/// GET /workspaces?organizationId=: any organization member may list;
/// counts come from the collaborator subsystems.
pub async fn list_workspaces(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Query(query): Query<ListWorkspacesQuery>,
) -> Result<Json<ApiResponse<Vec<WorkspaceWithDetails>>>> {
    let organization_id = query
        .organization_id
        .ok_or_else(|| AppError::InvalidOperation("Organization ID is required".into()))?;

    let conn = state.db.get()?;

    permissions::require_org_membership(&conn, &ctx.user.id, &organization_id)?;

    let workspaces = queries::list_workspaces_for_organization(&conn, &organization_id)?;

    tracing::debug!(
        user_id = %ctx.user.id,
        organization_id = %organization_id,
        count = workspaces.len(),
        "fetched workspaces"
    );

    Ok(Json(ApiResponse::data(workspaces)))
}

/// POST /workspaces: organization owner/admin only; creates the
/// workspace and an admin membership for the caller in one transaction.
pub async fn create_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(input): Json<CreateWorkspace>,
) -> Result<(StatusCode, Json<ApiResponse<Workspace>>)> {
    validate_create_workspace(&input)?;

    let mut conn = state.db.get()?;

    permissions::require_org_role(
        &conn,
        &ctx.user.id,
        &input.organization_id,
        &[OrgRole::Owner, OrgRole::Admin],
    )?;

    if queries::get_workspace_by_org_and_slug(&conn, &input.organization_id, &input.slug)?
        .is_some()
    {
        return Err(AppError::Conflict(
            "Workspace slug already exists in this organization".into(),
        ));
    }

    tracing::info!(
        user_id = %ctx.user.id,
        organization_id = %input.organization_id,
        slug = %input.slug,
        "creating workspace"
    );

    let workspace = queries::create_workspace(&mut conn, &ctx.user.id, &input)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Workspace created successfully",
            workspace,
        )),
    ))
}

/// PUT /workspaces?id=: workspace admin only. A slug change re-checks
/// uniqueness within the parent organization before applying.
pub async fn update_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Query(query): Query<WorkspaceIdQuery>,
    Json(input): Json<UpdateWorkspace>,
) -> Result<Json<ApiResponse<Workspace>>> {
    let workspace_id = query
        .id
        .ok_or_else(|| AppError::InvalidOperation("Workspace ID is required".into()))?;

    let conn = state.db.get()?;

    permissions::require_workspace_role(
        &conn,
        &ctx.user.id,
        &workspace_id,
        &[WorkspaceRole::Admin],
    )?;

    validate_update_workspace(&input)?;

    let workspace = queries::get_workspace_by_id(&conn, &workspace_id)?
        .ok_or_else(|| AppError::NotFound("Workspace not found".into()))?;

    if let Some(new_slug) = &input.slug {
        if *new_slug != workspace.slug
            && queries::get_workspace_by_org_and_slug(
                &conn,
                &workspace.organization_id,
                new_slug,
            )?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Workspace slug already exists in this organization".into(),
            ));
        }
    }

    queries::update_workspace(&conn, &workspace_id, &input)?;

    let updated = queries::get_workspace_by_id(&conn, &workspace_id)?
        .ok_or_else(|| AppError::NotFound("Workspace not found".into()))?;

    tracing::info!(
        user_id = %ctx.user.id,
        workspace_id = %workspace_id,
        "workspace updated"
    );

    Ok(Json(ApiResponse::with_message(
        "Workspace updated successfully",
        updated,
    )))
}

/// DELETE /workspaces?id=: workspace admin only. The default workspace
/// is the organization's permanent anchor and is never deletable.
pub async fn delete_workspace(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Query(query): Query<WorkspaceIdQuery>,
) -> Result<Json<ApiResponse<()>>> {
    let workspace_id = query
        .id
        .ok_or_else(|| AppError::InvalidOperation("Workspace ID is required".into()))?;

    let conn = state.db.get()?;

    permissions::require_workspace_role(
        &conn,
        &ctx.user.id,
        &workspace_id,
        &[WorkspaceRole::Admin],
    )?;

    let workspace = queries::get_workspace_by_id(&conn, &workspace_id)?
        .ok_or_else(|| AppError::NotFound("Workspace not found".into()))?;

    if workspace.is_default() {
        return Err(AppError::InvalidOperation(
            "Cannot delete default workspace".into(),
        ));
    }

    tracing::info!(
        user_id = %ctx.user.id,
        workspace_id = %workspace_id,
        slug = %workspace.slug,
        "deleting workspace"
    );

    queries::delete_workspace(&conn, &workspace_id)?;

    Ok(Json(ApiResponse::message("Workspace deleted successfully")))
}
