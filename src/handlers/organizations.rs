use axum::extract::{Extension, State};
use axum::http::StatusCode;
use serde::Deserialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::{Json, Query};
use crate::middleware::SessionContext;
use crate::models::{
    CreateOrganization, OrgRole, Organization, OrganizationWithDetails, UpdateOrganization,
};
use crate::permissions;
use crate::response::ApiResponse;
use crate::validate::{validate_create_organization, validate_update_organization};

#[derive(Debug, Deserialize)]
pub struct OrganizationIdQuery {
    pub id: Option<String>,
}

/// GET /organizations: every organization where the session user holds
/// a membership, newest first, with nested summaries.
pub async fn list_organizations(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
) -> Result<Json<ApiResponse<Vec<OrganizationWithDetails>>>> {
    let conn = state.db.get()?;
    let organizations = queries::list_organizations_for_user(&conn, &ctx.user.id)?;

    tracing::debug!(
        user_id = %ctx.user.id,
        count = organizations.len(),
        "fetched organizations"
    );

    Ok(Json(ApiResponse::data(organizations)))
}

/// POST /organizations: validate, then provision the organization, its
/// default workspace, and both membership rows in one transaction.
pub async fn create_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Json(input): Json<CreateOrganization>,
) -> Result<(StatusCode, Json<ApiResponse<Organization>>)> {
    validate_create_organization(&input)?;

    let mut conn = state.db.get()?;

    // Pre-check for a friendlier error; the UNIQUE constraint inside the
    // transaction is what actually decides races.
    if queries::get_organization_by_slug(&conn, &input.slug)?.is_some() {
        return Err(AppError::Conflict("Organization slug already exists".into()));
    }

    tracing::info!(user_id = %ctx.user.id, slug = %input.slug, "provisioning organization");

    let organization = queries::provision_organization(&mut conn, &ctx.user.id, &input)?;

    tracing::info!(
        user_id = %ctx.user.id,
        organization_id = %organization.id,
        slug = %organization.slug,
        "organization created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Organization created successfully",
            organization,
        )),
    ))
}

/// PUT /organizations?id=: partial update, owner or admin only. Slug is
/// not mutable on this path.
pub async fn update_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Query(query): Query<OrganizationIdQuery>,
    Json(input): Json<UpdateOrganization>,
) -> Result<Json<ApiResponse<Organization>>> {
    let organization_id = query
        .id
        .ok_or_else(|| AppError::InvalidOperation("Organization ID is required".into()))?;

    let conn = state.db.get()?;

    permissions::require_org_role(
        &conn,
        &ctx.user.id,
        &organization_id,
        &[OrgRole::Owner, OrgRole::Admin],
    )?;

    validate_update_organization(&input)?;

    queries::update_organization(&conn, &organization_id, &input)?;

    let organization = queries::get_organization_by_id(&conn, &organization_id)?
        .ok_or_else(|| AppError::NotFound("Organization not found".into()))?;

    tracing::info!(
        user_id = %ctx.user.id,
        organization_id = %organization_id,
        "organization updated"
    );

    Ok(Json(ApiResponse::with_message(
        "Organization updated successfully",
        organization,
    )))
}

/// DELETE /organizations?id=: owner only; cascades to workspaces and
/// all membership rows.
pub async fn delete_organization(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    Query(query): Query<OrganizationIdQuery>,
) -> Result<Json<ApiResponse<()>>> {
    let organization_id = query
        .id
        .ok_or_else(|| AppError::InvalidOperation("Organization ID is required".into()))?;

    let conn = state.db.get()?;

    let member = permissions::require_org_membership(&conn, &ctx.user.id, &organization_id)?;
    if member.role != OrgRole::Owner {
        tracing::warn!(
            user_id = %ctx.user.id,
            organization_id = %organization_id,
            role = member.role.as_ref(),
            "delete refused, not owner"
        );
        return Err(AppError::Forbidden(
            "Only organization owner can delete".into(),
        ));
    }

    tracing::info!(
        user_id = %ctx.user.id,
        organization_id = %organization_id,
        "deleting organization"
    );

    queries::delete_organization(&conn, &organization_id)?;

    Ok(Json(ApiResponse::message(
        "Organization deleted successfully",
    )))
}
