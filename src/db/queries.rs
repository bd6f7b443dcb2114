use chrono::Utc;
use rusqlite::{Connection, params, types::Value};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{
    ORG_MEMBER_COLS, ORGANIZATION_COLS, USER_COLS, WORKSPACE_COLS, WORKSPACE_MEMBER_COLS,
    query_all, query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// True when the error is a SQLite UNIQUE constraint failure. Used to
/// translate slug collisions into `Conflict` when two writers race past
/// the pre-check.
fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    fn execute(mut self, conn: &Connection) -> Result<bool> {
        if self.fields.is_empty() {
            return Ok(false);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Users ============

/// Upsert a user by identity-provider id. Idempotent: redelivering the
/// same event leaves the row in the same state.
pub fn upsert_user(conn: &Connection, input: &UpsertUser) -> Result<User> {
    let now = now();

    conn.execute(
        "INSERT INTO users (id, external_id, email, name, avatar_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (external_id) DO UPDATE SET
            email = excluded.email,
            name = excluded.name,
            avatar_url = excluded.avatar_url,
            updated_at = excluded.updated_at",
        params![
            gen_id(),
            &input.external_id,
            &input.email,
            &input.name,
            &input.avatar_url,
            now,
            now
        ],
    )?;

    get_user_by_external_id(conn, &input.external_id)?
        .ok_or_else(|| AppError::Internal("User missing after upsert".into()))
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        [&id],
    )
}

pub fn get_user_by_external_id(conn: &Connection, external_id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE external_id = ?1", USER_COLS),
        [&external_id],
    )
}

/// Delete a user by identity-provider id. Returns false when the row was
/// already absent; redelivered delete events converge to the same state.
pub fn delete_user_by_external_id(conn: &Connection, external_id: &str) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM users WHERE external_id = ?1",
        params![external_id],
    )?;
    Ok(deleted > 0)
}

// ============ Organizations ============

pub fn get_organization_by_id(conn: &Connection, id: &str) -> Result<Option<Organization>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM organizations WHERE id = ?1",
            ORGANIZATION_COLS
        ),
        [&id],
    )
}

pub fn get_organization_by_slug(conn: &Connection, slug: &str) -> Result<Option<Organization>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM organizations WHERE slug = ?1",
            ORGANIZATION_COLS
        ),
        [&slug],
    )
}

pub fn get_organization_by_external_id(
    conn: &Connection,
    external_id: &str,
) -> Result<Option<Organization>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM organizations WHERE external_id = ?1",
            ORGANIZATION_COLS
        ),
        [&external_id],
    )
}

/// Atomically provision an organization: the organization row, its
/// default workspace, an owner membership for the creating user, and an
/// admin membership on the default workspace. All four writes commit
/// together or not at all; a concurrent create with the same slug loses
/// on the UNIQUE constraint and surfaces as `Conflict`.
pub fn provision_organization(
    conn: &mut Connection,
    user_id: &str,
    input: &CreateOrganization,
) -> Result<Organization> {
    let now = now();
    let org_id = gen_id();
    let workspace_id = gen_id();
    // User-initiated organizations have no identity-provider id; a
    // synthesized one keeps the column unique.
    let external_id = format!("{}-{}", input.slug, Utc::now().timestamp_millis());

    let tx = conn.transaction()?;

    let inserted = tx.execute(
        "INSERT INTO organizations (id, external_id, name, slug, domain, logo_url, billing_email, settings, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, ?8, ?9)",
        params![
            &org_id,
            &external_id,
            &input.name,
            &input.slug,
            &input.domain,
            &input.logo_url,
            &input.billing_email,
            now,
            now
        ],
    );
    if let Err(err) = inserted {
        if is_unique_violation(&err) {
            return Err(AppError::Conflict("Organization slug already exists".into()));
        }
        return Err(err.into());
    }

    tx.execute(
        "INSERT INTO workspaces (id, organization_id, name, slug, description, settings, created_at, updated_at)
         VALUES (?1, ?2, 'Default Workspace', ?3, 'Your default workspace', NULL, ?4, ?5)",
        params![&workspace_id, &org_id, DEFAULT_WORKSPACE_SLUG, now, now],
    )?;

    tx.execute(
        "INSERT INTO organization_members (id, organization_id, user_id, role, permissions, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, '{}', ?5, ?6)",
        params![gen_id(), &org_id, user_id, OrgRole::Owner.as_ref(), now, now],
    )?;

    tx.execute(
        "INSERT INTO workspace_members (id, workspace_id, user_id, role, permissions, created_at)
         VALUES (?1, ?2, ?3, ?4, '{}', ?5)",
        params![
            gen_id(),
            &workspace_id,
            user_id,
            WorkspaceRole::Admin.as_ref(),
            now
        ],
    )?;

    tx.commit()?;

    get_organization_by_id(conn, &org_id)?
        .ok_or_else(|| AppError::Internal("Organization missing after provisioning".into()))
}

/// Upsert an organization by identity-provider id (create-if-absent, to
/// tolerate out-of-order webhook delivery).
pub fn upsert_organization(conn: &Connection, input: &UpsertOrganization) -> Result<Organization> {
    let now = now();

    conn.execute(
        "INSERT INTO organizations (id, external_id, name, slug, domain, logo_url, billing_email, settings, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, NULL, ?5, NULL, NULL, ?6, ?7)
         ON CONFLICT (external_id) DO UPDATE SET
            name = excluded.name,
            slug = excluded.slug,
            logo_url = excluded.logo_url,
            updated_at = excluded.updated_at",
        params![
            gen_id(),
            &input.external_id,
            &input.name,
            &input.slug,
            &input.logo_url,
            now,
            now
        ],
    )?;

    get_organization_by_external_id(conn, &input.external_id)?
        .ok_or_else(|| AppError::Internal("Organization missing after upsert".into()))
}

/// Apply only the provided fields; unset fields are left untouched.
/// The settings blob is written through as serialized JSON, never parsed.
pub fn update_organization(
    conn: &Connection,
    id: &str,
    input: &UpdateOrganization,
) -> Result<bool> {
    let settings = input
        .settings
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    UpdateBuilder::new("organizations", id)
        .with_updated_at()
        .set_opt("name", input.name.clone())
        .set_opt("logo_url", input.logo_url.clone())
        .set_opt("domain", input.domain.clone())
        .set_opt("billing_email", input.billing_email.clone())
        .set_opt("settings", settings)
        .execute(conn)
}

/// Cascades to workspaces and all membership rows via foreign keys.
pub fn delete_organization(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM organizations WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

pub fn delete_organization_by_external_id(
    conn: &Connection,
    external_id: &str,
) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM organizations WHERE external_id = ?1",
        params![external_id],
    )?;
    Ok(deleted > 0)
}

/// All organizations where the user holds any membership, newest first,
/// with nested member/workspace/subscription data.
pub fn list_organizations_for_user(
    conn: &Connection,
    user_id: &str,
) -> Result<Vec<OrganizationWithDetails>> {
    let organizations: Vec<Organization> = query_all(
        conn,
        &format!(
            "SELECT {} FROM organizations
             WHERE id IN (SELECT organization_id FROM organization_members WHERE user_id = ?1)
             ORDER BY created_at DESC",
            ORGANIZATION_COLS
        ),
        [&user_id],
    )?;

    let mut results = Vec::with_capacity(organizations.len());
    for organization in organizations {
        let members: Vec<OrgMember> = query_all(
            conn,
            &format!(
                "SELECT {} FROM organization_members WHERE organization_id = ?1 ORDER BY created_at",
                ORG_MEMBER_COLS
            ),
            [&organization.id],
        )?;
        let workspaces: Vec<Workspace> = query_all(
            conn,
            &format!(
                "SELECT {} FROM workspaces WHERE organization_id = ?1 ORDER BY created_at DESC",
                WORKSPACE_COLS
            ),
            [&organization.id],
        )?;
        let subscriptions: Vec<SubscriptionSummary> = query_all(
            conn,
            "SELECT id, plan, status FROM subscriptions WHERE organization_id = ?1 ORDER BY created_at DESC",
            [&organization.id],
        )?;

        results.push(OrganizationWithDetails {
            organization,
            members,
            workspaces,
            subscriptions,
        });
    }

    Ok(results)
}

// ============ Organization members ============

pub fn get_org_member(
    conn: &Connection,
    organization_id: &str,
    user_id: &str,
) -> Result<Option<OrgMember>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM organization_members WHERE organization_id = ?1 AND user_id = ?2",
            ORG_MEMBER_COLS
        ),
        params![organization_id, user_id],
    )
}

/// Upsert the membership role for a (organization, user) pair.
pub fn upsert_org_member(
    conn: &Connection,
    organization_id: &str,
    user_id: &str,
    role: OrgRole,
) -> Result<OrgMember> {
    let now = now();

    conn.execute(
        "INSERT INTO organization_members (id, organization_id, user_id, role, permissions, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, '{}', ?5, ?6)
         ON CONFLICT (organization_id, user_id) DO UPDATE SET
            role = excluded.role,
            updated_at = excluded.updated_at",
        params![gen_id(), organization_id, user_id, role.as_ref(), now, now],
    )?;

    get_org_member(conn, organization_id, user_id)?
        .ok_or_else(|| AppError::Internal("Membership missing after upsert".into()))
}

pub fn delete_org_members(
    conn: &Connection,
    organization_id: &str,
    user_id: &str,
) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM organization_members WHERE organization_id = ?1 AND user_id = ?2",
        params![organization_id, user_id],
    )?;
    Ok(deleted)
}

// ============ Workspaces ============

pub fn get_workspace_by_id(conn: &Connection, id: &str) -> Result<Option<Workspace>> {
    query_one(
        conn,
        &format!("SELECT {} FROM workspaces WHERE id = ?1", WORKSPACE_COLS),
        [&id],
    )
}

pub fn get_workspace_by_org_and_slug(
    conn: &Connection,
    organization_id: &str,
    slug: &str,
) -> Result<Option<Workspace>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM workspaces WHERE organization_id = ?1 AND slug = ?2",
            WORKSPACE_COLS
        ),
        params![organization_id, slug],
    )
}

/// Atomically create a workspace plus an admin membership for the
/// creating user. Slug uniqueness is per organization; a concurrent
/// create with the same pair loses on the UNIQUE constraint.
pub fn create_workspace(
    conn: &mut Connection,
    user_id: &str,
    input: &CreateWorkspace,
) -> Result<Workspace> {
    let now = now();
    let workspace_id = gen_id();

    let tx = conn.transaction()?;

    let inserted = tx.execute(
        "INSERT INTO workspaces (id, organization_id, name, slug, description, settings, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, NULL, ?6, ?7)",
        params![
            &workspace_id,
            &input.organization_id,
            &input.name,
            &input.slug,
            &input.description,
            now,
            now
        ],
    );
    if let Err(err) = inserted {
        if is_unique_violation(&err) {
            return Err(AppError::Conflict(
                "Workspace slug already exists in this organization".into(),
            ));
        }
        return Err(err.into());
    }

    tx.execute(
        "INSERT INTO workspace_members (id, workspace_id, user_id, role, permissions, created_at)
         VALUES (?1, ?2, ?3, ?4, '{}', ?5)",
        params![
            gen_id(),
            &workspace_id,
            user_id,
            WorkspaceRole::Admin.as_ref(),
            now
        ],
    )?;

    tx.commit()?;

    get_workspace_by_id(conn, &workspace_id)?
        .ok_or_else(|| AppError::Internal("Workspace missing after creation".into()))
}

/// A slug change that races another writer past the handler's pre-check
/// loses on the per-organization UNIQUE constraint here.
pub fn update_workspace(conn: &Connection, id: &str, input: &UpdateWorkspace) -> Result<bool> {
    let settings = input
        .settings
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    let result = UpdateBuilder::new("workspaces", id)
        .with_updated_at()
        .set_opt("name", input.name.clone())
        .set_opt("slug", input.slug.clone())
        .set_opt("description", input.description.clone())
        .set_opt("settings", settings)
        .execute(conn);

    match result {
        Err(AppError::Database(err)) if is_unique_violation(&err) => Err(AppError::Conflict(
            "Workspace slug already exists in this organization".into(),
        )),
        other => other,
    }
}

/// Cascades to membership rows and collaborator rows via foreign keys.
pub fn delete_workspace(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM workspaces WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// All workspaces of an organization, newest first, with members and
/// aggregate counts from the collaborator subsystems.
pub fn list_workspaces_for_organization(
    conn: &Connection,
    organization_id: &str,
) -> Result<Vec<WorkspaceWithDetails>> {
    let workspaces: Vec<Workspace> = query_all(
        conn,
        &format!(
            "SELECT {} FROM workspaces WHERE organization_id = ?1 ORDER BY created_at DESC",
            WORKSPACE_COLS
        ),
        [&organization_id],
    )?;

    let mut results = Vec::with_capacity(workspaces.len());
    for workspace in workspaces {
        let members: Vec<WorkspaceMember> = query_all(
            conn,
            &format!(
                "SELECT {} FROM workspace_members WHERE workspace_id = ?1 ORDER BY created_at",
                WORKSPACE_MEMBER_COLS
            ),
            [&workspace.id],
        )?;

        let (complaints, projects): (i64, i64) = conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM complaints WHERE workspace_id = ?1),
                (SELECT COUNT(*) FROM projects WHERE workspace_id = ?1)",
            params![&workspace.id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let counts = WorkspaceCounts {
            complaints,
            projects,
            members: members.len() as i64,
        };

        results.push(WorkspaceWithDetails {
            workspace,
            members,
            counts,
        });
    }

    Ok(results)
}

// ============ Workspace members ============

pub fn get_workspace_member(
    conn: &Connection,
    workspace_id: &str,
    user_id: &str,
) -> Result<Option<WorkspaceMember>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM workspace_members WHERE workspace_id = ?1 AND user_id = ?2",
            WORKSPACE_MEMBER_COLS
        ),
        params![workspace_id, user_id],
    )
}
