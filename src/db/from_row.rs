//! Row-mapping helpers: a `FromRow` trait per entity plus column lists
//! kept next to the mappers so SELECT order and field order stay in sync.

use rusqlite::{Connection, Row};

use crate::error::Result;
use crate::models::*;

pub const USER_COLS: &str = "id, external_id, email, name, avatar_url, created_at, updated_at";

pub const ORGANIZATION_COLS: &str =
    "id, external_id, name, slug, domain, logo_url, billing_email, settings, created_at, updated_at";

pub const WORKSPACE_COLS: &str =
    "id, organization_id, name, slug, description, settings, created_at, updated_at";

pub const ORG_MEMBER_COLS: &str =
    "id, organization_id, user_id, role, permissions, created_at, updated_at";

pub const WORKSPACE_MEMBER_COLS: &str =
    "id, workspace_id, user_id, role, permissions, created_at";

pub trait FromRow: Sized {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Parse a role column, failing the row conversion on unknown values
/// rather than panicking.
fn parse_role<T: std::str::FromStr>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown role '{}'", raw).into(),
        )
    })
}

impl FromRow for User {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            external_id: row.get(1)?,
            email: row.get(2)?,
            name: row.get(3)?,
            avatar_url: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl FromRow for Organization {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Organization {
            id: row.get(0)?,
            external_id: row.get(1)?,
            name: row.get(2)?,
            slug: row.get(3)?,
            domain: row.get(4)?,
            logo_url: row.get(5)?,
            billing_email: row.get(6)?,
            settings: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl FromRow for Workspace {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Workspace {
            id: row.get(0)?,
            organization_id: row.get(1)?,
            name: row.get(2)?,
            slug: row.get(3)?,
            description: row.get(4)?,
            settings: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

impl FromRow for OrgMember {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(OrgMember {
            id: row.get(0)?,
            organization_id: row.get(1)?,
            user_id: row.get(2)?,
            role: parse_role(row, 3)?,
            permissions: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}

impl FromRow for WorkspaceMember {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(WorkspaceMember {
            id: row.get(0)?,
            workspace_id: row.get(1)?,
            user_id: row.get(2)?,
            role: parse_role(row, 3)?,
            permissions: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl FromRow for SubscriptionSummary {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(SubscriptionSummary {
            id: row.get(0)?,
            plan: row.get(1)?,
            status: row.get(2)?,
        })
    }
}

pub fn query_one<T: FromRow, P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Option<T>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query_map(params, |row| T::from_row(row))?;
    match rows.next() {
        Some(row) => Ok(Some(row?)),
        None => Ok(None),
    }
}

pub fn query_all<T: FromRow, P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| T::from_row(row))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
