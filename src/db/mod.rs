pub mod from_row;
pub mod queries;

use std::sync::Arc;

use jwt_simple::algorithms::HS256Key;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::error::Result;
use crate::storage::ObjectStorage;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Shared application state. Collaborators (storage, keys) are injected
/// here so handlers stay independently testable.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub session_key: HS256Key,
    pub webhook_secret: String,
    pub storage: Arc<dyn ObjectStorage>,
}

/// Create the schema. Referential integrity and the cascade invariants
/// live here: deleting an organization removes its workspaces and all
/// membership rows; deleting a workspace removes its memberships and the
/// collaborator rows that hang off it.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            external_id TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL,
            name TEXT,
            avatar_url TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS organizations (
            id TEXT PRIMARY KEY,
            external_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            domain TEXT,
            logo_url TEXT,
            billing_email TEXT,
            settings TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS workspaces (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL
                REFERENCES organizations(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            description TEXT,
            settings TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE (organization_id, slug)
        );

        CREATE TABLE IF NOT EXISTS organization_members (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL
                REFERENCES organizations(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL
                REFERENCES users(id) ON DELETE CASCADE,
            role TEXT NOT NULL,
            permissions TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE (organization_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS workspace_members (
            id TEXT PRIMARY KEY,
            workspace_id TEXT NOT NULL
                REFERENCES workspaces(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL
                REFERENCES users(id) ON DELETE CASCADE,
            role TEXT NOT NULL,
            permissions TEXT,
            created_at INTEGER NOT NULL,
            UNIQUE (workspace_id, user_id)
        );

        -- Collaborator subsystems. This core never writes these tables;
        -- they exist so listings can report counts and summaries.
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            workspace_id TEXT NOT NULL
                REFERENCES workspaces(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS complaints (
            id TEXT PRIMARY KEY,
            workspace_id TEXT NOT NULL
                REFERENCES workspaces(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open',
            created_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            organization_id TEXT NOT NULL
                REFERENCES organizations(id) ON DELETE CASCADE,
            plan TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_workspaces_org ON workspaces(organization_id);
        CREATE INDEX IF NOT EXISTS idx_org_members_user ON organization_members(user_id);
        CREATE INDEX IF NOT EXISTS idx_ws_members_user ON workspace_members(user_id);
        ",
    )?;
    Ok(())
}

/// Build a file-backed pool for the server binary. Foreign keys must be
/// enabled per connection; SQLite defaults them off.
pub fn open_pool(path: &str, max_size: u32) -> std::result::Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(path)
        .with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
    Pool::builder().max_size(max_size).build(manager)
}
