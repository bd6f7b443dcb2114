use serde::{Deserialize, Serialize};

/// Local mirror of an identity-provider user. Rows are only ever written
/// by the webhook synchronizer, never by end-user requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Upsert payload keyed by `external_id`.
#[derive(Debug, Clone)]
pub struct UpsertUser {
    pub external_id: String,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}
