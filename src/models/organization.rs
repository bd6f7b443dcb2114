use serde::{Deserialize, Serialize};

use super::{OrgMember, Workspace};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub external_id: String,
    pub name: String,
    pub slug: String,
    pub domain: Option<String>,
    pub logo_url: Option<String>,
    pub billing_email: Option<String>,
    /// Opaque serialized settings blob; written through, never parsed here.
    pub settings: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub slug: String,
    pub domain: Option<String>,
    #[serde(rename = "logoUrl")]
    pub logo_url: Option<String>,
    #[serde(rename = "billingEmail")]
    pub billing_email: Option<String>,
}

/// Partial update; slug is intentionally not accepted on this path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    #[serde(rename = "logoUrl")]
    pub logo_url: Option<String>,
    pub domain: Option<String>,
    #[serde(rename = "billingEmail")]
    pub billing_email: Option<String>,
    pub settings: Option<serde_json::Value>,
}

/// Upsert payload for identity-provider organization events.
#[derive(Debug, Clone)]
pub struct UpsertOrganization {
    pub external_id: String,
    pub name: String,
    pub slug: String,
    pub logo_url: Option<String>,
}

/// Summary of a subscription, nested into organization listings.
/// Subscriptions are owned by the billing subsystem; this core only reads.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionSummary {
    pub id: String,
    pub plan: String,
    pub status: String,
}

/// Organization with nested member/workspace/subscription data, as
/// returned by the list endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationWithDetails {
    #[serde(flatten)]
    pub organization: Organization,
    pub members: Vec<OrgMember>,
    pub workspaces: Vec<Workspace>,
    pub subscriptions: Vec<SubscriptionSummary>,
}
