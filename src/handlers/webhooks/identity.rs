//! Webhook synchronizer: consumes signed identity-provider lifecycle
//! events and idempotently mirrors them into the local store.
//!
//! Each event is applied in its own database writes; a failure while
//! handling one event never touches state committed by earlier events.
//! Unknown event types are accepted and ignored so new provider event
//! types do not break delivery.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::db::{AppState, queries};
use crate::models::{OrgRole, UpsertOrganization, UpsertUser};

use super::signature;

#[derive(Debug, Deserialize)]
struct IdentityEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct UserEventData {
    id: String,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    first_name: Option<String>,
    last_name: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeletedEventData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct OrganizationEventData {
    id: String,
    name: Option<String>,
    slug: Option<String>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganizationRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PublicUserData {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct MembershipEventData {
    organization: OrganizationRef,
    public_user_data: PublicUserData,
    role: Option<String>,
}

/// Roles arrive as provider strings, sometimes prefixed (`org:admin`).
/// Unknown values fall back to viewer rather than rejecting the event.
fn parse_org_role(raw: Option<&str>) -> OrgRole {
    raw.map(|r| r.strip_prefix("org:").unwrap_or(r))
        .and_then(|r| r.parse().ok())
        .unwrap_or(OrgRole::Viewer)
}

pub async fn handle_identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let (Some(msg_id), Some(timestamp), Some(sig)) = (
        header_str(&headers, "webhook-id"),
        header_str(&headers, "webhook-timestamp"),
        header_str(&headers, "webhook-signature"),
    ) else {
        return (StatusCode::BAD_REQUEST, "Missing signature headers");
    };

    if !signature::verify(&state.webhook_secret, msg_id, timestamp, &body, sig) {
        tracing::warn!(msg_id, "webhook signature verification failed");
        return (StatusCode::BAD_REQUEST, "Invalid signature");
    }

    let event: IdentityEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("failed to parse identity webhook: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    tracing::debug!(event_type = %event.event_type, msg_id, "identity event received");

    match event.event_type.as_str() {
        "user.created" | "user.updated" => handle_user_upsert(state, event.data),
        "user.deleted" => handle_user_deleted(state, event.data),
        "organization.created" => handle_organization_upsert(state, event.data, true),
        "organization.updated" => handle_organization_upsert(state, event.data, false),
        "organization.deleted" => handle_organization_deleted(state, event.data),
        "organizationMembership.created" | "organizationMembership.updated" => {
            handle_membership_upsert(state, event.data)
        }
        "organizationMembership.deleted" => handle_membership_deleted(state, event.data),
        _ => {
            tracing::debug!(event_type = %event.event_type, "unhandled event type ignored");
            (StatusCode::OK, "Event ignored")
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn handle_user_upsert(state: AppState, data: serde_json::Value) -> (StatusCode, &'static str) {
    let user: UserEventData = match serde_json::from_value(data) {
        Ok(u) => u,
        Err(e) => {
            tracing::error!("failed to parse user event: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid user payload");
        }
    };

    let Some(email) = user.email_addresses.first() else {
        tracing::warn!(external_id = %user.id, "user event without email address");
        return (StatusCode::BAD_REQUEST, "User email required");
    };

    let name = match (&user.first_name, &user.last_name) {
        (Some(first), Some(last)) => Some(format!("{} {}", first, last)),
        (Some(first), None) => Some(first.clone()),
        (None, Some(last)) => Some(last.clone()),
        (None, None) => None,
    };

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("db connection error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    let input = UpsertUser {
        external_id: user.id.clone(),
        email: email.email_address.clone(),
        name,
        avatar_url: user.image_url.filter(|u| !u.is_empty()),
    };

    match queries::upsert_user(&conn, &input) {
        Ok(_) => {
            tracing::info!(external_id = %user.id, "user mirrored");
            (StatusCode::OK, "Webhook processed successfully")
        }
        Err(e) => {
            tracing::error!(external_id = %user.id, "user upsert failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error processing webhook")
        }
    }
}

/// Redelivery after the row is already gone converges silently.
fn handle_user_deleted(state: AppState, data: serde_json::Value) -> (StatusCode, &'static str) {
    let deleted: DeletedEventData = match serde_json::from_value(data) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("failed to parse delete event: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid delete payload");
        }
    };

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("db connection error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    match queries::delete_user_by_external_id(&conn, &deleted.id) {
        Ok(removed) => {
            tracing::info!(external_id = %deleted.id, removed, "user delete applied");
            (StatusCode::OK, "Webhook processed successfully")
        }
        Err(e) => {
            tracing::error!(external_id = %deleted.id, "user delete failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error processing webhook")
        }
    }
}

fn handle_organization_upsert(
    state: AppState,
    data: serde_json::Value,
    created: bool,
) -> (StatusCode, &'static str) {
    let org: OrganizationEventData = match serde_json::from_value(data) {
        Ok(o) => o,
        Err(e) => {
            tracing::error!("failed to parse organization event: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid organization payload");
        }
    };

    let Some(name) = org.name.filter(|n| !n.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Organization name required");
    };
    let Some(slug) = org.slug.filter(|s| !s.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Organization slug required");
    };

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("db connection error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    // A freshly created provider organization must not steal a slug a
    // user-initiated creation already claimed.
    if created {
        match queries::get_organization_by_slug(&conn, &slug) {
            Ok(Some(existing)) if existing.external_id != org.id => {
                tracing::warn!(slug = %slug, "organization slug already exists locally");
                return (StatusCode::CONFLICT, "Organization slug already exists");
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("slug lookup failed: {}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Error processing webhook");
            }
        }
    }

    let input = UpsertOrganization {
        external_id: org.id.clone(),
        name,
        slug,
        logo_url: org.image_url.filter(|u| !u.is_empty()),
    };

    match queries::upsert_organization(&conn, &input) {
        Ok(_) => {
            tracing::info!(external_id = %org.id, "organization mirrored");
            (StatusCode::OK, "Webhook processed successfully")
        }
        Err(e) => {
            tracing::error!(external_id = %org.id, "organization upsert failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error processing webhook")
        }
    }
}

fn handle_organization_deleted(
    state: AppState,
    data: serde_json::Value,
) -> (StatusCode, &'static str) {
    let deleted: DeletedEventData = match serde_json::from_value(data) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("failed to parse delete event: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid delete payload");
        }
    };

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("db connection error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    match queries::delete_organization_by_external_id(&conn, &deleted.id) {
        Ok(removed) => {
            tracing::info!(external_id = %deleted.id, removed, "organization delete applied");
            (StatusCode::OK, "Webhook processed successfully")
        }
        Err(e) => {
            tracing::error!(external_id = %deleted.id, "organization delete failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error processing webhook")
        }
    }
}

/// Both sides must already be mirrored; 404 asks the provider to retry
/// after the user/organization events land.
fn handle_membership_upsert(
    state: AppState,
    data: serde_json::Value,
) -> (StatusCode, &'static str) {
    let membership: MembershipEventData = match serde_json::from_value(data) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("failed to parse membership event: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid membership payload");
        }
    };

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("db connection error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    let user = match queries::get_user_by_external_id(&conn, &membership.public_user_data.user_id)
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            tracing::warn!(
                external_id = %membership.public_user_data.user_id,
                "membership event for unknown user"
            );
            return (StatusCode::NOT_FOUND, "User not found");
        }
        Err(e) => {
            tracing::error!("user lookup failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error processing webhook");
        }
    };

    let org = match queries::get_organization_by_external_id(&conn, &membership.organization.id) {
        Ok(Some(o)) => o,
        Ok(None) => {
            tracing::warn!(
                external_id = %membership.organization.id,
                "membership event for unknown organization"
            );
            return (StatusCode::NOT_FOUND, "Organization not found");
        }
        Err(e) => {
            tracing::error!("organization lookup failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error processing webhook");
        }
    };

    let role = parse_org_role(membership.role.as_deref());

    match queries::upsert_org_member(&conn, &org.id, &user.id, role) {
        Ok(_) => {
            tracing::info!(
                organization_id = %org.id,
                user_id = %user.id,
                role = role.as_ref(),
                "membership mirrored"
            );
            (StatusCode::OK, "Webhook processed successfully")
        }
        Err(e) => {
            tracing::error!("membership upsert failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error processing webhook")
        }
    }
}

/// Missing user or organization means there is nothing to delete.
fn handle_membership_deleted(
    state: AppState,
    data: serde_json::Value,
) -> (StatusCode, &'static str) {
    let membership: MembershipEventData = match serde_json::from_value(data) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("failed to parse membership event: {}", e);
            return (StatusCode::BAD_REQUEST, "Invalid membership payload");
        }
    };

    let conn = match state.db.get() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("db connection error: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    let user = queries::get_user_by_external_id(&conn, &membership.public_user_data.user_id);
    let org = queries::get_organization_by_external_id(&conn, &membership.organization.id);

    let (user, org) = match (user, org) {
        (Ok(Some(u)), Ok(Some(o))) => (u, o),
        (Ok(_), Ok(_)) => {
            tracing::debug!("membership delete for unmirrored user/organization, nothing to do");
            return (StatusCode::OK, "Webhook processed successfully");
        }
        _ => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error processing webhook");
        }
    };

    match queries::delete_org_members(&conn, &org.id, &user.id) {
        Ok(removed) => {
            tracing::info!(
                organization_id = %org.id,
                user_id = %user.id,
                removed,
                "membership delete applied"
            );
            (StatusCode::OK, "Webhook processed successfully")
        }
        Err(e) => {
            tracing::error!("membership delete failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Error processing webhook")
        }
    }
}
