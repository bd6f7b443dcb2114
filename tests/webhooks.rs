//! Tests for the identity webhook endpoint: signature enforcement,
//! mirror upserts, idempotent deletes, and membership ordering.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use casedesk::db::queries;
use casedesk::handlers::webhooks::signature;
use casedesk::models::OrgRole;

mod common;
use common::*;

fn user_created_event(external_id: &str, email: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "user.created",
        "data": {
            "id": external_id,
            "email_addresses": [{ "email_address": email }],
            "first_name": "Ada",
            "last_name": "Lovelace",
            "image_url": "https://img.example.com/ada.png"
        }
    })
}

fn org_created_event(external_id: &str, name: &str, slug: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "organization.created",
        "data": { "id": external_id, "name": name, "slug": slug }
    })
}

#[tokio::test]
async fn test_missing_signature_headers_rejected() {
    let state = create_test_state();
    let app = test_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/identity")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"type":"user.created","data":{}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Missing signature headers");
}

#[tokio::test]
async fn test_invalid_signature_rejected_without_side_effects() {
    let state = create_test_state();

    let payload = serde_json::to_vec(&user_created_event("user_x", "x@example.com")).unwrap();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    let forged = signature::sign("whsec_d3Jvbmctc2VjcmV0", "msg_1", &timestamp, &payload);

    let app = test_app(state.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/identity")
                .header("content-type", "application/json")
                .header("webhook-id", "msg_1")
                .header("webhook-timestamp", timestamp)
                .header("webhook-signature", forged)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Invalid signature");

    let conn = state.db.get().unwrap();
    assert!(
        queries::get_user_by_external_id(&conn, "user_x")
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_stale_timestamp_rejected() {
    let state = create_test_state();

    let payload = serde_json::to_vec(&user_created_event("user_x", "x@example.com")).unwrap();
    let timestamp = (chrono::Utc::now().timestamp() - 3600).to_string();
    let sig = signature::sign(WEBHOOK_SECRET, "msg_1", &timestamp, &payload);

    let app = test_app(state);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhooks/identity")
                .header("content-type", "application/json")
                .header("webhook-id", "msg_1")
                .header("webhook-timestamp", timestamp)
                .header("webhook-signature", sig)
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_user_created_mirrors_user() {
    let state = create_test_state();
    let app = test_app(state.clone());

    let response = app
        .oneshot(webhook_request(&user_created_event(
            "user_ada",
            "ada@example.com",
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    let user = queries::get_user_by_external_id(&conn, "user_ada")
        .unwrap()
        .expect("mirrored user row");
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(
        user.avatar_url.as_deref(),
        Some("https://img.example.com/ada.png")
    );
}

#[tokio::test]
async fn test_user_event_without_email_rejected() {
    let state = create_test_state();
    let app = test_app(state);

    let event = serde_json::json!({
        "type": "user.created",
        "data": { "id": "user_noemail", "email_addresses": [] }
    });

    let response = app.oneshot(webhook_request(&event)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "User email required");
}

#[tokio::test]
async fn test_user_update_redelivery_is_idempotent() {
    let state = create_test_state();

    let event = user_created_event("user_ada", "ada@example.com");
    for _ in 0..2 {
        let response = test_app(state.clone())
            .oneshot(webhook_request(&event))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let conn = state.db.get().unwrap();
    let user = queries::get_user_by_external_id(&conn, "user_ada")
        .unwrap()
        .unwrap();
    assert_eq!(user.email, "ada@example.com");

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_user_delete_is_idempotent() {
    let state = create_test_state();

    {
        let conn = state.db.get().unwrap();
        seed_user(&conn, "user_gone", "gone@example.com");
    }

    let event = serde_json::json!({
        "type": "user.deleted",
        "data": { "id": "user_gone" }
    });

    for _ in 0..2 {
        let response = test_app(state.clone())
            .oneshot(webhook_request(&event))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let conn = state.db.get().unwrap();
    assert!(
        queries::get_user_by_external_id(&conn, "user_gone")
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_organization_created_and_updated() {
    let state = create_test_state();

    let response = test_app(state.clone())
        .oneshot(webhook_request(&org_created_event(
            "org_ext_1",
            "Acme",
            "acme",
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let update = serde_json::json!({
        "type": "organization.updated",
        "data": { "id": "org_ext_1", "name": "Acme Inc", "slug": "acme" }
    });
    let response = test_app(state.clone())
        .oneshot(webhook_request(&update))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Redelivery converges to the same row.
    let response = test_app(state.clone())
        .oneshot(webhook_request(&update))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    let org = queries::get_organization_by_external_id(&conn, "org_ext_1")
        .unwrap()
        .expect("mirrored organization row");
    assert_eq!(org.name, "Acme Inc");
    assert_eq!(org.slug, "acme");

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM organizations", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_organization_created_with_taken_slug_conflicts() {
    let state = create_test_state();

    {
        let mut conn = state.db.get().unwrap();
        let owner = seed_user(&conn, "user_owner", "owner@example.com");
        create_test_org(&mut conn, &owner.id, "Local Acme", "acme");
    }

    let response = test_app(state)
        .oneshot(webhook_request(&org_created_event(
            "org_ext_other",
            "Provider Acme",
            "acme",
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_text(response).await, "Organization slug already exists");
}

#[tokio::test]
async fn test_organization_delete_is_idempotent() {
    let state = create_test_state();

    let response = test_app(state.clone())
        .oneshot(webhook_request(&org_created_event(
            "org_ext_1",
            "Acme",
            "acme",
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let event = serde_json::json!({
        "type": "organization.deleted",
        "data": { "id": "org_ext_1" }
    });

    for _ in 0..2 {
        let response = test_app(state.clone())
            .oneshot(webhook_request(&event))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let conn = state.db.get().unwrap();
    assert!(
        queries::get_organization_by_external_id(&conn, "org_ext_1")
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_membership_created_requires_synced_user() {
    let state = create_test_state();

    let response = test_app(state.clone())
        .oneshot(webhook_request(&org_created_event(
            "org_ext_1",
            "Acme",
            "acme",
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let membership = serde_json::json!({
        "type": "organizationMembership.created",
        "data": {
            "organization": { "id": "org_ext_1" },
            "public_user_data": { "user_id": "user_late" },
            "role": "org:admin"
        }
    });

    // User event has not arrived yet.
    let response = test_app(state.clone())
        .oneshot(webhook_request(&membership))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "User not found");

    let response = test_app(state.clone())
        .oneshot(webhook_request(&user_created_event(
            "user_late",
            "late@example.com",
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Retry after sync succeeds and the provider role prefix is stripped.
    let response = test_app(state.clone())
        .oneshot(webhook_request(&membership))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let conn = state.db.get().unwrap();
    let user = queries::get_user_by_external_id(&conn, "user_late")
        .unwrap()
        .unwrap();
    let org = queries::get_organization_by_external_id(&conn, "org_ext_1")
        .unwrap()
        .unwrap();
    let member = queries::get_org_member(&conn, &org.id, &user.id)
        .unwrap()
        .expect("membership row");
    assert_eq!(member.role, OrgRole::Admin);
}

#[tokio::test]
async fn test_membership_update_changes_role() {
    let state = create_test_state();

    for event in [
        user_created_event("user_m", "m@example.com"),
        org_created_event("org_ext_1", "Acme", "acme"),
        serde_json::json!({
            "type": "organizationMembership.created",
            "data": {
                "organization": { "id": "org_ext_1" },
                "public_user_data": { "user_id": "user_m" },
                "role": "member"
            }
        }),
        serde_json::json!({
            "type": "organizationMembership.updated",
            "data": {
                "organization": { "id": "org_ext_1" },
                "public_user_data": { "user_id": "user_m" },
                "role": "unrecognized-role"
            }
        }),
    ] {
        let response = test_app(state.clone())
            .oneshot(webhook_request(&event))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let conn = state.db.get().unwrap();
    let user = queries::get_user_by_external_id(&conn, "user_m").unwrap().unwrap();
    let org = queries::get_organization_by_external_id(&conn, "org_ext_1")
        .unwrap()
        .unwrap();
    let member = queries::get_org_member(&conn, &org.id, &user.id)
        .unwrap()
        .unwrap();
    // Unknown provider roles downgrade to viewer.
    assert_eq!(member.role, OrgRole::Viewer);
}

#[tokio::test]
async fn test_membership_delete_is_idempotent() {
    let state = create_test_state();

    for event in [
        user_created_event("user_m", "m@example.com"),
        org_created_event("org_ext_1", "Acme", "acme"),
        serde_json::json!({
            "type": "organizationMembership.created",
            "data": {
                "organization": { "id": "org_ext_1" },
                "public_user_data": { "user_id": "user_m" },
                "role": "member"
            }
        }),
    ] {
        test_app(state.clone())
            .oneshot(webhook_request(&event))
            .await
            .unwrap();
    }

    let delete = serde_json::json!({
        "type": "organizationMembership.deleted",
        "data": {
            "organization": { "id": "org_ext_1" },
            "public_user_data": { "user_id": "user_m" }
        }
    });

    for _ in 0..2 {
        let response = test_app(state.clone())
            .oneshot(webhook_request(&delete))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let conn = state.db.get().unwrap();
    let user = queries::get_user_by_external_id(&conn, "user_m").unwrap().unwrap();
    let org = queries::get_organization_by_external_id(&conn, "org_ext_1")
        .unwrap()
        .unwrap();
    assert!(
        queries::get_org_member(&conn, &org.id, &user.id)
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_unknown_event_type_is_accepted() {
    let state = create_test_state();
    let app = test_app(state);

    let event = serde_json::json!({
        "type": "session.created",
        "data": { "id": "sess_1" }
    });

    let response = app.oneshot(webhook_request(&event)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Event ignored");
}
