use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::jwt::verify_session_token;
use crate::models::User;
use crate::util::extract_bearer_token;

/// Verified request identity: the session's external subject plus the
/// locally mirrored user row.
#[derive(Clone)]
pub struct SessionContext {
    pub external_id: String,
    pub user: User,
}

/// Session auth for all non-webhook endpoints. Verifies the Bearer
/// session token, then resolves the local user mirror; a valid session
/// whose user has not been synced yet is a 404, since nothing can be
/// attributed to it.
pub async fn session_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer_token(request.headers()).ok_or_else(AppError::unauthorized)?;

    let external_id = verify_session_token(&state.session_key, token)?;

    let conn = state.db.get()?;
    let user = queries::get_user_by_external_id(&conn, &external_id)?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    drop(conn);

    request
        .extensions_mut()
        .insert(SessionContext { external_id, user });

    Ok(next.run(request).await)
}
