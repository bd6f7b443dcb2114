use std::str::FromStr;

use axum::extract::{Extension, Multipart, State};

use crate::db::AppState;
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::middleware::SessionContext;
use crate::models::{UploadKind, UploadedFile};
use crate::permissions;
use crate::response::ApiResponse;
use crate::util::generate_file_name;

struct UploadRequest {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
    kind: UploadKind,
    workspace_id: Option<String>,
    complaint_id: Option<String>,
}

async fn read_multipart(multipart: &mut Multipart) -> Result<UploadRequest> {
    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut upload_type: Option<String> = None;
    let mut workspace_id: Option<String> = None;
    let mut complaint_id: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation("body", &e.to_string()))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation("file", &e.to_string()))?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            Some("uploadType") => {
                upload_type = Some(field.text().await.unwrap_or_default());
            }
            Some("workspaceId") => {
                workspace_id = Some(field.text().await.unwrap_or_default());
            }
            Some("complaintId") => {
                complaint_id = Some(field.text().await.unwrap_or_default());
            }
            _ => {}
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::InvalidOperation("No file provided".into()))?;

    let upload_type = upload_type
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::InvalidOperation("Upload type is required".into()))?;

    let kind = UploadKind::from_str(&upload_type)
        .map_err(|_| AppError::InvalidOperation("Invalid upload type".into()))?;

    Ok(UploadRequest {
        file_name,
        content_type,
        bytes,
        kind,
        workspace_id: workspace_id.filter(|w| !w.is_empty()),
        complaint_id: complaint_id.filter(|c| !c.is_empty()),
    })
}

fn validate_file(req: &UploadRequest) -> Result<()> {
    if req.bytes.len() > req.kind.max_size() {
        return Err(AppError::validation("file", req.kind.size_limit_message()));
    }
    if !req
        .kind
        .allowed_mime_types()
        .contains(&req.content_type.as_str())
    {
        return Err(AppError::validation("file", req.kind.mime_message()));
    }
    Ok(())
}

/// POST /upload: multipart {file, uploadType, workspaceId?, complaintId?}.
///
/// Category decides the size limit, allowed MIME types, bucket, and path
/// prefix. Workspace-scoped categories require the caller to already be
/// a member of the target workspace; the check runs before any storage
/// traffic.
pub async fn upload(
    State(state): State<AppState>,
    Extension(ctx): Extension<SessionContext>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadedFile>>> {
    let req = read_multipart(&mut multipart).await?;

    tracing::debug!(
        user_id = %ctx.user.id,
        kind = req.kind.as_ref(),
        file_name = %req.file_name,
        file_size = req.bytes.len(),
        "upload requested"
    );

    if req.kind.requires_workspace() {
        let workspace_id = req
            .workspace_id
            .as_deref()
            .ok_or_else(|| AppError::InvalidOperation("Workspace ID is required".into()))?;

        let conn = state.db.get()?;
        if !permissions::is_workspace_member(&conn, &ctx.user.id, workspace_id)? {
            tracing::warn!(
                user_id = %ctx.user.id,
                workspace_id,
                "upload refused, not a workspace member"
            );
            return Err(AppError::Forbidden("Access denied".into()));
        }
    }

    validate_file(&req)?;

    let file_name = generate_file_name(&req.file_name, &ctx.user.id);
    let path = match req.kind {
        UploadKind::Avatar => format!("{}/{}", ctx.user.id, file_name),
        UploadKind::Attachment => format!(
            "{}/{}/{}",
            req.workspace_id.as_deref().unwrap_or_default(),
            ctx.user.id,
            file_name
        ),
        UploadKind::Complaint => format!(
            "{}/{}/{}",
            req.workspace_id.as_deref().unwrap_or_default(),
            req.complaint_id.as_deref().unwrap_or("temp"),
            file_name
        ),
    };

    let bucket = req.kind.bucket();
    let file_size = req.bytes.len();
    let mime_type = req.content_type.clone();

    let url = state
        .storage
        .upload(bucket, &path, req.bytes, &mime_type)
        .await?;

    tracing::info!(
        user_id = %ctx.user.id,
        bucket,
        path = %path,
        "file uploaded"
    );

    let message = match req.kind {
        UploadKind::Avatar => "Avatar uploaded successfully",
        UploadKind::Attachment => "Attachment uploaded successfully",
        UploadKind::Complaint => "Complaint attachment uploaded successfully",
    };

    Ok(Json(ApiResponse::with_message(
        message,
        UploadedFile {
            url,
            path,
            bucket: bucket.to_string(),
            file_name,
            file_size,
            mime_type,
        },
    )))
}
