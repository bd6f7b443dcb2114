use serde::Serialize;
use strum::{AsRefStr, EnumString};

const MB: usize = 1024 * 1024;

const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

const ATTACHMENT_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
    "video/quicktime",
    "application/pdf",
];

/// Upload category. Determines the size limit, the allowed MIME types,
/// the target bucket, and whether a workspace membership check applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum UploadKind {
    Avatar,
    Attachment,
    Complaint,
}

impl UploadKind {
    pub fn max_size(&self) -> usize {
        match self {
            UploadKind::Avatar => 5 * MB,
            UploadKind::Attachment => 50 * MB,
            UploadKind::Complaint => 100 * MB,
        }
    }

    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Avatar => IMAGE_MIME_TYPES,
            UploadKind::Attachment | UploadKind::Complaint => ATTACHMENT_MIME_TYPES,
        }
    }

    pub fn bucket(&self) -> &'static str {
        match self {
            UploadKind::Avatar => "avatars",
            UploadKind::Attachment => "attachments",
            UploadKind::Complaint => "complaints",
        }
    }

    /// Workspace-scoped categories require the caller to already be a
    /// member of the target workspace.
    pub fn requires_workspace(&self) -> bool {
        matches!(self, UploadKind::Attachment | UploadKind::Complaint)
    }

    pub fn size_limit_message(&self) -> &'static str {
        match self {
            UploadKind::Avatar => "Avatar file must be less than 5MB",
            UploadKind::Attachment => "Attachment file must be less than 50MB",
            UploadKind::Complaint => "Complaint attachment must be less than 100MB",
        }
    }

    pub fn mime_message(&self) -> &'static str {
        match self {
            UploadKind::Avatar => "Avatar must be an image (JPEG, PNG, GIF, or WebP)",
            UploadKind::Attachment | UploadKind::Complaint => {
                "Attachment must be an image, video, or PDF"
            }
        }
    }
}

/// Metadata returned to the caller after a successful upload.
#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub url: String,
    pub path: String,
    pub bucket: String,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "fileSize")]
    pub file_size: usize,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}
