//! Field validation performed at the boundary of each operation, before
//! any write occurs. Failures accumulate as `{path, message}` details.

use url::Url;

use crate::error::{AppError, FieldError, Result};
use crate::models::{CreateOrganization, CreateWorkspace, UpdateOrganization, UpdateWorkspace};

const MAX_NAME_LEN: usize = 255;
const MAX_SLUG_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;

pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn name(&mut self, path: &str, value: &str, required_message: &str) -> &mut Self {
        if value.is_empty() {
            self.errors.push(FieldError::new(path, required_message));
        } else if value.len() > MAX_NAME_LEN {
            self.errors.push(FieldError::new(
                path,
                format!("{} must be less than {} characters", path_label(path), MAX_NAME_LEN),
            ));
        }
        self
    }

    pub fn slug(&mut self, path: &str, value: &str) -> &mut Self {
        if value.is_empty() {
            self.errors.push(FieldError::new(path, "Slug is required"));
        } else if value.len() > MAX_SLUG_LEN {
            self.errors.push(FieldError::new(
                path,
                format!("Slug must be less than {} characters", MAX_SLUG_LEN),
            ));
        } else if !value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            self.errors.push(FieldError::new(
                path,
                "Slug can only contain lowercase letters, numbers, and hyphens",
            ));
        }
        self
    }

    /// Empty strings are treated as absent, matching the original form
    /// behavior where cleared inputs submit "".
    pub fn url_opt(&mut self, path: &str, value: Option<&str>, message: &str) -> &mut Self {
        if let Some(value) = value {
            if !value.is_empty() && Url::parse(value).is_err() {
                self.errors.push(FieldError::new(path, message));
            }
        }
        self
    }

    pub fn email_opt(&mut self, path: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            if !value.is_empty() && !is_valid_email(value) {
                self.errors
                    .push(FieldError::new(path, "Invalid email address"));
            }
        }
        self
    }

    pub fn description_opt(&mut self, path: &str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            if value.len() > MAX_DESCRIPTION_LEN {
                self.errors.push(FieldError::new(
                    path,
                    format!("Description must be less than {} characters", MAX_DESCRIPTION_LEN),
                ));
            }
        }
        self
    }

    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self.errors))
        }
    }
}

fn path_label(path: &str) -> &str {
    match path {
        "name" => "Name",
        other => other,
    }
}

/// Syntactic email check: one '@', non-empty local part, domain with a dot.
fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}

pub fn validate_create_organization(input: &CreateOrganization) -> Result<()> {
    let mut v = Validator::new();
    v.name("name", &input.name, "Organization name is required")
        .slug("slug", &input.slug)
        .url_opt("domain", input.domain.as_deref(), "Invalid domain URL")
        .url_opt("logoUrl", input.logo_url.as_deref(), "Invalid logo URL")
        .email_opt("billingEmail", input.billing_email.as_deref());
    v.finish()
}

pub fn validate_update_organization(input: &UpdateOrganization) -> Result<()> {
    let mut v = Validator::new();
    if let Some(name) = &input.name {
        v.name("name", name, "Organization name is required");
    }
    v.url_opt("domain", input.domain.as_deref(), "Invalid domain URL")
        .url_opt("logoUrl", input.logo_url.as_deref(), "Invalid logo URL")
        .email_opt("billingEmail", input.billing_email.as_deref());
    v.finish()
}

pub fn validate_create_workspace(input: &CreateWorkspace) -> Result<()> {
    let mut v = Validator::new();
    if input.organization_id.is_empty() {
        return Err(AppError::validation(
            "organizationId",
            "Invalid organization ID",
        ));
    }
    v.name("name", &input.name, "Workspace name is required")
        .slug("slug", &input.slug)
        .description_opt("description", input.description.as_deref());
    v.finish()
}

pub fn validate_update_workspace(input: &UpdateWorkspace) -> Result<()> {
    let mut v = Validator::new();
    if let Some(name) = &input.name {
        v.name("name", name, "Workspace name is required");
    }
    if let Some(slug) = &input.slug {
        v.slug("slug", slug);
    }
    v.description_opt("description", input.description.as_deref());
    v.finish()
}
