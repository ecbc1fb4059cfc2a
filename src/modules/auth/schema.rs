use lazy_static::lazy_static;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::{Validate, ValidationErrors};

use super::model::{Role, User};

pub const MAX_PHOTO_BYTES: usize = 5 * 1024 * 1024;
pub const ALLOWED_PHOTO_TYPES: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];
pub const MIN_AGE: u32 = 18;

lazy_static! {
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{10,15}$").unwrap();
}

// =============================================================================
// LOGIN
// =============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

// =============================================================================
// AUTHORIZATION STATUS (enrichment payload)
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthStatusDetail {
    #[serde(default)]
    pub authorization_status: Option<String>,
    #[serde(default)]
    pub is_authorized: Option<bool>,
    #[serde(default)]
    pub can_access_qr: Option<bool>,
    #[serde(default)]
    pub authorization_info: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// =============================================================================
// REGISTER
// =============================================================================

/// Identification photo attached to a registration
#[derive(Debug, Clone)]
pub struct IdentificationPhoto {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl IdentificationPhoto {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "identificacion".to_string());
        let content_type = match path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            _ => "application/octet-stream",
        };
        Ok(Self::new(file_name, content_type, bytes))
    }

    fn problem(&self) -> Option<&'static str> {
        if !ALLOWED_PHOTO_TYPES.contains(&self.content_type.as_str()) {
            return Some("Only JPG or PNG images are allowed");
        }
        if self.bytes.len() > MAX_PHOTO_BYTES {
            return Some("The image must be smaller than 5MB");
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, Validate)]
pub struct RegisterForm {
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email format is not valid")
    )]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub password_confirm: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Surname is required"))]
    pub surname: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(range(min = 18, message = "Must be an adult (18 or older)"))]
    pub age: u32,
    pub phone: String,
    pub role: Option<Role>,
    pub photo: Option<IdentificationPhoto>,
}

impl RegisterForm {
    /// Client-side checks run before anything is sent; the server stays authoritative
    pub fn check(&self) -> Result<(), Vec<FieldError>> {
        let mut errors = match self.validate() {
            Ok(()) => Vec::new(),
            Err(e) => field_errors(&e),
        };

        if self.password != self.password_confirm {
            errors.push(FieldError::new("password_confirm", "Passwords do not match"));
        }

        let phone: String = self.phone.chars().filter(|c| !c.is_whitespace()).collect();
        if phone.is_empty() {
            errors.push(FieldError::new("phone", "Phone is required"));
        } else if !PHONE_RE.is_match(&phone) {
            errors.push(FieldError::new("phone", "Phone format is not valid"));
        }

        match self.role {
            None => errors.push(FieldError::new("role", "A role must be selected")),
            Some(role) if !Role::REGISTRABLE.contains(&role) => {
                errors.push(FieldError::new("role", "This role cannot be chosen at registration"))
            }
            Some(_) => {}
        }

        match &self.photo {
            None => errors.push(FieldError::new("photo", "An identification photo is required")),
            Some(photo) => {
                if let Some(problem) = photo.problem() {
                    errors.push(FieldError::new("photo", problem));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            errors.sort_by(|a, b| a.field.cmp(&b.field));
            Err(errors)
        }
    }

    /// Multipart body in the backend's field names. The confirmation field is not sent.
    pub fn to_multipart(&self) -> Result<Form, reqwest::Error> {
        let mut form = Form::new()
            .text("email", self.email.trim().to_string())
            .text("password", self.password.clone())
            .text("nombre_completo", self.name.trim().to_string())
            .text("apellidos", self.surname.trim().to_string())
            .text("direccion", self.address.trim().to_string())
            .text("edad", self.age.to_string())
            .text(
                "telefono",
                self.phone.chars().filter(|c| !c.is_whitespace()).collect::<String>(),
            );

        if let Some(role) = self.role {
            form = form.text("role", role.as_str());
        }

        if let Some(photo) = &self.photo {
            let part = Part::bytes(photo.bytes.clone())
                .file_name(photo.file_name.clone())
                .mime_str(&photo.content_type)?;
            form = form.part("foto_identificacion", part);
        }

        Ok(form)
    }
}

/// First message per field, ordered by field name
fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out: Vec<FieldError> = errors
        .field_errors()
        .into_iter()
        .filter_map(|(field, errs)| {
            errs.first().map(|err| FieldError {
                field: field.to_string(),
                message: err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| err.code.to_string()),
            })
        })
        .collect();
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub user: Option<User>,
    pub message: String,
}
