use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::modules::access::AccessLog;
use crate::services::timestamp;

// =============================================================================
// CURRENT CODE
// =============================================================================

/// Response of GET /qr/current
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QrCode {
    pub code: String,
    /// Bare base64 PNG or a data: URL
    #[serde(default)]
    pub qr_image: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub expires_at: DateTime<Utc>,
}

impl QrCode {
    /// Decoded PNG bytes of the rendered code, if the server sent one
    pub fn image_png_bytes(&self) -> Result<Option<Vec<u8>>, base64::DecodeError> {
        let Some(raw) = self.qr_image.as_deref() else {
            return Ok(None);
        };
        let payload = match raw.strip_prefix("data:") {
            Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(""),
            None => raw,
        };
        STANDARD.decode(payload.trim()).map(Some)
    }
}

// =============================================================================
// SCAN
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Entry,
    Exit,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Entry => "Entry",
            Self::Exit => "Exit",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entry" | "in" => Ok(Self::Entry),
            "exit" | "out" => Ok(Self::Exit),
            other => Err(format!("unknown access type '{}', expected entry or exit", other)),
        }
    }
}

/// Body of POST /qr/scan
#[derive(Debug, Serialize)]
pub struct ScanRequest<'a> {
    pub qr_code: &'a str,
    pub access_type: AccessType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub access_log: Option<AccessLog>,
}
