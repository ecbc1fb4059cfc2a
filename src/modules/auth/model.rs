use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::services::timestamp;

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "voluntarios")]
    Volunteer,
    #[serde(rename = "personal")]
    Staff,
    #[serde(rename = "servicio_social")]
    SocialService,
    #[serde(rename = "visitas")]
    Visitor,
    #[serde(rename = "familiares")]
    Family,
    #[serde(rename = "donantes")]
    Donor,
    #[serde(rename = "proveedores")]
    Supplier,
    /// Any role this client does not know about yet
    #[default]
    #[serde(rename = "other", other)]
    Other,
}

impl Role {
    /// Roles a new account may register with
    pub const REGISTRABLE: [Role; 7] = [
        Role::Volunteer,
        Role::Staff,
        Role::SocialService,
        Role::Visitor,
        Role::Family,
        Role::Donor,
        Role::Supplier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Volunteer => "voluntarios",
            Self::Staff => "personal",
            Self::SocialService => "servicio_social",
            Self::Visitor => "visitas",
            Self::Family => "familiares",
            Self::Donor => "donantes",
            Self::Supplier => "proveedores",
            Self::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Admin => "Administrator",
            Self::Volunteer => "Volunteers",
            Self::Staff => "Staff",
            Self::SocialService => "Social Service",
            Self::Visitor => "Visitors",
            Self::Family => "Family",
            Self::Donor => "Donors",
            Self::Supplier => "Suppliers",
            Self::Other => "Member",
        }
    }

    pub fn welcome_message(&self) -> &'static str {
        match self {
            Self::Admin => "Welcome, administrator! You have full access to the system.",
            Self::Volunteer => "Thank you for being part of our volunteer team!",
            Self::Staff => "Welcome to the team! Together we make a difference.",
            Self::SocialService => "Thank you for your commitment to social service!",
            Self::Visitor => "Welcome! We hope you enjoy your visit.",
            Self::Family => "Welcome! We are glad to have you as part of our family.",
            Self::Donor => "Thank you for your generosity and continued support!",
            Self::Supplier => "Welcome! We value our partnership.",
            Self::Other => "Welcome to Casa del Sol!",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" | "administrator" => Ok(Self::Admin),
            "voluntarios" | "volunteer" => Ok(Self::Volunteer),
            "personal" | "staff" => Ok(Self::Staff),
            "servicio_social" | "social-service" | "social_service" => Ok(Self::SocialService),
            "visitas" | "visitor" => Ok(Self::Visitor),
            "familiares" | "family" => Ok(Self::Family),
            "donantes" | "donor" => Ok(Self::Donor),
            "proveedores" | "supplier" => Ok(Self::Supplier),
            other => Err(format!("Unknown role '{}'", other)),
        }
    }
}

// =============================================================================
// AUTHORIZATION STATUS
// =============================================================================

/// Account standing, independent of authentication and of role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizationStatus {
    Pending,
    Authorized,
    Unauthorized,
}

impl AuthorizationStatus {
    /// Collapses the server's status string and the legacy `is_authorized` flag into one value.
    ///
    /// A recognised `authorization_status` always wins. Without one, the legacy
    /// flag decides: `true` is authorized, `false` or absent is pending.
    /// `unauthorized` can only come from an explicit status.
    pub fn normalize(status: Option<&str>, legacy_is_authorized: Option<bool>) -> Self {
        match status.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("pending") => Self::Pending,
            Some("authorized") => Self::Authorized,
            Some("unauthorized") => Self::Unauthorized,
            _ if legacy_is_authorized == Some(true) => Self::Authorized,
            _ => Self::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Authorized => "authorized",
            Self::Unauthorized => "unauthorized",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending authorization",
            Self::Authorized => "Authorized",
            Self::Unauthorized => "Unauthorized",
        }
    }
}

impl fmt::Display for AuthorizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthorizationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "authorized" => Ok(Self::Authorized),
            "unauthorized" => Ok(Self::Unauthorized),
            other => Err(format!("Unknown authorization status '{}'", other)),
        }
    }
}

// =============================================================================
// USER
// =============================================================================

/// User exactly as the backend sends it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub nombre_completo: String,
    #[serde(default)]
    pub apellidos: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telefono: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direccion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edad: Option<u32>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_authorized: Option<bool>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option", skip_serializing_if = "Option::is_none")]
    pub authorized_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option", skip_serializing_if = "Option::is_none")]
    pub unauthorized_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_info: Option<String>,
    #[serde(default, alias = "foto_identificacion_path", skip_serializing_if = "Option::is_none")]
    pub foto_identificacion: Option<String>,
}

/// User with its authorization standing already normalized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "UserRecord", into = "UserRecord")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub age: Option<u32>,
    pub role: Role,
    pub authorization: AuthorizationStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub authorized_at: Option<DateTime<Utc>>,
    pub unauthorized_at: Option<DateTime<Utc>>,
    pub authorization_info: Option<String>,
    pub identification_photo: Option<String>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname).trim().to_string()
    }

    pub fn initials(&self) -> String {
        let first = self.name.chars().next();
        let last = self.surname.chars().next();
        match (first, last) {
            (Some(a), Some(b)) => format!("{}{}", a, b).to_uppercase(),
            _ => "US".to_string(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        let authorization = AuthorizationStatus::normalize(
            record.authorization_status.as_deref(),
            record.is_authorized,
        );
        Self {
            id: record.id,
            email: record.email,
            name: record.nombre_completo,
            surname: record.apellidos,
            phone: record.telefono,
            address: record.direccion,
            age: record.edad,
            role: record.role,
            authorization,
            created_at: record.created_at,
            authorized_at: record.authorized_at,
            unauthorized_at: record.unauthorized_at,
            authorization_info: record.authorization_info,
            identification_photo: record.foto_identificacion,
        }
    }
}

impl From<User> for UserRecord {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            nombre_completo: user.name,
            apellidos: user.surname,
            telefono: user.phone,
            direccion: user.address,
            edad: user.age,
            role: user.role,
            authorization_status: Some(user.authorization.as_str().to_string()),
            is_authorized: Some(user.authorization == AuthorizationStatus::Authorized),
            created_at: user.created_at,
            authorized_at: user.authorized_at,
            unauthorized_at: user.unauthorized_at,
            authorization_info: user.authorization_info,
            foto_identificacion: user.identification_photo,
        }
    }
}

/// Backend ids arrive as numbers or strings depending on the endpoint
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(i64),
        Text(String),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
    })
}
