use std::fmt;

/// What a route demands beyond being signed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteRequirements {
    pub require_admin: bool,
    pub require_qr_access: bool,
}

impl RouteRequirements {
    pub const NONE: Self = Self {
        require_admin: false,
        require_qr_access: false,
    };
    pub const ADMIN: Self = Self {
        require_admin: true,
        require_qr_access: false,
    };
    pub const QR: Self = Self {
        require_admin: false,
        require_qr_access: true,
    };
    pub const ADMIN_QR: Self = Self {
        require_admin: true,
        require_qr_access: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// Public entry screen (login / register)
    Home,
    Welcome,
    Profile,
    Pending,
    Admin,
    AdminUsers,
    AccessManagement,
    QrDisplay,
    QrScanner,
}

impl Route {
    pub const ALL: [Route; 9] = [
        Route::Home,
        Route::Welcome,
        Route::Profile,
        Route::Pending,
        Route::Admin,
        Route::AdminUsers,
        Route::AccessManagement,
        Route::QrDisplay,
        Route::QrScanner,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Welcome => "/welcome",
            Self::Profile => "/profile",
            Self::Pending => "/pending",
            Self::Admin => "/admin",
            Self::AdminUsers => "/admin/users",
            Self::AccessManagement => "/admin/access",
            Self::QrDisplay => "/qr/display",
            Self::QrScanner => "/qr/scan",
        }
    }

    /// Unknown paths fall back to the public entry route
    pub fn from_path(path: &str) -> Self {
        let normalized = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        Self::ALL
            .into_iter()
            .find(|r| r.path() == normalized)
            .unwrap_or(Self::Home)
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Self::Home)
    }

    pub fn requirements(&self) -> RouteRequirements {
        match self {
            Self::Home | Self::Welcome | Self::Profile | Self::Pending => RouteRequirements::NONE,
            Self::Admin | Self::AdminUsers | Self::AccessManagement => RouteRequirements::ADMIN,
            Self::QrDisplay => RouteRequirements::ADMIN_QR,
            Self::QrScanner => RouteRequirements::QR,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
