pub mod crud;
pub mod identification;
pub mod interface;
pub mod schema;
pub mod user_management;

pub use crud::AdminApi;
pub use identification::{IdentificationImage, IdentificationViewer};
pub use interface::AdminError;
pub use schema::{PendingQuery, RejectCheck, SearchFilters, Stats, UserPage};
pub use user_management::{check_reject, UnauthorizeDraft, UserManagement};
