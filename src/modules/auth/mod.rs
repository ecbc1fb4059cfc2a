pub mod crud;
pub mod interface;
pub mod model;
pub mod schema;
pub mod session;

pub use crud::AuthApi;
pub use interface::{AuthError, SessionService};
pub use model::{AuthorizationStatus, Role, User};
pub use schema::{IdentificationPhoto, RegisterForm};
pub use session::{AuthSession, SessionSnapshot};
