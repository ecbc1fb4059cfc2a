pub mod crud;
pub mod report;
pub mod schema;

pub use crud::{default_exit_note, AccessApi};
pub use report::AccessReport;
pub use schema::{AccessLog, AccessLogPage, AccessLogQuery, UserInside};
