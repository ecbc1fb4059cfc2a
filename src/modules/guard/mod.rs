pub mod decision;
pub mod route;

pub use decision::{decide, decide_public, guard_route, GuardInput, GuardOutcome, Restriction};
pub use route::{Route, RouteRequirements};
