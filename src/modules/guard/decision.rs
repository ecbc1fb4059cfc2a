//! Navigation guard as an ordered decision table.
//!
//! Rules are checked top to bottom and the first match decides. The order
//! encodes precedence: loading, then authentication, then pending accounts,
//! then QR restrictions, then admin restrictions.

use super::route::{Route, RouteRequirements};
use crate::modules::auth::{AuthorizationStatus, SessionSnapshot};

/// Facts about the session the guard decides on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuardInput {
    pub loading: bool,
    pub authenticated: bool,
    pub authorization: Option<AuthorizationStatus>,
    pub is_admin: bool,
}

impl GuardInput {
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Self {
        Self {
            loading: snapshot.loading,
            authenticated: snapshot.authenticated,
            authorization: snapshot.authorization(),
            is_admin: snapshot.is_admin(),
        }
    }

    fn is_pending(&self) -> bool {
        self.authorization == Some(AuthorizationStatus::Pending)
    }

    fn can_access_qr(&self) -> bool {
        self.authorization == Some(AuthorizationStatus::Authorized)
    }
}

/// Which wording the restricted-access screen uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restriction {
    /// An administrator revoked the account's authorization
    ExplicitlyUnauthorized,
    /// The account has never been authorized
    NeverAuthorized,
}

impl Restriction {
    pub fn message(&self) -> &'static str {
        match self {
            Self::ExplicitlyUnauthorized => {
                "Your access has been revoked by an administrator. Contact the administration to restore it."
            }
            Self::NeverAuthorized => {
                "Your account is not authorized to use QR access yet. An administrator must approve it first."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    ShowLoading,
    Redirect(Route),
    ShowPending,
    ShowRestricted(Restriction),
    Render,
}

struct Rule {
    name: &'static str,
    applies: fn(&GuardInput, RouteRequirements) -> bool,
    outcome: fn(&GuardInput) -> GuardOutcome,
}

fn while_loading(input: &GuardInput, _: RouteRequirements) -> bool {
    input.loading
}

fn not_authenticated(input: &GuardInput, _: RouteRequirements) -> bool {
    !input.authenticated
}

fn pending_account(input: &GuardInput, _: RouteRequirements) -> bool {
    input.is_pending()
}

fn lacks_qr_access(input: &GuardInput, req: RouteRequirements) -> bool {
    req.require_qr_access && !input.can_access_qr()
}

fn lacks_admin_role(input: &GuardInput, req: RouteRequirements) -> bool {
    req.require_admin && !input.is_admin
}

fn always(_: &GuardInput, _: RouteRequirements) -> bool {
    true
}

fn restriction_for(input: &GuardInput) -> GuardOutcome {
    if input.authorization == Some(AuthorizationStatus::Unauthorized) {
        GuardOutcome::ShowRestricted(Restriction::ExplicitlyUnauthorized)
    } else {
        GuardOutcome::ShowRestricted(Restriction::NeverAuthorized)
    }
}

const PROTECTED_RULES: [Rule; 6] = [
    Rule {
        name: "loading",
        applies: while_loading,
        outcome: |_| GuardOutcome::ShowLoading,
    },
    Rule {
        name: "unauthenticated",
        applies: not_authenticated,
        outcome: |_| GuardOutcome::Redirect(Route::Home),
    },
    Rule {
        name: "pending",
        applies: pending_account,
        outcome: |_| GuardOutcome::ShowPending,
    },
    Rule {
        name: "qr-restricted",
        applies: lacks_qr_access,
        outcome: restriction_for,
    },
    Rule {
        name: "admin-restricted",
        applies: lacks_admin_role,
        outcome: |_| GuardOutcome::Redirect(Route::Welcome),
    },
    Rule {
        name: "authorized",
        applies: always,
        outcome: |_| GuardOutcome::Render,
    },
];

const PUBLIC_RULES: [Rule; 4] = [
    Rule {
        name: "loading",
        applies: while_loading,
        outcome: |_| GuardOutcome::ShowLoading,
    },
    Rule {
        name: "signed-in-pending",
        applies: |input, _| input.authenticated && input.is_pending(),
        outcome: |_| GuardOutcome::Redirect(Route::Pending),
    },
    Rule {
        name: "signed-in",
        applies: |input, _| input.authenticated,
        outcome: |_| GuardOutcome::Redirect(Route::Welcome),
    },
    Rule {
        name: "anonymous",
        applies: always,
        outcome: |_| GuardOutcome::Render,
    },
];

fn evaluate(rules: &[Rule], input: &GuardInput, requirements: RouteRequirements) -> GuardOutcome {
    for rule in rules {
        if (rule.applies)(input, requirements) {
            let outcome = (rule.outcome)(input);
            tracing::debug!(rule = rule.name, ?outcome, "Guard decision");
            return outcome;
        }
    }
    GuardOutcome::Render
}

/// Decision for a protected screen with the given requirements
pub fn decide(input: &GuardInput, requirements: RouteRequirements) -> GuardOutcome {
    evaluate(&PROTECTED_RULES, input, requirements)
}

/// Decision for the public entry screen
pub fn decide_public(input: &GuardInput) -> GuardOutcome {
    evaluate(&PUBLIC_RULES, input, RouteRequirements::NONE)
}

/// Decision for any known route
pub fn guard_route(route: Route, input: &GuardInput) -> GuardOutcome {
    if route.is_public() {
        decide_public(input)
    } else {
        decide(input, route.requirements())
    }
}
