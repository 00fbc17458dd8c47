use super::super::domain::{Role, StatusCode};
use super::{ActionCode, ActionContext};

/// Composable availability predicate for an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Actor holds at least one of the roles.
    Roles(Vec<Role>),
    /// Application is in one of the statuses.
    States(Vec<StatusCode>),
    NonTerminal,
    HasOffer(bool),
    /// The policy tree permits the action for this actor and application.
    Policy,
    All(Vec<Guard>),
    Any(Vec<Guard>),
}

impl Guard {
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Guard::Roles(roles.into_iter().collect())
    }

    pub fn states(states: impl IntoIterator<Item = StatusCode>) -> Self {
        Guard::States(states.into_iter().collect())
    }

    pub fn and(self, other: Guard) -> Self {
        match self {
            Guard::All(mut guards) => {
                guards.push(other);
                Guard::All(guards)
            }
            guard => Guard::All(vec![guard, other]),
        }
    }

    pub fn or(self, other: Guard) -> Self {
        match self {
            Guard::Any(mut guards) => {
                guards.push(other);
                Guard::Any(guards)
            }
            guard => Guard::Any(vec![guard, other]),
        }
    }

    pub fn check(&self, code: ActionCode, ctx: &ActionContext<'_>) -> bool {
        match self {
            Guard::Roles(roles) => roles.iter().any(|role| ctx.actor.has_role(*role)),
            Guard::States(states) => states.contains(&ctx.application.status()),
            Guard::NonTerminal => !ctx.application.status().is_terminal(),
            Guard::HasOffer(expected) => ctx.application.has_offer() == *expected,
            Guard::Policy => {
                ctx.services
                    .policies
                    .evaluate(code.as_str(), ctx.actor, ctx.application)
            }
            Guard::All(guards) => guards.iter().all(|guard| guard.check(code, ctx)),
            Guard::Any(guards) => guards.iter().any(|guard| guard.check(code, ctx)),
        }
    }
}
