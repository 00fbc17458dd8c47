use serde_json::json;

use super::super::domain::{Role, StatusCode};
use super::super::policy::SUPERVISE_VERIFICATION;
use super::super::repository::Candidate;
use super::support::update;
use super::{
    Action, ActionCode, ActionContext, ActionOptions, ActionOutcome, ActionParams, ActionResult,
    ExecutionContext, FieldErrors, Guard,
};

/// Verifier acting on an application under verification, subject to policy.
pub(super) fn on_verification() -> Guard {
    Guard::roles([Role::Verifier])
        .and(Guard::states([StatusCode::Verification]))
        .and(Guard::Policy)
}

pub(super) struct TakeToVerification {
    guard: Guard,
}

impl TakeToVerification {
    pub(super) fn new() -> Self {
        Self {
            guard: on_verification(),
        }
    }
}

impl Action for TakeToVerification {
    fn code(&self) -> ActionCode {
        ActionCode::TakeToVerification
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Unassigned applications are open to any verifier; reassigning someone else's
    /// verification needs the supervise permission or `change_verifier`.
    fn allow(&self, ctx: &ActionContext<'_>) -> bool {
        let claimable = match ctx.application.verifier_id.as_deref() {
            None => true,
            Some(current) if current == ctx.actor.id => false,
            Some(_) => ctx.actor.permissions.contains(SUPERVISE_VERIFICATION),
        };
        claimable && self.guard.check(self.code(), ctx)
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, _params: &ActionParams) -> ActionResult {
        let verifier_id = ctx.actor.id.clone();
        update(
            ctx,
            self.code(),
            format!("verification taken by {verifier_id}"),
            |application| application.verifier_id = Some(verifier_id.clone()),
        )?;
        Ok(ActionOutcome::new(self.code()).with_data(json!({ "verifier_id": verifier_id })))
    }
}

/// Hands the verification over to another verifier from the directory.
pub(super) struct ChangeVerifier {
    guard: Guard,
}

impl ChangeVerifier {
    pub(super) fn new() -> Self {
        Self {
            guard: Guard::roles([Role::Verifier, Role::Admin])
                .and(Guard::states([StatusCode::Verification]))
                .and(Guard::Policy),
        }
    }

    fn candidates(ctx: &ActionContext<'_>) -> Vec<Candidate> {
        let current = ctx.application.verifier_id.as_deref();
        ctx.services
            .directory
            .members(Role::Verifier)
            .into_iter()
            .filter(|candidate| Some(candidate.id.as_str()) != current)
            .collect()
    }
}

impl Action for ChangeVerifier {
    fn code(&self) -> ActionCode {
        ActionCode::ChangeVerifier
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn options(&self, ctx: &ActionContext<'_>) -> ActionOptions {
        ActionOptions::with_candidates(Self::candidates(ctx))
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, params: &ActionParams) -> ActionResult {
        let mut errors = FieldErrors::default();
        let Some(verifier_id) = params.required_text("verifier_id", &mut errors) else {
            return Err(errors.into());
        };
        if !Self::candidates(&ctx.as_view())
            .iter()
            .any(|candidate| candidate.id == verifier_id)
        {
            return Err(FieldErrors::single("verifier_id", "is not an available verifier").into());
        }

        let previous = ctx.application.verifier_id.clone();
        update(
            ctx,
            self.code(),
            format!(
                "verifier changed from {} to {verifier_id}",
                previous.as_deref().unwrap_or("nobody")
            ),
            |application| application.verifier_id = Some(verifier_id.clone()),
        )?;
        Ok(ActionOutcome::new(self.code())
            .with_data(json!({ "previous": previous, "verifier_id": verifier_id })))
    }
}
