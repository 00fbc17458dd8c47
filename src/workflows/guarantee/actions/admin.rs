use std::str::FromStr;

use serde_json::json;

use super::super::domain::{Role, StatusCode};
use super::super::status::TransitionMode;
use super::support::{notify, record_log, update};
use super::{
    Action, ActionCode, ActionContext, ActionOptions, ActionOutcome, ActionParams, ActionResult,
    ExecutionContext, FieldErrors, Guard,
};

/// Sets the manager responsible for an open application.
pub(super) struct AssignManager {
    guard: Guard,
}

impl AssignManager {
    pub(super) fn new() -> Self {
        Self {
            guard: Guard::roles([Role::Admin, Role::Agent])
                .and(Guard::NonTerminal)
                .and(Guard::Policy),
        }
    }
}

impl Action for AssignManager {
    fn code(&self) -> ActionCode {
        ActionCode::AssignManager
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn options(&self, ctx: &ActionContext<'_>) -> ActionOptions {
        ActionOptions::with_candidates(ctx.services.directory.members(Role::Agent))
            .hint("assigned_user_id", json!(ctx.application.assigned_user_id))
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, params: &ActionParams) -> ActionResult {
        let mut errors = FieldErrors::default();
        let Some(user_id) = params.required_text("user_id", &mut errors) else {
            return Err(errors.into());
        };
        if !ctx.services.directory.is_member(Role::Agent, &user_id) {
            return Err(FieldErrors::single("user_id", "is not an available manager").into());
        }

        update(
            ctx,
            self.code(),
            format!("manager set to {user_id}"),
            |application| application.assigned_user_id = Some(user_id.clone()),
        )?;
        Ok(ActionOutcome::new(self.code()).with_data(json!({ "assigned_user_id": user_id })))
    }
}

/// Administrative override that skips the transition table.
pub(super) struct ForceStatus {
    guard: Guard,
}

impl ForceStatus {
    pub(super) fn new() -> Self {
        Self {
            guard: Guard::roles([Role::Admin]),
        }
    }
}

impl Action for ForceStatus {
    fn code(&self) -> ActionCode {
        ActionCode::ForceStatus
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn options(&self, _ctx: &ActionContext<'_>) -> ActionOptions {
        let statuses: Vec<&str> = StatusCode::ALL.iter().map(|status| status.label()).collect();
        ActionOptions::default().hint("status", json!(statuses))
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, params: &ActionParams) -> ActionResult {
        let mut errors = FieldErrors::default();
        let target = params
            .required_text("status", &mut errors)
            .and_then(|raw| match StatusCode::from_str(&raw) {
                Ok(status) => Some(status),
                Err(error) => {
                    errors.add("status", error.to_string());
                    None
                }
            });
        let justification = params.required_text("justification", &mut errors);
        let (Some(target), Some(justification)) = (target, justification) else {
            return Err(errors.into());
        };

        let record = ctx.services.transitions.transition(
            ctx.application,
            target,
            ctx.actor,
            TransitionMode::Forced {
                justification: &justification,
            },
        )?;
        record_log(
            ctx,
            self.code(),
            format!("{} -> {target} forced: {justification}", record.from),
            None,
        );
        notify(ctx, self.code(), &[("justification", justification.as_str())]);

        Ok(ActionOutcome::new(self.code())
            .with_transition(record)
            .with_data(json!({ "justification": justification })))
    }
}
