use serde_json::{Map, Value};
use tracing::warn;

use super::super::domain::{Application, LogEntry, OfferId, StatusCode};
use super::super::repository::Notification;
use super::super::status::{TransitionMode, TransitionRecord};
use super::{
    Action, ActionCode, ActionError, ActionOutcome, ActionParams, ActionResult, ExecutionContext,
    FieldErrors, Guard,
};

/// Checked transition followed by the audit entry and the notification.
pub(super) fn advance(
    ctx: &mut ExecutionContext<'_>,
    code: ActionCode,
    target: StatusCode,
    message: impl Into<String>,
) -> Result<TransitionRecord, ActionError> {
    advance_with(ctx, code, target, message, None, |_| {})
}

/// Like [`advance`], applying `change` in the same save and referencing an offer in the log.
///
/// Nothing is visible on `ctx.application` unless the transition commits.
pub(super) fn advance_with<F>(
    ctx: &mut ExecutionContext<'_>,
    code: ActionCode,
    target: StatusCode,
    message: impl Into<String>,
    reference: Option<OfferId>,
    change: F,
) -> Result<TransitionRecord, ActionError>
where
    F: FnOnce(&mut Application),
{
    let mut next = ctx.application.clone();
    change(&mut next);
    let record = ctx.services.transitions.transition(
        &mut next,
        target,
        ctx.actor,
        TransitionMode::Checked,
    )?;
    *ctx.application = next;
    record_log(ctx, code, message, reference);
    notify(ctx, code, &[]);
    Ok(record)
}

/// Applies and persists a change that does not move the status.
///
/// The application is only replaced once the save succeeds.
pub(super) fn update<F>(
    ctx: &mut ExecutionContext<'_>,
    code: ActionCode,
    message: impl Into<String>,
    change: F,
) -> Result<(), ActionError>
where
    F: FnOnce(&mut Application),
{
    let mut next = ctx.application.clone();
    change(&mut next);
    ctx.services.repository.save(&next)?;
    *ctx.application = next;
    record_log(ctx, code, message, None);
    notify(ctx, code, &[]);
    Ok(())
}

/// Appends the audit entry; the state change it describes is already committed.
pub(super) fn record_log(
    ctx: &ExecutionContext<'_>,
    code: ActionCode,
    message: impl Into<String>,
    reference: Option<OfferId>,
) {
    let mut entry = LogEntry::new(
        ctx.application.id.clone(),
        ctx.actor.id.clone(),
        code.as_str(),
        message,
    );
    entry.reference_offer = reference;
    if let Err(error) = ctx.services.repository.append_log(entry) {
        warn!(application_id = %ctx.application.id, action = %code, %error, "audit entry not recorded");
    }
}

pub(super) fn notify(ctx: &ExecutionContext<'_>, code: ActionCode, details: &[(&str, &str)]) {
    let notification = details.iter().fold(
        Notification::new(code.as_str(), &*ctx.application),
        |notification, (key, value)| notification.with_detail(*key, *value),
    );
    if let Err(error) = ctx.services.notifications.publish(notification) {
        warn!(application_id = %ctx.application.id, action = %code, %error, "notification not delivered");
    }
}

/// Action whose whole effect is one checked transition, optionally requiring a text field.
pub(super) struct TransitionAction {
    code: ActionCode,
    guard: Guard,
    target: StatusCode,
    required_field: Option<&'static str>,
}

impl TransitionAction {
    pub(super) fn new(code: ActionCode, guard: Guard, target: StatusCode) -> Self {
        Self {
            code,
            guard,
            target,
            required_field: None,
        }
    }

    pub(super) fn requiring(mut self, field: &'static str) -> Self {
        self.required_field = Some(field);
        self
    }
}

impl Action for TransitionAction {
    fn code(&self) -> ActionCode {
        self.code
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, params: &ActionParams) -> ActionResult {
        let mut errors = FieldErrors::default();
        let detail = self
            .required_field
            .and_then(|field| params.required_text(field, &mut errors).map(|v| (field, v)));
        if !errors.is_empty() {
            return Err(errors.into());
        }

        let message = match &detail {
            Some((field, value)) => format!("{} ({field}: {value})", self.code),
            None => self.code.to_string(),
        };
        let record = advance(ctx, self.code, self.target, message)?;

        let outcome = ActionOutcome::new(self.code).with_transition(record);
        Ok(match detail {
            Some((field, value)) => outcome.with_data(Value::Object(Map::from_iter([(
                field.to_string(),
                Value::String(value),
            )]))),
            None => outcome,
        })
    }
}
