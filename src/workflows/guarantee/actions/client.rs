use serde_json::json;

use super::super::domain::{Role, StatusCode};
use super::super::status::StatusRegistry;
use super::support::{advance, advance_with, notify, record_log, update};
use super::{
    Action, ActionCode, ActionContext, ActionOptions, ActionOutcome, ActionParams, ActionResult,
    ExecutionContext, FieldErrors, Guard,
};

/// Statuses in which the bank already holds the request and must hear about a withdrawal.
const AT_BANK: [StatusCode; 4] = [
    StatusCode::SentToBank,
    StatusCode::InBankReview,
    StatusCode::BankInfoRequested,
    StatusCode::OfferSent,
];

fn applicant() -> Guard {
    Guard::roles([Role::Client, Role::Agent])
}

fn editable() -> Guard {
    Guard::states([StatusCode::Draft, StatusCode::InfoRequested])
}

pub(super) struct Edit {
    guard: Guard,
}

impl Edit {
    pub(super) fn new() -> Self {
        Self {
            guard: applicant().and(editable()).and(Guard::Policy),
        }
    }
}

impl Action for Edit {
    fn code(&self) -> ActionCode {
        ActionCode::Edit
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn options(&self, ctx: &ActionContext<'_>) -> ActionOptions {
        ActionOptions::default()
            .hint("required_amount", json!(ctx.application.required_amount))
            .hint("bank_id", json!(ctx.application.bank_id))
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, params: &ActionParams) -> ActionResult {
        let mut errors = FieldErrors::default();
        let amount = params.positive_decimal("required_amount", &mut errors);
        let bank_id = params.text("bank_id").map(str::to_string);
        if errors.is_empty() && amount.is_none() && bank_id.is_none() {
            errors.add("required_amount", "provide required_amount or bank_id");
        }
        if !errors.is_empty() {
            return Err(errors.into());
        }

        update(ctx, self.code(), "application details updated", |application| {
            if let Some(amount) = amount {
                application.required_amount = Some(amount);
            }
            if let Some(bank_id) = bank_id {
                application.bank_id = Some(bank_id);
            }
        })?;

        Ok(ActionOutcome::new(self.code()).with_data(json!({
            "required_amount": ctx.application.required_amount,
            "bank_id": ctx.application.bank_id,
        })))
    }
}

pub(super) struct SendToVerification {
    guard: Guard,
}

impl SendToVerification {
    pub(super) fn new() -> Self {
        Self {
            guard: applicant().and(editable()).and(Guard::Policy),
        }
    }
}

impl Action for SendToVerification {
    fn code(&self) -> ActionCode {
        ActionCode::SendToVerification
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, _params: &ActionParams) -> ActionResult {
        let mut errors = FieldErrors::default();
        if ctx.application.required_amount.is_none() {
            errors.add("required_amount", "is required");
        }
        if ctx.application.bank_id.is_none() {
            errors.add("bank_id", "is required");
        }
        if !errors.is_empty() {
            return Err(errors.into());
        }

        let record = advance(ctx, self.code(), StatusCode::Verification, "sent to verification")?;
        Ok(ActionOutcome::new(self.code()).with_transition(record))
    }
}

pub(super) struct Withdraw {
    guard: Guard,
}

impl Withdraw {
    pub(super) fn new() -> Self {
        let withdrawable = StatusRegistry::standard()
            .allowed_from(StatusCode::Withdrawn)
            .iter()
            .copied()
            .collect::<Vec<_>>();
        Self {
            guard: applicant()
                .and(Guard::States(withdrawable))
                .and(Guard::Policy),
        }
    }
}

impl Action for Withdraw {
    fn code(&self) -> ActionCode {
        ActionCode::Withdraw
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, params: &ActionParams) -> ActionResult {
        let reason = params
            .text("reason")
            .unwrap_or("withdrawn by applicant")
            .to_string();
        let was_at_bank = AT_BANK.contains(&ctx.application.status());
        let had_offer = ctx.application.has_offer();

        let record = advance(
            ctx,
            self.code(),
            StatusCode::Withdrawn,
            format!("withdrawn: {reason}"),
        )?;

        if was_at_bank {
            let adapter = ctx.services.banks.for_application(ctx.application);
            if had_offer {
                adapter.after_reject_offer(ctx.application)?;
            } else {
                adapter.after_reject_request(ctx.application, &reason)?;
            }
        }

        Ok(ActionOutcome::new(self.code())
            .with_transition(record)
            .with_data(json!({ "reason": reason })))
    }
}

pub(super) struct SendToBank {
    guard: Guard,
}

impl SendToBank {
    pub(super) fn new() -> Self {
        Self {
            guard: applicant()
                .and(Guard::states([StatusCode::Verified]))
                .and(Guard::Policy),
        }
    }
}

impl Action for SendToBank {
    fn code(&self) -> ActionCode {
        ActionCode::SendToBank
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn options(&self, ctx: &ActionContext<'_>) -> ActionOptions {
        let adapter = ctx.services.banks.for_application(ctx.application);
        ActionOptions::default().hint(
            "wait_for_signature",
            json!(adapter.requires_client_signature()),
        )
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, _params: &ActionParams) -> ActionResult {
        let wait_for_signature = ctx
            .services
            .banks
            .for_application(ctx.application)
            .requires_client_signature();
        let target = if wait_for_signature {
            StatusCode::AwaitingSignature
        } else {
            StatusCode::SentToBank
        };

        let record = advance(ctx, self.code(), target, format!("routed to bank ({target})"))?;
        Ok(ActionOutcome::new(self.code())
            .with_transition(record)
            .with_data(json!({ "wait_for_signature": wait_for_signature })))
    }
}

fn offer_holder() -> Guard {
    Guard::roles([Role::Client])
        .and(Guard::states([StatusCode::OfferSent]))
        .and(Guard::HasOffer(true))
        .and(Guard::Policy)
}

/// Accepts the bank's offer and closes every competing sibling.
pub(super) struct AcceptOffer {
    guard: Guard,
}

impl AcceptOffer {
    pub(super) fn new() -> Self {
        Self {
            guard: offer_holder(),
        }
    }
}

impl Action for AcceptOffer {
    fn code(&self) -> ActionCode {
        ActionCode::AcceptOffer
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Refused once any sibling has been accepted; an unreadable group counts as taken.
    fn allow(&self, ctx: &ActionContext<'_>) -> bool {
        self.guard.check(self.code(), ctx)
            && matches!(
                ctx.services.coordinator.has_winner(ctx.application),
                Ok(false)
            )
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, _params: &ActionParams) -> ActionResult {
        let offer_id = ctx.application.offer_id().cloned();
        let message = match &offer_id {
            Some(offer_id) => format!("offer {offer_id} accepted"),
            None => "offer accepted".to_string(),
        };
        let record = advance_with(
            ctx,
            self.code(),
            StatusCode::Accepted,
            message,
            offer_id.clone(),
            |_| {},
        )?;

        let report = ctx.services.coordinator.resolve(ctx.application, ctx.actor);

        ctx.services
            .banks
            .for_application(ctx.application)
            .after_client_offer_confirm(ctx.application)?;

        Ok(ActionOutcome::new(self.code())
            .with_transition(record)
            .with_data(json!({ "offer_id": offer_id, "siblings": report })))
    }
}

pub(super) struct RejectOffer {
    guard: Guard,
}

impl RejectOffer {
    pub(super) fn new() -> Self {
        Self {
            guard: offer_holder(),
        }
    }
}

impl Action for RejectOffer {
    fn code(&self) -> ActionCode {
        ActionCode::RejectOffer
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, params: &ActionParams) -> ActionResult {
        let offer_id = ctx.application.offer_id().cloned();
        let message = match params.text("reason") {
            Some(reason) => format!("offer rejected: {reason}"),
            None => "offer rejected".to_string(),
        };
        let record = advance_with(
            ctx,
            self.code(),
            StatusCode::Rejected,
            message,
            offer_id.clone(),
            |_| {},
        )?;

        ctx.services
            .banks
            .for_application(ctx.application)
            .after_reject_offer(ctx.application)?;

        Ok(ActionOutcome::new(self.code())
            .with_transition(record)
            .with_data(json!({ "offer_id": offer_id })))
    }
}

/// Free-text note on an open application; no status change.
pub(super) struct AddComment {
    guard: Guard,
}

impl AddComment {
    pub(super) fn new() -> Self {
        Self {
            guard: Guard::NonTerminal.and(Guard::Policy),
        }
    }
}

impl Action for AddComment {
    fn code(&self) -> ActionCode {
        ActionCode::AddComment
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, params: &ActionParams) -> ActionResult {
        let mut errors = FieldErrors::default();
        let text = params.required_text("text", &mut errors);
        let Some(text) = text else {
            return Err(errors.into());
        };

        record_log(ctx, self.code(), text.clone(), None);
        notify(ctx, self.code(), &[("text", text.as_str())]);
        Ok(ActionOutcome::new(self.code()).with_data(json!({ "text": text })))
    }
}
