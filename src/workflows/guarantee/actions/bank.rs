use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;

use super::super::domain::{Offer, OfferId, Role, StatusCode};
use super::super::reasons::RejectionReason;
use super::support::{advance, advance_with, update};
use super::{
    Action, ActionCode, ActionContext, ActionOptions, ActionOutcome, ActionParams, ActionResult,
    ExecutionContext, FieldErrors, Guard,
};

fn bank_on(states: impl IntoIterator<Item = StatusCode>) -> Guard {
    Guard::roles([Role::Bank])
        .and(Guard::states(states))
        .and(Guard::Policy)
}

fn non_negative_decimal(
    params: &ActionParams,
    field: &str,
    errors: &mut FieldErrors,
) -> Option<Decimal> {
    match params.decimal(field, errors) {
        Some(value) if value < Decimal::ZERO => {
            errors.add(field, "must not be negative");
            None
        }
        value => value,
    }
}

/// Declines the request. The canonical client-refusal reason withdraws instead of rejecting.
pub(super) struct RejectRequest {
    guard: Guard,
}

impl RejectRequest {
    pub(super) fn new() -> Self {
        Self {
            guard: Guard::roles([Role::Bank, Role::Agent])
                .and(Guard::states([
                    StatusCode::SentToBank,
                    StatusCode::InBankReview,
                    StatusCode::BankInfoRequested,
                ]))
                .and(Guard::Policy),
        }
    }
}

impl Action for RejectRequest {
    fn code(&self) -> ActionCode {
        ActionCode::RejectRequest
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, params: &ActionParams) -> ActionResult {
        let mut errors = FieldErrors::default();
        let Some(text) = params.required_text("reason", &mut errors) else {
            return Err(errors.into());
        };
        let reason = RejectionReason::parse(&text);
        let target = reason.target_status();

        let record = advance(
            ctx,
            self.code(),
            target,
            format!("request declined: {}", reason.text),
        )?;

        ctx.services
            .banks
            .for_application(ctx.application)
            .after_reject_request(ctx.application, &reason.text)?;

        Ok(ActionOutcome::new(self.code())
            .with_transition(record)
            .with_data(json!({ "reason": reason })))
    }
}

pub(super) struct CreateOffer {
    guard: Guard,
}

impl CreateOffer {
    pub(super) fn new() -> Self {
        Self {
            guard: bank_on([StatusCode::SentToBank, StatusCode::InBankReview])
                .and(Guard::HasOffer(false)),
        }
    }
}

impl Action for CreateOffer {
    fn code(&self) -> ActionCode {
        ActionCode::CreateOffer
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn options(&self, ctx: &ActionContext<'_>) -> ActionOptions {
        ActionOptions::default().hint("required_amount", json!(ctx.application.required_amount))
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, params: &ActionParams) -> ActionResult {
        let mut errors = FieldErrors::default();
        let amount = params.required_positive_decimal("amount", &mut errors);
        let commission = if params.contains("commission") {
            non_negative_decimal(params, "commission", &mut errors)
        } else {
            errors.add("commission", "is required");
            None
        };
        let term_days = params.required_positive_integer("term_days", &mut errors);
        let (Some(amount), Some(commission), Some(term_days)) = (amount, commission, term_days)
        else {
            return Err(errors.into());
        };

        let offer = Offer {
            id: OfferId::generate(),
            amount,
            commission,
            term_days,
            created_at: Utc::now(),
        };
        let offer_id = offer.id.clone();
        let record = advance_with(
            ctx,
            self.code(),
            StatusCode::OfferSent,
            format!("offer {offer_id}: {amount} for {term_days} days, commission {commission}"),
            Some(offer_id.clone()),
            |application| application.offer = Some(offer),
        )?;

        Ok(ActionOutcome::new(self.code())
            .with_transition(record)
            .with_data(json!({ "offer_id": offer_id })))
    }
}

/// Amends the terms of a sent offer; the status does not move.
pub(super) struct EditOffer {
    guard: Guard,
}

impl EditOffer {
    pub(super) fn new() -> Self {
        Self {
            guard: bank_on([StatusCode::OfferSent]).and(Guard::HasOffer(true)),
        }
    }
}

impl Action for EditOffer {
    fn code(&self) -> ActionCode {
        ActionCode::EditOffer
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn options(&self, ctx: &ActionContext<'_>) -> ActionOptions {
        match &ctx.application.offer {
            Some(offer) => ActionOptions::default()
                .hint("amount", json!(offer.amount))
                .hint("commission", json!(offer.commission))
                .hint("term_days", json!(offer.term_days)),
            None => ActionOptions::default(),
        }
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, params: &ActionParams) -> ActionResult {
        let mut errors = FieldErrors::default();
        let amount = params.positive_decimal("amount", &mut errors);
        let commission = non_negative_decimal(params, "commission", &mut errors);
        let term_days = params.positive_integer("term_days", &mut errors);
        if !errors.is_empty() {
            return Err(errors.into());
        }

        let Some(current) = ctx.application.offer.clone() else {
            return Err(FieldErrors::single("offer", "no offer to edit").into());
        };
        let mut amended = current.clone();
        amended.amount = amount.unwrap_or(current.amount);
        amended.commission = commission.unwrap_or(current.commission);
        amended.term_days = term_days.unwrap_or(current.term_days);
        if amended == current {
            return Err(FieldErrors::single("offer", "nothing to change").into());
        }

        let offer_id = amended.id.clone();
        let data = json!({
            "offer_id": offer_id,
            "amount": amended.amount,
            "commission": amended.commission,
            "term_days": amended.term_days,
        });
        update(ctx, self.code(), format!("offer {offer_id} amended"), |application| {
            application.offer = Some(amended)
        })?;
        Ok(ActionOutcome::new(self.code()).with_data(data))
    }
}

/// Withdraws the bank's offer and puts the request back under review.
pub(super) struct RecallOffer {
    guard: Guard,
}

impl RecallOffer {
    pub(super) fn new() -> Self {
        Self {
            guard: bank_on([StatusCode::OfferSent]).and(Guard::HasOffer(true)),
        }
    }
}

impl Action for RecallOffer {
    fn code(&self) -> ActionCode {
        ActionCode::RecallOffer
    }

    fn guard(&self) -> &Guard {
        &self.guard
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, params: &ActionParams) -> ActionResult {
        let offer_id = ctx.application.offer_id().cloned();
        let message = match (&offer_id, params.text("reason")) {
            (Some(offer_id), Some(reason)) => format!("offer {offer_id} recalled: {reason}"),
            (Some(offer_id), None) => format!("offer {offer_id} recalled"),
            (None, _) => "offer recalled".to_string(),
        };
        let record = advance_with(
            ctx,
            self.code(),
            StatusCode::InBankReview,
            message,
            offer_id.clone(),
            |application| application.offer = None,
        )?;

        Ok(ActionOutcome::new(self.code())
            .with_transition(record)
            .with_data(json!({ "recalled_offer_id": offer_id })))
    }
}
