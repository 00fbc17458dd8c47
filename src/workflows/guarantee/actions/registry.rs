use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, info};

use super::super::domain::{Actor, Application, Role, StatusCode};
use super::super::service::WorkflowServices;
use super::support::TransitionAction;
use super::{
    admin, bank, client, verifier, Action, ActionCode, ActionContext, ActionError, ActionOptions,
    ActionParams, ActionResult, ExecutionContext, Guard,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("action `{0}` is already registered")]
pub struct DuplicateAction(pub ActionCode);

/// Explicit set of actions a dispatcher may run, built once at startup.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every action the guarantee workflow ships with.
    pub fn standard() -> Self {
        let simple = [
            TransitionAction::new(
                ActionCode::Sign,
                Guard::roles([Role::Client])
                    .and(Guard::states([StatusCode::AwaitingSignature]))
                    .and(Guard::Policy),
                StatusCode::SentToBank,
            ),
            TransitionAction::new(
                ActionCode::AnswerBankRequest,
                Guard::roles([Role::Client, Role::Agent])
                    .and(Guard::states([StatusCode::BankInfoRequested]))
                    .and(Guard::Policy),
                StatusCode::SentToBank,
            ),
            TransitionAction::new(
                ActionCode::ConfirmPayment,
                Guard::roles([Role::Client])
                    .and(Guard::states([StatusCode::AwaitingPayment]))
                    .and(Guard::Policy),
                StatusCode::PaymentConfirmed,
            ),
            TransitionAction::new(
                ActionCode::Approve,
                verifier::on_verification(),
                StatusCode::Verified,
            ),
            TransitionAction::new(ActionCode::Deny, verifier::on_verification(), StatusCode::Denied)
                .requiring("reason"),
            TransitionAction::new(
                ActionCode::RequestMoreInfo,
                verifier::on_verification(),
                StatusCode::InfoRequested,
            )
            .requiring("comment"),
            TransitionAction::new(
                ActionCode::ReturnToVerification,
                Guard::roles([Role::Verifier])
                    .and(Guard::states([StatusCode::Verified]))
                    .and(Guard::Policy),
                StatusCode::Verification,
            ),
            TransitionAction::new(
                ActionCode::TakeInWork,
                Guard::roles([Role::Bank])
                    .and(Guard::states([StatusCode::SentToBank]))
                    .and(Guard::Policy),
                StatusCode::InBankReview,
            ),
            TransitionAction::new(
                ActionCode::RequestBankInfo,
                Guard::roles([Role::Bank])
                    .and(Guard::states([StatusCode::SentToBank, StatusCode::InBankReview]))
                    .and(Guard::Policy),
                StatusCode::BankInfoRequested,
            )
            .requiring("comment"),
            TransitionAction::new(
                ActionCode::RequestPayment,
                Guard::roles([Role::Bank])
                    .and(Guard::states([StatusCode::Accepted]))
                    .and(Guard::Policy),
                StatusCode::AwaitingPayment,
            ),
            TransitionAction::new(
                ActionCode::Finish,
                Guard::roles([Role::Bank])
                    .and(Guard::states([StatusCode::PaymentConfirmed]))
                    .and(Guard::Policy),
                StatusCode::Finished,
            )
            .requiring("guarantee_number"),
        ];

        let mut actions: Vec<Arc<dyn Action>> = vec![
            Arc::new(client::Edit::new()),
            Arc::new(client::SendToVerification::new()),
            Arc::new(client::Withdraw::new()),
            Arc::new(client::SendToBank::new()),
            Arc::new(client::AcceptOffer::new()),
            Arc::new(client::RejectOffer::new()),
            Arc::new(client::AddComment::new()),
            Arc::new(verifier::TakeToVerification::new()),
            Arc::new(verifier::ChangeVerifier::new()),
            Arc::new(bank::RejectRequest::new()),
            Arc::new(bank::CreateOffer::new()),
            Arc::new(bank::EditOffer::new()),
            Arc::new(bank::RecallOffer::new()),
            Arc::new(admin::AssignManager::new()),
            Arc::new(admin::ForceStatus::new()),
        ];
        actions.extend(
            simple
                .into_iter()
                .map(|action| Arc::new(action) as Arc<dyn Action>),
        );
        actions.sort_by_key(|action| action.code());

        Self { actions }
    }

    /// Adds an implementation for a code this registry does not hold yet.
    ///
    /// Codes come from the closed [`ActionCode`] set, so a host can supply its own
    /// implementation for a known operation (starting from [`ActionRegistry::new`] or after
    /// leaving one out) but cannot introduce an operation the workflow does not define.
    pub fn register(&mut self, action: Arc<dyn Action>) -> Result<(), DuplicateAction> {
        let code = action.code();
        if self.get(code).is_some() {
            return Err(DuplicateAction(code));
        }
        self.actions.push(action);
        Ok(())
    }

    pub fn get(&self, code: ActionCode) -> Option<&Arc<dyn Action>> {
        self.actions.iter().find(|action| action.code() == code)
    }

    pub fn codes(&self) -> Vec<ActionCode> {
        self.actions.iter().map(|action| action.code()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Action>> {
        self.actions.iter()
    }
}

/// Registry bound to one application and one actor.
pub struct Dispatcher<'a> {
    registry: &'a ActionRegistry,
    services: &'a WorkflowServices,
    actor: &'a Actor,
    application: Application,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        registry: &'a ActionRegistry,
        services: &'a WorkflowServices,
        actor: &'a Actor,
        application: Application,
    ) -> Self {
        Self {
            registry,
            services,
            actor,
            application,
        }
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn into_application(self) -> Application {
        self.application
    }

    fn view(&self) -> ActionContext<'_> {
        ActionContext {
            actor: self.actor,
            application: &self.application,
            services: self.services,
        }
    }

    /// Runs `code` if it exists and the actor may invoke it right now.
    pub fn dispatch(&mut self, code: &str, params: &ActionParams) -> ActionResult {
        let code = ActionCode::from_str(code)?;
        let action = self
            .registry
            .get(code)
            .ok_or_else(|| ActionError::UnknownAction(code.to_string()))?
            .clone();

        if !action.allow(&self.view()) {
            debug!(
                application_id = %self.application.id,
                actor_id = %self.actor.id,
                action = %code,
                status = %self.application.status(),
                "action refused"
            );
            return Err(ActionError::NotAllowed);
        }

        let mut ctx = ExecutionContext {
            actor: self.actor,
            application: &mut self.application,
            services: self.services,
        };
        let outcome = action.execute(&mut ctx, params)?;
        info!(
            application_id = %self.application.id,
            actor_id = %self.actor.id,
            action = %code,
            status = %self.application.status(),
            "action executed"
        );
        Ok(outcome)
    }

    /// Options for every action the actor may invoke in the application's current state.
    pub fn list_allowed(&self) -> BTreeMap<ActionCode, ActionOptions> {
        let ctx = self.view();
        self.registry
            .iter()
            .filter(|action| action.allow(&ctx))
            .map(|action| (action.code(), action.options(&ctx)))
            .collect()
    }
}
