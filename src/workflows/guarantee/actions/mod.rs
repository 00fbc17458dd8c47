//! Uniform contract every business operation on an application goes through.
//!
//! An action decides whether an actor may invoke it (`allow`), describes hints for the
//! presentation layer (`options`) and orchestrates the state change (`execute`). Transition
//! legality, persistence and notification delivery stay with the collaborators in
//! [`WorkflowServices`]; actions only compose them.

mod admin;
mod bank;
mod client;
mod guard;
mod params;
mod registry;
mod support;
mod verifier;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;

use super::domain::{Actor, Application};
use super::repository::{Candidate, IntegrationError, RepositoryError};
use super::service::WorkflowServices;
use super::status::{TransitionError, TransitionRecord};

pub use guard::Guard;
pub use params::{ActionParams, FieldErrors};
pub use registry::{ActionRegistry, Dispatcher, DuplicateAction};

/// Every operation the engine knows how to dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCode {
    Edit,
    SendToVerification,
    Withdraw,
    SendToBank,
    Sign,
    AnswerBankRequest,
    AcceptOffer,
    RejectOffer,
    ConfirmPayment,
    AddComment,
    TakeToVerification,
    Approve,
    Deny,
    RequestMoreInfo,
    ChangeVerifier,
    ReturnToVerification,
    TakeInWork,
    RequestBankInfo,
    RejectRequest,
    CreateOffer,
    EditOffer,
    RecallOffer,
    RequestPayment,
    Finish,
    AssignManager,
    ForceStatus,
}

impl ActionCode {
    pub const ALL: [ActionCode; 26] = [
        ActionCode::Edit,
        ActionCode::SendToVerification,
        ActionCode::Withdraw,
        ActionCode::SendToBank,
        ActionCode::Sign,
        ActionCode::AnswerBankRequest,
        ActionCode::AcceptOffer,
        ActionCode::RejectOffer,
        ActionCode::ConfirmPayment,
        ActionCode::AddComment,
        ActionCode::TakeToVerification,
        ActionCode::Approve,
        ActionCode::Deny,
        ActionCode::RequestMoreInfo,
        ActionCode::ChangeVerifier,
        ActionCode::ReturnToVerification,
        ActionCode::TakeInWork,
        ActionCode::RequestBankInfo,
        ActionCode::RejectRequest,
        ActionCode::CreateOffer,
        ActionCode::EditOffer,
        ActionCode::RecallOffer,
        ActionCode::RequestPayment,
        ActionCode::Finish,
        ActionCode::AssignManager,
        ActionCode::ForceStatus,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ActionCode::Edit => "edit",
            ActionCode::SendToVerification => "send_to_verification",
            ActionCode::Withdraw => "withdraw",
            ActionCode::SendToBank => "send_to_bank",
            ActionCode::Sign => "sign",
            ActionCode::AnswerBankRequest => "answer_bank_request",
            ActionCode::AcceptOffer => "accept_offer",
            ActionCode::RejectOffer => "reject_offer",
            ActionCode::ConfirmPayment => "confirm_payment",
            ActionCode::AddComment => "add_comment",
            ActionCode::TakeToVerification => "take_to_verification",
            ActionCode::Approve => "approve",
            ActionCode::Deny => "deny",
            ActionCode::RequestMoreInfo => "request_more_info",
            ActionCode::ChangeVerifier => "change_verifier",
            ActionCode::ReturnToVerification => "return_to_verification",
            ActionCode::TakeInWork => "take_in_work",
            ActionCode::RequestBankInfo => "request_bank_info",
            ActionCode::RejectRequest => "reject_request",
            ActionCode::CreateOffer => "create_offer",
            ActionCode::EditOffer => "edit_offer",
            ActionCode::RecallOffer => "recall_offer",
            ActionCode::RequestPayment => "request_payment",
            ActionCode::Finish => "finish",
            ActionCode::AssignManager => "assign_manager",
            ActionCode::ForceStatus => "force_status",
        }
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionCode {
    type Err = ActionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ActionCode::ALL
            .into_iter()
            .find(|code| code.as_str() == value)
            .ok_or_else(|| ActionError::UnknownAction(value.to_string()))
    }
}

/// Read-only view used to decide whether an action is available.
pub struct ActionContext<'a> {
    pub actor: &'a Actor,
    pub application: &'a Application,
    pub services: &'a WorkflowServices,
}

/// Mutable view handed to `execute`.
pub struct ExecutionContext<'a> {
    pub actor: &'a Actor,
    pub application: &'a mut Application,
    pub services: &'a WorkflowServices,
}

impl ExecutionContext<'_> {
    fn as_view(&self) -> ActionContext<'_> {
        ActionContext {
            actor: self.actor,
            application: &*self.application,
            services: self.services,
        }
    }
}

/// Structured hints the presentation layer needs to render an action.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActionOptions {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub candidates: Vec<Candidate>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub hints: BTreeMap<String, Value>,
}

impl ActionOptions {
    pub fn with_candidates(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            hints: BTreeMap::new(),
        }
    }

    pub fn hint(mut self, key: impl Into<String>, value: Value) -> Self {
        self.hints.insert(key.into(), value);
        self
    }
}

/// Successful action result with its action-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub code: ActionCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<TransitionRecord>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl ActionOutcome {
    pub fn new(code: ActionCode) -> Self {
        Self {
            code,
            transition: None,
            data: Value::Null,
        }
    }

    pub fn with_transition(mut self, record: TransitionRecord) -> Self {
        self.transition = Some(record);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Failure returned from dispatch; nothing in the engine panics or aborts.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    /// Deliberately carries no detail about which check failed.
    #[error("not allowed")]
    NotAllowed,
    #[error("validation failed: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    /// The local transition is already committed when this is returned.
    #[error("bank integration failed: {0}")]
    Integration(#[from] IntegrationError),
}

impl From<FieldErrors> for ActionError {
    fn from(errors: FieldErrors) -> Self {
        ActionError::Validation(errors)
    }
}

pub type ActionResult = Result<ActionOutcome, ActionError>;

/// One business operation.
pub trait Action: Send + Sync {
    fn code(&self) -> ActionCode;

    fn guard(&self) -> &Guard;

    fn allow(&self, ctx: &ActionContext<'_>) -> bool {
        self.guard().check(self.code(), ctx)
    }

    fn options(&self, _ctx: &ActionContext<'_>) -> ActionOptions {
        ActionOptions::default()
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>, params: &ActionParams) -> ActionResult;
}
