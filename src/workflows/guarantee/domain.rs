use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for guarantee applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

/// Key shared by every application fanned out from one client submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub String);

impl GroupId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OfferId(pub String);

impl OfferId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Draft,
    Verification,
    InfoRequested,
    Verified,
    AwaitingSignature,
    SentToBank,
    InBankReview,
    BankInfoRequested,
    OfferSent,
    Accepted,
    AwaitingPayment,
    PaymentConfirmed,
    Finished,
    Denied,
    Withdrawn,
    Rejected,
}

impl StatusCode {
    pub const ALL: [StatusCode; 16] = [
        StatusCode::Draft,
        StatusCode::Verification,
        StatusCode::InfoRequested,
        StatusCode::Verified,
        StatusCode::AwaitingSignature,
        StatusCode::SentToBank,
        StatusCode::InBankReview,
        StatusCode::BankInfoRequested,
        StatusCode::OfferSent,
        StatusCode::Accepted,
        StatusCode::AwaitingPayment,
        StatusCode::PaymentConfirmed,
        StatusCode::Finished,
        StatusCode::Denied,
        StatusCode::Withdrawn,
        StatusCode::Rejected,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            StatusCode::Draft => "draft",
            StatusCode::Verification => "verification",
            StatusCode::InfoRequested => "info_requested",
            StatusCode::Verified => "verified",
            StatusCode::AwaitingSignature => "awaiting_signature",
            StatusCode::SentToBank => "sent_to_bank",
            StatusCode::InBankReview => "in_bank_review",
            StatusCode::BankInfoRequested => "bank_info_requested",
            StatusCode::OfferSent => "offer_sent",
            StatusCode::Accepted => "accepted",
            StatusCode::AwaitingPayment => "awaiting_payment",
            StatusCode::PaymentConfirmed => "payment_confirmed",
            StatusCode::Finished => "finished",
            StatusCode::Denied => "denied",
            StatusCode::Withdrawn => "withdrawn",
            StatusCode::Rejected => "rejected",
        }
    }

    /// Terminal statuses never compete for a bank decision again.
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            StatusCode::Finished | StatusCode::Denied | StatusCode::Withdrawn | StatusCode::Rejected
        )
    }

    /// The client has accepted this application's offer; at most one sibling may ever get here.
    pub const fn is_past_acceptance(self) -> bool {
        matches!(
            self,
            StatusCode::Accepted
                | StatusCode::AwaitingPayment
                | StatusCode::PaymentConfirmed
                | StatusCode::Finished
        )
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status code `{0}`")]
pub struct UnknownStatus(pub String);

impl FromStr for StatusCode {
    type Err = UnknownStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        StatusCode::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| UnknownStatus(value.to_string()))
    }
}

/// Bank proposal attached to exactly one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub amount: Decimal,
    pub commission: Decimal,
    pub term_days: u32,
    pub created_at: DateTime<Utc>,
}

/// One bank guarantee request routed to exactly one bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub group_id: GroupId,
    status: StatusCode,
    status_changed_at: DateTime<Utc>,
    pub bank_id: Option<String>,
    pub client_id: String,
    pub agent_id: Option<String>,
    pub verifier_id: Option<String>,
    pub assigned_user_id: Option<String>,
    pub required_amount: Option<Decimal>,
    pub offer: Option<Offer>,
    pub created_at: DateTime<Utc>,
}

impl Application {
    /// New application in the initial draft state.
    pub fn draft(id: ApplicationId, group_id: GroupId, client_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            group_id,
            status: StatusCode::Draft,
            status_changed_at: now,
            bank_id: None,
            client_id: client_id.into(),
            agent_id: None,
            verifier_id: None,
            assigned_user_id: None,
            required_amount: None,
            offer: None,
            created_at: now,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn status_changed_at(&self) -> DateTime<Utc> {
        self.status_changed_at
    }

    pub fn has_offer(&self) -> bool {
        self.offer.is_some()
    }

    pub fn offer_id(&self) -> Option<&OfferId> {
        self.offer.as_ref().map(|offer| &offer.id)
    }

    /// Status and its timestamp only move together.
    pub(crate) fn set_status(&mut self, status: StatusCode, at: DateTime<Utc>) {
        self.status = status;
        self.status_changed_at = at;
    }

    /// Rebuilds an application from storage, keeping status and timestamp paired.
    pub fn restore(mut self, status: StatusCode, status_changed_at: DateTime<Utc>) -> Self {
        self.set_status(status, status_changed_at);
        self
    }

    pub fn snapshot(&self) -> ApplicationSnapshot {
        ApplicationSnapshot {
            application_id: self.id.clone(),
            status: self.status.label(),
            bank_id: self.bank_id.clone(),
            client_id: self.client_id.clone(),
            required_amount: self.required_amount.map(|amount| amount.to_string()),
            offer_id: self.offer_id().cloned(),
        }
    }
}

/// Sanitized view handed to notifications and presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationSnapshot {
    pub application_id: ApplicationId,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_id: Option<String>,
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_id: Option<OfferId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Agent,
    Verifier,
    Bank,
    Admin,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Agent => "agent",
            Role::Verifier => "verifier",
            Role::Bank => "bank",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Role::Client),
            "agent" => Ok(Role::Agent),
            "verifier" => Ok(Role::Verifier),
            "bank" => Ok(Role::Bank),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role `{other}`")),
        }
    }
}

/// Person or system acting on an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub roles: BTreeSet<Role>,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    pub client_id: Option<String>,
    pub agent_id: Option<String>,
    pub bank_id: Option<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            roles: BTreeSet::from([role]),
            permissions: BTreeSet::new(),
            client_id: None,
            agent_id: None,
            bank_id: None,
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Immutable audit record appended for every action and forced transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub application_id: ApplicationId,
    pub actor_id: String,
    pub action: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_offer: Option<OfferId>,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(
        application_id: ApplicationId,
        actor_id: impl Into<String>,
        action: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            application_id,
            actor_id: actor_id.into(),
            action: action.into(),
            message: message.into(),
            reference_offer: None,
            created_at: Utc::now(),
        }
    }

    pub fn referencing(mut self, offer: OfferId) -> Self {
        self.reference_offer = Some(offer);
        self
    }
}
