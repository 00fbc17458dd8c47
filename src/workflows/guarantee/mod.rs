//! Bank guarantee application workflow.
//!
//! Applications move through a fixed status table, every business operation is an action
//! dispatched against one application on behalf of one actor, and applications fanned out to
//! several banks are kept to a single accepted winner.

pub mod actions;
pub mod domain;
pub mod policy;
pub mod reasons;
pub mod repository;
pub mod service;
pub mod siblings;
pub mod status;

#[cfg(test)]
mod tests;

pub use actions::{
    Action, ActionCode, ActionError, ActionOptions, ActionOutcome, ActionParams, ActionRegistry,
    Dispatcher, FieldErrors, Guard,
};
pub use domain::{
    Actor, Application, ApplicationId, GroupId, LogEntry, Offer, OfferId, Role, StatusCode,
};
pub use policy::PolicyTree;
pub use reasons::{CanonicalReason, RejectionReason};
pub use repository::{
    ActorDirectory, ApplicationRepository, BankAdapters, BankIntegrationAdapter, Candidate,
    IntegrationError, NoopBankAdapter, Notification, NotificationError, NotificationPublisher,
    RepositoryError, StaticDirectory,
};
pub use service::{GuaranteeWorkflowService, WorkflowServices};
pub use siblings::{CoordinationReport, SiblingCoordinator};
pub use status::{StatusEntry, StatusRegistry, TransitionError, TransitionExecutor, TransitionMode};
