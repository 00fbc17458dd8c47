use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{Application, ApplicationId, GroupId, LogEntry, Role};

/// Storage abstraction so the engine can be exercised in isolation.
pub trait ApplicationRepository: Send + Sync {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn save(&self, application: &Application) -> Result<(), RepositoryError>;
    fn siblings(&self, group_id: &GroupId) -> Result<Vec<Application>, RepositoryError>;
    fn append_log(&self, entry: LogEntry) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound notification hook; delivery mechanics live behind the implementation.
pub trait NotificationPublisher: Send + Sync {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError>;
}

/// Event code plus a flattened snapshot of application data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub event_code: String,
    pub application_id: ApplicationId,
    pub details: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(event_code: impl Into<String>, application: &Application) -> Self {
        let snapshot = application.snapshot();
        let mut details = BTreeMap::new();
        details.insert("status".to_string(), snapshot.status.to_string());
        details.insert("client_id".to_string(), snapshot.client_id);
        if let Some(bank_id) = snapshot.bank_id {
            details.insert("bank_id".to_string(), bank_id);
        }
        if let Some(amount) = snapshot.required_amount {
            details.insert("required_amount".to_string(), amount);
        }
        if let Some(offer_id) = snapshot.offer_id {
            details.insert("offer_id".to_string(), offer_id.0);
        }

        Self {
            event_code: event_code.into(),
            application_id: snapshot.application_id,
            details,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}

/// Per-bank hooks invoked after the local state change has been committed.
pub trait BankIntegrationAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the bank expects the client's signature before it receives the request.
    fn requires_client_signature(&self) -> bool {
        false
    }

    fn after_reject_request(
        &self,
        application: &Application,
        reason: &str,
    ) -> Result<(), IntegrationError>;

    fn after_reject_offer(&self, application: &Application) -> Result<(), IntegrationError>;

    fn after_client_offer_confirm(&self, application: &Application)
        -> Result<(), IntegrationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrationError {
    #[error("bank `{bank}` rejected the call: {message}")]
    Rejected { bank: String, message: String },
    #[error("bank `{bank}` unreachable: {message}")]
    Unavailable { bank: String, message: String },
}

/// Adapter used for banks without a dedicated integration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBankAdapter;

impl BankIntegrationAdapter for NoopBankAdapter {
    fn name(&self) -> &str {
        "noop"
    }

    fn after_reject_request(
        &self,
        _application: &Application,
        _reason: &str,
    ) -> Result<(), IntegrationError> {
        Ok(())
    }

    fn after_reject_offer(&self, _application: &Application) -> Result<(), IntegrationError> {
        Ok(())
    }

    fn after_client_offer_confirm(
        &self,
        _application: &Application,
    ) -> Result<(), IntegrationError> {
        Ok(())
    }
}

/// Bank id to adapter lookup, falling back to [`NoopBankAdapter`].
#[derive(Clone, Default)]
pub struct BankAdapters {
    adapters: HashMap<String, Arc<dyn BankIntegrationAdapter>>,
    fallback: Arc<NoopBankAdapter>,
}

impl BankAdapters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        mut self,
        bank_id: impl Into<String>,
        adapter: Arc<dyn BankIntegrationAdapter>,
    ) -> Self {
        self.adapters.insert(bank_id.into(), adapter);
        self
    }

    pub fn for_application(&self, application: &Application) -> Arc<dyn BankIntegrationAdapter> {
        application
            .bank_id
            .as_deref()
            .and_then(|bank_id| self.adapters.get(bank_id))
            .cloned()
            .unwrap_or_else(|| self.fallback.clone() as Arc<dyn BankIntegrationAdapter>)
    }
}

/// Somebody an action may hand an application to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub display_name: String,
}

/// Resolves role membership and candidate assignees.
pub trait ActorDirectory: Send + Sync {
    fn members(&self, role: Role) -> Vec<Candidate>;

    fn is_member(&self, role: Role, actor_id: &str) -> bool {
        self.members(role)
            .iter()
            .any(|candidate| candidate.id == actor_id)
    }
}

/// Directory backed by a fixed member list, useful for the CLI and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    members: BTreeMap<Role, Vec<Candidate>>,
}

impl StaticDirectory {
    pub fn with_member(
        mut self,
        role: Role,
        id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        self.members.entry(role).or_default().push(Candidate {
            id: id.into(),
            display_name: display_name.into(),
        });
        self
    }
}

impl ActorDirectory for StaticDirectory {
    fn members(&self, role: Role) -> Vec<Candidate> {
        self.members.get(&role).cloned().unwrap_or_default()
    }
}
