use guarantee_flow::config::WorkflowConfig;
use guarantee_flow::error::AppError;
use guarantee_flow::workflows::guarantee::{
    Application, ApplicationId, ApplicationRepository, BankIntegrationAdapter, GroupId,
    IntegrationError, LogEntry, Notification, NotificationError, NotificationPublisher, PolicyTree,
    RepositoryError, Role, StatusCode,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable(format!("{what} lock poisoned")))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    applications: Arc<Mutex<HashMap<ApplicationId, Application>>>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
}

impl InMemoryApplicationRepository {
    pub(crate) fn log_len(&self) -> usize {
        lock(&self.logs, "log").map(|logs| logs.len()).unwrap_or_default()
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(lock(&self.applications, "repository")?.get(id).cloned())
    }

    fn save(&self, application: &Application) -> Result<(), RepositoryError> {
        lock(&self.applications, "repository")?
            .insert(application.id.clone(), application.clone());
        Ok(())
    }

    fn siblings(&self, group_id: &GroupId) -> Result<Vec<Application>, RepositoryError> {
        let guard = lock(&self.applications, "repository")?;
        let mut siblings: Vec<Application> = guard
            .values()
            .filter(|application| &application.group_id == group_id)
            .cloned()
            .collect();
        siblings.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(siblings)
    }

    fn append_log(&self, entry: LogEntry) -> Result<(), RepositoryError> {
        lock(&self.logs, "log")?.push(entry);
        Ok(())
    }
}

/// Publisher that traces each event instead of delivering it.
#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationPublisher {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl InMemoryNotificationPublisher {
    pub(crate) fn published(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or_default()
    }
}

impl NotificationPublisher for InMemoryNotificationPublisher {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            event = %notification.event_code,
            application_id = %notification.application_id,
            "notification published"
        );
        self.events
            .lock()
            .map_err(|_| NotificationError::Transport("event sink poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

/// Stand-in for a bank integration; hooks are traced and always succeed.
pub(crate) struct DemoBankAdapter {
    name: String,
    requires_signature: bool,
}

impl DemoBankAdapter {
    pub(crate) fn new(name: impl Into<String>, requires_signature: bool) -> Self {
        Self {
            name: name.into(),
            requires_signature,
        }
    }
}

impl BankIntegrationAdapter for DemoBankAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn requires_client_signature(&self) -> bool {
        self.requires_signature
    }

    fn after_reject_request(
        &self,
        application: &Application,
        reason: &str,
    ) -> Result<(), IntegrationError> {
        info!(bank = %self.name, application_id = %application.id, reason, "bank told request was dropped");
        Ok(())
    }

    fn after_reject_offer(&self, application: &Application) -> Result<(), IntegrationError> {
        info!(bank = %self.name, application_id = %application.id, "bank told offer was declined");
        Ok(())
    }

    fn after_client_offer_confirm(
        &self,
        application: &Application,
    ) -> Result<(), IntegrationError> {
        info!(bank = %self.name, application_id = %application.id, "bank told offer was accepted");
        Ok(())
    }
}

/// Built-in policy tree unless the configuration points at a policy file.
pub(crate) fn load_policies(config: &WorkflowConfig) -> Result<PolicyTree, AppError> {
    match &config.policy_path {
        Some(path) => {
            info!(path = %path.display(), "loading policy tree from file");
            Ok(PolicyTree::from_file(path)?)
        }
        None => Ok(PolicyTree::standard()),
    }
}

pub(crate) fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse()
}

pub(crate) fn parse_status(raw: &str) -> Result<StatusCode, String> {
    raw.parse::<StatusCode>().map_err(|err| err.to_string())
}
