use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;

use crate::workflows::guarantee::actions::{
    ActionCode, ActionOptions, ActionParams, ActionRegistry, ActionResult, Dispatcher,
};
use crate::workflows::guarantee::domain::{
    Actor, Application, ApplicationId, GroupId, LogEntry, Offer, OfferId, Role, StatusCode,
};
use crate::workflows::guarantee::policy::PolicyTree;
use crate::workflows::guarantee::repository::{
    ApplicationRepository, BankAdapters, BankIntegrationAdapter, IntegrationError, Notification,
    NotificationError, NotificationPublisher, RepositoryError, StaticDirectory,
};
use crate::workflows::guarantee::service::WorkflowServices;

pub(super) const GROUP: &str = "group-1";
pub(super) const CLIENT: &str = "client-1";
pub(super) const AGENT: &str = "agent-1";
pub(super) const BANK_A: &str = "bank-a";
pub(super) const BANK_B: &str = "bank-b";
pub(super) const BANK_C: &str = "bank-c";

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    applications: Arc<Mutex<HashMap<ApplicationId, Application>>>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
    failing_saves: Arc<Mutex<HashSet<ApplicationId>>>,
    failing_logs: Arc<Mutex<bool>>,
}

impl MemoryRepository {
    pub(super) fn insert(&self, application: Application) {
        self.applications
            .lock()
            .expect("repository mutex poisoned")
            .insert(application.id.clone(), application);
    }

    pub(super) fn stored(&self, id: &str) -> Application {
        self.applications
            .lock()
            .expect("repository mutex poisoned")
            .get(&ApplicationId(id.to_string()))
            .cloned()
            .expect("application stored")
    }

    pub(super) fn fail_saves_for(&self, id: &str) {
        self.failing_saves
            .lock()
            .expect("repository mutex poisoned")
            .insert(ApplicationId(id.to_string()));
    }

    pub(super) fn restore_saves_for(&self, id: &str) {
        self.failing_saves
            .lock()
            .expect("repository mutex poisoned")
            .remove(&ApplicationId(id.to_string()));
    }

    pub(super) fn fail_logs(&self, failing: bool) {
        *self.failing_logs.lock().expect("log mutex poisoned") = failing;
    }

    pub(super) fn contains(&self, id: &str) -> bool {
        self.applications
            .lock()
            .expect("repository mutex poisoned")
            .contains_key(&ApplicationId(id.to_string()))
    }

    pub(super) fn logs(&self) -> Vec<LogEntry> {
        self.logs.lock().expect("log mutex poisoned").clone()
    }

    pub(super) fn logs_for(&self, id: &str) -> Vec<LogEntry> {
        self.logs()
            .into_iter()
            .filter(|entry| entry.application_id.0 == id)
            .collect()
    }
}

impl ApplicationRepository for MemoryRepository {
    fn fetch(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        let guard = self.applications.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn save(&self, application: &Application) -> Result<(), RepositoryError> {
        if self
            .failing_saves
            .lock()
            .expect("repository mutex poisoned")
            .contains(&application.id)
        {
            return Err(RepositoryError::Unavailable("disk full".to_string()));
        }
        let mut guard = self.applications.lock().expect("repository mutex poisoned");
        guard.insert(application.id.clone(), application.clone());
        Ok(())
    }

    fn siblings(&self, group_id: &GroupId) -> Result<Vec<Application>, RepositoryError> {
        let guard = self.applications.lock().expect("repository mutex poisoned");
        let mut siblings: Vec<Application> = guard
            .values()
            .filter(|application| &application.group_id == group_id)
            .cloned()
            .collect();
        siblings.sort_by(|left, right| left.id.cmp(&right.id));
        Ok(siblings)
    }

    fn append_log(&self, entry: LogEntry) -> Result<(), RepositoryError> {
        if *self.failing_logs.lock().expect("log mutex poisoned") {
            return Err(RepositoryError::Unavailable("audit store offline".to_string()));
        }
        self.logs.lock().expect("log mutex poisoned").push(entry);
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifications {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notification mutex poisoned").clone()
    }

    pub(super) fn with_code(&self, code: &str) -> Vec<Notification> {
        self.events()
            .into_iter()
            .filter(|event| event.event_code == code)
            .collect()
    }
}

impl NotificationPublisher for MemoryNotifications {
    fn publish(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notification mutex poisoned")
            .push(notification);
        Ok(())
    }
}

/// Publisher whose transport is always down.
pub(super) struct BrokenNotifications;

impl NotificationPublisher for BrokenNotifications {
    fn publish(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp down".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct BankCall {
    pub(super) bank: String,
    pub(super) hook: &'static str,
    pub(super) application_id: String,
}

/// Adapter recording every hook into a log shared by all banks of a test.
#[derive(Clone)]
pub(super) struct RecordingBankAdapter {
    bank: String,
    calls: Arc<Mutex<Vec<BankCall>>>,
    requires_signature: bool,
    failing: bool,
}

impl RecordingBankAdapter {
    fn record(&self, hook: &'static str, application: &Application) -> Result<(), IntegrationError> {
        self.calls
            .lock()
            .expect("bank mutex poisoned")
            .push(BankCall {
                bank: self.bank.clone(),
                hook,
                application_id: application.id.0.clone(),
            });
        if self.failing {
            return Err(IntegrationError::Unavailable {
                bank: self.bank.clone(),
                message: "gateway timeout".to_string(),
            });
        }
        Ok(())
    }
}

impl BankIntegrationAdapter for RecordingBankAdapter {
    fn name(&self) -> &str {
        &self.bank
    }

    fn requires_client_signature(&self) -> bool {
        self.requires_signature
    }

    fn after_reject_request(
        &self,
        application: &Application,
        _reason: &str,
    ) -> Result<(), IntegrationError> {
        self.record("after_reject_request", application)
    }

    fn after_reject_offer(&self, application: &Application) -> Result<(), IntegrationError> {
        self.record("after_reject_offer", application)
    }

    fn after_client_offer_confirm(
        &self,
        application: &Application,
    ) -> Result<(), IntegrationError> {
        self.record("after_client_offer_confirm", application)
    }
}

/// How a test wants a bank's integration to behave.
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct BankBehaviour {
    pub(super) requires_signature: bool,
    pub(super) failing: bool,
}

pub(super) struct Harness {
    pub(super) repository: Arc<MemoryRepository>,
    pub(super) notifications: Arc<MemoryNotifications>,
    pub(super) bank_calls: Arc<Mutex<Vec<BankCall>>>,
    pub(super) services: WorkflowServices,
    pub(super) registry: ActionRegistry,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self::with_banks(&[])
    }

    pub(super) fn with_banks(overrides: &[(&str, BankBehaviour)]) -> Self {
        let repository = Arc::new(MemoryRepository::default());
        let notifications = Arc::new(MemoryNotifications::default());
        let bank_calls = Arc::new(Mutex::new(Vec::new()));

        let banks = [BANK_A, BANK_B, BANK_C]
            .into_iter()
            .fold(BankAdapters::new(), |banks, bank| {
                let behaviour = overrides
                    .iter()
                    .find(|(name, _)| *name == bank)
                    .map(|(_, behaviour)| *behaviour)
                    .unwrap_or_default();
                let adapter = RecordingBankAdapter {
                    bank: bank.to_string(),
                    calls: bank_calls.clone(),
                    requires_signature: behaviour.requires_signature,
                    failing: behaviour.failing,
                };
                banks.register(bank, Arc::new(adapter))
            });

        let directory = StaticDirectory::default()
            .with_member(Role::Verifier, "verifier-1", "Vera Verifier")
            .with_member(Role::Verifier, "verifier-2", "Victor Verifier")
            .with_member(Role::Agent, "manager-1", "Mona Manager")
            .with_member(Role::Agent, "manager-2", "Max Manager");

        let services = WorkflowServices::new(
            repository.clone(),
            notifications.clone(),
            Arc::new(directory),
            banks,
            PolicyTree::standard(),
        );

        Self {
            repository,
            notifications,
            bank_calls,
            services,
            registry: ActionRegistry::standard(),
        }
    }

    pub(super) fn insert(&self, application: Application) {
        self.repository.insert(application);
    }

    pub(super) fn stored(&self, id: &str) -> Application {
        self.repository.stored(id)
    }

    pub(super) fn dispatch(
        &self,
        id: &str,
        actor: &Actor,
        code: &str,
        params: ActionParams,
    ) -> ActionResult {
        let application = self.stored(id);
        Dispatcher::new(&self.registry, &self.services, actor, application).dispatch(code, &params)
    }

    pub(super) fn allowed(&self, id: &str, actor: &Actor) -> BTreeMap<ActionCode, ActionOptions> {
        let application = self.stored(id);
        Dispatcher::new(&self.registry, &self.services, actor, application).list_allowed()
    }

    pub(super) fn bank_calls(&self) -> Vec<BankCall> {
        self.bank_calls.lock().expect("bank mutex poisoned").clone()
    }
}

/// Application of the default client routed to `bank`, already in `status`.
pub(super) fn application(id: &str, bank: &str, status: StatusCode) -> Application {
    let mut application = Application::draft(
        ApplicationId(id.to_string()),
        GroupId(GROUP.to_string()),
        CLIENT,
    );
    application.bank_id = Some(bank.to_string());
    application.agent_id = Some(AGENT.to_string());
    application.required_amount = Some(Decimal::new(1_500_000, 0));
    let changed_at = application.status_changed_at();
    application.restore(status, changed_at)
}

pub(super) fn with_offer(mut application: Application, offer_id: &str) -> Application {
    application.offer = Some(Offer {
        id: OfferId(offer_id.to_string()),
        amount: Decimal::new(1_500_000, 0),
        commission: Decimal::new(25, 1),
        term_days: 365,
        created_at: application.created_at,
    });
    application
}

pub(super) fn client() -> Actor {
    let mut actor = Actor::new("client-user", Role::Client);
    actor.client_id = Some(CLIENT.to_string());
    actor
}

pub(super) fn stranger_client() -> Actor {
    let mut actor = Actor::new("other-client-user", Role::Client);
    actor.client_id = Some("client-2".to_string());
    actor
}

pub(super) fn agent() -> Actor {
    let mut actor = Actor::new("agent-user", Role::Agent);
    actor.agent_id = Some(AGENT.to_string());
    actor
}

pub(super) fn verifier(id: &str) -> Actor {
    Actor::new(id, Role::Verifier)
}

pub(super) fn bank(bank_id: &str) -> Actor {
    let mut actor = Actor::new(format!("{bank_id}-officer"), Role::Bank);
    actor.bank_id = Some(bank_id.to_string());
    actor
}

pub(super) fn admin() -> Actor {
    Actor::new("admin-user", Role::Admin)
}
