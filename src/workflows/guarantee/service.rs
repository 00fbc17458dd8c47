use std::collections::BTreeMap;
use std::sync::Arc;

use super::actions::{
    ActionCode, ActionError, ActionOptions, ActionOutcome, ActionParams, ActionRegistry,
    Dispatcher,
};
use super::domain::{Actor, Application, ApplicationId};
use super::policy::PolicyTree;
use super::repository::{
    ActorDirectory, ApplicationRepository, BankAdapters, NotificationPublisher, RepositoryError,
};
use super::siblings::SiblingCoordinator;
use super::status::{StatusEntry, StatusRegistry, TransitionExecutor};

/// Collaborators shared by every action.
pub struct WorkflowServices {
    pub transitions: Arc<TransitionExecutor>,
    pub policies: PolicyTree,
    pub repository: Arc<dyn ApplicationRepository>,
    pub notifications: Arc<dyn NotificationPublisher>,
    pub banks: BankAdapters,
    pub directory: Arc<dyn ActorDirectory>,
    pub coordinator: SiblingCoordinator,
}

impl WorkflowServices {
    pub fn new(
        repository: Arc<dyn ApplicationRepository>,
        notifications: Arc<dyn NotificationPublisher>,
        directory: Arc<dyn ActorDirectory>,
        banks: BankAdapters,
        policies: PolicyTree,
    ) -> Self {
        let transitions = Arc::new(TransitionExecutor::new(
            StatusRegistry::standard(),
            repository.clone(),
            notifications.clone(),
        ));
        let coordinator =
            SiblingCoordinator::new(repository.clone(), transitions.clone(), banks.clone());

        Self {
            transitions,
            policies,
            repository,
            notifications,
            banks,
            directory,
            coordinator,
        }
    }
}

/// Entry point for hosts: loads the application, binds a dispatcher and runs one action.
///
/// The host is expected to serialize calls per application.
pub struct GuaranteeWorkflowService {
    services: WorkflowServices,
    actions: ActionRegistry,
}

impl GuaranteeWorkflowService {
    pub fn new(services: WorkflowServices, actions: ActionRegistry) -> Self {
        Self { services, actions }
    }

    pub fn services(&self) -> &WorkflowServices {
        &self.services
    }

    pub fn dispatch(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
        code: &str,
        params: &ActionParams,
    ) -> Result<ActionOutcome, ActionError> {
        let application = self.get(application_id)?;
        Dispatcher::new(&self.actions, &self.services, actor, application).dispatch(code, params)
    }

    pub fn allowed_actions(
        &self,
        application_id: &ApplicationId,
        actor: &Actor,
    ) -> Result<BTreeMap<ActionCode, ActionOptions>, RepositoryError> {
        let application = self.get(application_id)?;
        Ok(Dispatcher::new(&self.actions, &self.services, actor, application).list_allowed())
    }

    pub fn get(&self, application_id: &ApplicationId) -> Result<Application, RepositoryError> {
        self.services
            .repository
            .fetch(application_id)?
            .ok_or(RepositoryError::NotFound)
    }

    pub fn status_table(&self) -> Vec<StatusEntry> {
        self.services.transitions.registry().table()
    }
}
