use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::super::domain::{Actor, Application, LogEntry, StatusCode};
use super::super::repository::{
    ApplicationRepository, Notification, NotificationPublisher, RepositoryError,
};
use super::registry::StatusRegistry;

pub const ROUTED_TO_BANK_EVENT: &str = "application_routed_to_bank";
pub const FORCE_TRANSITION_ACTION: &str = "force_transition";

/// How strictly a transition consults the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionMode<'a> {
    Checked,
    /// Skips the legality check; the justification lands in the audit log.
    Forced { justification: &'a str },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("illegal transition from `{current}` to `{target}`")]
    Illegal {
        current: StatusCode,
        target: StatusCode,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Outcome of a committed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionRecord {
    pub from: StatusCode,
    pub to: StatusCode,
    pub at: DateTime<Utc>,
    pub forced: bool,
}

/// Sole writer of application status.
pub struct TransitionExecutor {
    registry: StatusRegistry,
    repository: Arc<dyn ApplicationRepository>,
    notifications: Arc<dyn NotificationPublisher>,
}

impl TransitionExecutor {
    pub fn new(
        registry: StatusRegistry,
        repository: Arc<dyn ApplicationRepository>,
        notifications: Arc<dyn NotificationPublisher>,
    ) -> Self {
        Self {
            registry,
            repository,
            notifications,
        }
    }

    pub fn registry(&self) -> &StatusRegistry {
        &self.registry
    }

    /// Moves `application` into `target` and persists it.
    ///
    /// The application is left untouched when the move is illegal or the save fails.
    pub fn transition(
        &self,
        application: &mut Application,
        target: StatusCode,
        actor: &Actor,
        mode: TransitionMode<'_>,
    ) -> Result<TransitionRecord, TransitionError> {
        let current = application.status();
        if mode == TransitionMode::Checked && !self.registry.is_allowed(current, target) {
            return Err(TransitionError::Illegal { current, target });
        }

        let now = Utc::now();
        let mut next = application.clone();
        next.set_status(target, now);
        self.repository.save(&next)?;
        *application = next;

        let record = TransitionRecord {
            from: current,
            to: target,
            at: now,
            forced: matches!(mode, TransitionMode::Forced { .. }),
        };

        info!(
            application_id = %application.id,
            actor_id = %actor.id,
            from = %current,
            to = %target,
            forced = record.forced,
            "application status changed"
        );

        if let TransitionMode::Forced { justification } = mode {
            let entry = LogEntry::new(
                application.id.clone(),
                actor.id.clone(),
                FORCE_TRANSITION_ACTION,
                format!("{current} -> {target}: {justification}"),
            );
            if let Err(error) = self.repository.append_log(entry) {
                warn!(application_id = %application.id, %error, "failed to record forced transition");
            }
        }

        if matches!(
            target,
            StatusCode::AwaitingSignature | StatusCode::SentToBank
        ) {
            let wait_for_signature = target == StatusCode::AwaitingSignature;
            let notification = Notification::new(ROUTED_TO_BANK_EVENT, application)
                .with_detail("wait_for_signature", wait_for_signature.to_string());
            if let Err(error) = self.notifications.publish(notification) {
                warn!(application_id = %application.id, %error, "routed-to-bank event not delivered");
            }
        }

        Ok(record)
    }
}
