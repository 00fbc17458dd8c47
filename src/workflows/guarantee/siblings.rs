use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::domain::{Actor, Application, ApplicationId, LogEntry, OfferId, StatusCode};
use super::repository::{
    ApplicationRepository, BankAdapters, IntegrationError, RepositoryError,
};
use super::status::{TransitionError, TransitionExecutor, TransitionMode};

pub const SIBLING_CLEANUP_ACTION: &str = "sibling_cleanup";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CleanupError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

/// One sibling that could not be closed; the winner's transition stands regardless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    pub application_id: ApplicationId,
    pub error: String,
}

/// What a coordination pass did to each sibling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CoordinationReport {
    pub rejected: Vec<ApplicationId>,
    pub withdrawn: Vec<ApplicationId>,
    pub failures: Vec<CleanupFailure>,
}

impl CoordinationReport {
    /// True when the pass changed nothing, e.g. when re-run on a resolved group.
    pub fn is_noop(&self) -> bool {
        self.rejected.is_empty() && self.withdrawn.is_empty() && self.failures.is_empty()
    }

    fn fail(&mut self, application_id: &ApplicationId, error: CleanupError) {
        warn!(%application_id, %error, "sibling cleanup failed");
        self.failures.push(CleanupFailure {
            application_id: application_id.clone(),
            error: error.to_string(),
        });
    }
}

/// Keeps at most one application of a fan-out group in the running once an offer is accepted.
pub struct SiblingCoordinator {
    repository: Arc<dyn ApplicationRepository>,
    transitions: Arc<TransitionExecutor>,
    banks: BankAdapters,
}

impl SiblingCoordinator {
    pub fn new(
        repository: Arc<dyn ApplicationRepository>,
        transitions: Arc<TransitionExecutor>,
        banks: BankAdapters,
    ) -> Self {
        Self {
            repository,
            transitions,
            banks,
        }
    }

    /// Creates one draft per bank, all sharing the template's group.
    ///
    /// Every derived id is checked before anything is saved, so a clash leaves no partial group.
    pub fn fan_out(
        &self,
        template: &Application,
        bank_ids: &[String],
    ) -> Result<Vec<Application>, RepositoryError> {
        let mut seen = HashSet::with_capacity(bank_ids.len());
        let mut drafts = Vec::with_capacity(bank_ids.len());
        for bank_id in bank_ids {
            if !seen.insert(bank_id.as_str()) {
                return Err(RepositoryError::Conflict);
            }
            let mut application = Application::draft(
                ApplicationId(format!("{}-{}", template.id, bank_id)),
                template.group_id.clone(),
                template.client_id.clone(),
            );
            application.bank_id = Some(bank_id.clone());
            application.agent_id = template.agent_id.clone();
            application.assigned_user_id = template.assigned_user_id.clone();
            application.required_amount = template.required_amount;

            if self.repository.fetch(&application.id)?.is_some() {
                return Err(RepositoryError::Conflict);
            }
            drafts.push(application);
        }

        for application in &drafts {
            self.repository.save(application)?;
        }

        info!(
            group_id = %template.group_id.0,
            banks = drafts.len(),
            "application fanned out to banks"
        );
        Ok(drafts)
    }

    /// Whether another application of the group already holds an accepted offer.
    pub fn has_winner(&self, application: &Application) -> Result<bool, RepositoryError> {
        let siblings = self.repository.siblings(&application.group_id)?;
        Ok(siblings
            .iter()
            .filter(|sibling| sibling.id != application.id)
            .any(|sibling| sibling.status().is_past_acceptance()))
    }

    /// Closes every open sibling of `winner`.
    ///
    /// Siblings holding an offer are rejected, the rest withdrawn. Terminal siblings and any
    /// sibling already past acceptance are left alone. Each failure is recorded and the pass
    /// moves on; running it again on a resolved group changes nothing.
    pub fn resolve(&self, winner: &Application, actor: &Actor) -> CoordinationReport {
        let mut report = CoordinationReport::default();

        let siblings = match self.repository.siblings(&winner.group_id) {
            Ok(siblings) => siblings,
            Err(error) => {
                report.fail(&winner.id, error.into());
                return report;
            }
        };

        let winning_offer = winner.offer_id().cloned();
        let reference = match &winning_offer {
            Some(offer_id) => format!("offer {offer_id} of application {}", winner.id),
            None => format!("application {}", winner.id),
        };

        for mut sibling in siblings {
            if sibling.id == winner.id || sibling.status().is_terminal() {
                continue;
            }
            if sibling.status().is_past_acceptance() {
                warn!(
                    application_id = %sibling.id,
                    winner = %winner.id,
                    status = %sibling.status(),
                    "sibling already past acceptance; leaving it untouched"
                );
                continue;
            }

            let target = if sibling.has_offer() {
                StatusCode::Rejected
            } else {
                StatusCode::Withdrawn
            };
            match self.close(&mut sibling, target, actor, &reference, winning_offer.as_ref()) {
                Ok(()) if target == StatusCode::Rejected => report.rejected.push(sibling.id),
                Ok(()) => report.withdrawn.push(sibling.id),
                Err(error) => report.fail(&sibling.id, error),
            }
        }

        if !report.is_noop() {
            info!(
                group_id = %winner.group_id.0,
                winner = %winner.id,
                rejected = report.rejected.len(),
                withdrawn = report.withdrawn.len(),
                failed = report.failures.len(),
                "sibling group resolved"
            );
        }
        report
    }

    fn close(
        &self,
        sibling: &mut Application,
        target: StatusCode,
        actor: &Actor,
        reference: &str,
        winning_offer: Option<&OfferId>,
    ) -> Result<(), CleanupError> {
        let justification = format!("sibling closed after client accepted {reference}");
        self.transitions.transition(
            sibling,
            target,
            actor,
            TransitionMode::Forced {
                justification: &justification,
            },
        )?;

        let mut entry = LogEntry::new(
            sibling.id.clone(),
            actor.id.clone(),
            SIBLING_CLEANUP_ACTION,
            format!("{target}: client accepted {reference}"),
        );
        entry.reference_offer = winning_offer.cloned();
        if let Err(error) = self.repository.append_log(entry) {
            warn!(application_id = %sibling.id, %error, "sibling cleanup log entry not stored");
        }

        let adapter = self.banks.for_application(sibling);
        if target == StatusCode::Rejected {
            adapter.after_reject_offer(sibling)?;
        } else {
            adapter.after_reject_request(sibling, &format!("client accepted {reference}"))?;
        }
        Ok(())
    }
}
