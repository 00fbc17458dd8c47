use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::super::domain::StatusCode;

use StatusCode::*;

/// Statuses pending a bank or verifier decision that a client may still walk away from.
const WITHDRAWABLE: &[StatusCode] = &[
    Draft,
    Verification,
    InfoRequested,
    Verified,
    AwaitingSignature,
    SentToBank,
    InBankReview,
    BankInfoRequested,
    OfferSent,
];

fn allowed_from(target: StatusCode) -> &'static [StatusCode] {
    match target {
        Draft => &[],
        Verification => &[Draft, InfoRequested, Verified],
        InfoRequested => &[Verification],
        Verified => &[Verification],
        AwaitingSignature => &[Verified],
        SentToBank => &[Verified, AwaitingSignature, BankInfoRequested],
        InBankReview => &[SentToBank, OfferSent],
        BankInfoRequested => &[SentToBank, InBankReview],
        OfferSent => &[SentToBank, InBankReview],
        Accepted => &[OfferSent],
        AwaitingPayment => &[Accepted],
        PaymentConfirmed => &[AwaitingPayment],
        Finished => &[PaymentConfirmed],
        Denied => &[Verification],
        Withdrawn => WITHDRAWABLE,
        Rejected => &[SentToBank, InBankReview, BankInfoRequested, OfferSent],
    }
}

/// Declarative table of legal transitions keyed by target status.
#[derive(Debug, Clone)]
pub struct StatusRegistry {
    allowed: BTreeMap<StatusCode, BTreeSet<StatusCode>>,
}

impl Default for StatusRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl StatusRegistry {
    pub fn standard() -> Self {
        let allowed = StatusCode::ALL
            .into_iter()
            .map(|target| (target, allowed_from(target).iter().copied().collect()))
            .collect();
        Self { allowed }
    }

    /// Statuses from which a direct move into `target` is legal.
    pub fn allowed_from(&self, target: StatusCode) -> &BTreeSet<StatusCode> {
        // Every StatusCode is inserted by `standard`.
        &self.allowed[&target]
    }

    pub fn is_allowed(&self, from: StatusCode, target: StatusCode) -> bool {
        self.allowed
            .get(&target)
            .is_some_and(|sources| sources.contains(&from))
    }

    /// Legal next statuses for an application currently in `from`.
    pub fn targets_from(&self, from: StatusCode) -> Vec<StatusCode> {
        self.allowed
            .iter()
            .filter(|(_, sources)| sources.contains(&from))
            .map(|(target, _)| *target)
            .collect()
    }

    pub fn table(&self) -> Vec<StatusEntry> {
        self.allowed
            .iter()
            .map(|(status, sources)| StatusEntry {
                status: *status,
                label: status.label(),
                terminal: status.is_terminal(),
                allowed_from: sources.iter().copied().collect(),
            })
            .collect()
    }
}

/// Introspection row for audit and UI tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEntry {
    pub status: StatusCode,
    pub label: &'static str,
    pub terminal: bool,
    pub allowed_from: Vec<StatusCode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_covers_every_status() {
        let registry = StatusRegistry::standard();
        let table = registry.table();
        assert_eq!(table.len(), StatusCode::ALL.len());
        assert!(table
            .iter()
            .any(|entry| entry.status == StatusCode::Draft && entry.allowed_from.is_empty()));
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_transitions() {
        let registry = StatusRegistry::standard();
        for status in StatusCode::ALL.into_iter().filter(|s| s.is_terminal()) {
            assert!(
                registry.targets_from(status).is_empty(),
                "{status} should be terminal"
            );
        }
    }

    #[test]
    fn offer_sent_can_be_accepted_or_rejected() {
        let registry = StatusRegistry::standard();
        let targets = registry.targets_from(StatusCode::OfferSent);
        assert!(targets.contains(&StatusCode::Accepted));
        assert!(targets.contains(&StatusCode::Rejected));
        assert!(targets.contains(&StatusCode::Withdrawn));
        assert!(!targets.contains(&StatusCode::Finished));
    }
}
