use serde_json::json;

use super::common::*;
use crate::workflows::guarantee::actions::{ActionCode, ActionError, ActionParams};
use crate::workflows::guarantee::domain::{
    Application, ApplicationId, GroupId, OfferId, StatusCode,
};
use crate::workflows::guarantee::repository::RepositoryError;
use crate::workflows::guarantee::siblings::SIBLING_CLEANUP_ACTION;

/// A1 and A2 hold offers, A3 is still under review at its bank.
fn three_banks(harness: &Harness) {
    harness.insert(with_offer(
        application("app-a1", BANK_A, StatusCode::OfferSent),
        "offer-1",
    ));
    harness.insert(with_offer(
        application("app-a2", BANK_B, StatusCode::OfferSent),
        "offer-2",
    ));
    harness.insert(application("app-a3", BANK_C, StatusCode::InBankReview));
}

fn cleanup_entries(harness: &Harness) -> Vec<(String, Option<OfferId>)> {
    harness
        .repository
        .logs()
        .into_iter()
        .filter(|entry| entry.action == SIBLING_CLEANUP_ACTION)
        .map(|entry| (entry.application_id.0, entry.reference_offer))
        .collect()
}

#[test]
fn accepting_one_offer_closes_every_sibling() {
    let harness = Harness::new();
    three_banks(&harness);

    let outcome = harness
        .dispatch("app-a1", &client(), "accept_offer", ActionParams::new())
        .expect("offer accepted");

    assert_eq!(harness.stored("app-a1").status(), StatusCode::Accepted);
    assert_eq!(harness.stored("app-a2").status(), StatusCode::Rejected);
    assert_eq!(harness.stored("app-a3").status(), StatusCode::Withdrawn);

    let winning_offer = Some(OfferId("offer-1".to_string()));
    assert_eq!(
        cleanup_entries(&harness),
        vec![
            ("app-a2".to_string(), winning_offer.clone()),
            ("app-a3".to_string(), winning_offer),
        ]
    );

    assert_eq!(outcome.data["offer_id"], json!("offer-1"));
    assert_eq!(outcome.data["siblings"]["rejected"], json!(["app-a2"]));
    assert_eq!(outcome.data["siblings"]["withdrawn"], json!(["app-a3"]));

    let hooks: Vec<(String, &str)> = harness
        .bank_calls()
        .into_iter()
        .map(|call| (call.bank, call.hook))
        .collect();
    assert_eq!(
        hooks,
        vec![
            (BANK_B.to_string(), "after_reject_offer"),
            (BANK_C.to_string(), "after_reject_request"),
            (BANK_A.to_string(), "after_client_offer_confirm"),
        ]
    );
}

#[test]
fn coordination_is_idempotent() {
    let harness = Harness::new();
    three_banks(&harness);
    harness
        .dispatch("app-a1", &client(), "accept_offer", ActionParams::new())
        .expect("offer accepted");
    let logged = harness.repository.logs().len();
    let calls = harness.bank_calls().len();

    let winner = harness.stored("app-a1");
    let report = harness.services.coordinator.resolve(&winner, &client());

    assert!(report.is_noop());
    assert_eq!(harness.repository.logs().len(), logged);
    assert_eq!(harness.bank_calls().len(), calls);
    assert_eq!(harness.stored("app-a1").status(), StatusCode::Accepted);
}

#[test]
fn terminal_siblings_are_left_alone() {
    let harness = Harness::new();
    three_banks(&harness);
    harness.insert(application("app-a4", BANK_C, StatusCode::Denied));

    harness
        .dispatch("app-a1", &client(), "accept_offer", ActionParams::new())
        .expect("offer accepted");

    assert_eq!(harness.stored("app-a4").status(), StatusCode::Denied);
    assert!(harness.repository.logs_for("app-a4").is_empty());
}

#[test]
fn sibling_failures_are_reported_without_failing_the_winner() {
    let harness = Harness::with_banks(&[(
        BANK_B,
        BankBehaviour {
            failing: true,
            ..BankBehaviour::default()
        },
    )]);
    three_banks(&harness);

    let outcome = harness
        .dispatch("app-a1", &client(), "accept_offer", ActionParams::new())
        .expect("winner unaffected by sibling failures");

    assert_eq!(harness.stored("app-a1").status(), StatusCode::Accepted);
    assert_eq!(harness.stored("app-a3").status(), StatusCode::Withdrawn);
    // The local close of A2 stands; only its bank notification failed.
    assert_eq!(harness.stored("app-a2").status(), StatusCode::Rejected);

    let failures = outcome.data["siblings"]["failures"]
        .as_array()
        .expect("failures listed");
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0]["application_id"], json!("app-a2"));
    assert_eq!(outcome.data["siblings"]["withdrawn"], json!(["app-a3"]));
}

#[test]
fn a_sibling_that_cannot_be_saved_stays_open_and_is_reported() {
    let harness = Harness::new();
    three_banks(&harness);
    harness.repository.fail_saves_for("app-a3");

    let outcome = harness
        .dispatch("app-a1", &client(), "accept_offer", ActionParams::new())
        .expect("offer accepted");

    assert_eq!(harness.stored("app-a3").status(), StatusCode::InBankReview);
    assert_eq!(
        outcome.data["siblings"]["failures"][0]["application_id"],
        json!("app-a3")
    );
    assert_eq!(cleanup_entries(&harness).len(), 1);
}

#[test]
fn fan_out_creates_one_draft_per_bank() {
    let harness = Harness::new();
    let mut template = Application::draft(
        ApplicationId("req-7".to_string()),
        GroupId::generate(),
        CLIENT,
    );
    template.agent_id = Some(AGENT.to_string());
    let banks = vec![BANK_A.to_string(), BANK_B.to_string()];

    let created = harness
        .services
        .coordinator
        .fan_out(&template, &banks)
        .expect("fan out");

    assert_eq!(created.len(), 2);
    for (application, bank) in created.iter().zip(&banks) {
        assert_eq!(application.status(), StatusCode::Draft);
        assert_eq!(application.group_id, template.group_id);
        assert_eq!(application.bank_id.as_ref(), Some(bank));
        assert_eq!(application.agent_id.as_deref(), Some(AGENT));
    }
    assert_eq!(harness.stored("req-7-bank-b").client_id, CLIENT);

    assert_eq!(
        harness.services.coordinator.fan_out(&template, &banks),
        Err(RepositoryError::Conflict)
    );
}

#[test]
fn a_group_with_a_winner_refuses_a_second_acceptance() {
    let harness = Harness::new();
    three_banks(&harness);
    harness.repository.fail_saves_for("app-a3");
    harness
        .dispatch("app-a1", &client(), "accept_offer", ActionParams::new())
        .expect("first offer accepted");
    assert_eq!(harness.stored("app-a3").status(), StatusCode::InBankReview);

    // The sibling missed by cleanup gets an offer once its storage recovers.
    harness.repository.restore_saves_for("app-a3");
    harness
        .dispatch(
            "app-a3",
            &bank(BANK_C),
            "create_offer",
            ActionParams::new()
                .with("amount", "1500000")
                .with("commission", "2.0")
                .with("term_days", 365),
        )
        .expect("late offer created");

    assert!(!harness
        .allowed("app-a3", &client())
        .contains_key(&ActionCode::AcceptOffer));
    let second = harness.dispatch("app-a3", &client(), "accept_offer", ActionParams::new());
    assert!(matches!(second, Err(ActionError::NotAllowed)));

    assert_eq!(harness.stored("app-a1").status(), StatusCode::Accepted);
    assert_eq!(harness.stored("app-a3").status(), StatusCode::OfferSent);
}

#[test]
fn siblings_past_acceptance_are_never_closed() {
    let harness = Harness::new();
    harness.insert(with_offer(
        application("app-a1", BANK_A, StatusCode::AwaitingPayment),
        "offer-1",
    ));
    harness.insert(with_offer(
        application("app-a2", BANK_B, StatusCode::Accepted),
        "offer-2",
    ));
    harness.insert(application("app-a3", BANK_C, StatusCode::InBankReview));

    let winner = harness.stored("app-a2");
    let report = harness.services.coordinator.resolve(&winner, &client());

    assert_eq!(harness.stored("app-a1").status(), StatusCode::AwaitingPayment);
    assert!(report.rejected.is_empty());
    assert_eq!(report.withdrawn, vec![ApplicationId("app-a3".to_string())]);
    assert!(harness.repository.logs_for("app-a1").is_empty());
}

#[test]
fn banks_are_told_even_when_the_cleanup_log_is_lost() {
    let harness = Harness::new();
    three_banks(&harness);
    harness.repository.fail_logs(true);

    let outcome = harness
        .dispatch("app-a1", &client(), "accept_offer", ActionParams::new())
        .expect("offer accepted");

    assert_eq!(harness.stored("app-a2").status(), StatusCode::Rejected);
    assert_eq!(harness.stored("app-a3").status(), StatusCode::Withdrawn);
    assert_eq!(outcome.data["siblings"]["failures"], json!([]));
    let hooks: Vec<(String, &str)> = harness
        .bank_calls()
        .into_iter()
        .map(|call| (call.bank, call.hook))
        .collect();
    assert!(hooks.contains(&(BANK_B.to_string(), "after_reject_offer")));
    assert!(hooks.contains(&(BANK_C.to_string(), "after_reject_request")));
    assert!(harness.repository.logs().is_empty());
}

#[test]
fn fan_out_saves_nothing_when_a_later_bank_clashes() {
    let harness = Harness::new();
    let template = Application::draft(
        ApplicationId("req-8".to_string()),
        GroupId::generate(),
        CLIENT,
    );
    harness.insert(Application::draft(
        ApplicationId("req-8-bank-b".to_string()),
        GroupId::generate(),
        CLIENT,
    ));

    let clash = harness
        .services
        .coordinator
        .fan_out(&template, &[BANK_A.to_string(), BANK_B.to_string()]);
    assert_eq!(clash, Err(RepositoryError::Conflict));
    assert!(!harness.repository.contains("req-8-bank-a"));

    let repeated = harness
        .services
        .coordinator
        .fan_out(&template, &[BANK_C.to_string(), BANK_C.to_string()]);
    assert_eq!(repeated, Err(RepositoryError::Conflict));
    assert!(!harness.repository.contains("req-8-bank-c"));
}
