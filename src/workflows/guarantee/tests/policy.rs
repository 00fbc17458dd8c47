use super::common::*;
use crate::workflows::guarantee::domain::StatusCode;
use crate::workflows::guarantee::policy::{
    AttributeValue, Condition, Decision, EvaluationContext, Policy, PolicySet, PolicyTree, Rule,
    GUARANTEE_ACCESS_SET, SUPERVISE_VERIFICATION,
};

#[test]
fn clients_are_permitted_only_on_their_own_applications() {
    let tree = PolicyTree::standard();
    let application = application("app-1", BANK_A, StatusCode::Draft);

    assert!(tree.evaluate("edit", &client(), &application));
    assert!(!tree.evaluate("edit", &stranger_client(), &application));
}

#[test]
fn banks_see_only_applications_routed_to_them() {
    let tree = PolicyTree::standard();
    let application = application("app-1", BANK_A, StatusCode::SentToBank);

    assert!(tree.evaluate("take_in_work", &bank(BANK_A), &application));
    assert!(!tree.evaluate("take_in_work", &bank(BANK_B), &application));
}

#[test]
fn agents_reach_their_client_base_and_assigned_applications() {
    let tree = PolicyTree::standard();
    let mut application = application("app-1", BANK_A, StatusCode::Draft);
    let mut outsider = agent();
    outsider.id = "manager-1".to_string();
    outsider.agent_id = Some("agent-9".to_string());

    assert!(tree.evaluate("edit", &agent(), &application));
    assert!(!tree.evaluate("edit", &outsider, &application));

    application.assigned_user_id = Some("manager-1".to_string());
    let trace = tree
        .explain("edit", &outsider, &application)
        .expect("assigned manager is permitted");
    assert_eq!(trace.policy_set, GUARANTEE_ACCESS_SET);
    assert_eq!(trace.policy, "agent");
    assert_eq!(trace.rule, "assigned-manager");
}

#[test]
fn verifiers_need_the_assignment_or_the_supervise_permission() {
    let tree = PolicyTree::standard();
    let mut application = application("app-1", BANK_A, StatusCode::Verification);

    // Unassigned: only picking the application up is open.
    assert!(!tree.evaluate("approve", &verifier("verifier-1"), &application));
    assert!(tree.evaluate("take_to_verification", &verifier("verifier-1"), &application));

    application.verifier_id = Some("verifier-1".to_string());
    assert!(tree.evaluate("approve", &verifier("verifier-1"), &application));
    assert!(!tree.evaluate("approve", &verifier("verifier-2"), &application));

    let supervisor = verifier("verifier-2").with_permission(SUPERVISE_VERIFICATION);
    assert!(tree.evaluate("approve", &supervisor, &application));
}

#[test]
fn admins_are_permitted_everywhere() {
    let tree = PolicyTree::standard();
    let application = application("app-1", BANK_C, StatusCode::Finished);
    let trace = tree
        .explain("force_status", &admin(), &application)
        .expect("admin permitted");
    assert_eq!(trace.rule, "permit-all");
}

#[test]
fn evaluation_is_pure_and_repeatable() {
    let tree = PolicyTree::standard();
    let snapshot = tree.clone();
    let application = application("app-1", BANK_A, StatusCode::Draft);
    let untouched = application.clone();
    let actor = client();

    let first = tree.evaluate("edit", &actor, &application);
    let second = tree.evaluate("edit", &actor, &application);

    assert_eq!(first, second);
    assert_eq!(tree, snapshot);
    assert_eq!(application, untouched);
    assert_eq!(actor, client());
}

#[test]
fn unknown_and_unset_paths_never_match() {
    let application = application("app-1", BANK_A, StatusCode::Verification);
    let actor = verifier("verifier-1");
    let ctx = EvaluationContext {
        action: "approve",
        subject: &actor,
        resource: &application,
    };

    let unknown = Condition::equal(
        "subject.nickname",
        AttributeValue::Text("verifier-1".to_string()),
    );
    assert!(!unknown.holds(&ctx));

    // Application has no verifier yet.
    let unset = Condition::context_eq("resource.verifier_id", "subject.id");
    assert!(!unset.holds(&ctx));

    // Both sides unset still does not match.
    let both_unset = Condition::context_eq("subject.bank_id", "resource.verifier_id");
    assert!(!both_unset.holds(&ctx));

    let flag = Condition::equal("resource.has_offer", AttributeValue::Flag(false));
    assert!(flag.holds(&ctx));
}

#[test]
fn set_operators_compare_members() {
    let application = application("app-1", BANK_A, StatusCode::OfferSent);
    let actor = verifier("verifier-1").with_permission("reports.read");
    let ctx = EvaluationContext {
        action: "approve",
        subject: &actor,
        resource: &application,
    };

    assert!(Condition::is_in("resource.status", ["offer_sent", "accepted"]).holds(&ctx));
    assert!(!Condition::is_in("resource.status", ["draft"]).holds(&ctx));
    assert!(Condition::any_in("subject.permissions", ["admin.all", "reports.read"]).holds(&ctx));
    assert!(!Condition::any_in("subject.roles", ["bank", "admin"]).holds(&ctx));
}

#[test]
fn deny_unless_permit_combines_children_in_order() {
    let application = application("app-1", BANK_A, StatusCode::Draft);
    let actor = client();
    let ctx = EvaluationContext {
        action: "edit",
        subject: &actor,
        resource: &application,
    };

    let never = Rule::new("never").require(Condition::is_in("action.code", ["finish"]));
    let always = Rule::new("always");

    let denying = Policy::new("denying").rule(never.clone());
    assert_eq!(denying.evaluate(&ctx), Decision::Deny);

    let off_target = Policy::new("banks-only")
        .when(Condition::any_in("subject.roles", ["bank"]))
        .rule(always.clone());
    assert_eq!(off_target.evaluate(&ctx), Decision::NotApplicable);

    let set = PolicySet::new("set")
        .policy(denying)
        .policy(off_target)
        .policy(Policy::new("permitting").rule(never).rule(always));
    assert_eq!(set.evaluate(&ctx), Decision::Permit);

    let closed = PolicySet::new("closed").when(Condition::is_in("resource.status", ["finished"]));
    assert_eq!(closed.evaluate(&ctx), Decision::NotApplicable);

    assert!(!PolicyTree::default().evaluate("edit", &actor, &application));
}

#[test]
fn trees_load_from_json_and_report_unknown_paths() {
    let document = r#"{
        "sets": [{
            "name": "custom",
            "policies": [{
                "name": "owners",
                "target": [{ "op": "any_in", "path": "subject.roles", "values": ["client"] }],
                "rules": [{
                    "name": "own",
                    "conditions": [
                        { "op": "context_eq", "path": "subject.client_id", "other": "resource.client_id" },
                        { "op": "equal", "path": "resource.has_offer", "value": false }
                    ]
                }, {
                    "name": "typo",
                    "conditions": [{ "op": "in", "path": "resource.stauts", "values": ["draft"] }]
                }]
            }]
        }]
    }"#;

    let tree = PolicyTree::from_json(document).expect("valid policy document");
    let application = application("app-1", BANK_A, StatusCode::Draft);

    assert!(tree.evaluate("edit", &client(), &application));
    assert!(!tree.evaluate("edit", &stranger_client(), &application));
    assert_eq!(tree.unknown_paths(), vec!["resource.stauts".to_string()]);
    assert!(PolicyTree::standard().unknown_paths().is_empty());
}

#[test]
fn malformed_policy_documents_are_rejected() {
    assert!(PolicyTree::from_json(r#"{ "sets": [{ "name": 1 }] }"#).is_err());
}
