use super::condition::Condition;
use super::tree::{Policy, PolicySet, PolicyTree, Rule};

pub const GUARANTEE_ACCESS_SET: &str = "guarantee-access";

/// Permission letting a verifier act on applications assigned to somebody else.
pub const SUPERVISE_VERIFICATION: &str = "verification.supervise";

fn for_role(role: &str) -> Condition {
    Condition::any_in("subject.roles", [role])
}

impl PolicyTree {
    /// Ownership-based access used when no policy file is configured.
    ///
    /// Role and status gating lives on the actions; these policies only decide whose
    /// application an actor may touch.
    pub fn standard() -> Self {
        let client = Policy::new("client").when(for_role("client")).rule(
            Rule::new("own-application")
                .require(Condition::context_eq("subject.client_id", "resource.client_id")),
        );

        let agent = Policy::new("agent")
            .when(for_role("agent"))
            .rule(
                Rule::new("own-client-base")
                    .require(Condition::context_eq("subject.agent_id", "resource.agent_id")),
            )
            .rule(
                Rule::new("assigned-manager")
                    .require(Condition::context_eq("subject.id", "resource.assigned_user_id")),
            );

        let verifier = Policy::new("verifier")
            .when(for_role("verifier"))
            .rule(
                Rule::new("assigned-verifier")
                    .require(Condition::context_eq("resource.verifier_id", "subject.id")),
            )
            .rule(
                Rule::new("supervisor")
                    .require(Condition::any_in("subject.permissions", [SUPERVISE_VERIFICATION])),
            )
            .rule(
                Rule::new("pick-up")
                    .when(Condition::is_in("action.code", ["take_to_verification"])),
            );

        let bank = Policy::new("bank").when(for_role("bank")).rule(
            Rule::new("own-bank").require(Condition::context_eq("subject.bank_id", "resource.bank_id")),
        );

        let admin = Policy::new("admin")
            .when(for_role("admin"))
            .rule(Rule::new("permit-all"));

        PolicyTree::new(vec![PolicySet::new(GUARANTEE_ACCESS_SET)
            .policy(client)
            .policy(agent)
            .policy(verifier)
            .policy(bank)
            .policy(admin)])
    }
}
