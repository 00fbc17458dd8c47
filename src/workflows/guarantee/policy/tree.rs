use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::super::domain::{Actor, Application};
use super::attributes::EvaluationContext;
use super::condition::Condition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    Permit,
    Deny,
    NotApplicable,
}

/// How a parent merges the decisions of its ordered children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombiningAlgorithm {
    #[default]
    DenyUnlessPermit,
}

fn target_matches(target: &[Condition], ctx: &EvaluationContext<'_>) -> bool {
    target.iter().all(|condition| condition.holds(ctx))
}

/// Permits when its target and every condition clause hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    #[serde(default)]
    pub target: Vec<Condition>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: Vec::new(),
            conditions: Vec::new(),
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.target.push(condition);
        self
    }

    pub fn require(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Decision {
        if target_matches(&self.target, ctx) && target_matches(&self.conditions, ctx) {
            Decision::Permit
        } else {
            Decision::NotApplicable
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub name: String,
    #[serde(default)]
    pub target: Vec<Condition>,
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub algorithm: CombiningAlgorithm,
}

impl Policy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: Vec::new(),
            rules: Vec::new(),
            algorithm: CombiningAlgorithm::default(),
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.target.push(condition);
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    fn permitting_rule(&self, ctx: &EvaluationContext<'_>) -> Result<&Rule, Decision> {
        if !target_matches(&self.target, ctx) {
            return Err(Decision::NotApplicable);
        }
        match self.algorithm {
            CombiningAlgorithm::DenyUnlessPermit => self
                .rules
                .iter()
                .find(|rule| rule.evaluate(ctx) == Decision::Permit)
                .ok_or(Decision::Deny),
        }
    }

    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Decision {
        match self.permitting_rule(ctx) {
            Ok(_) => Decision::Permit,
            Err(decision) => decision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    pub name: String,
    #[serde(default)]
    pub target: Vec<Condition>,
    pub policies: Vec<Policy>,
    #[serde(default)]
    pub algorithm: CombiningAlgorithm,
}

impl PolicySet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: Vec::new(),
            policies: Vec::new(),
            algorithm: CombiningAlgorithm::default(),
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.target.push(condition);
        self
    }

    pub fn policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }

    fn permit_path<'s>(
        &'s self,
        ctx: &EvaluationContext<'_>,
    ) -> Result<(&'s Policy, &'s Rule), Decision> {
        if !target_matches(&self.target, ctx) {
            return Err(Decision::NotApplicable);
        }
        match self.algorithm {
            CombiningAlgorithm::DenyUnlessPermit => self
                .policies
                .iter()
                .find_map(|policy| {
                    policy
                        .permitting_rule(ctx)
                        .ok()
                        .map(|rule| (policy, rule))
                })
                .ok_or(Decision::Deny),
        }
    }

    pub fn evaluate(&self, ctx: &EvaluationContext<'_>) -> Decision {
        match self.permit_path(ctx) {
            Ok(_) => Decision::Permit,
            Err(decision) => decision,
        }
    }
}

/// Names along the path that produced a permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermitTrace {
    pub policy_set: String,
    pub policy: String,
    pub rule: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyLoadError {
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),
    #[error("policy document is not valid: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Root of the ABAC decision engine. Evaluation never mutates the tree or its inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyTree {
    pub sets: Vec<PolicySet>,
}

impl PolicyTree {
    pub fn new(sets: Vec<PolicySet>) -> Self {
        Self { sets }
    }

    pub fn from_json(document: &str) -> Result<Self, PolicyLoadError> {
        let tree: PolicyTree = serde_json::from_str(document)?;
        for path in tree.unknown_paths() {
            warn!(path, "policy references an unknown attribute path; it will never match");
        }
        Ok(tree)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, PolicyLoadError> {
        let document = std::fs::read_to_string(path)?;
        Self::from_json(&document)
    }

    pub fn evaluate(&self, action: &str, actor: &Actor, resource: &Application) -> bool {
        self.explain(action, actor, resource).is_some()
    }

    /// Like [`PolicyTree::evaluate`] but reports which rule permitted.
    pub fn explain(
        &self,
        action: &str,
        actor: &Actor,
        resource: &Application,
    ) -> Option<PermitTrace> {
        let ctx = EvaluationContext {
            action,
            subject: actor,
            resource,
        };
        let trace = self.sets.iter().find_map(|set| {
            set.permit_path(&ctx).ok().map(|(policy, rule)| PermitTrace {
                policy_set: set.name.clone(),
                policy: policy.name.clone(),
                rule: rule.name.clone(),
            })
        });

        if let Some(trace) = &trace {
            debug!(
                action,
                actor_id = %actor.id,
                application_id = %resource.id,
                policy = %trace.policy,
                rule = %trace.rule,
                "policy permitted action"
            );
        }
        trace
    }

    pub fn unknown_paths(&self) -> Vec<String> {
        let mut unknown = Vec::new();
        for set in &self.sets {
            let set_conditions = set.target.iter();
            let policy_conditions = set.policies.iter().flat_map(|policy| {
                policy.target.iter().chain(
                    policy
                        .rules
                        .iter()
                        .flat_map(|rule| rule.target.iter().chain(rule.conditions.iter())),
                )
            });
            for condition in set_conditions.chain(policy_conditions) {
                unknown.extend(condition.unknown_paths().into_iter().map(str::to_string));
            }
        }
        unknown.sort();
        unknown.dedup();
        unknown
    }
}
