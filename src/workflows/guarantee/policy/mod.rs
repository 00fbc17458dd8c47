//! Attribute-based access control over (action, actor, application).
//!
//! Conditions compare attributes from a closed set of paths. Rules, policies and policy sets
//! combine them with deny-unless-permit, so anything not explicitly permitted is denied.

mod attributes;
mod condition;
mod defaults;
mod tree;

pub use attributes::{resolve, Attribute, AttributeValue, EvaluationContext};
pub use condition::Condition;
pub use defaults::{GUARANTEE_ACCESS_SET, SUPERVISE_VERIFICATION};
pub use tree::{
    CombiningAlgorithm, Decision, PermitTrace, Policy, PolicyLoadError, PolicySet, PolicyTree,
    Rule,
};
