use serde::{Deserialize, Serialize};

use super::super::domain::{Actor, Application};

/// Value an attribute path resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Flag(bool),
    Text(String),
    List(Vec<String>),
}

impl AttributeValue {
    fn text(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }

    /// Single- and multi-valued attributes both expose their members for set operators.
    pub fn members(&self) -> Vec<&str> {
        match self {
            AttributeValue::Text(value) => vec![value.as_str()],
            AttributeValue::List(values) => values.iter().map(String::as_str).collect(),
            AttributeValue::Flag(_) => Vec::new(),
        }
    }
}

/// The triple a policy decision is made over.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub action: &'a str,
    pub subject: &'a Actor,
    pub resource: &'a Application,
}

/// Closed set of attribute paths policies may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    ActionCode,
    SubjectId,
    SubjectRoles,
    SubjectPermissions,
    SubjectClientId,
    SubjectAgentId,
    SubjectBankId,
    ResourceId,
    ResourceGroupId,
    ResourceStatus,
    ResourceBankId,
    ResourceClientId,
    ResourceAgentId,
    ResourceVerifierId,
    ResourceAssignedUserId,
    ResourceHasOffer,
}

impl Attribute {
    pub const ALL: [Attribute; 16] = [
        Attribute::ActionCode,
        Attribute::SubjectId,
        Attribute::SubjectRoles,
        Attribute::SubjectPermissions,
        Attribute::SubjectClientId,
        Attribute::SubjectAgentId,
        Attribute::SubjectBankId,
        Attribute::ResourceId,
        Attribute::ResourceGroupId,
        Attribute::ResourceStatus,
        Attribute::ResourceBankId,
        Attribute::ResourceClientId,
        Attribute::ResourceAgentId,
        Attribute::ResourceVerifierId,
        Attribute::ResourceAssignedUserId,
        Attribute::ResourceHasOffer,
    ];

    pub const fn path(self) -> &'static str {
        match self {
            Attribute::ActionCode => "action.code",
            Attribute::SubjectId => "subject.id",
            Attribute::SubjectRoles => "subject.roles",
            Attribute::SubjectPermissions => "subject.permissions",
            Attribute::SubjectClientId => "subject.client_id",
            Attribute::SubjectAgentId => "subject.agent_id",
            Attribute::SubjectBankId => "subject.bank_id",
            Attribute::ResourceId => "resource.id",
            Attribute::ResourceGroupId => "resource.group_id",
            Attribute::ResourceStatus => "resource.status",
            Attribute::ResourceBankId => "resource.bank_id",
            Attribute::ResourceClientId => "resource.client_id",
            Attribute::ResourceAgentId => "resource.agent_id",
            Attribute::ResourceVerifierId => "resource.verifier_id",
            Attribute::ResourceAssignedUserId => "resource.assigned_user_id",
            Attribute::ResourceHasOffer => "resource.has_offer",
        }
    }

    pub fn parse(path: &str) -> Option<Self> {
        Attribute::ALL
            .into_iter()
            .find(|attribute| attribute.path() == path)
    }

    /// Unset optional attributes resolve to `None`.
    pub fn resolve(self, ctx: &EvaluationContext<'_>) -> Option<AttributeValue> {
        let subject = ctx.subject;
        let resource = ctx.resource;
        match self {
            Attribute::ActionCode => Some(AttributeValue::text(ctx.action)),
            Attribute::SubjectId => Some(AttributeValue::text(&subject.id)),
            Attribute::SubjectRoles => Some(AttributeValue::List(
                subject
                    .roles
                    .iter()
                    .map(|role| role.label().to_string())
                    .collect(),
            )),
            Attribute::SubjectPermissions => Some(AttributeValue::List(
                subject.permissions.iter().cloned().collect(),
            )),
            Attribute::SubjectClientId => subject.client_id.as_deref().map(AttributeValue::text),
            Attribute::SubjectAgentId => subject.agent_id.as_deref().map(AttributeValue::text),
            Attribute::SubjectBankId => subject.bank_id.as_deref().map(AttributeValue::text),
            Attribute::ResourceId => Some(AttributeValue::text(&resource.id.0)),
            Attribute::ResourceGroupId => Some(AttributeValue::text(&resource.group_id.0)),
            Attribute::ResourceStatus => Some(AttributeValue::text(resource.status().label())),
            Attribute::ResourceBankId => resource.bank_id.as_deref().map(AttributeValue::text),
            Attribute::ResourceClientId => Some(AttributeValue::text(&resource.client_id)),
            Attribute::ResourceAgentId => resource.agent_id.as_deref().map(AttributeValue::text),
            Attribute::ResourceVerifierId => {
                resource.verifier_id.as_deref().map(AttributeValue::text)
            }
            Attribute::ResourceAssignedUserId => resource
                .assigned_user_id
                .as_deref()
                .map(AttributeValue::text),
            Attribute::ResourceHasOffer => Some(AttributeValue::Flag(resource.has_offer())),
        }
    }
}

/// Resolves a path string; unknown paths and unset attributes both yield `None`.
pub fn resolve(path: &str, ctx: &EvaluationContext<'_>) -> Option<AttributeValue> {
    Attribute::parse(path).and_then(|attribute| attribute.resolve(ctx))
}
