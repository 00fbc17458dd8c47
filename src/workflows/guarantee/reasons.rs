use serde::Serialize;

use super::domain::StatusCode;

/// Reasons with a fixed meaning. Anything else is free text from the bank or agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalReason {
    /// The client walked away; the request is withdrawn rather than rejected.
    ClientRefusal,
}

const CANONICAL_REASONS: &[(&str, CanonicalReason)] =
    &[("Отказ клиента", CanonicalReason::ClientRefusal)];

impl CanonicalReason {
    pub fn phrase(self) -> &'static str {
        CANONICAL_REASONS
            .iter()
            .find(|(_, reason)| *reason == self)
            .map(|(phrase, _)| *phrase)
            .unwrap_or_default()
    }

    pub fn target_status(self) -> StatusCode {
        match self {
            CanonicalReason::ClientRefusal => StatusCode::Withdrawn,
        }
    }
}

/// Reason attached to a rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectionReason {
    pub text: String,
    pub canonical: Option<CanonicalReason>,
}

impl RejectionReason {
    /// Matches the trimmed text exactly against the canonical phrases.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let canonical = CANONICAL_REASONS
            .iter()
            .find(|(phrase, _)| *phrase == text)
            .map(|(_, reason)| *reason);
        Self {
            text: text.to_string(),
            canonical,
        }
    }

    pub fn target_status(&self) -> StatusCode {
        self.canonical
            .map(CanonicalReason::target_status)
            .unwrap_or(StatusCode::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_refusal_withdraws_the_request() {
        let reason = RejectionReason::parse("  Отказ клиента ");
        assert_eq!(reason.canonical, Some(CanonicalReason::ClientRefusal));
        assert_eq!(reason.target_status(), StatusCode::Withdrawn);
        assert_eq!(CanonicalReason::ClientRefusal.phrase(), "Отказ клиента");
    }

    #[test]
    fn free_text_rejects_the_request() {
        let reason = RejectionReason::parse("Insufficient collateral");
        assert_eq!(reason.canonical, None);
        assert_eq!(reason.text, "Insufficient collateral");
        assert_eq!(reason.target_status(), StatusCode::Rejected);
    }

    #[test]
    fn near_misses_are_not_canonical() {
        assert_eq!(
            RejectionReason::parse("отказ клиента").target_status(),
            StatusCode::Rejected
        );
    }
}
