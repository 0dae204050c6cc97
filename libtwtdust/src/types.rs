//! Core types for twtdust

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, TwtDustError};

/// One remote post, as delivered by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: u64,
    /// Author handle without the leading `@`
    pub author: String,
    pub created_at: DateTime<Utc>,
    /// Engagement count (favorites)
    pub favorite_count: u64,
    pub retweet_count: u64,
    pub text: String,
}

impl Target {
    /// Permalink-style reference to this post
    pub fn permalink(&self) -> String {
        permalink(&self.author, self.id)
    }
}

pub fn permalink(author: &str, id: u64) -> String {
    format!("https://twitter.com/{}/status/{}", author, id)
}

/// Action applied to a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Tweet,
    Retweet,
    Reply,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Tweet => write!(f, "tweet"),
            Action::Retweet => write!(f, "retweet"),
            Action::Reply => write!(f, "reply"),
        }
    }
}

/// Classified reason an action failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Authentication,
    RateLimit,
    Rejected,
    Transport,
    InvalidArgument,
    Config,
}

/// Result of applying one action to one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// The action went through; `created` is the resulting post
    Success { created: Target },
    /// The provider rejected the action as duplicate content
    Skipped { code: Option<u32>, message: String },
    Failed {
        kind: FailureKind,
        code: Option<u32>,
        message: String,
    },
}

impl OutcomeStatus {
    /// Map a failed call onto an outcome. Duplicate content becomes a skip.
    pub fn from_error(error: &TwtDustError) -> Self {
        match error {
            TwtDustError::Platform(PlatformError::DuplicateContent(p)) => OutcomeStatus::Skipped {
                code: p.code,
                message: p.message.clone(),
            },
            TwtDustError::Platform(e) => {
                let kind = match e {
                    PlatformError::Authentication(_) => FailureKind::Authentication,
                    PlatformError::RateLimit(_) => FailureKind::RateLimit,
                    PlatformError::Transport(_) => FailureKind::Transport,
                    PlatformError::Api(_) | PlatformError::DuplicateContent(_) => {
                        FailureKind::Rejected
                    }
                };
                OutcomeStatus::Failed {
                    kind,
                    code: e.code(),
                    message: e
                        .provider()
                        .map(|p| p.message.clone())
                        .unwrap_or_else(|| e.to_string()),
                }
            }
            TwtDustError::InvalidInput(msg) => OutcomeStatus::Failed {
                kind: FailureKind::InvalidArgument,
                code: None,
                message: msg.clone(),
            },
            TwtDustError::Config(e) => OutcomeStatus::Failed {
                kind: FailureKind::Config,
                code: None,
                message: e.to_string(),
            },
        }
    }
}

/// Per-target result produced by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub action: Action,
    /// Id of the post the action was applied to (for tweets, the new post)
    pub target_id: u64,
    /// Author of the target, when known
    pub target_author: Option<String>,
    /// Creation time of the target. Only known when the target was fetched
    /// from the provider, i.e. for batch items.
    pub target_created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ActionOutcome {
    /// Successful action on a target known only by id (and maybe author)
    pub fn success(action: Action, target_id: u64, target_author: Option<String>, created: Target) -> Self {
        Self {
            action,
            target_id,
            target_author,
            target_created_at: None,
            status: OutcomeStatus::Success { created },
        }
    }

    /// Outcome for a target resolved from the provider
    pub fn resolved(action: Action, target: &Target, status: OutcomeStatus) -> Self {
        Self {
            action,
            target_id: target.id,
            target_author: Some(target.author.clone()),
            target_created_at: Some(target.created_at),
            status,
        }
    }

    /// Permalink of the target, when its author is known
    pub fn target_permalink(&self) -> Option<String> {
        self.target_author
            .as_deref()
            .map(|author| permalink(author, self.target_id))
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Success { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, OutcomeStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }

    /// The post created by a successful action
    pub fn created(&self) -> Option<&Target> {
        match &self.status {
            OutcomeStatus::Success { created } => Some(created),
            _ => None,
        }
    }
}

/// Ordered outcomes of one dispatch, in target resolution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub outcomes: Vec<ActionOutcome>,
    /// Set when a shutdown request stopped the batch early
    pub interrupted: bool,
}

impl DispatchResult {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderFailure;
    use chrono::TimeZone;

    fn target(id: u64) -> Target {
        Target {
            id,
            author: "alice".to_string(),
            created_at: Utc.with_ymd_and_hms(2021, 10, 1, 12, 0, 0).unwrap(),
            favorite_count: 3,
            retweet_count: 1,
            text: "hi".to_string(),
        }
    }

    #[test]
    fn test_permalink() {
        assert_eq!(target(42).permalink(), "https://twitter.com/alice/status/42");
    }

    #[test]
    fn test_duplicate_becomes_skip() {
        let error: TwtDustError = PlatformError::DuplicateContent(ProviderFailure::new(
            Some(403),
            Some(327),
            "You have already retweeted this Tweet.",
        ))
        .into();
        let outcome = ActionOutcome::resolved(Action::Retweet, &target(102), OutcomeStatus::from_error(&error));
        assert!(outcome.is_skipped());
        assert_eq!(
            outcome.status,
            OutcomeStatus::Skipped {
                code: Some(327),
                message: "You have already retweeted this Tweet.".to_string()
            }
        );
    }

    #[test]
    fn test_failure_kinds() {
        let rate: TwtDustError =
            PlatformError::RateLimit(ProviderFailure::new(Some(429), Some(88), "Rate limit exceeded")).into();
        match OutcomeStatus::from_error(&rate) {
            OutcomeStatus::Failed { kind, code, .. } => {
                assert_eq!(kind, FailureKind::RateLimit);
                assert_eq!(code, Some(88));
            }
            other => panic!("Expected failure, got {:?}", other),
        }

        let transport: TwtDustError = PlatformError::Transport("connection reset".to_string()).into();
        match OutcomeStatus::from_error(&transport) {
            OutcomeStatus::Failed { kind, code, message } => {
                assert_eq!(kind, FailureKind::Transport);
                assert_eq!(code, None);
                assert!(message.contains("connection reset"));
            }
            other => panic!("Expected failure, got {:?}", other),
        }

        let invalid = TwtDustError::InvalidInput("empty handle".to_string());
        assert!(matches!(
            OutcomeStatus::from_error(&invalid),
            OutcomeStatus::Failed {
                kind: FailureKind::InvalidArgument,
                ..
            }
        ));
    }

    #[test]
    fn test_dispatch_result_counts() {
        let skip: TwtDustError = PlatformError::DuplicateContent(ProviderFailure::new(None, Some(327), "dup")).into();
        let fail: TwtDustError = PlatformError::Transport("down".to_string()).into();
        let result = DispatchResult {
            outcomes: vec![
                ActionOutcome::success(Action::Retweet, 1, None, target(11)),
                ActionOutcome::resolved(Action::Retweet, &target(2), OutcomeStatus::from_error(&skip)),
                ActionOutcome::resolved(Action::Retweet, &target(3), OutcomeStatus::from_error(&fail)),
                ActionOutcome::success(Action::Retweet, 4, None, target(14)),
            ],
            interrupted: false,
        };
        assert_eq!(result.len(), 4);
        assert_eq!(result.succeeded(), 2);
        assert_eq!(result.skipped(), 1);
        assert_eq!(result.failed(), 1);
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = ActionOutcome::success(Action::Reply, 7, Some("bob".to_string()), target(70));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["action"], "reply");
        assert_eq!(json["created"]["id"], 70);
        assert!(json["target_created_at"].is_null());
    }

    #[test]
    fn test_resolved_outcome_carries_target_details() {
        let skip: TwtDustError = PlatformError::DuplicateContent(ProviderFailure::new(
            Some(403),
            Some(327),
            "You have already retweeted this Tweet.",
        ))
        .into();
        let outcome = ActionOutcome::resolved(Action::Retweet, &target(102), OutcomeStatus::from_error(&skip));

        assert_eq!(outcome.target_id, 102);
        assert_eq!(
            outcome.target_permalink().as_deref(),
            Some("https://twitter.com/alice/status/102")
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["target_author"], "alice");
        assert_eq!(json["target_created_at"], "2021-10-01T12:00:00Z");
    }
}
