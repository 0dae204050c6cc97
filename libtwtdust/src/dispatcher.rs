//! Bulk action dispatcher
//!
//! Resolves a [`TargetSelector`] through the [`Platform`], applies one action
//! per target in order, and pauses a random interval between items. Batches
//! are best effort: one bad post never aborts the run. Only failures that
//! invalidate every later call (bad credentials) stop a batch early.
//!
//! ```no_run
//! use libtwtdust::dispatcher::Dispatcher;
//! use libtwtdust::pacing::Pacing;
//! use libtwtdust::platforms::mock::MockPlatform;
//! use libtwtdust::selector::TargetSelector;
//!
//! # async fn example() -> libtwtdust::Result<()> {
//! let dispatcher = Dispatcher::new(MockPlatform::with_timeline("alice", &[1, 2]), Pacing::default());
//! let selector = TargetSelector::ByUser { handle: "alice".to_string(), count: 20 };
//! let result = dispatcher.run_retweet(&selector).await?;
//! println!("{} retweeted, {} skipped", result.succeeded(), result.skipped());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, TwtDustError};
use crate::obfuscation;
use crate::pacing::{DelayRange, Pacing, ShutdownSleeper, Sleeper};
use crate::platforms::Platform;
use crate::selector::{resolve, validate_count, Language, Resolved, TargetSelector};
use crate::types::{Action, ActionOutcome, DispatchResult, OutcomeStatus, Target};

/// Receives outcomes as the dispatcher produces them
pub trait DispatchObserver: Send + Sync {
    fn on_outcome(&self, _outcome: &ActionOutcome) {}

    /// Called before each pacing pause
    fn on_pause(&self, _delay: Duration) {}
}

/// Observer that ignores everything
pub struct NoopObserver;

impl DispatchObserver for NoopObserver {}

enum BatchAction<'a> {
    Retweet,
    Reply { text: &'a str },
}

impl BatchAction<'_> {
    fn action(&self) -> Action {
        match self {
            BatchAction::Retweet => Action::Retweet,
            BatchAction::Reply { .. } => Action::Reply,
        }
    }
}

pub struct Dispatcher<P: Platform> {
    platform: P,
    pacing: Pacing,
    sleeper: Arc<dyn Sleeper>,
    observer: Box<dyn DispatchObserver>,
}

impl<P: Platform> Dispatcher<P> {
    pub fn new(platform: P, pacing: Pacing) -> Self {
        Self {
            platform,
            pacing,
            sleeper: Arc::new(ShutdownSleeper::default()),
            observer: Box::new(NoopObserver),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn DispatchObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Recent posts of `handle`, newest first
    pub async fn run_timeline(&self, handle: &str, count: u32) -> Result<Vec<Target>> {
        validate_count(count)?;
        let targets = self.platform.fetch_user_timeline(handle, count).await?;
        info!("user tweets number: {}", targets.len());
        Ok(targets)
    }

    /// Up to `count` popular posts for `topic`, in provider order
    pub async fn run_search(&self, topic: &str, language: &str, count: u32) -> Result<Vec<Target>> {
        let language: Language = language.parse()?;
        validate_count(count)?;
        let targets = self
            .platform
            .search_popular(topic, language.code(), count)
            .await?;
        info!("popular tweets number: {}", targets.len());
        Ok(targets)
    }

    /// Create one post. Failures go straight to the caller.
    pub async fn run_tweet(&self, text: &str) -> Result<ActionOutcome> {
        let created = self.platform.create_post(text).await?;
        info!("Created tweet {}", created.id);
        let outcome = ActionOutcome::success(Action::Tweet, created.id, None, created);
        self.observer.on_outcome(&outcome);
        Ok(outcome)
    }

    /// Retweet every target the selector resolves to
    pub async fn run_retweet(&self, selector: &TargetSelector) -> Result<DispatchResult> {
        match resolve(&self.platform, selector).await? {
            Resolved::Single { id, handle } => {
                let created = self.platform.create_retweet(id).await?;
                info!("Retweeted {}", id);
                Ok(self.single(ActionOutcome::success(Action::Retweet, id, handle, created)))
            }
            Resolved::Batch(targets) => {
                self.dispatch_batch(&BatchAction::Retweet, &targets, self.pacing.retweet)
                    .await
            }
        }
    }

    /// Reply to every target the selector resolves to.
    ///
    /// Batch replies get a fresh obfuscation tag each; a single explicit
    /// target is replied to with `text` as given.
    pub async fn run_reply(&self, selector: &TargetSelector, text: &str) -> Result<DispatchResult> {
        match resolve(&self.platform, selector).await? {
            Resolved::Single { id, handle } => {
                let handle = handle.ok_or_else(|| {
                    TwtDustError::InvalidInput(
                        "Replying to a single tweet needs both the tweet id and its author".to_string(),
                    )
                })?;
                let created = self.platform.create_reply(&handle, id, text).await?;
                info!("Replied to {}", id);
                Ok(self.single(ActionOutcome::success(Action::Reply, id, Some(handle), created)))
            }
            Resolved::Batch(targets) => {
                self.dispatch_batch(&BatchAction::Reply { text }, &targets, self.pacing.reply)
                    .await
            }
        }
    }

    fn single(&self, outcome: ActionOutcome) -> DispatchResult {
        self.observer.on_outcome(&outcome);
        DispatchResult {
            outcomes: vec![outcome],
            interrupted: false,
        }
    }

    async fn apply(&self, action: &BatchAction<'_>, target: &Target) -> Result<Target> {
        match action {
            BatchAction::Retweet => self.platform.create_retweet(target.id).await,
            BatchAction::Reply { text } => {
                let text = obfuscation::obfuscate(text);
                self.platform.create_reply(&target.author, target.id, &text).await
            }
        }
    }

    async fn dispatch_batch(
        &self,
        action: &BatchAction<'_>,
        targets: &[Target],
        range: DelayRange,
    ) -> Result<DispatchResult> {
        let kind = action.action();
        let mut result = DispatchResult::default();
        info!("Dispatching {} to {} target(s)", kind, targets.len());

        for (index, target) in targets.iter().enumerate() {
            if self.sleeper.should_stop() {
                warn!(
                    "Shutdown requested, stopping before {} of {} target(s)",
                    index + 1,
                    targets.len()
                );
                result.interrupted = true;
                break;
            }

            let outcome = match self.apply(action, target).await {
                Ok(created) => {
                    info!("{} {} succeeded: {}", kind, target.id, created.id);
                    ActionOutcome::resolved(kind, target, OutcomeStatus::Success { created })
                }
                Err(e) if e.is_fatal() => {
                    warn!("{} {} failed, aborting batch: {}", kind, target.id, e);
                    return Err(e);
                }
                Err(e) => {
                    let outcome = ActionOutcome::resolved(kind, target, OutcomeStatus::from_error(&e));
                    if outcome.is_skipped() {
                        info!("{} {} skipped: {}", kind, target.id, e);
                    } else {
                        warn!("{} {} failed: {}", kind, target.id, e);
                    }
                    outcome
                }
            };

            self.observer.on_outcome(&outcome);
            result.outcomes.push(outcome);

            if index + 1 < targets.len() {
                let delay = range.sample();
                debug!("Pausing {}s before next {}", delay.as_secs(), kind);
                self.observer.on_pause(delay);
                if !self.sleeper.pause(delay).await {
                    warn!(
                        "Shutdown requested, stopping after {} of {} target(s)",
                        index + 1,
                        targets.len()
                    );
                    result.interrupted = true;
                    break;
                }
            }
        }

        info!(
            "{} done: {} succeeded, {} skipped, {} failed",
            kind,
            result.succeeded(),
            result.skipped(),
            result.failed()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PlatformError, ProviderFailure};
    use crate::pacing::{RecordingSleeper, ShutdownFlag};
    use crate::platforms::mock::{MockCall, MockConfig, MockPlatform};
    use std::sync::Mutex;

    fn setup(platform: MockPlatform) -> (Dispatcher<MockPlatform>, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::new());
        let dispatcher = Dispatcher::new(platform, Pacing::default()).with_sleeper(sleeper.clone());
        (dispatcher, sleeper)
    }

    #[derive(Default)]
    struct Collecting {
        outcomes: Arc<Mutex<Vec<u64>>>,
        pauses: Arc<Mutex<usize>>,
    }

    impl DispatchObserver for Collecting {
        fn on_outcome(&self, outcome: &ActionOutcome) {
            self.outcomes.lock().unwrap().push(outcome.target_id);
        }

        fn on_pause(&self, _delay: Duration) {
            *self.pauses.lock().unwrap() += 1;
        }
    }

    #[tokio::test]
    async fn test_timeline_over_limit_makes_no_call() {
        let (dispatcher, _) = setup(MockPlatform::with_timeline("alice", &[1]));
        let err = dispatcher.run_timeline("alice", 201).await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(dispatcher.platform().call_count(), 0);
    }

    #[tokio::test]
    async fn test_search_bad_language_makes_no_call() {
        let (dispatcher, _) = setup(MockPlatform::with_search(&[1]));
        assert!(dispatcher.run_search("rust", "cs", 20).await.is_err());
        assert!(dispatcher.run_search("rust", "en", 0).await.is_err());
        assert_eq!(dispatcher.platform().call_count(), 0);
    }

    #[tokio::test]
    async fn test_tweet_success_and_failure() {
        let (dispatcher, _) = setup(MockPlatform::new(MockConfig::default()));
        let outcome = dispatcher.run_tweet("Hello, my friends!").await.unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.created().unwrap().text, "Hello, my friends!");

        let (dispatcher, _) = setup(MockPlatform::new(MockConfig {
            post_failure: Some(PlatformError::DuplicateContent(ProviderFailure::new(
                Some(403),
                Some(187),
                "Status is a duplicate.",
            ))),
            ..Default::default()
        }));
        assert!(dispatcher.run_tweet("again").await.is_err());
    }

    #[tokio::test]
    async fn test_single_retweet_propagates_duplicate() {
        let (dispatcher, sleeper) = setup(MockPlatform::with_timeline("alice", &[]).duplicate_on(42));
        let selector = TargetSelector::ById { id: 42, handle: None };
        let err = dispatcher.run_retweet(&selector).await.unwrap_err();
        assert!(matches!(
            err,
            TwtDustError::Platform(PlatformError::DuplicateContent(_))
        ));
        assert!(sleeper.pauses().is_empty());
    }

    #[tokio::test]
    async fn test_single_reply_without_handle_is_invalid() {
        let (dispatcher, _) = setup(MockPlatform::with_search(&[]));
        let selector = TargetSelector::ById { id: 42, handle: None };
        let err = dispatcher.run_reply(&selector, "hi").await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(dispatcher.platform().call_count(), 0);
    }

    #[tokio::test]
    async fn test_single_reply_has_no_tag() {
        let (dispatcher, sleeper) = setup(MockPlatform::with_search(&[]));
        let selector = TargetSelector::ById {
            id: 42,
            handle: Some("bob".to_string()),
        };
        let result = dispatcher.run_reply(&selector, "hi").await.unwrap();
        assert_eq!(result.succeeded(), 1);
        assert_eq!(
            dispatcher.platform().calls(),
            vec![MockCall::Reply {
                handle: "bob".to_string(),
                target_id: 42,
                text: "@bob hi".to_string()
            }]
        );
        assert!(sleeper.pauses().is_empty());
    }

    #[tokio::test]
    async fn test_failures_do_not_abort_batch() {
        let platform = MockPlatform::with_timeline("alice", &[1, 2, 3, 4])
            .fail_on(
                2,
                PlatformError::RateLimit(ProviderFailure::new(Some(429), Some(88), "Rate limit exceeded")),
            )
            .fail_on(3, PlatformError::Transport("connection reset".to_string()));
        let (dispatcher, sleeper) = setup(platform);
        let selector = TargetSelector::ByUser {
            handle: "alice".to_string(),
            count: 20,
        };

        let result = dispatcher.run_retweet(&selector).await.unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(result.succeeded(), 2);
        assert_eq!(result.failed(), 2);
        assert!(result.outcomes[1].is_failed());
        assert!(result.outcomes[2].is_failed());
        assert_eq!(sleeper.pauses().len(), 3);
    }

    #[tokio::test]
    async fn test_auth_failure_aborts_batch() {
        let platform = MockPlatform::with_timeline("alice", &[1, 2, 3]).fail_on(
            2,
            PlatformError::Authentication(ProviderFailure::new(
                Some(401),
                Some(32),
                "Could not authenticate you.",
            )),
        );
        let (dispatcher, _) = setup(platform);
        let selector = TargetSelector::ByUser {
            handle: "alice".to_string(),
            count: 20,
        };

        let err = dispatcher.run_retweet(&selector).await.unwrap_err();
        assert_eq!(err.exit_code(), 2);
        // Target 3 is never attempted
        assert!(!dispatcher
            .platform()
            .calls()
            .contains(&MockCall::Retweet { target_id: 3 }));
    }

    #[tokio::test]
    async fn test_fetch_failure_propagates() {
        let platform = MockPlatform::new(MockConfig {
            fetch_failure: Some(PlatformError::Transport("dns failure".to_string())),
            ..Default::default()
        });
        let (dispatcher, _) = setup(platform);
        let selector = TargetSelector::ByTopic {
            topic: "rust".to_string(),
            language: Language::En,
            result_limit: 20,
        };
        assert!(dispatcher.run_retweet(&selector).await.is_err());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let (dispatcher, sleeper) = setup(MockPlatform::with_search(&[]));
        let selector = TargetSelector::ByTopic {
            topic: "nothing".to_string(),
            language: Language::En,
            result_limit: 20,
        };
        let result = dispatcher.run_reply(&selector, "hi").await.unwrap();
        assert!(result.is_empty());
        assert!(sleeper.pauses().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_stops_between_items() {
        let sleeper = Arc::new(RecordingSleeper::stopping_after(1));
        let dispatcher = Dispatcher::new(MockPlatform::with_timeline("alice", &[1, 2, 3]), Pacing::default())
            .with_sleeper(sleeper.clone());
        let selector = TargetSelector::ByUser {
            handle: "alice".to_string(),
            count: 20,
        };

        let result = dispatcher.run_retweet(&selector).await.unwrap();
        assert!(result.interrupted);
        assert_eq!(result.len(), 1);
        assert_eq!(sleeper.pauses().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_before_first_item_sends_nothing() {
        let flag = ShutdownFlag::new();
        flag.trigger();
        let dispatcher = Dispatcher::new(MockPlatform::with_timeline("alice", &[1, 2]), Pacing::default())
            .with_sleeper(Arc::new(ShutdownSleeper::new(flag)));
        let selector = TargetSelector::ByUser {
            handle: "alice".to_string(),
            count: 20,
        };

        let result = dispatcher.run_retweet(&selector).await.unwrap();
        assert!(result.interrupted);
        assert!(result.is_empty());
        assert_eq!(
            dispatcher.platform().calls(),
            vec![MockCall::Timeline {
                handle: "alice".to_string(),
                count: 20
            }]
        );
    }

    #[tokio::test]
    async fn test_batch_outcomes_carry_target_timestamp() {
        let platform = MockPlatform::with_timeline("alice", &[101, 102]).duplicate_on(102);
        let (dispatcher, _) = setup(platform);
        let selector = TargetSelector::ByUser {
            handle: "alice".to_string(),
            count: 20,
        };

        let result = dispatcher.run_retweet(&selector).await.unwrap();
        for outcome in &result.outcomes {
            assert_eq!(outcome.target_author.as_deref(), Some("alice"));
            assert!(outcome.target_created_at.is_some());
            assert!(outcome.target_permalink().is_some());
        }
        let skipped = serde_json::to_value(&result.outcomes[1]).unwrap();
        assert_eq!(skipped["status"], "skipped");
        assert_eq!(skipped["target_id"], 102);
        assert_eq!(skipped["target_created_at"], "2021-10-01T12:00:00Z");
    }

    #[tokio::test]
    async fn test_observer_sees_every_outcome() {
        let observer = Collecting::default();
        let outcomes = observer.outcomes.clone();
        let pauses = observer.pauses.clone();
        let (dispatcher, _) = setup(MockPlatform::with_timeline("alice", &[7, 8, 9]).duplicate_on(8));
        let dispatcher = dispatcher.with_observer(Box::new(observer));
        let selector = TargetSelector::ByUser {
            handle: "alice".to_string(),
            count: 20,
        };

        dispatcher.run_retweet(&selector).await.unwrap();
        assert_eq!(*outcomes.lock().unwrap(), vec![7, 8, 9]);
        assert_eq!(*pauses.lock().unwrap(), 2);
    }
}
