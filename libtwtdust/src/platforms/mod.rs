//! Platform abstraction
//!
//! [`Platform`] is the façade the dispatcher talks to. [`twitter::TwitterClient`]
//! is the real implementation; [`mock::MockPlatform`] is available in all
//! builds so integration tests can drive the dispatcher without a network.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Target;

pub mod mock;
pub mod oauth;
pub mod twitter;

/// Remote operations the dispatcher needs from the provider
///
/// Every operation may fail with a classified
/// [`PlatformError`](crate::error::PlatformError). Argument problems are
/// reported as [`TwtDustError::InvalidInput`](crate::error::TwtDustError)
/// before anything is sent.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Most recent posts by `handle`, newest first, in provider order.
    ///
    /// `count` above [`MAX_COUNT`](crate::selector::MAX_COUNT) is rejected.
    async fn fetch_user_timeline(&self, handle: &str, count: u32) -> Result<Vec<Target>>;

    /// Up to `count` popular posts for `topic`, in the provider's ranking.
    ///
    /// `language` must be `en` or `zh`.
    async fn search_popular(&self, topic: &str, language: &str, count: u32) -> Result<Vec<Target>>;

    async fn create_post(&self, text: &str) -> Result<Target>;

    /// Reply to `target_id`; the provider requires the text to start with `@handle `.
    async fn create_reply(&self, handle: &str, target_id: u64, text: &str) -> Result<Target>;

    /// Retweet `target_id`, returning the retweet object.
    async fn create_retweet(&self, target_id: u64) -> Result<Target>;
}

/// Compose reply text with the mention prefix the provider expects
pub fn reply_text(handle: &str, text: &str) -> String {
    format!("@{} {}", handle.trim_start_matches('@'), text)
}
