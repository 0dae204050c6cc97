//! Mock platform for testing
//!
//! Serves canned timelines and search results and lets a test script a
//! failure for any target id. Every call is recorded so tests can assert on
//! exactly what reached the "provider".

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::{PlatformError, ProviderFailure, Result, TwtDustError};
use crate::platforms::{reply_text, Platform};
use crate::selector::{validate_count, Language};
use crate::types::Target;

/// Offset added to a target id to form the id of a retweet or reply
pub const CREATED_ID_OFFSET: u64 = 1_000_000;

/// A call that reached the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Timeline { handle: String, count: u32 },
    Search { topic: String, language: String, count: u32 },
    Post { text: String },
    Reply { handle: String, target_id: u64, text: String },
    Retweet { target_id: u64 },
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Timeline returned for any handle
    pub timeline: Vec<Target>,
    pub search_results: Vec<Target>,
    /// Failure returned when acting on a given target id
    pub failures: HashMap<u64, PlatformError>,
    /// Failure returned by `create_post`
    pub post_failure: Option<PlatformError>,
    /// Failure returned by timeline and search fetches
    pub fetch_failure: Option<PlatformError>,
}

pub struct MockPlatform {
    config: MockConfig,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A platform whose timeline holds the given ids, all by `author`
    pub fn with_timeline(author: &str, ids: &[u64]) -> Self {
        Self::new(MockConfig {
            timeline: ids.iter().map(|id| target(*id, author)).collect(),
            ..Default::default()
        })
    }

    /// A platform whose popular search returns the given ids
    pub fn with_search(ids: &[u64]) -> Self {
        Self::new(MockConfig {
            search_results: ids
                .iter()
                .map(|id| target(*id, &format!("user{}", id)))
                .collect(),
            ..Default::default()
        })
    }

    /// Script a failure for actions on `target_id`
    pub fn fail_on(mut self, target_id: u64, error: PlatformError) -> Self {
        self.config.failures.insert(target_id, error);
        self
    }

    /// Script "already retweeted" (code 327) for `target_id`
    pub fn duplicate_on(self, target_id: u64) -> Self {
        self.fail_on(
            target_id,
            PlatformError::DuplicateContent(ProviderFailure::new(
                Some(403),
                Some(327),
                "You have already retweeted this Tweet.",
            )),
        )
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls that reached the mock
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: MockCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn scripted(&self, target_id: u64) -> Result<()> {
        match self.config.failures.get(&target_id) {
            Some(error) => Err(error.clone().into()),
            None => Ok(()),
        }
    }
}

/// Build a target with a fixed timestamp
pub fn target(id: u64, author: &str) -> Target {
    Target {
        id,
        author: author.to_string(),
        created_at: Utc.with_ymd_and_hms(2021, 10, 1, 12, 0, 0).unwrap(),
        favorite_count: id % 100,
        retweet_count: 0,
        text: format!("post {}", id),
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn fetch_user_timeline(&self, handle: &str, count: u32) -> Result<Vec<Target>> {
        validate_count(count)?;
        self.record(MockCall::Timeline {
            handle: handle.to_string(),
            count,
        });
        if let Some(error) = &self.config.fetch_failure {
            return Err(error.clone().into());
        }
        Ok(self
            .config
            .timeline
            .iter()
            .take(count as usize)
            .cloned()
            .collect())
    }

    async fn search_popular(&self, topic: &str, language: &str, count: u32) -> Result<Vec<Target>> {
        language.parse::<Language>()?;
        validate_count(count)?;
        self.record(MockCall::Search {
            topic: topic.to_string(),
            language: language.to_string(),
            count,
        });
        if let Some(error) = &self.config.fetch_failure {
            return Err(error.clone().into());
        }
        Ok(self
            .config
            .search_results
            .iter()
            .take(count as usize)
            .cloned()
            .collect())
    }

    async fn create_post(&self, text: &str) -> Result<Target> {
        self.record(MockCall::Post {
            text: text.to_string(),
        });
        if let Some(error) = &self.config.post_failure {
            return Err(error.clone().into());
        }
        let mut created = target(CREATED_ID_OFFSET, "mock");
        created.text = text.to_string();
        Ok(created)
    }

    async fn create_reply(&self, handle: &str, target_id: u64, text: &str) -> Result<Target> {
        if handle.trim().is_empty() {
            return Err(TwtDustError::InvalidInput(
                "Reply needs the target author's handle".to_string(),
            ));
        }
        let text = reply_text(handle, text);
        self.record(MockCall::Reply {
            handle: handle.to_string(),
            target_id,
            text: text.clone(),
        });
        self.scripted(target_id)?;
        let mut created = target(target_id + CREATED_ID_OFFSET, "mock");
        created.text = text;
        Ok(created)
    }

    async fn create_retweet(&self, target_id: u64) -> Result<Target> {
        self.record(MockCall::Retweet { target_id });
        self.scripted(target_id)?;
        Ok(target(target_id + CREATED_ID_OFFSET, "mock"))
    }
}
