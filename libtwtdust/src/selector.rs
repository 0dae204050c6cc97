//! Target selection and resolution
//!
//! A [`TargetSelector`] names exactly one way of finding the posts a batch
//! acts on. [`resolve`] turns it into either a single id or the ordered list
//! of targets returned by the provider.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TwtDustError};
use crate::platforms::Platform;
use crate::types::Target;

/// Largest timeline page the provider accepts
pub const MAX_COUNT: u32 = 200;
pub const DEFAULT_COUNT: u32 = 20;

/// Languages supported by popular search
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }
}

impl FromStr for Language {
    type Err = TwtDustError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "en" => Ok(Language::En),
            "zh" => Ok(Language::Zh),
            other => Err(TwtDustError::InvalidInput(format!(
                "Unsupported language '{}'. Valid options: en, zh",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Reject page sizes the provider would refuse
pub fn validate_count(count: u32) -> Result<()> {
    if count == 0 {
        return Err(TwtDustError::InvalidInput(
            "Tweet count must be at least 1".to_string(),
        ));
    }
    if count > MAX_COUNT {
        return Err(TwtDustError::InvalidInput(format!(
            "Tweet count {} is larger than {}",
            count, MAX_COUNT
        )));
    }
    Ok(())
}

/// How the targets of a retweet or reply are found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSelector {
    /// One explicit post. `handle` is the author, needed only for replies.
    ById { id: u64, handle: Option<String> },
    /// Most recent posts of a user, newest first
    ByUser { handle: String, count: u32 },
    /// Popular posts for a topic, at most `result_limit` of them
    ByTopic {
        topic: String,
        language: Language,
        result_limit: u32,
    },
}

impl TargetSelector {
    /// Pick a selector from optional command inputs.
    ///
    /// Precedence: an id selects a single post; otherwise a handle selects
    /// that user's timeline; otherwise the topic search is used.
    pub fn from_parts(
        id: Option<u64>,
        handle: Option<String>,
        count: u32,
        topic: String,
        language: &str,
    ) -> Result<Self> {
        let handle = handle.filter(|h| !h.trim().is_empty());
        let selector = match (id, handle) {
            (Some(id), handle) => TargetSelector::ById { id, handle },
            (None, Some(handle)) => TargetSelector::ByUser { handle, count },
            (None, None) => TargetSelector::ByTopic {
                topic,
                language: language.parse()?,
                result_limit: count,
            },
        };
        selector.validate()?;
        Ok(selector)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            TargetSelector::ById { .. } => Ok(()),
            TargetSelector::ByUser { handle, count } => {
                if handle.trim().is_empty() {
                    return Err(TwtDustError::InvalidInput("User handle is empty".to_string()));
                }
                validate_count(*count)
            }
            TargetSelector::ByTopic { result_limit, .. } => validate_count(*result_limit),
        }
    }
}

/// Targets a selector resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Single { id: u64, handle: Option<String> },
    Batch(Vec<Target>),
}

/// Resolve a selector against the platform.
///
/// Single ids never touch the provider. Validation happens before any call.
pub async fn resolve(platform: &dyn Platform, selector: &TargetSelector) -> Result<Resolved> {
    selector.validate()?;

    match selector {
        TargetSelector::ById { id, handle } => Ok(Resolved::Single {
            id: *id,
            handle: handle.clone(),
        }),
        TargetSelector::ByUser { handle, count } => {
            let targets = platform.fetch_user_timeline(handle, *count).await?;
            debug!("Resolved {} target(s) from @{}'s timeline", targets.len(), handle);
            Ok(Resolved::Batch(targets))
        }
        TargetSelector::ByTopic {
            topic,
            language,
            result_limit,
        } => {
            let mut targets = platform
                .search_popular(topic, language.code(), *result_limit)
                .await?;
            targets.truncate(*result_limit as usize);
            debug!(
                "Resolved {} popular target(s) for '{}' ({})",
                targets.len(),
                topic,
                language
            );
            Ok(Resolved::Batch(targets))
        }
    }
}
