//! twtdust - bulk retweet and reply runner
//!
//! Resolves a set of target posts (one id, a user's timeline, or a popular
//! topic search) and applies one action to each, pacing itself with random
//! pauses so the provider does not throttle or flag the account.

pub mod config;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod obfuscation;
pub mod pacing;
pub mod platforms;
pub mod selector;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use credentials::Credentials;
pub use dispatcher::{DispatchObserver, Dispatcher};
pub use error::{PlatformError, Result, TwtDustError};
pub use selector::{Language, TargetSelector};
pub use types::{Action, ActionOutcome, DispatchResult, OutcomeStatus, Target};
