//! Error types for twtdust

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TwtDustError>;

#[derive(Error, Debug)]
pub enum TwtDustError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TwtDustError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            TwtDustError::InvalidInput(_) => 3,
            TwtDustError::Platform(PlatformError::Authentication(_)) => 2,
            TwtDustError::Platform(_) => 1,
            TwtDustError::Config(_) => 1,
        }
    }

    /// Whether this error invalidates the whole run rather than one item
    pub fn is_fatal(&self) -> bool {
        match self {
            TwtDustError::Config(_) => true,
            TwtDustError::Platform(e) => e.is_fatal(),
            TwtDustError::InvalidInput(_) => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Raw failure details reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
    /// Provider error code (e.g. 327 for "already retweeted")
    pub code: Option<u32>,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(status: Option<u16>, code: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.code, self.status) {
            (Some(code), _) => write!(f, "[code {}] {}", code, self.message),
            (None, Some(status)) => write!(f, "[HTTP {}] {}", status, self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(ProviderFailure),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(ProviderFailure),

    #[error("Duplicate content: {0}")]
    DuplicateContent(ProviderFailure),

    #[error("Request rejected: {0}")]
    Api(ProviderFailure),

    #[error("Network error: {0}")]
    Transport(String),
}

/// Provider codes that mean the credentials are unusable
const AUTH_CODES: &[u32] = &[32, 64, 89, 99, 135, 215, 220, 326];
/// Provider codes for throttling
const RATE_LIMIT_CODES: &[u32] = &[88, 185];
/// Provider codes for duplicate status / already retweeted
const DUPLICATE_CODES: &[u32] = &[187, 327];

impl PlatformError {
    /// Classify a provider response into a typed failure.
    ///
    /// The provider code wins over the HTTP status when both are known.
    pub fn classify(failure: ProviderFailure) -> Self {
        if let Some(code) = failure.code {
            if DUPLICATE_CODES.contains(&code) {
                return PlatformError::DuplicateContent(failure);
            }
            if RATE_LIMIT_CODES.contains(&code) {
                return PlatformError::RateLimit(failure);
            }
            if AUTH_CODES.contains(&code) {
                return PlatformError::Authentication(failure);
            }
        }

        match failure.status {
            Some(401) => PlatformError::Authentication(failure),
            Some(429) => PlatformError::RateLimit(failure),
            _ => PlatformError::Api(failure),
        }
    }

    /// Provider details, if the failure came from the provider
    pub fn provider(&self) -> Option<&ProviderFailure> {
        match self {
            PlatformError::Authentication(p)
            | PlatformError::RateLimit(p)
            | PlatformError::DuplicateContent(p)
            | PlatformError::Api(p) => Some(p),
            PlatformError::Transport(_) => None,
        }
    }

    pub fn code(&self) -> Option<u32> {
        self.provider().and_then(|p| p.code)
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, PlatformError::DuplicateContent(_))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, PlatformError::Authentication(_))
    }
}
