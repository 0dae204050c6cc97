//! Twitter v1.1 REST client

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, Response};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::ApiConfig;
use crate::credentials::Credentials;
use crate::error::{PlatformError, ProviderFailure, Result};
use crate::platforms::oauth::OAuthSigner;
use crate::platforms::{reply_text, Platform};
use crate::selector::{validate_count, Language};
use crate::types::Target;

/// Format of `created_at`, e.g. `Wed Oct 10 20:19:24 +0000 2018`
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

pub struct TwitterClient {
    client: Client,
    base_url: String,
    signer: OAuthSigner,
}

impl TwitterClient {
    pub fn new(config: &ApiConfig, credentials: Credentials) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("twtdust/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlatformError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            signer: OAuthSigner::new(credentials),
        })
    }

    async fn request<T: for<'de> Deserialize<'de>>(
        &self,
        method: Method,
        endpoint: &str,
        params: Vec<(String, String)>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let auth = self.signer.sign(method.as_str(), &url, &params)?;
        debug!(%method, endpoint, "Calling provider");

        let builder = self
            .client
            .request(method.clone(), &url)
            .header(reqwest::header::AUTHORIZATION, auth);
        let builder = if method == Method::GET {
            builder.query(&params)
        } else {
            builder.form(&params)
        };

        let response = builder.send().await.map_err(transport_error)?;
        decode(response).await
    }
}

#[async_trait]
impl Platform for TwitterClient {
    #[instrument(skip(self))]
    async fn fetch_user_timeline(&self, handle: &str, count: u32) -> Result<Vec<Target>> {
        validate_count(count)?;
        let tweets: Vec<WireTweet> = self
            .request(
                Method::GET,
                "/statuses/user_timeline.json",
                vec![
                    ("screen_name".to_string(), handle.to_string()),
                    ("count".to_string(), count.to_string()),
                ],
            )
            .await?;
        tweets.into_iter().map(Target::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn search_popular(&self, topic: &str, language: &str, count: u32) -> Result<Vec<Target>> {
        let language: Language = language.parse()?;
        validate_count(count)?;
        let response: SearchResponse = self
            .request(
                Method::GET,
                "/search/tweets.json",
                vec![
                    ("q".to_string(), topic.to_string()),
                    ("result_type".to_string(), "popular".to_string()),
                    ("lang".to_string(), language.code().to_string()),
                    ("count".to_string(), count.to_string()),
                ],
            )
            .await?;
        response.statuses.into_iter().map(Target::try_from).collect()
    }

    #[instrument(skip(self, text))]
    async fn create_post(&self, text: &str) -> Result<Target> {
        let tweet: WireTweet = self
            .request(
                Method::POST,
                "/statuses/update.json",
                vec![("status".to_string(), text.to_string())],
            )
            .await?;
        tweet.try_into()
    }

    #[instrument(skip(self, text))]
    async fn create_reply(&self, handle: &str, target_id: u64, text: &str) -> Result<Target> {
        if handle.trim().is_empty() {
            return Err(crate::error::TwtDustError::InvalidInput(
                "Reply needs the target author's handle".to_string(),
            ));
        }
        let tweet: WireTweet = self
            .request(
                Method::POST,
                "/statuses/update.json",
                vec![
                    ("status".to_string(), reply_text(handle, text)),
                    ("in_reply_to_status_id".to_string(), target_id.to_string()),
                ],
            )
            .await?;
        tweet.try_into()
    }

    #[instrument(skip(self))]
    async fn create_retweet(&self, target_id: u64) -> Result<Target> {
        let tweet: WireTweet = self
            .request(
                Method::POST,
                &format!("/statuses/retweet/{}.json", target_id),
                Vec::new(),
            )
            .await?;
        tweet.try_into()
    }
}

fn transport_error(error: reqwest::Error) -> PlatformError {
    PlatformError::Transport(error.to_string())
}

/// Turn a response into data, or into a classified failure
async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| {
            PlatformError::Api(ProviderFailure::new(
                Some(status.as_u16()),
                None,
                format!("Unexpected response body: {}", e),
            ))
            .into()
        });
    }

    let failure = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(ErrorResponse { errors }) if !errors.is_empty() => {
            let first = &errors[0];
            ProviderFailure::new(Some(status.as_u16()), Some(first.code), first.message.clone())
        }
        _ => ProviderFailure::new(
            Some(status.as_u16()),
            None,
            status.canonical_reason().unwrap_or("Unknown error").to_string(),
        ),
    };

    debug!(%failure, "Provider rejected request");
    Err(PlatformError::classify(failure).into())
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    errors: Vec<WireError>,
}

#[derive(Debug, Deserialize)]
struct WireError {
    code: u32,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    statuses: Vec<WireTweet>,
}

#[derive(Debug, Deserialize)]
struct WireTweet {
    id: u64,
    created_at: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    full_text: Option<String>,
    #[serde(default)]
    favorite_count: u64,
    #[serde(default)]
    retweet_count: u64,
    user: WireUser,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    screen_name: String,
}

impl TryFrom<WireTweet> for Target {
    type Error = crate::error::TwtDustError;

    fn try_from(tweet: WireTweet) -> Result<Self> {
        let created_at = DateTime::parse_from_str(&tweet.created_at, CREATED_AT_FORMAT)
            .map_err(|e| {
                PlatformError::Api(ProviderFailure::new(
                    None,
                    None,
                    format!("Unparseable created_at '{}': {}", tweet.created_at, e),
                ))
            })?
            .with_timezone(&Utc);

        Ok(Target {
            id: tweet.id,
            author: tweet.user.screen_name,
            created_at,
            favorite_count: tweet.favorite_count,
            retweet_count: tweet.retweet_count,
            text: tweet.full_text.or(tweet.text).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_wire_tweet_conversion() {
        let json = r#"{
            "id": 1050118621198921728,
            "created_at": "Wed Oct 10 20:19:24 +0000 2018",
            "text": "To make room for more expression",
            "favorite_count": 12,
            "retweet_count": 3,
            "user": {"screen_name": "TwitterAPI"}
        }"#;
        let tweet: WireTweet = serde_json::from_str(json).unwrap();
        let target = Target::try_from(tweet).unwrap();

        assert_eq!(target.id, 1050118621198921728);
        assert_eq!(target.author, "TwitterAPI");
        assert_eq!(target.favorite_count, 12);
        assert_eq!(target.created_at.year(), 2018);
        assert_eq!(target.created_at.hour(), 20);
        assert_eq!(
            target.permalink(),
            "https://twitter.com/TwitterAPI/status/1050118621198921728"
        );
    }

    #[test]
    fn test_bad_created_at_is_rejected() {
        let json = r#"{"id": 1, "created_at": "yesterday", "user": {"screen_name": "a"}}"#;
        let tweet: WireTweet = serde_json::from_str(json).unwrap();
        assert!(Target::try_from(tweet).is_err());
    }

    #[test]
    fn test_error_body_parsing() {
        let json = r#"{"errors":[{"code":327,"message":"You have already retweeted this Tweet."}]}"#;
        let body: ErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.errors[0].code, 327);
    }
}
