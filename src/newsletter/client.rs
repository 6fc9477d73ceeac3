// Mailchimp client for the newsletter audience

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::models::{MailchimpProblem, MemberRequest, SubscribeResult};
use crate::common::config::NewsletterConfig;

/// Something, an `@`, something, a dot, something; no whitespace anywhere
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("MAILCHIMP_API_KEY, MAILCHIMP_AUDIENCE_ID or MAILCHIMP_SERVER_PREFIX not configured")]
    NotConfigured,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Member already exists")]
    MemberExists,

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Mailchimp API error: HTTP {status}: {detail}")]
    Api { status: u16, detail: String },

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
}

impl NewsletterError {
    /// Visitor-facing message for this failure
    pub fn into_result(self) -> SubscribeResult {
        let non_empty = |detail: String| Some(detail).filter(|d| !d.is_empty());
        match self {
            Self::NotConfigured => SubscribeResult::failed(
                "Nieuwsbrief service is tijdelijk niet beschikbaar.",
                Some("Missing configuration".to_string()),
            ),
            Self::InvalidEmail => SubscribeResult::failed(
                "Vul een geldig e-mailadres in.",
                Some("Invalid email format".to_string()),
            ),
            Self::MemberExists => SubscribeResult::failed(
                "Je bent al ingeschreven voor onze nieuwsbrief! 💕",
                Some("Member already exists".to_string()),
            ),
            Self::InvalidResource(detail) => SubscribeResult::failed(
                "Dit e-mailadres lijkt niet geldig te zijn.",
                non_empty(detail),
            ),
            Self::Api { detail, .. } => SubscribeResult::failed(
                "Er ging iets mis. Probeer het later opnieuw.",
                non_empty(detail).or_else(|| Some("Unknown error".to_string())),
            ),
            Self::RequestFailed(reason) => SubscribeResult::failed(
                "Er ging iets mis met de verbinding. Probeer het later opnieuw.",
                Some(reason),
            ),
        }
    }
}

pub struct NewsletterClient {
    client: Client,
    config: Arc<NewsletterConfig>,
}

impl NewsletterClient {
    pub fn new(config: Arc<NewsletterConfig>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, config }
    }

    /// Subscribe `email` with double opt-in. Never fails; the outcome is
    /// reported in the returned result.
    pub async fn subscribe(&self, email: &str) -> SubscribeResult {
        match self.add_member(email).await {
            Ok(()) => {
                info!("Newsletter subscription pending confirmation");
                SubscribeResult::subscribed()
            }
            Err(e) => {
                match &e {
                    NewsletterError::NotConfigured => error!(error = %e, "Newsletter unavailable"),
                    NewsletterError::Api { .. } | NewsletterError::RequestFailed(_) => {
                        warn!(error = %e, "Newsletter subscription failed")
                    }
                    _ => debug!(error = %e, "Newsletter subscription rejected"),
                }
                e.into_result()
            }
        }
    }

    async fn add_member(&self, email: &str) -> Result<(), NewsletterError> {
        let (api_key, url) = match (self.config.api_key.as_deref(), self.config.members_url()) {
            (Some(key), Some(url)) => (key, url),
            _ => return Err(NewsletterError::NotConfigured),
        };

        if !is_valid_email(email) {
            return Err(NewsletterError::InvalidEmail);
        }

        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("apikey {}", api_key))
            .json(&MemberRequest::pending(email))
            .send()
            .await
            .map_err(|e| NewsletterError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let problem = response
            .json::<MailchimpProblem>()
            .await
            .map_err(|e| NewsletterError::RequestFailed(e.to_string()))?;

        Err(match problem.title.as_str() {
            "Member Exists" => NewsletterError::MemberExists,
            "Invalid Resource" => NewsletterError::InvalidResource(problem.detail),
            _ => NewsletterError::Api {
                status: status.as_u16(),
                detail: problem.detail,
            },
        })
    }
}
