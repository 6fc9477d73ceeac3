//! Newsletter request/response models

use serde::{Deserialize, Serialize};

/// Body of `POST /api/newsletter`
#[derive(Debug, Default, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Outcome shown to the visitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeResult {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubscribeResult {
    pub fn subscribed() -> Self {
        Self {
            success: true,
            message: "Bedankt! Check je inbox om je inschrijving te bevestigen. 📧".to_string(),
            error: None,
        }
    }

    pub fn failed(message: &str, error: Option<String>) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            error,
        }
    }
}

/// New audience member; `pending` makes Mailchimp send the confirmation mail
#[derive(Debug, Serialize)]
pub struct MemberRequest<'a> {
    pub email_address: &'a str,
    pub status: &'static str,
    pub tags: [&'static str; 2],
    pub merge_fields: serde_json::Map<String, serde_json::Value>,
}

impl<'a> MemberRequest<'a> {
    pub fn pending(email_address: &'a str) -> Self {
        Self {
            email_address,
            status: "pending",
            tags: ["Website", "Homepage"],
            merge_fields: serde_json::Map::new(),
        }
    }
}

/// Mailchimp problem-detail error body
#[derive(Debug, Default, Deserialize)]
pub struct MailchimpProblem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: String,
}
