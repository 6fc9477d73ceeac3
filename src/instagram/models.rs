//! Instagram media models

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

const FALLBACK_PERMALINK: &str = "https://instagram.com/laninabracelets";

/// One media item as the Graph API returns it and the feed renders it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstagramPost {
    pub id: String,
    /// `IMAGE`, `VIDEO` or `CAROUSEL_ALBUM`
    pub media_type: String,
    #[serde(default)]
    pub media_url: String,
    pub permalink: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// `GET /me/media` page; paging cursors are not followed
#[derive(Debug, Default, Deserialize)]
pub struct MediaPage {
    #[serde(default)]
    pub data: Vec<InstagramPost>,
}

fn fallback_post(id: &str, media_url: &str, caption: &str, timestamp: &str) -> InstagramPost {
    InstagramPost {
        id: id.to_string(),
        media_type: "IMAGE".to_string(),
        media_url: media_url.to_string(),
        permalink: FALLBACK_PERMALINK.to_string(),
        caption: Some(caption.to_string()),
        timestamp: timestamp.to_string(),
        thumbnail_url: None,
    }
}

/// Stand-in posts served while the API is unavailable, at most `limit`
pub fn fallback_posts(limit: usize, now: DateTime<Utc>) -> Vec<InstagramPost> {
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
    let posts = [
        fallback_post(
            "1",
            "https://images.unsplash.com/photo-1611591437281-460bfbe1220a?q=80&w=400&auto=format&fit=crop",
            "Nieuwe gouden armband collectie! ✨ #LaNinaBracelets #handmade",
            &timestamp,
        ),
        fallback_post(
            "2",
            "https://images.unsplash.com/photo-1535632066927-ab7c9ab60908?q=80&w=400&auto=format&fit=crop",
            "Behind the scenes: handgemaakt in Amsterdam 💎",
            &timestamp,
        ),
    ];
    posts.into_iter().take(limit).collect()
}
