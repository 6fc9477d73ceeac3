// Application configuration loaded from environment variables

use std::env;
use std::path::PathBuf;

use crate::oauth::models::REQUIRED_SCOPES;

const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_API_BASE: &str = "https://openapi.etsy.com/v3";
const DEFAULT_OAUTH_URL: &str = "https://www.etsy.com/oauth/connect";
const DEFAULT_TOKEN_URL: &str = "https://api.etsy.com/v3/public/oauth/token";
const DEFAULT_INSTAGRAM_API_BASE: &str = "https://graph.instagram.com";

/// Which token storage backend this deployment uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// JSON files on local disk (single long-running instance only)
    File,
    /// Signed and encrypted HTTP-only cookies
    Cookie,
    /// Shared Redis-compatible REST key-value store
    KeyValue,
}

impl StorageKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "file" | "fs" => Some(Self::File),
            "cookie" | "cookies" => Some(Self::Cookie),
            "kv" | "redis" | "upstash" => Some(Self::KeyValue),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Cookie => "cookie",
            Self::KeyValue => "kv",
        }
    }
}

/// Marketplace (Etsy Open API v3) endpoints and credentials
#[derive(Debug, Clone)]
pub struct MarketplaceConfig {
    /// API key, doubles as the OAuth client id
    pub api_key: Option<String>,
    pub shop_id: Option<String>,
    pub api_base: String,
    pub oauth_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    pub scopes: Vec<String>,
}

impl MarketplaceConfig {
    /// Build a config pointing every endpoint at `base`, used by tests against a mock server.
    #[cfg(test)]
    pub fn for_base_url(base: &str, site_url: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            api_key: Some("test-api-key".to_string()),
            shop_id: Some("12345678".to_string()),
            api_base: format!("{}/v3", base),
            oauth_url: format!("{}/oauth/connect", base),
            token_url: format!("{}/v3/public/oauth/token", base),
            redirect_uri: callback_uri(site_url),
            scopes: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.shop_id.is_some()
    }
}

/// Mailchimp audience the newsletter form subscribes into
#[derive(Debug, Clone, Default)]
pub struct NewsletterConfig {
    pub api_key: Option<String>,
    pub audience_id: Option<String>,
    /// Data center prefix such as `us21`, part of the API host
    pub server_prefix: Option<String>,
    /// Replaces `https://<prefix>.api.mailchimp.com/3.0` when set
    pub api_base: Option<String>,
}

impl NewsletterConfig {
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.audience_id.is_some() && self.server_prefix.is_some()
    }

    /// Members collection of the configured audience
    pub fn members_url(&self) -> Option<String> {
        let prefix = self.server_prefix.as_deref()?;
        let audience = self.audience_id.as_deref()?;
        let base = match self.api_base.as_deref() {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}.api.mailchimp.com/3.0", prefix),
        };
        Some(format!("{}/lists/{}/members", base, audience))
    }
}

/// Instagram Graph API access for the homepage feed
#[derive(Debug, Clone)]
pub struct InstagramConfig {
    pub access_token: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub kind: StorageKind,
    pub data_dir: PathBuf,
    pub cookie_secret: Option<String>,
    pub cookie_secure: bool,
    pub kv_url: Option<String>,
    pub kv_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub site_url: String,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub marketplace: MarketplaceConfig,
    pub storage: StorageConfig,
    pub newsletter: NewsletterConfig,
    pub instagram: InstagramConfig,
}

impl AppConfig {
    /// File storage in `data_dir` and every upstream API on `marketplace_base`
    #[cfg(test)]
    pub fn for_tests(data_dir: &std::path::Path, marketplace_base: &str) -> Self {
        let site_url = DEFAULT_SITE_URL.to_string();
        let base = marketplace_base.trim_end_matches('/');
        Self {
            port: 0,
            marketplace: MarketplaceConfig::for_base_url(marketplace_base, &site_url),
            site_url,
            environment: "test".to_string(),
            cors_origins: Vec::new(),
            storage: StorageConfig {
                kind: StorageKind::File,
                data_dir: data_dir.to_path_buf(),
                cookie_secret: None,
                cookie_secure: false,
                kv_url: None,
                kv_token: None,
            },
            newsletter: NewsletterConfig {
                api_key: Some("test-mailchimp-key".to_string()),
                audience_id: Some("test-audience".to_string()),
                server_prefix: Some("us1".to_string()),
                api_base: Some(format!("{}/mailchimp/3.0", base)),
            },
            instagram: InstagramConfig {
                access_token: Some("test-instagram-token".to_string()),
                api_base: format!("{}/instagram", base),
            },
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let site_url = non_empty_var("SITE_URL")
            .or_else(|| non_empty_var("NEXT_PUBLIC_SITE_URL"))
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(8080);

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| format!("{},http://localhost:3001", site_url))
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let marketplace = MarketplaceConfig {
            api_key: non_empty_var("ETSY_API_KEY"),
            shop_id: non_empty_var("ETSY_SHOP_ID"),
            api_base: non_empty_var("ETSY_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            oauth_url: non_empty_var("ETSY_OAUTH_URL")
                .unwrap_or_else(|| DEFAULT_OAUTH_URL.to_string()),
            token_url: non_empty_var("ETSY_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            redirect_uri: callback_uri(&site_url),
            scopes: REQUIRED_SCOPES.iter().map(|s| s.to_string()).collect(),
        };

        // TOKEN_STORAGE - file (default), cookie or kv
        let kind = non_empty_var("TOKEN_STORAGE")
            .and_then(|v| StorageKind::parse(&v))
            .unwrap_or(StorageKind::File);

        // COOKIE_SECURE - defaults to on in production
        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(environment == "production");

        let storage = StorageConfig {
            kind,
            data_dir: PathBuf::from(env::var("OAUTH_DATA_DIR").unwrap_or_else(|_| ".".to_string())),
            cookie_secret: non_empty_var("COOKIE_SECRET").or_else(|| non_empty_var("JWT_SECRET")),
            cookie_secure,
            kv_url: non_empty_var("KV_REST_API_URL")
                .or_else(|| non_empty_var("UPSTASH_REDIS_REST_URL")),
            kv_token: non_empty_var("KV_REST_API_TOKEN")
                .or_else(|| non_empty_var("UPSTASH_REDIS_REST_TOKEN")),
        };

        let newsletter = NewsletterConfig {
            api_key: non_empty_var("MAILCHIMP_API_KEY"),
            audience_id: non_empty_var("MAILCHIMP_AUDIENCE_ID"),
            server_prefix: non_empty_var("MAILCHIMP_SERVER_PREFIX"),
            api_base: non_empty_var("MAILCHIMP_API_BASE"),
        };

        let instagram = InstagramConfig {
            access_token: non_empty_var("INSTAGRAM_ACCESS_TOKEN"),
            api_base: non_empty_var("INSTAGRAM_API_BASE")
                .unwrap_or_else(|| DEFAULT_INSTAGRAM_API_BASE.to_string()),
        };

        Self {
            port,
            site_url,
            environment,
            cors_origins,
            marketplace,
            storage,
            newsletter,
            instagram,
        }
    }
}

/// The fixed OAuth callback location for a deployment
pub fn callback_uri(site_url: &str) -> String {
    format!("{}/api/admin/oauth/callback", site_url.trim_end_matches('/'))
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
