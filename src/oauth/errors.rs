//! OAuth errors and the operator-facing error taxonomy

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("ETSY_API_KEY not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Token exchange failed: HTTP {status}: {body}")]
    ExchangeFailed { status: u16, body: String },

    #[error("Token refresh failed: HTTP {status}: {body}")]
    RefreshFailed { status: u16, body: String },

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid token response: {0}")]
    InvalidGrant(String),
}

/// Why an authorization attempt ended on the error page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthErrorKind {
    AccessDenied,
    InvalidRequest,
    InvalidState,
    MissingParameters,
    TokenExchangeFailed,
    Unknown,
}

impl OAuthErrorKind {
    pub fn from_code(code: &str) -> Self {
        match code {
            "access_denied" => Self::AccessDenied,
            "invalid_request" => Self::InvalidRequest,
            "invalid_state" => Self::InvalidState,
            "missing_parameters" => Self::MissingParameters,
            "token_exchange_failed" => Self::TokenExchangeFailed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "access_denied",
            Self::InvalidRequest => "invalid_request",
            Self::InvalidState => "invalid_state",
            Self::MissingParameters => "missing_parameters",
            Self::TokenExchangeFailed => "token_exchange_failed",
            Self::Unknown => "unknown",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::AccessDenied => "Access Denied",
            Self::InvalidRequest => "Invalid Request",
            Self::InvalidState => "Security Check Failed",
            Self::MissingParameters => "Missing Parameters",
            Self::TokenExchangeFailed => "Token Exchange Failed",
            Self::Unknown => "Unknown Error",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::AccessDenied => "The authorization request was cancelled on Etsy.",
            Self::InvalidRequest => "The OAuth configuration contains an error.",
            Self::InvalidState => "The state check failed (possible CSRF or an expired attempt).",
            Self::MissingParameters => "Etsy did not send back all required parameters.",
            Self::TokenExchangeFailed => "Exchanging the authorization code for tokens failed.",
            Self::Unknown => "An unexpected error occurred.",
        }
    }

    pub fn remedy(&self) -> &'static str {
        match self {
            Self::AccessDenied => "Start again and grant the application access.",
            Self::InvalidRequest => "Check that all API settings are correct.",
            Self::InvalidState => {
                "Start again within 15 minutes. If it keeps happening, clear the browser cookies."
            }
            Self::MissingParameters => "Restart the OAuth flow.",
            Self::TokenExchangeFailed => "Check that the API key and redirect URL are configured correctly.",
            Self::Unknown => "Try again. If the problem persists, check the server logs.",
        }
    }
}

/// Terminal failure of a callback, rendered as `?error=<kind>&description=<text>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackFailure {
    pub kind: OAuthErrorKind,
    pub description: Option<String>,
}

impl CallbackFailure {
    pub fn new(kind: OAuthErrorKind) -> Self {
        Self {
            kind,
            description: None,
        }
    }

    pub fn with_description(kind: OAuthErrorKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: Some(description.into()),
        }
    }

    /// Location of the admin error page for this failure
    pub fn error_page_location(&self) -> String {
        let mut location = format!("/admin/oauth/error?error={}", self.kind.as_str());
        if let Some(description) = &self.description {
            location.push_str("&description=");
            location.push_str(&urlencoding::encode(description));
        }
        location
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for kind in [
            OAuthErrorKind::AccessDenied,
            OAuthErrorKind::InvalidRequest,
            OAuthErrorKind::InvalidState,
            OAuthErrorKind::MissingParameters,
            OAuthErrorKind::TokenExchangeFailed,
            OAuthErrorKind::Unknown,
        ] {
            assert_eq!(OAuthErrorKind::from_code(kind.as_str()), kind);
            assert!(!kind.title().is_empty());
            assert!(!kind.remedy().is_empty());
        }
        assert_eq!(OAuthErrorKind::from_code("server_error"), OAuthErrorKind::Unknown);
    }

    #[test]
    fn test_error_page_location_encodes_description() {
        let failure = CallbackFailure::with_description(
            OAuthErrorKind::TokenExchangeFailed,
            "HTTP 400: bad code",
        );
        assert_eq!(
            failure.error_page_location(),
            "/admin/oauth/error?error=token_exchange_failed&description=HTTP%20400%3A%20bad%20code"
        );
        assert_eq!(
            CallbackFailure::new(OAuthErrorKind::InvalidState).error_page_location(),
            "/admin/oauth/error?error=invalid_state"
        );
    }
}
