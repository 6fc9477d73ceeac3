// Error reporting with Sentry, configured from the environment
use std::env;
use tracing::info;

#[derive(Debug, Clone)]
pub struct MonitoringConfig {
    pub sentry_dsn: Option<String>,
    pub environment: String,
    pub enable_performance_monitoring: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            sentry_dsn: None,
            environment: "development".to_string(),
            enable_performance_monitoring: false,
        }
    }
}

impl MonitoringConfig {
    /// `SENTRY_DSN`, `ENVIRONMENT`, `SENTRY_TRACES` (true/false)
    pub fn from_env() -> Self {
        Self {
            sentry_dsn: env::var("SENTRY_DSN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            enable_performance_monitoring: env::var("SENTRY_TRACES")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),
        }
    }

    pub fn traces_sample_rate(&self) -> f32 {
        if self.enable_performance_monitoring {
            0.1
        } else {
            0.0
        }
    }
}

/// Keeps the Sentry client alive; events are flushed when this is dropped
pub struct MonitoringService {
    sentry_guard: Option<sentry::ClientInitGuard>,
}

impl MonitoringService {
    /// Initialise Sentry when a DSN is configured, otherwise a no-op
    pub fn init(config: &MonitoringConfig) -> Self {
        let Some(dsn) = config.sentry_dsn.as_deref() else {
            info!("Sentry DSN not configured, error reporting disabled");
            return Self { sentry_guard: None };
        };

        let guard = sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.environment.clone().into()),
                traces_sample_rate: config.traces_sample_rate(),
                ..Default::default()
            },
        ));

        info!(environment = %config.environment, "Sentry initialized");
        Self {
            sentry_guard: Some(guard),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sentry_guard
            .as_ref()
            .map(|guard| guard.is_enabled())
            .unwrap_or(false)
    }
}

impl Drop for MonitoringService {
    fn drop(&mut self) {
        if self.sentry_guard.is_some() {
            info!("Shutting down Sentry");
        }
    }
}
