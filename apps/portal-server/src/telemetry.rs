//! Telemetry initialization.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::alert::{AdminAlertLayer, AlertReceiver};

const DEFAULT_FILTER: &str = "info,portal_server=debug,portal_infra=debug,portal_core=debug";

/// Telemetry configuration.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Enable JSON logging (for production).
    pub json_logs: bool,
    /// Service name recorded at startup and in admin error mail subjects.
    pub service_name: String,
    /// Capture ERROR events for mailing to `ADMINS`.
    pub admin_alerts: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            json_logs: false,
            service_name: "news-portal".to_string(),
            admin_alerts: false,
        }
    }
}

impl TelemetryConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            json_logs: std::env::var("LOG_FORMAT")
                .map(|v| v.to_lowercase() == "json")
                .unwrap_or(false),
            service_name: std::env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "news-portal".to_string()),
            admin_alerts: std::env::var("ADMINS")
                .map(|raw| !crate::config::address_list(&raw).is_empty())
                .unwrap_or(false),
        }
    }
}

/// Install the global subscriber. Call once, before anything logs.
///
/// Returns the captured ERROR events when admin alerts are on; hand them to
/// an [`AdminMailer`](crate::alert::AdminMailer) once mail is configured.
pub fn init_telemetry(config: &TelemetryConfig) -> Option<AlertReceiver> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (alert_layer, alerts) = if config.admin_alerts {
        let (layer, receiver) = AdminAlertLayer::new();
        (Some(layer), Some(receiver))
    } else {
        (None, None)
    };

    if config.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .with(alert_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .with(alert_layer)
            .init();
    }

    tracing::info!(
        service = %config.service_name,
        json_logs = config.json_logs,
        admin_alerts = config.admin_alerts,
        "Telemetry initialized"
    );
    alerts
}
