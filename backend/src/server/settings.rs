//! Application settings loaded via OrthoConfig.
//!
//! Every field can be set with a `--kebab-case` flag, a `TRACKER_*`
//! environment variable or a configuration file.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

use tracker_backend::domain::history::DEFAULT_MAX_PARTIAL_DIFFS;
use tracker_backend::domain::{Email, ServiceConfig};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SECRET_KEY_FILE: &str = "/var/run/secrets/tracker_key";
const DEFAULT_CANCEL_ACCOUNT_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;
const DEFAULT_PROJECT_TEMPLATE: &str = "scrum";

/// Settings that cannot be turned into a running configuration.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid bind address {value:?}: {source}")]
    BindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("invalid feedback email {value:?}")]
    FeedbackEmail { value: String },
    #[error("cancel account max age must be positive, got {0}")]
    CancelAccountMaxAge(i64),
}

/// Server and service settings.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "TRACKER")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; in-memory adapters are used when absent.
    pub database_url: Option<String>,
    /// Upper bound of the PostgreSQL connection pool.
    pub database_max_connections: Option<u32>,
    /// File holding at least 32 bytes of key material for cookies and tokens.
    pub secret_key_file: Option<PathBuf>,
    /// Mark the session cookie `Secure`.
    #[ortho_config(default = true)]
    pub cookie_secure: bool,
    /// Allow sign-ups without an invitation.
    #[ortho_config(default = false)]
    pub public_register_enabled: bool,
    /// Recipient of user feedback; feedback is disabled when absent.
    pub feedback_email: Option<String>,
    /// Lifetime of account cancellation tokens.
    pub cancel_account_max_age_secs: Option<i64>,
    /// Template applied to projects created without one.
    pub default_project_template: Option<String>,
    /// Partial history entries stored between two full snapshots.
    pub history_max_partial_diffs: Option<usize>,
}

impl AppSettings {
    /// Parse the configured bind address, falling back to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|source| SettingsError::BindAddr {
            value: raw.to_owned(),
            source,
        })
    }

    /// Path of the signing key, or the default location.
    pub fn secret_key_file(&self) -> PathBuf {
        self.secret_key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRET_KEY_FILE))
    }

    /// Slug of the template new projects use by default.
    pub fn default_project_template(&self) -> &str {
        self.default_project_template
            .as_deref()
            .unwrap_or(DEFAULT_PROJECT_TEMPLATE)
    }

    /// Translate the settings into the domain service configuration.
    pub fn service_config(&self) -> Result<ServiceConfig, SettingsError> {
        let feedback_email = self
            .feedback_email
            .as_deref()
            .map(|raw| {
                Email::new(raw).map_err(|_| SettingsError::FeedbackEmail {
                    value: raw.to_owned(),
                })
            })
            .transpose()?;
        let max_age = self
            .cancel_account_max_age_secs
            .unwrap_or(DEFAULT_CANCEL_ACCOUNT_MAX_AGE_SECS);
        if max_age <= 0 {
            return Err(SettingsError::CancelAccountMaxAge(max_age));
        }
        Ok(ServiceConfig {
            public_register_enabled: self.public_register_enabled,
            feedback_email,
            cancel_account_max_age: Duration::seconds(max_age),
            default_project_template: self.default_project_template().to_owned(),
            history_max_partial_diffs: self
                .history_max_partial_diffs
                .unwrap_or(DEFAULT_MAX_PARTIAL_DIFFS),
        })
    }
}
