//! Runtime configuration.
//!
//! Values are resolved with precedence: explicit flag, then environment
//! variable, then default.

use std::time::Duration;

use crate::error::{Result, TrackerError};
use crate::models::{Identity, Role};

pub const ENV_SERVER_URL: &str = "TG_SERVER_URL";
pub const ENV_USER_ID: &str = "TG_USER_ID";
pub const ENV_USER_ROLE: &str = "TG_USER_ROLE";
pub const ENV_TIMEOUT_SECS: &str = "TG_TIMEOUT_SECS";
pub const ENV_BIND: &str = "TG_BIND";

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_url: String,
    pub user_id: i64,
    pub role: Role,
    pub timeout: Duration,
}

/// Values supplied on the command line, if any
#[derive(Debug, Clone, Default)]
pub struct ClientOverrides {
    pub server_url: Option<String>,
    pub user_id: Option<i64>,
    pub role: Option<Role>,
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    pub fn resolve(overrides: ClientOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary variable lookup
    pub fn resolve_with<F>(overrides: ClientOverrides, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server_url = overrides
            .server_url
            .or_else(|| lookup(ENV_SERVER_URL))
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        let user_id = match overrides.user_id {
            Some(id) => id,
            None => {
                let raw = lookup(ENV_USER_ID).ok_or_else(|| {
                    TrackerError::InvalidInput(format!(
                        "No user id given. Pass --user-id or set {}",
                        ENV_USER_ID
                    ))
                })?;
                raw.trim().parse().map_err(|_| {
                    TrackerError::InvalidInput(format!("{} must be an integer, got '{}'", ENV_USER_ID, raw))
                })?
            },
        };

        let role = match overrides.role {
            Some(role) => role,
            None => match lookup(ENV_USER_ROLE) {
                Some(raw) => raw.parse()?,
                None => Role::Developer,
            },
        };

        let timeout_secs = match overrides.timeout_secs {
            Some(secs) => secs,
            None => match lookup(ENV_TIMEOUT_SECS) {
                Some(raw) => raw.trim().parse().map_err(|_| {
                    TrackerError::InvalidInput(format!(
                        "{} must be a number of seconds, got '{}'",
                        ENV_TIMEOUT_SECS, raw
                    ))
                })?,
                None => DEFAULT_TIMEOUT_SECS,
            },
        };

        Ok(Self {
            server_url,
            user_id,
            role,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn identity(&self) -> Identity {
        Identity::new(self.user_id, self.role)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    /// Username of an admin account created at startup
    pub seed_admin: Option<String>,
}

impl ServerConfig {
    pub fn resolve(bind: Option<String>, seed_admin: Option<String>) -> Self {
        Self {
            bind: bind
                .or_else(|| std::env::var(ENV_BIND).ok())
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            seed_admin,
        }
    }
}
