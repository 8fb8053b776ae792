//! Application configuration
//!
//! Everything is read from the environment once at startup, components get handed the parts they
//! need from the resulting [`Config`](Config)

use std::env::var;
use std::net::SocketAddr;

use anyhow::Result;

const DEFAULT_ADDRESS: &str = "0.0.0.0:8000";

/// Deployment environment
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    /// Local development, cookies are not marked as secure
    Development,

    /// Anything else
    Production,
}

impl Environment {
    /// Parse the `STATUS` value
    fn from_status(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "dev" | "development" => Self::Development,
            _ => Self::Production,
        }
    }
}

/// Configuration for the whole application
#[derive(Clone, Debug)]
pub struct Config {
    /// Address to listen on
    pub address: SocketAddr,

    /// Secret used to sign session tokens
    pub jwt_secret: String,

    /// Deployment environment
    pub environment: Environment,

    /// Postgres connection string, the in-memory storage is used without one
    pub database_url: Option<String>,
}

impl Config {
    /// Build the configuration from environment variables
    ///
    /// # Errors
    ///
    /// Will return `Err` when `ADDRESS` or `PORT` can not be parsed
    pub fn from_env() -> Result<Self> {
        let mut address =
            env_var_or_else("ADDRESS", || String::from(DEFAULT_ADDRESS)).parse::<SocketAddr>()?;

        // optional override of just the port
        if let Some(port) = non_empty_env_var("PORT") {
            address.set_port(port.parse::<u16>()?);
        }

        let jwt_secret = env_var_or_else("JWT_SECRET", || {
            let jwt_secret = crate::password::generate();
            tracing::info!("`JWT_SECRET` is not set, generating temporary one: {jwt_secret}");
            jwt_secret
        });

        let environment = non_empty_env_var("STATUS")
            .map_or(Environment::Production, |status| {
                Environment::from_status(&status)
            });

        Ok(Self {
            address,
            jwt_secret,
            environment,
            database_url: non_empty_env_var("DATABASE_URL"),
        })
    }

    /// Should cookies only be sent over HTTPS?
    pub fn secure_cookies(&self) -> bool {
        self.environment != Environment::Development
    }
}

/// Get the value of ENV var, but only when it is set and not empty
fn non_empty_env_var(var_name: &'static str) -> Option<String> {
    var(var_name).ok().filter(|value| !value.is_empty())
}

/// Get the value of ENV var, or a default
fn env_var_or_else(var_name: &'static str, or_else: fn() -> String) -> String {
    non_empty_env_var(var_name).unwrap_or_else(or_else)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_from_status() {
        assert_eq!(Environment::Development, Environment::from_status("dev"));
        assert_eq!(Environment::Development, Environment::from_status(" Development "));
        assert_eq!(Environment::Production, Environment::from_status("prod"));
        assert_eq!(Environment::Production, Environment::from_status(""));
    }

    #[test]
    fn test_secure_cookies() {
        let mut config = Config {
            address: DEFAULT_ADDRESS.parse().unwrap(),
            jwt_secret: "verysecret".to_string(),
            environment: Environment::Development,
            database_url: None,
        };
        assert!(!config.secure_cookies());

        config.environment = Environment::Production;
        assert!(config.secure_cookies());
    }
}
