//! Server configuration.
//!
//! Loaded from an optional TOML file, then overridden by `PORTAL__`
//! environment variables with `__` separating nested keys, e.g.
//! `PORTAL__AUTH__JWT_SECRET` or `PORTAL__DATABASE__URL`.

use std::net::SocketAddr;

use portal_auth::AuthConfig;
use portal_auth::config::MAX_SESSION_LIFETIME_SECS;
use portal_auth::session::SessionPolicy;
use portal_db::DbConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::envelope::CorsConfig;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub listen_addr: String,
    /// Default tracing directive; `RUST_LOG` takes precedence.
    pub log_filter: String,
    pub database: DbConfig,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    /// Require a staff session with `generate_invitation_codes` to
    /// issue invitation codes.
    pub protect_invitation_issuance: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            log_filter: "portal=info".into(),
            database: DbConfig::default(),
            auth: AuthConfig::default(),
            cors: CorsConfig::default(),
            protect_invitation_issuance: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ServerConfig {
    /// Load configuration from `path` (or `portal.toml` in the working
    /// directory when present) and the environment.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let builder = config::Config::builder();

        let builder = match path {
            Some(path) => builder.add_source(config::File::with_name(path)),
            None => builder.add_source(config::File::with_name("portal").required(false)),
        };

        let builder = builder.add_source(
            config::Environment::with_prefix("PORTAL")
                .separator("__")
                .try_parsing(true),
        );

        Self::build(builder)
    }

    /// Load configuration from TOML text alone.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        Self::build(
            config::Config::builder()
                .add_source(config::File::from_str(toml, config::FileFormat::Toml)),
        )
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let config = builder
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reject configurations the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid(format!("listen_addr: {e}")))?;

        if self.auth.session_policy == SessionPolicy::SignedClaims
            && self.auth.jwt_secret.is_empty()
        {
            return Err(ConfigError::Invalid(
                "auth.jwt_secret is required for signed session tokens".into(),
            ));
        }

        if self.auth.tiers.tier_names().is_empty() {
            return Err(ConfigError::Invalid(
                "auth.tiers must define at least one tier".into(),
            ));
        }

        for (key, secs) in [
            ("signed_token_lifetime_secs", self.auth.signed_token_lifetime_secs),
            (
                "persisted_session_lifetime_secs",
                self.auth.persisted_session_lifetime_secs,
            ),
        ] {
            if secs == 0 || secs > MAX_SESSION_LIFETIME_SECS {
                return Err(ConfigError::Invalid(format!(
                    "auth.{key} must be between 1 and {MAX_SESSION_LIFETIME_SECS}"
                )));
            }
        }

        if self.auth.invitation.code_length < 6 {
            return Err(ConfigError::Invalid(
                "auth.invitation.code_length must be at least 6".into(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.database.url, "mem://");
        assert_eq!(config.auth.signed_token_lifetime_secs, 86_400);
        assert!(!config.protect_invitation_issuance);
        // No secret configured yet.
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_overrides_nested_sections() {
        let config = ServerConfig::from_toml_str(
            r#"
            listen_addr = "127.0.0.1:9000"
            protect_invitation_issuance = true

            [database]
            url = "ws://localhost:8000"
            namespace = "shop"

            [auth]
            jwt_secret = "s3cret"
            session_policy = "persisted"
            require_client_verification = true

            [auth.redirects]
            staff = "/staff/home"

            [auth.tiers]
            supervisor = ["view_orders", "generate_invitation_codes"]

            [cors]
            allow_origin = "https://tienda.example"
            "#,
        )
        .unwrap();

        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        assert!(config.protect_invitation_issuance);
        assert_eq!(config.database.url, "ws://localhost:8000");
        assert_eq!(config.database.namespace, "shop");
        assert_eq!(config.database.database, "main");
        assert_eq!(config.auth.session_policy, SessionPolicy::Persisted);
        assert!(config.auth.require_client_verification);
        assert_eq!(config.auth.redirects.staff, "/staff/home");
        assert_eq!(config.auth.redirects.client, "/dashboard");
        assert!(config.auth.tiers.validate_tier("supervisor").is_ok());
        assert!(config.auth.tiers.validate_tier("admin").is_err());
        assert_eq!(config.cors.allow_origin, "https://tienda.example");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn persisted_policy_needs_no_secret() {
        let config =
            ServerConfig::from_toml_str("[auth]\nsession_policy = \"persisted\"\n").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn bad_listen_addr_is_invalid() {
        let config = ServerConfig::from_toml_str(
            "listen_addr = \"not an addr\"\n[auth]\njwt_secret = \"x\"\n",
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn session_lifetimes_are_bounded() {
        let too_long = ServerConfig::from_toml_str(
            "[auth]\njwt_secret = \"x\"\nsigned_token_lifetime_secs = 100000000000000000\n",
        )
        .unwrap();
        assert!(matches!(too_long.validate(), Err(ConfigError::Invalid(_))));

        let zero = ServerConfig::from_toml_str(
            "[auth]\njwt_secret = \"x\"\npersisted_session_lifetime_secs = 0\n",
        )
        .unwrap();
        assert!(matches!(zero.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn wrong_types_fail_to_parse() {
        assert!(matches!(
            ServerConfig::from_toml_str("[auth]\nstore_timeout_ms = \"soon\"\n"),
            Err(ConfigError::Parse(_))
        ));
    }
}
