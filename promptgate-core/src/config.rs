//! Process configuration, read once from the environment at startup.
//!
//! # Environment Variables
//!
//! | Variable | Used by | Default |
//! |----------|---------|---------|
//! | `PDP_URL` | pep | `http://aims:8080` |
//! | `PEP_URL` | gateway | `http://pep:8080` |
//! | `RAG_URL` | gateway (answer pipeline) | `http://rag:8080` |
//! | `AIMS_URL` | gateway (evidence store) | `http://aims:8080` |
//! | `VERSION` | all (health) | `dev` |
//! | `PROMPTGATE_PEP_TIMEOUT_SECS` | gateway | 10 |
//! | `PROMPTGATE_ANSWER_TIMEOUT_SECS` | gateway | 15 |
//! | `PROMPTGATE_EVIDENCE_TIMEOUT_SECS` | gateway | 5 |
//! | `PROMPTGATE_PDP_TIMEOUT_SECS` | pep | 10 |
//! | `PROMPTGATE_CONNECT_TIMEOUT_SECS` | all clients | 5 |
//! | `PROMPTGATE_SHUTDOWN_TIMEOUT_SECS` | all | 30 |
//!
//! Invalid timeouts log a warning and keep the default. Invalid base URLs are
//! a startup error.

use std::time::Duration;

use tracing::warn;

use crate::error::PromptGateError;

/// Default PDP base URL (the PDP is hosted by the aims service).
pub const DEFAULT_PDP_URL: &str = "http://aims:8080";
/// Default PEP base URL.
pub const DEFAULT_PEP_URL: &str = "http://pep:8080";
/// Default answer pipeline base URL.
pub const DEFAULT_RAG_URL: &str = "http://rag:8080";
/// Default evidence store base URL.
pub const DEFAULT_AIMS_URL: &str = "http://aims:8080";
/// Version reported by health endpoints when `VERSION` is unset.
pub const DEFAULT_VERSION: &str = "dev";

// ─────────────────────────────────────────────────────────────────────────────
// Timeouts
// ─────────────────────────────────────────────────────────────────────────────

/// Per-stage and process-wide time bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Gateway → PEP.
    pub pep: Duration,
    /// Gateway → answer pipeline.
    pub answer: Duration,
    /// Gateway → evidence store.
    pub evidence: Duration,
    /// PEP → PDP.
    pub pdp: Duration,
    /// TCP/TLS connect bound for every outbound client.
    pub connect: Duration,
    /// Bound on graceful drain at shutdown.
    pub shutdown: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            pep: Duration::from_secs(10),
            answer: Duration::from_secs(15),
            evidence: Duration::from_secs(5),
            pdp: Duration::from_secs(10),
            connect: Duration::from_secs(5),
            shutdown: Duration::from_secs(30),
        }
    }
}

impl Timeouts {
    /// Read timeouts from the environment.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            pep: secs_from_env("PROMPTGATE_PEP_TIMEOUT_SECS", default.pep),
            answer: secs_from_env("PROMPTGATE_ANSWER_TIMEOUT_SECS", default.answer),
            evidence: secs_from_env("PROMPTGATE_EVIDENCE_TIMEOUT_SECS", default.evidence),
            pdp: secs_from_env("PROMPTGATE_PDP_TIMEOUT_SECS", default.pdp),
            connect: secs_from_env("PROMPTGATE_CONNECT_TIMEOUT_SECS", default.connect),
            shutdown: secs_from_env("PROMPTGATE_SHUTDOWN_TIMEOUT_SECS", default.shutdown),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ServiceConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Downstream addresses and settings shared by all services.
///
/// Each service only reads the fields it needs; the rest are validated
/// anyway so a broken deployment fails at startup rather than on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// PDP base URL (no trailing slash).
    pub pdp_url: String,
    /// PEP base URL (no trailing slash).
    pub pep_url: String,
    /// Answer pipeline base URL (no trailing slash).
    pub rag_url: String,
    /// Evidence store base URL (no trailing slash).
    pub aims_url: String,
    /// Version string reported by health endpoints.
    pub version: String,
    /// Stage and process timeouts.
    pub timeouts: Timeouts,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pdp_url: DEFAULT_PDP_URL.to_string(),
            pep_url: DEFAULT_PEP_URL.to_string(),
            rag_url: DEFAULT_RAG_URL.to_string(),
            aims_url: DEFAULT_AIMS_URL.to_string(),
            version: DEFAULT_VERSION.to_string(),
            timeouts: Timeouts::default(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`PromptGateError::Config`] if a base URL is not an absolute
    /// `http`/`https` URL.
    pub fn from_env() -> Result<Self, PromptGateError> {
        Ok(Self {
            pdp_url: url_from_env("PDP_URL", DEFAULT_PDP_URL)?,
            pep_url: url_from_env("PEP_URL", DEFAULT_PEP_URL)?,
            rag_url: url_from_env("RAG_URL", DEFAULT_RAG_URL)?,
            aims_url: url_from_env("AIMS_URL", DEFAULT_AIMS_URL)?,
            version: std::env::var("VERSION").unwrap_or_else(|_| DEFAULT_VERSION.to_string()),
            timeouts: Timeouts::from_env(),
        })
    }
}

/// Validate a base URL and strip its trailing slash.
///
/// # Errors
///
/// Returns [`PromptGateError::Config`] naming `name` if the URL does not
/// parse, is not `http`/`https`, or has no host.
pub fn validate_base_url(name: &str, raw: &str) -> Result<String, PromptGateError> {
    let url = reqwest::Url::parse(raw).map_err(|e| PromptGateError::Config {
        details: format!("{name} must be an absolute URL, got '{raw}': {e}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(PromptGateError::Config {
            details: format!("{name} must use http or https, got '{raw}'"),
        });
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(PromptGateError::Config {
            details: format!("{name} has no host: '{raw}'"),
        });
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn url_from_env(name: &str, default: &str) -> Result<String, PromptGateError> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    validate_base_url(name, &raw)
}

/// Read a whole number of seconds; zero and unparsable values keep the default.
fn secs_from_env(name: &str, default: Duration) -> Duration {
    match parse_env_warn(name, default.as_secs()) {
        0 => {
            warn!(env_var = name, "Timeout must be positive, using default");
            default
        }
        secs => Duration::from_secs(secs),
    }
}

/// Parse an environment variable with a warning on invalid values.
fn parse_env_warn<T: std::str::FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(val) => match val.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    env_var = name,
                    value = %val,
                    default = %default,
                    "Invalid value for environment variable, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "PDP_URL",
        "PEP_URL",
        "RAG_URL",
        "AIMS_URL",
        "VERSION",
        "PROMPTGATE_PEP_TIMEOUT_SECS",
        "PROMPTGATE_ANSWER_TIMEOUT_SECS",
        "PROMPTGATE_EVIDENCE_TIMEOUT_SECS",
        "PROMPTGATE_PDP_TIMEOUT_SECS",
        "PROMPTGATE_CONNECT_TIMEOUT_SECS",
        "PROMPTGATE_SHUTDOWN_TIMEOUT_SECS",
    ];

    /// Saves and restores the variables it covers.
    struct EnvVarGuard {
        vars: Vec<(&'static str, Option<String>)>,
    }

    impl EnvVarGuard {
        fn new(names: &[&'static str]) -> Self {
            let vars = names
                .iter()
                .map(|&name| (name, std::env::var(name).ok()))
                .collect();
            for name in names {
                // SAFETY: guarded tests are #[serial]; no other thread reads these vars.
                unsafe { std::env::remove_var(name) };
            }
            Self { vars }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            for (name, original) in &self.vars {
                // SAFETY: guarded tests are #[serial]; no other thread reads these vars.
                unsafe {
                    match original {
                        Some(val) => std::env::set_var(name, val),
                        None => std::env::remove_var(name),
                    }
                }
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults_when_unset() {
        let _guard = EnvVarGuard::new(VARS);
        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.timeouts.pep, Duration::from_secs(10));
        assert_eq!(config.timeouts.answer, Duration::from_secs(15));
        assert_eq!(config.timeouts.evidence, Duration::from_secs(5));
    }

    #[test]
    #[serial]
    fn test_overrides() {
        let _guard = EnvVarGuard::new(VARS);
        // SAFETY: Test runs under #[serial].
        unsafe {
            std::env::set_var("PEP_URL", "http://localhost:9000/");
            std::env::set_var("VERSION", "1.4.2");
            std::env::set_var("PROMPTGATE_ANSWER_TIMEOUT_SECS", "30");
        }

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.pep_url, "http://localhost:9000");
        assert_eq!(config.version, "1.4.2");
        assert_eq!(config.timeouts.answer, Duration::from_secs(30));
    }

    #[test]
    #[serial]
    fn test_invalid_timeouts_fall_back() {
        let _guard = EnvVarGuard::new(VARS);
        // SAFETY: Test runs under #[serial].
        unsafe {
            std::env::set_var("PROMPTGATE_PEP_TIMEOUT_SECS", "soon");
            std::env::set_var("PROMPTGATE_EVIDENCE_TIMEOUT_SECS", "0");
        }

        let timeouts = Timeouts::from_env();
        assert_eq!(timeouts.pep, Duration::from_secs(10));
        assert_eq!(timeouts.evidence, Duration::from_secs(5));
    }

    #[test]
    #[serial]
    fn test_invalid_url_is_an_error() {
        let _guard = EnvVarGuard::new(VARS);
        // SAFETY: Test runs under #[serial].
        unsafe { std::env::set_var("RAG_URL", "rag:8080/answer") };
        match ServiceConfig::from_env() {
            Err(PromptGateError::Config { details }) => assert!(details.contains("RAG_URL")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_base_url() {
        assert_eq!(
            validate_base_url("X", "https://pdp.internal:8443/").unwrap(),
            "https://pdp.internal:8443"
        );
        assert!(validate_base_url("X", "not a url").is_err());
        assert!(validate_base_url("X", "ftp://files").is_err());
        assert!(validate_base_url("X", "").is_err());
    }
}
