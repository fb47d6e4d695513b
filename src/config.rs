//! Runtime configuration: gateway endpoint and optional advisory
//! credentials.
//!
//! The advisory feature is gated on two environment values; either one
//! missing simply disables the feature, it is never an error.

/// Environment variable holding the advisory service API key.
pub const ADVISOR_API_KEY_VAR: &str = "ADVISOR_API_KEY";

/// Environment variable holding the advisory service base URL.
pub const ADVISOR_BASE_URL_VAR: &str = "ADVISOR_BASE_URL";

/// Model requested from the advisory service.
pub const ADVISOR_MODEL: &str = "gpt-4";

/// Where the local gateway daemon listens.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl GatewayConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Credentials for the advisory service, present only when both
/// environment values are set.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

impl AdvisorConfig {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: ADVISOR_MODEL.to_string(),
        }
    }

    /// Reads the advisory credentials from the process environment.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let api_key = lookup(ADVISOR_API_KEY_VAR).filter(|v| !v.is_empty())?;
        let base_url = lookup(ADVISOR_BASE_URL_VAR).filter(|v| !v.is_empty())?;
        Some(Self::new(api_key, base_url))
    }
}
