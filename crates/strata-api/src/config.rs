//! Server configuration.

use serde::{Deserialize, Serialize};

use strata_core::storage::StoreConfig;
use strata_core::{Error, Result};

/// Configuration for the Strata API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server port.
    pub http_port: u16,

    /// Enable debug mode.
    ///
    /// When enabled, the server falls back to an in-memory storage backend
    /// if no S3 endpoint is configured. Production requires an endpoint and
    /// credentials.
    pub debug: bool,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsConfig,

    /// Object storage connection settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 5000,
            debug: false,
            cors: CorsConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// CORS configuration for browser-based access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Use `["*"]` to allow all origins (development only).
    /// Empty list disables CORS entirely.
    pub allowed_origins: Vec<String>,

    /// Max age for preflight cache (seconds).
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_age_seconds: 3600,
        }
    }
}

/// Object storage connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// S3-compatible endpoint (e.g. `http://127.0.0.1:9000` for MinIO).
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Region; defaults to `us-east-1`.
    #[serde(default)]
    pub region: Option<String>,
    /// Access key id.
    #[serde(default)]
    pub access_key_id: Option<String>,
    /// Secret access key.
    #[serde(default)]
    pub secret_access_key: Option<String>,
    /// Allow plain-HTTP endpoints (local MinIO).
    #[serde(default)]
    pub allow_http: bool,
}

impl StorageConfig {
    /// Returns true when an S3 endpoint or credentials are configured.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() || self.access_key_id.is_some()
    }

    /// Converts to the core store configuration.
    #[must_use]
    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            endpoint: self.endpoint.clone(),
            region: self.region.clone(),
            access_key_id: self.access_key_id.clone(),
            secret_access_key: self.secret_access_key.clone(),
            allow_http: self.allow_http,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Supported env vars:
    /// - `STRATA_HTTP_PORT`
    /// - `STRATA_DEBUG`
    /// - `STRATA_CORS_ALLOWED_ORIGINS` (comma-separated, or `*`)
    /// - `STRATA_CORS_MAX_AGE_SECONDS`
    /// - `STRATA_S3_ENDPOINT`
    /// - `STRATA_S3_REGION`
    /// - `STRATA_S3_ACCESS_KEY_ID`
    /// - `STRATA_S3_SECRET_ACCESS_KEY`
    /// - `STRATA_S3_ALLOW_HTTP`
    ///
    /// # Errors
    ///
    /// Returns an error if any environment variable is present but cannot be
    /// parsed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = env_u16("STRATA_HTTP_PORT")? {
            config.http_port = port;
        }
        if let Some(debug) = env_bool("STRATA_DEBUG")? {
            config.debug = debug;
        }

        if let Some(origins) = env_string("STRATA_CORS_ALLOWED_ORIGINS") {
            config.cors.allowed_origins = parse_cors_allowed_origins(&origins);
        }
        if let Some(max_age) = env_u64("STRATA_CORS_MAX_AGE_SECONDS")? {
            config.cors.max_age_seconds = max_age;
        }

        config.storage.endpoint = env_string("STRATA_S3_ENDPOINT");
        config.storage.region = env_string("STRATA_S3_REGION");
        config.storage.access_key_id = env_string("STRATA_S3_ACCESS_KEY_ID");
        config.storage.secret_access_key = env_string("STRATA_S3_SECRET_ACCESS_KEY");
        if let Some(allow_http) = env_bool("STRATA_S3_ALLOW_HTTP")? {
            config.storage.allow_http = allow_http;
        }

        if !config.debug && !config.storage.is_configured() {
            return Err(Error::validation(
                "STRATA_S3_ENDPOINT is required when STRATA_DEBUG=false",
            ));
        }

        Ok(config)
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_u16(name: &str) -> Result<Option<u16>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u16>()
        .map(Some)
        .map_err(|e| Error::validation(format!("{name} must be a u16: {e}")))
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    v.parse::<u64>()
        .map(Some)
        .map_err(|e| Error::validation(format!("{name} must be a u64: {e}")))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    let value = value.trim().to_ascii_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "y" => Ok(true),
        "false" | "0" | "no" | "n" => Ok(false),
        _ => Err(Error::validation(format!(
            "{name} must be a boolean (true/false/1/0)"
        ))),
    }
}

fn env_bool(name: &str) -> Result<Option<bool>> {
    let Some(v) = env_string(name) else {
        return Ok(None);
    };
    parse_bool(name, &v).map(Some)
}

fn parse_cors_allowed_origins(value: &str) -> Vec<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed == "*" {
        return vec!["*".to_string()];
    }

    trimmed
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("TEST", "true").unwrap());
        assert!(parse_bool("TEST", "1").unwrap());
        assert!(!parse_bool("TEST", "FALSE").unwrap());
        assert!(!parse_bool("TEST", "no").unwrap());
        assert!(parse_bool("TEST", "maybe").is_err());
    }

    #[test]
    fn cors_origins_parse_wildcard_and_lists() {
        assert_eq!(parse_cors_allowed_origins("*"), vec!["*"]);
        assert_eq!(
            parse_cors_allowed_origins("http://a.test, http://b.test"),
            vec!["http://a.test", "http://b.test"]
        );
        assert!(parse_cors_allowed_origins("  ").is_empty());
    }

    #[test]
    fn storage_config_reports_configured_state() {
        let mut storage = StorageConfig::default();
        assert!(!storage.is_configured());
        storage.endpoint = Some("http://127.0.0.1:9000".to_string());
        assert!(storage.is_configured());
    }
}
