//! Environment-driven configuration for both services.
//!
//! Every loader takes a lookup function so tests never touch the process
//! environment; `from_env` wires it to `std::env::var`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::adapters::model_store::ModelSource;
use crate::adapters::openmeteo::{DEFAULT_FORECAST_URL, DEFAULT_TIMEZONE};

pub const DEFAULT_BACKEND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_AI_SERVICE_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_MODEL_PATH: &str = "app/model/flood_model_v1.json";
pub const DEFAULT_EE_API_BASE: &str = "https://earthengine.googleapis.com/v1";

/// Docker secret consulted when `EE_ACCESS_TOKEN_FILE` is unset.
const DOCKER_SECRET_TOKEN: &str = "/run/secrets/ee_access_token";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("Failed to read token file {path:?}: {source}")]
    TokenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No Earth Engine access token: set EE_ACCESS_TOKEN_FILE or mount /run/secrets/ee_access_token")]
    NoToken,
}

/// OAuth access token for Earth Engine.
///
/// Wiped from memory on drop and never printed.
#[derive(Clone)]
pub struct AccessToken(Zeroizing<String>);

impl AccessToken {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self(Zeroizing::new(token))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

#[derive(Debug, Clone)]
pub struct EarthEngineConfig {
    pub api_base: String,
    pub project: String,
    pub token: AccessToken,
}

/// Which provider supplies the precipitation features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrecipitationProvider {
    #[default]
    OpenMeteo,
    Chirps,
}

impl PrecipitationProvider {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "open-meteo" | "openmeteo" => Ok(Self::OpenMeteo),
            "chirps" => Ok(Self::Chirps),
            other => Err(ConfigError::Invalid {
                name: "PRECIP_SOURCE",
                reason: format!("unknown source {other:?} (expected open-meteo or chirps)"),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub listen_addr: SocketAddr,
    /// Full URL of the inference service's predict endpoint.
    pub ai_service_url: String,
    pub earth_engine: EarthEngineConfig,
    pub precipitation: PrecipitationProvider,
    pub open_meteo_url: String,
    pub precipitation_timezone: String,
}

impl BackendConfig {
    /// # Errors
    /// Returns error if a required variable is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// # Errors
    /// Returns error if a required variable is missing or malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::from_lookup_with_secret(lookup, Path::new(DOCKER_SECRET_TOKEN))
    }

    pub(crate) fn from_lookup_with_secret(
        lookup: impl Fn(&str) -> Option<String>,
        docker_secret: &Path,
    ) -> Result<Self, ConfigError> {
        let project = non_empty(&lookup, "PROJECT_ID").ok_or(ConfigError::Missing("PROJECT_ID"))?;
        let ai_service_url =
            non_empty(&lookup, "AI_SERVICE_URL").ok_or(ConfigError::Missing("AI_SERVICE_URL"))?;
        if !(ai_service_url.starts_with("http://") || ai_service_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: "AI_SERVICE_URL",
                reason: "must be an http(s) URL".into(),
            });
        }

        let precipitation = non_empty(&lookup, "PRECIP_SOURCE")
            .map(|v| PrecipitationProvider::parse(&v))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            listen_addr: socket_addr(&lookup, "BACKEND_ADDR", DEFAULT_BACKEND_ADDR)?,
            ai_service_url,
            earth_engine: EarthEngineConfig {
                api_base: non_empty(&lookup, "EE_API_BASE")
                    .unwrap_or_else(|| DEFAULT_EE_API_BASE.to_string()),
                project,
                token: resolve_token(&lookup, docker_secret)?,
            },
            precipitation,
            open_meteo_url: non_empty(&lookup, "OPEN_METEO_URL")
                .unwrap_or_else(|| DEFAULT_FORECAST_URL.to_string()),
            precipitation_timezone: non_empty(&lookup, "PRECIP_TIMEZONE")
                .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub listen_addr: SocketAddr,
    pub model: ModelSource,
}

impl InferenceConfig {
    /// # Errors
    /// Returns error if a variable is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// # Errors
    /// Returns error if a variable is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let sha256 = non_empty(&lookup, "MODEL_SHA256");
        if let Some(digest) = &sha256 {
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ConfigError::Invalid {
                    name: "MODEL_SHA256",
                    reason: "expected 64 hex characters".into(),
                });
            }
        }

        Ok(Self {
            listen_addr: socket_addr(&lookup, "AI_SERVICE_ADDR", DEFAULT_AI_SERVICE_ADDR)?,
            model: ModelSource {
                local_path: PathBuf::from(
                    non_empty(&lookup, "MODEL_PATH").unwrap_or_else(|| DEFAULT_MODEL_PATH.into()),
                ),
                remote_url: non_empty(&lookup, "MODEL_URL"),
                sha256,
            },
        })
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn socket_addr(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: &str,
) -> Result<SocketAddr, ConfigError> {
    let raw = non_empty(lookup, name).unwrap_or_else(|| default.to_string());
    raw.parse().map_err(|e| ConfigError::Invalid {
        name,
        reason: format!("{raw:?}: {e}"),
    })
}

fn read_token_file(path: &Path) -> Result<AccessToken, ConfigError> {
    let raw = Zeroizing::new(std::fs::read_to_string(path).map_err(|source| {
        ConfigError::TokenFile {
            path: path.to_path_buf(),
            source,
        }
    })?);
    let token = raw.trim();
    if token.is_empty() {
        return Err(ConfigError::Invalid {
            name: "EE_ACCESS_TOKEN_FILE",
            reason: format!("{path:?} is empty"),
        });
    }
    Ok(AccessToken::new(token.to_string()))
}

/// Token precedence: `EE_ACCESS_TOKEN_FILE`, the Docker secret, then (debug
/// builds only) `EE_ACCESS_TOKEN`.
fn resolve_token(
    lookup: &impl Fn(&str) -> Option<String>,
    docker_secret: &Path,
) -> Result<AccessToken, ConfigError> {
    if let Some(path) = non_empty(lookup, "EE_ACCESS_TOKEN_FILE") {
        return read_token_file(Path::new(&path));
    }
    if docker_secret.exists() {
        return read_token_file(docker_secret);
    }
    if cfg!(debug_assertions) {
        if let Some(token) = non_empty(lookup, "EE_ACCESS_TOKEN") {
            tracing::warn!("Using EE_ACCESS_TOKEN from the environment (debug build)");
            return Ok(AccessToken::new(token));
        }
    }
    Err(ConfigError::NoToken)
}
