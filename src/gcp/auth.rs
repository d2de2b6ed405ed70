//! GCP Authentication
//!
//! Access tokens come from Application Default Credentials or a fixed
//! token; default project and zone are read from the gcloud configuration.

use anyhow::{Context, Result};
use gcp_auth::TokenProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default scopes for GCP API access
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Refresh tokens this much before they actually expire
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Token TTL when expiry can't be determined
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

/// Where access tokens come from
#[derive(Clone)]
enum TokenSource {
    /// Application Default Credentials
    Provider(Arc<dyn TokenProvider>),
    /// A pre-issued token, e.g. from `GCP_ACCESS_TOKEN`
    Static(String),
}

/// GCP credentials holder with token caching
#[derive(Clone)]
pub struct GcpCredentials {
    source: TokenSource,
    token_cache: Arc<RwLock<Option<CachedToken>>>,
}

#[derive(Clone)]
struct CachedToken {
    token: String,
    /// Expiry with the buffer already applied
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

impl GcpCredentials {
    /// Create new GCP credentials using Application Default Credentials
    pub async fn new() -> Result<Self> {
        let provider = gcp_auth::provider().await.context(
            "Failed to initialize GCP authentication. Run 'gcloud auth application-default login'",
        )?;
        Ok(Self::from_provider(provider))
    }

    /// Credentials backed by any `gcp_auth` token provider
    pub fn from_provider(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            source: TokenSource::Provider(provider),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Credentials that always present `token`
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Static(token.into()),
            token_cache: Arc::new(RwLock::new(None)),
        }
    }

    /// Get an access token for API calls
    pub async fn get_token(&self) -> Result<String> {
        let provider = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Provider(provider) => provider,
        };

        {
            let cache = self.token_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.token.clone());
                }
                tracing::debug!("Cached token expired, fetching new token");
            }
        }

        let token = provider
            .token(DEFAULT_SCOPES)
            .await
            .context("Failed to get access token")?;
        let token_str = token.as_str().to_string();

        let expires_at = Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;
        {
            let mut cache = self.token_cache.write().await;
            *cache = Some(CachedToken {
                token: token_str.clone(),
                expires_at,
            });
        }

        tracing::debug!(
            "New token cached, expires in ~{} minutes",
            (DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER).as_secs() / 60
        );

        Ok(token_str)
    }

    /// Whether [`refresh_token`](Self::refresh_token) can yield a different token
    pub fn can_refresh(&self) -> bool {
        matches!(self.source, TokenSource::Provider(_))
    }

    /// Drop the cached token and fetch a fresh one
    pub async fn refresh_token(&self) -> Result<String> {
        {
            let mut cache = self.token_cache.write().await;
            *cache = None;
        }
        self.get_token().await
    }
}

/// Get the gcloud configuration directory
pub fn get_gcloud_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Project IDs are 6-30 characters of lowercase letters, digits and
/// hyphens, start with a letter and don't end with a hyphen
fn validate_project_id(project: &str) -> bool {
    (6..=30).contains(&project.len())
        && project.starts_with(|c: char| c.is_ascii_lowercase())
        && !project.ends_with('-')
        && project
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Value of `key` under `[section]` in gcloud INI-style properties.
/// Lines before the first section header count as `[core]`.
fn ini_value(content: &str, section: &str, key: &str) -> Option<String> {
    let mut current = "core";
    for line in content.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            current = name.trim();
            continue;
        }
        if current != section {
            continue;
        }
        if let Some((k, v)) = line.split_once('=') {
            if k.trim() == key {
                return Some(v.trim().to_string());
            }
        }
    }
    None
}

/// Contents of the gcloud properties files, most specific first: the
/// active named configuration, then the legacy `properties` file
fn gcloud_properties() -> Vec<String> {
    let Some(config_dir) = get_gcloud_config_dir() else {
        return Vec::new();
    };
    let mut files = Vec::new();

    if let Ok(active) = std::fs::read_to_string(config_dir.join("active_config")) {
        let name = active.trim();
        // Config names become file names
        if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            let path = config_dir.join("configurations").join(format!("config_{}", name));
            if let Ok(content) = std::fs::read_to_string(path) {
                files.push(content);
            }
        } else {
            tracing::warn!("Invalid characters in active_config name");
        }
    }
    if let Ok(content) = std::fs::read_to_string(config_dir.join("properties")) {
        files.push(content);
    }
    files
}

/// Read the default project from the environment or gcloud configuration
pub fn get_default_project() -> Option<String> {
    for var in ["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"] {
        if let Ok(project) = std::env::var(var) {
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }

    gcloud_properties()
        .iter()
        .filter_map(|content| ini_value(content, "core", "project"))
        .find(|project| validate_project_id(project))
}

/// Get the default zone from the environment or gcloud configuration
pub fn get_default_zone() -> Option<String> {
    if let Ok(zone) = std::env::var("CLOUDSDK_COMPUTE_ZONE") {
        return Some(zone);
    }
    gcloud_properties()
        .iter()
        .find_map(|content| ini_value(content, "compute", "zone"))
}
