//! Configuration Management
//!
//! Persistent configuration for gcp-graph, stored as YAML under the user's
//! config directory.

use crate::adapter::{AdapterOptions, DEFAULT_MAX_CONCURRENCY};
use crate::cache::DEFAULT_CACHE_TTL;
use crate::scope::{region_of_zone, Scope};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Primary project ID
    #[serde(default)]
    pub project_id: Option<String>,
    /// Additional projects to discover
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL.as_secs()
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_use_cache() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project_id: None,
            projects: Vec::new(),
            regions: Vec::new(),
            zones: Vec::new(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_concurrency: default_max_concurrency(),
            use_cache: default_use_cache(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcp-graph").join("config.yaml"))
    }

    /// Load configuration from disk, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file: {:#}", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Get effective project (CLI > config > gcloud default)
    pub fn effective_project(&self) -> Option<String> {
        self.project_id
            .clone()
            .or_else(crate::gcp::auth::get_default_project)
    }

    /// Configured zones, or the gcloud default zone
    pub fn effective_zones(&self) -> Vec<String> {
        if !self.zones.is_empty() {
            return self.zones.clone();
        }
        crate::gcp::auth::get_default_zone().into_iter().collect()
    }

    /// Scopes to discover: for every project its global scope, each
    /// configured region and each zone (plus the zones' regions)
    pub fn scopes(&self) -> Vec<Scope> {
        self.scopes_for(&self.all_projects(), &self.effective_zones())
    }

    fn all_projects(&self) -> Vec<String> {
        let mut projects: Vec<String> = self.effective_project().into_iter().collect();
        for project in &self.projects {
            if !projects.contains(project) {
                projects.push(project.clone());
            }
        }
        projects
    }

    /// Entries that don't parse as the expected kind of scope are skipped
    /// with a warning
    fn scopes_for(&self, projects: &[String], zones: &[String]) -> Vec<Scope> {
        let mut scopes = Vec::new();
        for project in projects {
            match Scope::parse(project) {
                Ok(scope) if scope.is_global() => scopes.push(scope),
                _ => {
                    tracing::warn!("Skipping invalid project id '{}'", project);
                    continue;
                }
            }

            let zonal: Vec<Scope> = zones
                .iter()
                .filter_map(|z| located(project, z, Scope::is_zonal, "zone"))
                .collect();
            let mut regional: Vec<Scope> = self
                .regions
                .iter()
                .filter_map(|r| located(project, r, Scope::is_regional, "region"))
                .collect();
            for zone in zonal.iter().filter_map(Scope::location) {
                let region = Scope::regional(project.as_str(), region_of_zone(zone));
                if !regional.contains(&region) {
                    regional.push(region);
                }
            }

            scopes.extend(regional);
            scopes.extend(zonal);
        }
        scopes
    }

    pub fn adapter_options(&self, cancel: CancellationToken) -> AdapterOptions {
        AdapterOptions {
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            max_concurrency: self.max_concurrency.max(1),
            use_cache: self.use_cache,
            cancel,
        }
    }
}

/// `project.location` if it parses as the expected kind of scope
fn located(project: &str, location: &str, expected: fn(&Scope) -> bool, what: &str) -> Option<Scope> {
    match Scope::parse(&format!("{}.{}", project, location)) {
        Ok(scope) if expected(&scope) => Some(scope),
        _ => {
            tracing::warn!("Skipping invalid {} '{}' for project {}", what, location, project);
            None
        }
    }
}
