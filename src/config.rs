//! Host configuration parsed from environment variables.

use canvas::render::BasemapConfig;

pub const DEFAULT_API_BASE: &str = "http://localhost:7998";
pub const DEFAULT_TILE_URL: &str = "http://localhost:7999/data/LTH_factory/{z}/{x}/{y}.pbf";
pub const DEFAULT_TILE_SOURCE_LAYER: &str = "factory";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be an http(s) URL, got {value:?}")]
    InvalidUrl { var: &'static str, value: String },
    #[error("FLOORPLAN_TILE_URL must contain {{z}}, {{x}} and {{y}}, got {0:?}")]
    MissingTilePlaceholders(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for StoreTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Feature store base URL, no trailing slash.
    pub api_base: String,
    pub tile_url: String,
    pub tile_source_layer: String,
    pub timeouts: StoreTimeouts,
}

impl EditorConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `FLOORPLAN_API_BASE`: default `http://localhost:7998`
    /// - `FLOORPLAN_TILE_URL`: `{z}/{x}/{y}.pbf` template
    /// - `FLOORPLAN_TILE_SOURCE_LAYER`: default `factory`
    /// - `FLOORPLAN_REQUEST_TIMEOUT_SECS`: default 30
    /// - `FLOORPLAN_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`EditorConfig::from_env`], reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base = lookup("FLOORPLAN_API_BASE")
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        if !is_http_url(&api_base) {
            return Err(ConfigError::InvalidUrl { var: "FLOORPLAN_API_BASE", value: api_base });
        }

        let tile_url = lookup("FLOORPLAN_TILE_URL").unwrap_or_else(|| DEFAULT_TILE_URL.to_string());
        if !is_http_url(&tile_url) {
            return Err(ConfigError::InvalidUrl { var: "FLOORPLAN_TILE_URL", value: tile_url });
        }
        if !["{z}", "{x}", "{y}"].iter().all(|p| tile_url.contains(p)) {
            return Err(ConfigError::MissingTilePlaceholders(tile_url));
        }

        let tile_source_layer =
            lookup("FLOORPLAN_TILE_SOURCE_LAYER").unwrap_or_else(|| DEFAULT_TILE_SOURCE_LAYER.to_string());
        let timeouts = StoreTimeouts {
            request_secs: parse_u64(lookup("FLOORPLAN_REQUEST_TIMEOUT_SECS"), DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64(lookup("FLOORPLAN_CONNECT_TIMEOUT_SECS"), DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_base, tile_url, tile_source_layer, timeouts })
    }

    /// Basemap settings for the engine.
    #[must_use]
    pub fn basemap(&self) -> BasemapConfig {
        BasemapConfig { tiles_url: self.tile_url.clone(), source_layer: self.tile_source_layer.clone() }
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn parse_u64(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
