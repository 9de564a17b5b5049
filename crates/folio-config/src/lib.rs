//! Configuration for Folio.
//!
//! Parses `folio.toml` with serde. Without an explicit path the file is
//! looked up in the current directory and its parents; without any file the
//! defaults apply.
//!
//! ```toml
//! [render]
//! extract_title = true
//!
//! [scene]
//! padding = 16.0
//! zoom_min = 0.25
//! zoom_max = 8.0
//!
//! [cache]
//! enabled = true
//! dir = "${FOLIO_CACHE:-.folio/cache}"
//! ```
//!
//! `cache.dir` supports `${VAR}` and `${VAR:-default}` expansion and is
//! resolved relative to the directory holding the config file. Command-line
//! values are applied on top through [`CliSettings`].

mod expand;

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "folio.toml";

const DEFAULT_CACHE_DIR: &str = ".folio/cache";

/// Command-line values that take precedence over the file.
#[derive(Debug, Default)]
pub struct CliSettings {
    pub extract_title: Option<bool>,
    pub padding: Option<f64>,
    pub cache_enabled: Option<bool>,
    pub cache_dir: Option<PathBuf>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub render: RenderConfig,
    pub scene: SceneConfig,
    cache: CacheConfigRaw,

    /// Cache settings with the directory resolved (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path of the file the config came from.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// `[render]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Use the first H1 as the document title.
    pub extract_title: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            extract_title: true,
        }
    }
}

/// `[scene]` section.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Margin around diagram bounds.
    pub padding: f64,
    pub zoom_min: f64,
    pub zoom_max: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            padding: 16.0,
            zoom_min: 0.25,
            zoom_max: 8.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    enabled: Option<bool>,
    dir: Option<String>,
}

/// Resolved `[cache]` section.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Unset variable during `${VAR}` expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar { field: String, message: String },
}

impl Config {
    /// Load configuration, then apply `cli_settings`.
    ///
    /// With `config_path`, that file must exist. Otherwise `folio.toml` is
    /// searched for from the current directory upwards, and the defaults are
    /// used when none is found.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, the file cannot be
    /// read or parsed, a variable is unset, or validation fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_base(&std::env::current_dir().unwrap_or_default())
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(extract_title) = settings.extract_title {
            self.render.extract_title = extract_title;
        }
        if let Some(padding) = settings.padding {
            self.scene.padding = padding;
        }
        if let Some(enabled) = settings.cache_enabled {
            self.cache_resolved.enabled = enabled;
        }
        if let Some(dir) = &settings.cache_dir {
            self.cache_resolved.dir.clone_from(dir);
        }
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            render: RenderConfig::default(),
            scene: SceneConfig::default(),
            cache: CacheConfigRaw::default(),
            cache_resolved: CacheConfig {
                enabled: true,
                dir: base.join(DEFAULT_CACHE_DIR),
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        if let Some(dir) = &config.cache.dir {
            config.cache.dir = Some(expand::expand_env(dir, "cache.dir")?);
        }
        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn resolve_paths(&mut self, config_dir: &Path) {
        self.cache_resolved = CacheConfig {
            enabled: self.cache.enabled.unwrap_or(true),
            dir: config_dir.join(self.cache.dir.as_deref().unwrap_or(DEFAULT_CACHE_DIR)),
        };
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scene = &self.scene;
        if !scene.padding.is_finite() || scene.padding < 0.0 {
            return Err(ConfigError::Validation(
                "scene.padding must be a finite number >= 0".to_owned(),
            ));
        }
        if !(scene.zoom_min.is_finite() && scene.zoom_min > 0.0) {
            return Err(ConfigError::Validation(
                "scene.zoom_min must be greater than 0".to_owned(),
            ));
        }
        if !scene.zoom_max.is_finite() || scene.zoom_max < scene.zoom_min {
            return Err(ConfigError::Validation(
                "scene.zoom_max must be >= scene.zoom_min".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Search `start` and its parents for `folio.toml`.
fn discover_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        let candidate = current.join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}
