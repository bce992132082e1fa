//! Configuration management for procview.
//!
//! Parses `procview.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Path Resolution
//!
//! Relative paths are resolved against the directory containing the config
//! file (or the current directory when no file is found), so that the XSLT
//! processor sees the same base directory regardless of where `pv` is run.
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `document.source`
//! - `document.stylesheet`
//! - `cache.file`
//! - `xslt.program`

mod expand;

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use pv_cache::RenderRequest;
use serde::Deserialize;

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override source document path.
    pub source: Option<PathBuf>,
    /// Override stylesheet path.
    pub stylesheet: Option<PathBuf>,
    /// Override cache file path.
    pub cache_file: Option<PathBuf>,
    /// Override cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override page title.
    pub title: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "procview.toml";

/// Project data directory, relative to the config directory.
const PROJECT_DIRNAME: &str = ".procview";

const DEFAULT_SOURCE: &str = "doc/examples/simpleProcedure_v1_Example.xml";
const DEFAULT_STYLESHEET: &str = "web/procedureToHTML.xsl";
const DEFAULT_TITLE: &str = "HTML version of Procedure";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document configuration (paths are relative strings from TOML).
    document: DocumentConfigRaw,
    /// Cache configuration (paths are relative strings from TOML).
    cache: CacheConfigRaw,
    /// XSLT processor configuration.
    pub xslt: XsltConfig,

    /// Resolved document configuration (set after loading).
    #[serde(skip)]
    pub document_resolved: DocumentConfig,
    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw document configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DocumentConfigRaw {
    source: Option<String>,
    stylesheet: Option<String>,
    title: Option<String>,
}

/// Resolved document configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DocumentConfig {
    /// XML source document.
    pub source: PathBuf,
    /// XSLT stylesheet.
    pub stylesheet: PathBuf,
    /// Title of the generated HTML page.
    pub title: String,
}

/// Raw cache configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    enabled: Option<bool>,
    file: Option<String>,
}

/// Resolved cache configuration with absolute paths.
#[derive(Debug, Default)]
pub struct CacheConfig {
    /// Whether rendered output is cached.
    pub enabled: bool,
    /// Cache file for the rendered document.
    pub file: PathBuf,
    /// Project directory for procview data (.procview/).
    pub project_dir: PathBuf,
}

impl CacheConfig {
    /// Default cache directory (.procview/cache/).
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.project_dir.join("cache")
    }
}

/// XSLT processor configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct XsltConfig {
    /// Processor executable.
    pub program: String,
    /// Extra arguments passed before the input paths.
    pub args: Vec<String>,
    /// String parameters passed to the stylesheet.
    pub params: BTreeMap<String, String>,
}

impl Default for XsltConfig {
    fn default() -> Self {
        Self {
            program: "xsltproc".to_owned(),
            args: Vec::new(),
            params: BTreeMap::new(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`document.source`").
        field: String,
        /// Error message (e.g., "${`PROCEDURE_DIR`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Default cache file for `source`: `<cache_dir>/<source stem>.html`.
fn default_cache_file(cache_dir: &Path, source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map_or(Cow::Borrowed("document"), |s| s.to_string_lossy());
    cache_dir.join(format!("{stem}.html"))
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `procview.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the final configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;

        Ok(config)
    }

    /// Build the render request for the configured document.
    #[must_use]
    pub fn render_request(&self) -> RenderRequest {
        RenderRequest::new(
            &self.document_resolved.source,
            &self.document_resolved.stylesheet,
            &self.cache_resolved.file,
        )
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source) = &settings.source {
            self.document_resolved.source.clone_from(source);
            // Keep the derived cache file in step with the new source
            if self.cache.file.is_none() && settings.cache_file.is_none() {
                self.cache_resolved.file =
                    default_cache_file(&self.cache_resolved.cache_dir(), source);
            }
        }
        if let Some(stylesheet) = &settings.stylesheet {
            self.document_resolved.stylesheet.clone_from(stylesheet);
        }
        if let Some(cache_file) = &settings.cache_file {
            self.cache_resolved.file.clone_from(cache_file);
        }
        if let Some(cache_enabled) = settings.cache_enabled {
            self.cache_resolved.enabled = cache_enabled;
        }
        if let Some(title) = &settings.title {
            self.document_resolved.title.clone_from(title);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        let mut config = Self {
            document: DocumentConfigRaw::default(),
            cache: CacheConfigRaw::default(),
            xslt: XsltConfig::default(),
            document_resolved: DocumentConfig::default(),
            cache_resolved: CacheConfig::default(),
            config_path: None,
        };
        config.resolve_paths(base);
        config
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically by [`Config::load`] after CLI settings are applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_document()?;
        self.validate_xslt()?;
        Ok(())
    }

    /// Validate document and cache paths.
    fn validate_document(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.document_resolved.title, "document.title")?;

        // Regeneration overwrites the cache file, so it must not be an input
        let cache_file = &self.cache_resolved.file;
        if *cache_file == self.document_resolved.source
            || *cache_file == self.document_resolved.stylesheet
        {
            return Err(ConfigError::Validation(format!(
                "cache.file must differ from document.source and document.stylesheet ({})",
                cache_file.display()
            )));
        }

        Ok(())
    }

    /// Validate XSLT processor configuration.
    fn validate_xslt(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.xslt.program, "xslt.program")?;
        if let Some(name) = self.xslt.params.keys().find(|name| name.is_empty()) {
            return Err(ConfigError::Validation(format!(
                "xslt.params contains an empty parameter name ({name:?})"
            )));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref source) = self.document.source {
            self.document.source = Some(expand::expand_env(source, "document.source")?);
        }
        if let Some(ref stylesheet) = self.document.stylesheet {
            self.document.stylesheet = Some(expand::expand_env(stylesheet, "document.stylesheet")?);
        }
        if let Some(ref file) = self.cache.file {
            self.cache.file = Some(expand::expand_env(file, "cache.file")?);
        }
        self.xslt.program = expand::expand_env(&self.xslt.program, "xslt.program")?;

        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.document_resolved = DocumentConfig {
            source: resolve(self.document.source.as_deref(), DEFAULT_SOURCE),
            stylesheet: resolve(self.document.stylesheet.as_deref(), DEFAULT_STYLESHEET),
            title: self
                .document
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_TITLE.to_owned()),
        };

        let project_dir = config_dir.join(PROJECT_DIRNAME);
        let mut cache = CacheConfig {
            enabled: self.cache.enabled.unwrap_or(true),
            file: PathBuf::new(),
            project_dir,
        };
        cache.file = match self.cache.file.as_deref() {
            Some(file) => config_dir.join(file),
            None => default_cache_file(&cache.cache_dir(), &self.document_resolved.source),
        };
        self.cache_resolved = cache;
    }
}
