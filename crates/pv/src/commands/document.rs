//! Document selection arguments shared by all commands.

use std::path::PathBuf;

use clap::Args;
use pv_config::{CliSettings, Config};

use crate::error::CliError;

/// Which document to render and where to cache it.
#[derive(Args)]
pub(crate) struct DocumentArgs {
    /// Path to configuration file (default: auto-discover procview.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// XML source document (overrides config).
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// XSLT stylesheet (overrides config).
    #[arg(long)]
    stylesheet: Option<PathBuf>,

    /// Cache file for the rendered output (overrides config).
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Page title (overrides config).
    #[arg(long)]
    title: Option<String>,
}

impl DocumentArgs {
    /// Load the configuration with these arguments applied on top.
    pub(crate) fn load_config(self, cache_enabled: Option<bool>) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            source: self.source,
            stylesheet: self.stylesheet,
            cache_file: self.cache_file,
            cache_enabled,
            title: self.title,
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}
