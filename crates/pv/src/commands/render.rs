//! `pv render` command implementation.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;
use pv_cache::{RenderCache, RenderError, Transform, TransformError};
use pv_config::{Config, XsltConfig};
use pv_xslt::XsltProc;

use super::document::DocumentArgs;
use crate::error::CliError;
use crate::page;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    #[command(flatten)]
    document: DocumentArgs,

    /// Write the page to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable caching (default: enabled).
    #[arg(long)]
    cache: Option<bool>,

    /// Disable caching.
    #[arg(long, conflicts_with = "cache")]
    no_cache: bool,
}

/// A finished page, plus the transform failure it reports, if any.
struct PageOutcome {
    page: String,
    failure: Option<TransformError>,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// A transform failure still produces a page (with an error paragraph in
    /// place of the procedure) before the error is returned.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let cache_enabled = self.no_cache.then_some(false).or(self.cache);
        let config = self.document.load_config(cache_enabled)?;

        let outcome = build_page(&config, processor(&config.xslt))?;
        write_page(self.output.as_deref(), &outcome.page)?;

        match outcome.failure {
            Some(e) => Err(RenderError::Transform(e).into()),
            None => Ok(()),
        }
    }
}

/// Build the XSLT processor described by the config.
fn processor(config: &XsltConfig) -> XsltProc {
    config.params.iter().fold(
        XsltProc::new()
            .with_program(&config.program)
            .with_args(&config.args),
        |xslt, (name, value)| xslt.with_param(name, value),
    )
}

/// Render the configured document into a complete HTML page.
fn build_page<T: Transform>(config: &Config, transform: T) -> Result<PageOutcome, CliError> {
    let request = config.render_request();
    let cache = RenderCache::new(transform);

    let body = if config.cache_resolved.enabled {
        ensure_cache_dir(&request.cache_path, &config.cache_resolved.project_dir)?;
        cache.render(&request).map(|rendered| {
            tracing::debug!(
                cache_hit = rendered.decision.is_cache_hit(),
                "Rendered procedure"
            );
            rendered.html
        })
    } else {
        cache.render_uncached(&request)
    };

    let title = &config.document_resolved.title;
    match body {
        Ok(html) => Ok(PageOutcome {
            page: page::render_page(title, &html),
            failure: None,
        }),
        Err(RenderError::Transform(e)) => Ok(PageOutcome {
            page: page::render_page(title, &page::error_body(&e)),
            failure: Some(e),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Ensure the cache file's directory exists.
///
/// When the cache lives under the `.procview/` project directory, a
/// `.gitignore` is created there as well.
fn ensure_cache_dir(cache_file: &Path, project_dir: &Path) -> Result<(), CliError> {
    if let Some(parent) = cache_file.parent() {
        fs::create_dir_all(parent)?;
    }

    if cache_file.starts_with(project_dir) {
        let gitignore_path = project_dir.join(".gitignore");
        if !gitignore_path.exists() {
            let _ = fs::write(&gitignore_path, "# Automatically created by procview\n*\n");
        }
    }

    Ok(())
}

fn write_page(output: Option<&Path>, page: &str) -> Result<(), CliError> {
    match output {
        Some(path) => fs::write(path, page)?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(page.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
