//! `pv status` command implementation.

use clap::Args;
use pv_cache::Decision;

use super::document::DocumentArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the status command.
#[derive(Args)]
pub(crate) struct StatusArgs {
    #[command(flatten)]
    document: DocumentArgs,
}

impl StatusArgs {
    /// Execute the status command.
    ///
    /// Prints the resolved paths and whether the next render would be served
    /// from the cache. Nothing is rendered or written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.document.load_config(None)?;
        let request = config.render_request();

        output.field("Source", request.source_path.display());
        output.field("Stylesheet", request.stylesheet_path.display());
        output.field("Cache file", request.cache_path.display());
        if !config.cache_resolved.enabled {
            output.stale("Cache: disabled in configuration");
        }

        let decision = pv_cache::resolve(&request)?;
        if decision.is_cache_hit() {
            output.fresh(&describe(decision));
        } else {
            output.stale(&describe(decision));
        }

        Ok(())
    }
}

/// One-line summary of a freshness decision.
fn describe(decision: Decision) -> String {
    match decision {
        Decision::UseCache => "Cache: fresh".to_owned(),
        Decision::Regenerate(reason) => format!("Cache: stale ({})", reason.as_str()),
    }
}
