//! `xsltproc`-backed [`Transform`] for procview.
//!
//! [`XsltProc`] runs the libxslt command-line processor as a child process:
//!
//! ```text
//! <program> [args...] [--stringparam name value...] <stylesheet> <source>
//! ```
//!
//! Standard output becomes the rendered HTML. On failure the processor's exit
//! status is reported as the [`TransformError`] code and its standard error as
//! the message. Both inputs are checked for well-formedness before the process
//! is spawned, so a broken document is reported with the same codes
//! `xsltproc` itself uses.
//!
//! # Example
//!
//! ```no_run
//! use pv_cache::{RenderCache, RenderRequest};
//! use pv_xslt::XsltProc;
//!
//! let xslt = XsltProc::new().with_param("title", "Startup procedure");
//! let cache = RenderCache::new(xslt);
//! let rendered = cache.render(&RenderRequest::new(
//!     "doc/examples/procedure.xml",
//!     "web/procedureToHTML.xsl",
//!     ".procview/cache/procedure.html",
//! ))?;
//! # Ok::<(), pv_cache::RenderError>(())
//! ```

mod wellformed;

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use pv_cache::{Transform, TransformError};

pub use wellformed::{XmlCheckError, check_file, check_str};

/// `xsltproc` exit status: the stylesheet could not be parsed.
pub const EXIT_STYLESHEET_PARSE: i32 = 4;
/// `xsltproc` exit status: error in one of the documents.
pub const EXIT_DOCUMENT: i32 = 6;
/// `xsltproc` exit status: internal processing error.
pub const EXIT_INTERNAL: i32 = 9;

/// Default processor executable.
const DEFAULT_PROGRAM: &str = "xsltproc";

/// Transform that shells out to `xsltproc` (or a compatible processor).
#[derive(Debug, Clone)]
pub struct XsltProc {
    program: OsString,
    args: Vec<OsString>,
    params: Vec<(String, String)>,
}

impl Default for XsltProc {
    fn default() -> Self {
        Self::new()
    }
}

impl XsltProc {
    /// Create a processor that runs `xsltproc` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            program: OsString::from(DEFAULT_PROGRAM),
            args: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Use a different executable.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Extra arguments placed before the parameters and input paths.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Pass a string parameter to the stylesheet (`--stringparam name value`).
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    fn command(&self, source: &Path, stylesheet: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (name, value) in &self.params {
            cmd.arg("--stringparam").arg(name).arg(value);
        }
        cmd.arg(stylesheet).arg(source);
        cmd
    }

    fn program_name(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}

impl Transform for XsltProc {
    fn transform(&self, source: &Path, stylesheet: &Path) -> Result<String, TransformError> {
        check_file(stylesheet).map_err(|e| {
            TransformError::new(
                format!("cannot parse stylesheet {}: {e}", stylesheet.display()),
                EXIT_STYLESHEET_PARSE,
            )
        })?;
        check_file(source).map_err(|e| {
            TransformError::new(
                format!("cannot parse document {}: {e}", source.display()),
                EXIT_DOCUMENT,
            )
        })?;

        let mut cmd = self.command(source, stylesheet);
        tracing::debug!(command = ?cmd, "Running XSLT processor");

        let output = cmd.output().map_err(|e| {
            TransformError::new(
                format!("failed to run {}: {e}", self.program_name()),
                EXIT_INTERNAL,
            )
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();

        if !output.status.success() {
            // No exit code means the process was killed by a signal
            let code = output.status.code().unwrap_or(EXIT_INTERNAL);
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.program_name(), output.status)
            } else {
                stderr.to_owned()
            };
            return Err(TransformError::new(message, code));
        }

        if !stderr.is_empty() {
            tracing::warn!(program = %self.program_name(), "{stderr}");
        }

        String::from_utf8(output.stdout).map_err(|_| {
            TransformError::new(
                format!("{} produced output that is not UTF-8", self.program_name()),
                EXIT_INTERNAL,
            )
        })
    }
}
