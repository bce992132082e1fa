//! Staleness-driven render cache for procview.
//!
//! Given a source document, a stylesheet and a cache file path, this crate
//! decides whether the cached output is still fresh and, if not, regenerates
//! it through a caller-supplied [`Transform`]. Three types form the core API:
//!
//! - [`RenderRequest`]: the three paths for one invocation
//! - [`Timestamps`]: modification times of those paths, with a pure
//!   [`Timestamps::decide`] that yields a [`Decision`]
//! - [`RenderCache`]: reads the cache on a hit, regenerates and overwrites it
//!   on a miss
//!
//! Every call re-derives the decision from current filesystem metadata. No
//! state survives between requests, and concurrent writers to the same cache
//! file are not coordinated (the last write wins).
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use pv_cache::{RenderCache, RenderRequest, TransformError};
//!
//! let request = RenderRequest::new("doc.xml", "view.xsl", "cache/doc.html");
//! let cache = RenderCache::new(|_source: &Path, _stylesheet: &Path| {
//!     Ok::<_, TransformError>("<p>rendered</p>".to_owned())
//! });
//! let rendered = cache.render(&request)?;
//! println!("{}", rendered.html);
//! # Ok::<(), pv_cache::RenderError>(())
//! ```

mod error;
mod freshness;
mod render;

use std::path::Path;

pub use error::{RenderError, TransformError};
pub use freshness::{Decision, MissingFile, RegenerateReason, Timestamps};
pub use render::{RenderCache, RenderRequest, Rendered, resolve};

/// External capability that turns a source document plus a stylesheet into
/// rendered output.
///
/// Implementations receive file paths rather than loaded documents so the
/// engine can resolve relative DTD and include references against the files'
/// own locations.
pub trait Transform {
    /// Render `source` with `stylesheet`.
    ///
    /// # Arguments
    ///
    /// * `source` - Path to the XML source document
    /// * `stylesheet` - Path to the stylesheet
    fn transform(&self, source: &Path, stylesheet: &Path) -> Result<String, TransformError>;
}

impl<F> Transform for F
where
    F: Fn(&Path, &Path) -> Result<String, TransformError>,
{
    fn transform(&self, source: &Path, stylesheet: &Path) -> Result<String, TransformError> {
        self(source, stylesheet)
    }
}
