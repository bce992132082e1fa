//! Cache freshness decision.
//!
//! [`Timestamps`] holds the modification times of the three files involved in
//! a render. [`Timestamps::decide`] is a pure function over those times, so
//! the decision can be tested without touching disk. [`Timestamps::probe`]
//! is the only part that reads filesystem metadata.

use std::io;
use std::path::Path;
use std::time::SystemTime;

use crate::error::RenderError;
use crate::render::RenderRequest;

/// Why the cached output has to be regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerateReason {
    /// Source document was modified after the cache was written.
    SourceNewer,
    /// Stylesheet was modified after the cache was written.
    StylesheetNewer,
    /// No cache file exists yet.
    CacheMissing,
}

impl RegenerateReason {
    /// Short description for status output and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SourceNewer => "source newer",
            Self::StylesheetNewer => "stylesheet newer",
            Self::CacheMissing => "cache missing",
        }
    }
}

/// Outcome of the freshness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Cached output is fresh; serve it verbatim.
    UseCache,
    /// Cached output is stale or absent.
    Regenerate(RegenerateReason),
}

impl Decision {
    /// Whether this decision serves the existing cache file.
    #[must_use]
    pub fn is_cache_hit(self) -> bool {
        matches!(self, Self::UseCache)
    }
}

/// A mandatory input that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MissingFile {
    /// The source document.
    #[error("source document is missing")]
    Source,
    /// The stylesheet.
    #[error("stylesheet is missing")]
    Stylesheet,
}

/// Modification times of the files in a [`RenderRequest`].
///
/// `None` means the file does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamps {
    /// Source document mtime.
    pub source: Option<SystemTime>,
    /// Stylesheet mtime.
    pub stylesheet: Option<SystemTime>,
    /// Cache file mtime.
    pub cached: Option<SystemTime>,
}

impl Timestamps {
    /// Read the current modification times for `request`.
    ///
    /// A file that does not exist yields `None`. Any other metadata failure
    /// (e.g. permission denied) is returned as [`RenderError::Io`].
    ///
    /// Files are read in decision order and reading stops at the first
    /// missing input, so an absent source is reported even when the
    /// stylesheet or cache path cannot be inspected.
    pub fn probe(request: &RenderRequest) -> Result<Self, RenderError> {
        let inputs = Self::probe_inputs(request)?;
        if inputs.source.is_none() || inputs.stylesheet.is_none() {
            return Ok(inputs);
        }
        Ok(Self {
            cached: mtime(&request.cache_path)?,
            ..inputs
        })
    }

    /// Read the source and stylesheet modification times only.
    ///
    /// The cache path is never inspected; `cached` is always `None`.
    pub fn probe_inputs(request: &RenderRequest) -> Result<Self, RenderError> {
        let source = mtime(&request.source_path)?;
        if source.is_none() {
            return Ok(Self::default());
        }
        Ok(Self {
            source,
            stylesheet: mtime(&request.stylesheet_path)?,
            cached: None,
        })
    }

    /// Decide whether the cache is fresh.
    ///
    /// The source is checked before the stylesheet, both for existence and
    /// for staleness. Only a strictly later input mtime marks the cache
    /// stale; equal times keep the cache.
    pub fn decide(&self) -> Result<Decision, MissingFile> {
        let source = self.source.ok_or(MissingFile::Source)?;
        let stylesheet = self.stylesheet.ok_or(MissingFile::Stylesheet)?;

        let Some(cached) = self.cached else {
            return Ok(Decision::Regenerate(RegenerateReason::CacheMissing));
        };

        if source > cached {
            Ok(Decision::Regenerate(RegenerateReason::SourceNewer))
        } else if stylesheet > cached {
            Ok(Decision::Regenerate(RegenerateReason::StylesheetNewer))
        } else {
            Ok(Decision::UseCache)
        }
    }
}

/// Modification time of `path`, or `None` if it does not exist.
fn mtime(path: &Path) -> Result<Option<SystemTime>, RenderError> {
    match std::fs::metadata(path) {
        Ok(meta) => meta
            .modified()
            .map(Some)
            .map_err(|e| RenderError::io(path, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RenderError::io(path, e)),
    }
}
