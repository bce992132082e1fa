//! Render pipeline: resolve freshness, then read the cache or regenerate it.

use std::fs;
use std::path::PathBuf;

use crate::Transform;
use crate::error::RenderError;
use crate::freshness::{Decision, MissingFile, Timestamps};

/// Paths involved in one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    /// XML source document.
    pub source_path: PathBuf,
    /// XSLT stylesheet.
    pub stylesheet_path: PathBuf,
    /// Where the rendered output is cached.
    pub cache_path: PathBuf,
}

impl RenderRequest {
    /// Create a render request.
    #[must_use]
    pub fn new(
        source_path: impl Into<PathBuf>,
        stylesheet_path: impl Into<PathBuf>,
        cache_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            stylesheet_path: stylesheet_path.into(),
            cache_path: cache_path.into(),
        }
    }

    fn missing(&self, file: MissingFile) -> RenderError {
        match file {
            MissingFile::Source => RenderError::MissingInput(self.source_path.clone()),
            MissingFile::Stylesheet => RenderError::MissingStylesheet(self.stylesheet_path.clone()),
        }
    }
}

/// Rendered content together with the decision that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Rendered HTML.
    pub html: String,
    /// Whether the output came from the cache or a fresh transform.
    pub decision: Decision,
}

/// Decide whether the cache for `request` is fresh.
///
/// Reads current filesystem metadata on every call.
///
/// # Errors
///
/// Returns `RenderError::MissingInput` if the source document does not exist.
/// Returns `RenderError::MissingStylesheet` if the stylesheet does not exist.
/// Returns `RenderError::Io` if metadata cannot be read.
pub fn resolve(request: &RenderRequest) -> Result<Decision, RenderError> {
    let timestamps = Timestamps::probe(request)?;
    let decision = timestamps.decide().map_err(|file| request.missing(file))?;
    tracing::debug!(
        source = %request.source_path.display(),
        cache = %request.cache_path.display(),
        ?decision,
        "Resolved cache freshness"
    );
    Ok(decision)
}

/// Serves rendered output from a cache file, regenerating it when stale.
///
/// The cache file's parent directory must already exist.
pub struct RenderCache<T> {
    transform: T,
}

impl<T: Transform> RenderCache<T> {
    /// Create a render cache around a transform capability.
    #[must_use]
    pub fn new(transform: T) -> Self {
        Self { transform }
    }

    /// Render `request`, using the cache file when it is fresh.
    ///
    /// On a cache hit the file is read verbatim and nothing is written. On a
    /// miss the transform runs once and its output overwrites the cache file.
    /// A failed transform leaves any existing cache file untouched.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::MissingInput` / `RenderError::MissingStylesheet`
    /// if an input is absent, `RenderError::Transform` if the transform fails,
    /// and `RenderError::Io` if the cache cannot be read or written.
    pub fn render(&self, request: &RenderRequest) -> Result<Rendered, RenderError> {
        let decision = resolve(request)?;

        let html = match decision {
            Decision::UseCache => fs::read_to_string(&request.cache_path)
                .map_err(|e| RenderError::io(&request.cache_path, e))?,
            Decision::Regenerate(reason) => {
                tracing::info!(
                    reason = reason.as_str(),
                    cache = %request.cache_path.display(),
                    "Regenerating cached render"
                );
                let html = self.run_transform(request)?;
                fs::write(&request.cache_path, &html)
                    .map_err(|e| RenderError::io(&request.cache_path, e))?;
                html
            }
        };

        Ok(Rendered { html, decision })
    }

    /// Render `request` without reading or writing the cache file.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::MissingInput` / `RenderError::MissingStylesheet`
    /// if an input is absent, `RenderError::Transform` if the transform
    /// fails, and `RenderError::Io` if input metadata cannot be read.
    pub fn render_uncached(&self, request: &RenderRequest) -> Result<String, RenderError> {
        Timestamps::probe_inputs(request)?
            .decide()
            .map_err(|file| request.missing(file))?;
        self.run_transform(request)
    }

    fn run_transform(&self, request: &RenderRequest) -> Result<String, RenderError> {
        self.transform
            .transform(&request.source_path, &request.stylesheet_path)
            .map_err(|e| {
                tracing::warn!(
                    source = %request.source_path.display(),
                    code = e.code,
                    error = %e.message,
                    "Transform failed"
                );
                RenderError::Transform(e)
            })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs::File;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;
    use crate::error::TransformError;
    use crate::freshness::RegenerateReason;

    /// Write `content` to `path` and set its mtime to `secs` after the epoch.
    fn write_at(path: &Path, content: &str, secs: u64) {
        fs::write(path, content).unwrap();
        set_mtime(path, secs);
    }

    fn set_mtime(path: &Path, secs: u64) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    fn mtime(path: &Path) -> SystemTime {
        fs::metadata(path).unwrap().modified().unwrap()
    }

    fn request(tmp: &TempDir) -> RenderRequest {
        RenderRequest::new(
            tmp.path().join("procedure.xml"),
            tmp.path().join("procedure.xsl"),
            tmp.path().join("procedure.html"),
        )
    }

    /// Request with source and stylesheet written at the given mtimes.
    fn request_with_inputs(tmp: &TempDir, source: u64, stylesheet: u64) -> RenderRequest {
        let req = request(tmp);
        write_at(&req.source_path, "<procedure/>", source);
        write_at(&req.stylesheet_path, "<xsl:stylesheet/>", stylesheet);
        req
    }

    fn counting<'a>(
        calls: &'a Cell<usize>,
        html: &'static str,
    ) -> impl Fn(&Path, &Path) -> Result<String, TransformError> + 'a {
        move |_, _| {
            calls.set(calls.get() + 1);
            Ok(html.to_owned())
        }
    }

    fn failing(_: &Path, _: &Path) -> Result<String, TransformError> {
        Err(TransformError::new("XSLT compilation failed", 5))
    }

    #[test]
    fn test_resolve_cache_missing() {
        let tmp = TempDir::new().unwrap();
        let req = request_with_inputs(&tmp, 100, 50);

        assert_eq!(
            resolve(&req).unwrap(),
            Decision::Regenerate(RegenerateReason::CacheMissing)
        );
    }

    #[test]
    fn test_resolve_source_newer() {
        let tmp = TempDir::new().unwrap();
        let req = request_with_inputs(&tmp, 100, 50);
        write_at(&req.cache_path, "old", 90);

        assert_eq!(
            resolve(&req).unwrap(),
            Decision::Regenerate(RegenerateReason::SourceNewer)
        );
    }

    #[test]
    fn test_resolve_stylesheet_newer() {
        let tmp = TempDir::new().unwrap();
        let req = request_with_inputs(&tmp, 50, 100);
        write_at(&req.cache_path, "old", 90);

        assert_eq!(
            resolve(&req).unwrap(),
            Decision::Regenerate(RegenerateReason::StylesheetNewer)
        );
    }

    #[test]
    fn test_resolve_fresh_cache() {
        let tmp = TempDir::new().unwrap();
        let req = request_with_inputs(&tmp, 50, 50);
        write_at(&req.cache_path, "cached", 90);

        assert_eq!(resolve(&req).unwrap(), Decision::UseCache);
        assert_eq!(resolve(&req).unwrap(), Decision::UseCache);
    }

    #[test]
    fn test_resolve_missing_source() {
        let tmp = TempDir::new().unwrap();
        let req = request(&tmp);
        write_at(&req.stylesheet_path, "<xsl:stylesheet/>", 50);
        write_at(&req.cache_path, "cached", 90);

        let err = resolve(&req).unwrap_err();
        assert!(
            matches!(&err, RenderError::MissingInput(p) if *p == req.source_path),
            "Expected MissingInput, got {err:?}"
        );
    }

    #[test]
    fn test_resolve_missing_stylesheet() {
        let tmp = TempDir::new().unwrap();
        let req = request(&tmp);
        write_at(&req.source_path, "<procedure/>", 50);

        let err = resolve(&req).unwrap_err();
        assert!(
            matches!(&err, RenderError::MissingStylesheet(p) if *p == req.stylesheet_path),
            "Expected MissingStylesheet, got {err:?}"
        );
    }

    /// Place the cache path under a regular file so looking it up fails with
    /// `NotADirectory` instead of `NotFound`.
    fn block_cache_path(tmp: &TempDir, req: &mut RenderRequest) {
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        req.cache_path = blocker.join("procedure.html");
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_missing_source_before_cache_lookup() {
        let tmp = TempDir::new().unwrap();
        let mut req = request(&tmp);
        write_at(&req.stylesheet_path, "<xsl:stylesheet/>", 50);
        block_cache_path(&tmp, &mut req);

        let err = resolve(&req).unwrap_err();
        assert!(
            matches!(&err, RenderError::MissingInput(p) if *p == req.source_path),
            "Expected MissingInput, got {err:?}"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_cache_metadata_failure_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let mut req = request_with_inputs(&tmp, 100, 50);
        block_cache_path(&tmp, &mut req);

        let err = resolve(&req).unwrap_err();
        assert!(
            matches!(&err, RenderError::Io { path, .. } if *path == req.cache_path),
            "Expected Io on cache path, got {err:?}"
        );
    }

    #[test]
    fn test_render_unreadable_cache_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let mut req = request_with_inputs(&tmp, 50, 50);
        // A directory created now is newer than both inputs
        req.cache_path = tmp.path().join("cache-dir");
        fs::create_dir(&req.cache_path).unwrap();
        let calls = Cell::new(0);
        let cache = RenderCache::new(counting(&calls, "<p>x</p>"));

        assert_eq!(resolve(&req).unwrap(), Decision::UseCache);
        let err = cache.render(&req).unwrap_err();

        assert!(
            matches!(&err, RenderError::Io { path, .. } if *path == req.cache_path),
            "Expected Io on cache path, got {err:?}"
        );
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_render_cache_miss_writes_cache() {
        let tmp = TempDir::new().unwrap();
        let req = request_with_inputs(&tmp, 100, 50);
        let calls = Cell::new(0);
        let cache = RenderCache::new(counting(&calls, "<h1>Procedure</h1>"));

        let rendered = cache.render(&req).unwrap();

        assert_eq!(rendered.html, "<h1>Procedure</h1>");
        assert_eq!(
            rendered.decision,
            Decision::Regenerate(RegenerateReason::CacheMissing)
        );
        assert_eq!(calls.get(), 1);
        assert_eq!(
            fs::read_to_string(&req.cache_path).unwrap(),
            "<h1>Procedure</h1>"
        );
    }

    #[test]
    fn test_render_twice_hits_cache() {
        let tmp = TempDir::new().unwrap();
        let req = request_with_inputs(&tmp, 100, 50);
        let calls = Cell::new(0);
        let cache = RenderCache::new(counting(&calls, "<h1>Procedure</h1>"));

        let first = cache.render(&req).unwrap();
        let second = cache.render(&req).unwrap();

        assert_eq!(first.html, second.html);
        assert!(!first.decision.is_cache_hit());
        assert_eq!(second.decision, Decision::UseCache);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_render_cache_hit_returns_file_verbatim() {
        let tmp = TempDir::new().unwrap();
        let req = request_with_inputs(&tmp, 50, 50);
        write_at(&req.cache_path, "<p>from cache</p>\n", 90);
        let calls = Cell::new(0);
        let cache = RenderCache::new(counting(&calls, "<p>fresh</p>"));

        let rendered = cache.render(&req).unwrap();

        assert_eq!(rendered.html, "<p>from cache</p>\n");
        assert_eq!(rendered.decision, Decision::UseCache);
        assert_eq!(calls.get(), 0);
        // No write on a hit
        assert_eq!(
            mtime(&req.cache_path),
            SystemTime::UNIX_EPOCH + Duration::from_secs(90)
        );
    }

    #[test]
    fn test_render_stale_cache_is_overwritten() {
        let tmp = TempDir::new().unwrap();
        let req = request_with_inputs(&tmp, 50, 100);
        write_at(&req.cache_path, "<p>old render with a longer body</p>", 90);
        let calls = Cell::new(0);
        let cache = RenderCache::new(counting(&calls, "<p>new</p>"));

        let rendered = cache.render(&req).unwrap();

        assert_eq!(
            rendered.decision,
            Decision::Regenerate(RegenerateReason::StylesheetNewer)
        );
        assert_eq!(fs::read_to_string(&req.cache_path).unwrap(), "<p>new</p>");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_render_transform_failure_keeps_stale_cache() {
        let tmp = TempDir::new().unwrap();
        let req = request_with_inputs(&tmp, 100, 50);
        write_at(&req.cache_path, "<p>stale</p>", 90);
        let cache = RenderCache::new(failing);

        let err = cache.render(&req).unwrap_err();

        match err {
            RenderError::Transform(e) => {
                assert_eq!(e.code, 5);
                assert_eq!(e.message, "XSLT compilation failed");
            }
            other => panic!("Expected Transform error, got {other:?}"),
        }
        assert_eq!(fs::read_to_string(&req.cache_path).unwrap(), "<p>stale</p>");
        assert_eq!(
            mtime(&req.cache_path),
            SystemTime::UNIX_EPOCH + Duration::from_secs(90)
        );
    }

    #[test]
    fn test_render_transform_failure_creates_no_cache() {
        let tmp = TempDir::new().unwrap();
        let req = request_with_inputs(&tmp, 100, 50);
        let cache = RenderCache::new(failing);

        assert!(matches!(
            cache.render(&req),
            Err(RenderError::Transform(_))
        ));
        assert!(!req.cache_path.exists());
    }

    #[test]
    fn test_render_missing_source_skips_transform() {
        let tmp = TempDir::new().unwrap();
        let req = request(&tmp);
        write_at(&req.stylesheet_path, "<xsl:stylesheet/>", 50);
        let calls = Cell::new(0);
        let cache = RenderCache::new(counting(&calls, "unused"));

        assert!(matches!(
            cache.render(&req),
            Err(RenderError::MissingInput(_))
        ));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_render_missing_cache_dir_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let mut req = request_with_inputs(&tmp, 100, 50);
        req.cache_path = tmp.path().join("missing-dir/procedure.html");
        let calls = Cell::new(0);
        let cache = RenderCache::new(counting(&calls, "<p>x</p>"));

        let err = cache.render(&req).unwrap_err();

        assert!(
            matches!(&err, RenderError::Io { path, .. } if *path == req.cache_path),
            "Expected Io error, got {err:?}"
        );
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_render_uncached_never_touches_cache() {
        let tmp = TempDir::new().unwrap();
        let req = request_with_inputs(&tmp, 50, 50);
        let calls = Cell::new(0);
        let cache = RenderCache::new(counting(&calls, "<p>direct</p>"));

        assert_eq!(cache.render_uncached(&req).unwrap(), "<p>direct</p>");
        assert_eq!(cache.render_uncached(&req).unwrap(), "<p>direct</p>");

        assert_eq!(calls.get(), 2);
        assert!(!req.cache_path.exists());
    }

    #[test]
    fn test_render_uncached_missing_stylesheet() {
        let tmp = TempDir::new().unwrap();
        let req = request(&tmp);
        write_at(&req.source_path, "<procedure/>", 50);
        let cache = RenderCache::new(failing);

        assert!(matches!(
            cache.render_uncached(&req),
            Err(RenderError::MissingStylesheet(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_render_uncached_unreadable_input_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let mut req = request_with_inputs(&tmp, 50, 50);
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        req.source_path = blocker.join("procedure.xml");
        let calls = Cell::new(0);
        let cache = RenderCache::new(counting(&calls, "unused"));

        let err = cache.render_uncached(&req).unwrap_err();

        assert!(
            matches!(&err, RenderError::Io { path, .. } if *path == req.source_path),
            "Expected Io on source path, got {err:?}"
        );
        assert_eq!(calls.get(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_render_uncached_ignores_unreadable_cache_path() {
        let tmp = TempDir::new().unwrap();
        let mut req = request_with_inputs(&tmp, 50, 50);
        block_cache_path(&tmp, &mut req);
        let calls = Cell::new(0);
        let cache = RenderCache::new(counting(&calls, "<p>direct</p>"));

        assert_eq!(cache.render_uncached(&req).unwrap(), "<p>direct</p>");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_transform_receives_request_paths() {
        let tmp = TempDir::new().unwrap();
        let req = request_with_inputs(&tmp, 100, 50);
        let expected = req.clone();
        let cache = RenderCache::new(move |source: &Path, stylesheet: &Path| {
            assert_eq!(source, expected.source_path);
            assert_eq!(stylesheet, expected.stylesheet_path);
            Ok::<_, TransformError>(String::from("<p>ok</p>"))
        });

        assert_eq!(cache.render(&req).unwrap().html, "<p>ok</p>");
    }
}
