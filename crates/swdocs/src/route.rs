//! The `/sw/{slug}` route: its data loader and the errors it can end in.
//!
//! [`DocRoute::load`] runs once per request: it extracts the slug, looks the document up, converts it,
//! and returns it with a `200` status. Failures are turned into a [`RouteError`] where they are caught, and
//! rendered by the [`ErrorBoundary`](boundary::ErrorBoundary).
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::error;

pub mod boundary;

use crate::content::{DEFAULT_CATEGORY, DocumentSource, MarkdownConverter, RenderedContent};
use crate::errors::LoaderError;
use crate::params::{RouteParams, require_param};

pub use boundary::{BoundaryOutput, ErrorBoundary};

/// Status text sent with the 404 produced when no document matches the slug.
pub const NOT_FOUND_STATUS_TEXT: &str = "Oops! This page could not be found.";

/// Name of the route parameter holding the document slug.
pub const SLUG_PARAM: &str = "slug";

/// A successful loader result: the payload and the status it should be sent with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loaded<T> {
    pub status: u16,
    pub data: T,
}

impl<T> Loaded<T> {
    pub fn ok(data: T) -> Self {
        Self { status: 200, data }
    }
}

/// An HTTP-style failure thrown on purpose, e.g. a 404 for an unknown slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status: u16,
    pub status_text: String,
}

impl ErrorResponse {
    pub fn new(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(404, NOT_FOUND_STATUS_TEXT)
    }
}

/// What reached the error boundary, classified where the failure was caught.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// A structured failure carrying its own status and status text.
    Response(ErrorResponse),
    /// Any other error, with its message and the chain of errors that caused it.
    Failure { message: String, trace: String },
    /// Something that is not an error value at all, e.g. a panic.
    Unknown,
}

impl RouteError {
    pub fn failure(message: impl Into<String>, trace: impl Into<String>) -> Self {
        RouteError::Failure {
            message: message.into(),
            trace: trace.into(),
        }
    }

    /// Build a [`RouteError::Failure`] from any error, walking its `source()` chain for the trace.
    pub fn from_error(error: &(dyn Error + 'static)) -> Self {
        RouteError::Failure {
            message: error.to_string(),
            trace: error_trace(error),
        }
    }

    /// Status the response carrying this error should be sent with.
    pub fn status(&self) -> u16 {
        match self {
            RouteError::Response(response) => response.status,
            RouteError::Failure { .. } | RouteError::Unknown => 500,
        }
    }
}

impl From<LoaderError> for RouteError {
    fn from(error: LoaderError) -> Self {
        match error {
            LoaderError::NotFound { .. } => RouteError::Response(ErrorResponse::not_found()),
            LoaderError::MissingParam(param) => {
                RouteError::Response(ErrorResponse::new(400, param.to_string()))
            }
            other => RouteError::from_error(&other),
        }
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::Response(response) => {
                write!(f, "{} {}", response.status, response.status_text)
            }
            RouteError::Failure { message, .. } => write!(f, "500 {}", message),
            RouteError::Unknown => write!(f, "500 unknown error"),
        }
    }
}

/// Formats the causes of `error`, one `at <cause>` line each, innermost last.
fn error_trace(error: &(dyn Error + 'static)) -> String {
    let mut lines = Vec::new();
    let mut current = error.source();

    while let Some(cause) = current {
        lines.push(format!("at {}", cause));
        current = cause.source();
    }

    lines.join("\n")
}

/// The data loader of the document route.
///
/// ## Example
/// ```rs
/// use swdocs::content::FsSource;
/// use swdocs::params::RouteParams;
/// use swdocs::route::DocRoute;
///
/// let route = DocRoute::new(FsSource::new("content"));
/// let params: RouteParams = [("slug", "getting-started")].into_iter().collect();
/// let loaded = route.load(&params).await?;
/// assert_eq!(loaded.status, 200);
/// ```
#[derive(Clone)]
pub struct DocRoute {
    source: Arc<dyn DocumentSource>,
    converter: MarkdownConverter,
    category: String,
}

impl DocRoute {
    pub fn new(source: impl DocumentSource + 'static) -> Self {
        Self::from_shared(Arc::new(source))
    }

    pub fn from_shared(source: Arc<dyn DocumentSource>) -> Self {
        Self {
            source,
            converter: MarkdownConverter::default(),
            category: DEFAULT_CATEGORY.to_string(),
        }
    }

    pub fn with_converter(mut self, converter: MarkdownConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn source(&self) -> &dyn DocumentSource {
        self.source.as_ref()
    }

    pub async fn load(&self, params: &RouteParams) -> Result<Loaded<RenderedContent>, LoaderError> {
        let slug = require_param(params, SLUG_PARAM)?;

        let Some(doc) = self.source.lookup(&slug, &self.category).await? else {
            error!(name: "route", "Invalid slug: {}", slug);
            return Err(LoaderError::NotFound { slug });
        };

        let content = self.converter.convert(&doc)?;

        Ok(Loaded::ok(content))
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::content::{ContentFormat, Document, MemorySource};
    use crate::errors::{ParamError, SourceError};

    /// Counts lookups, so tests can assert the source was never reached.
    struct CountingSource {
        inner: MemorySource,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl DocumentSource for CountingSource {
        async fn lookup(
            &self,
            slug: &str,
            category: &str,
        ) -> Result<Option<Document>, SourceError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.lookup(slug, category).await
        }

        fn describe(&self) -> String {
            "counting".into()
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn lines_containing(&self, needle: &str) -> usize {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf)
                .lines()
                .filter(|line| line.contains(needle))
                .count()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn params(slug: &str) -> RouteParams {
        [(SLUG_PARAM, slug)].into_iter().collect()
    }

    fn route_with(source: MemorySource) -> DocRoute {
        DocRoute::new(source)
    }

    #[tokio::test]
    async fn loads_and_converts_existing_document() {
        let raw = "# Getting started\n\nWelcome.\n";
        let route = route_with(MemorySource::new().with_document(
            "sw",
            "getting-started",
            ContentFormat::Markdown,
            raw,
        ));

        let loaded = route.load(&params("getting-started")).await.unwrap();

        let expected = MarkdownConverter::default()
            .convert(&Document::new(
                "getting-started",
                "sw",
                ContentFormat::Markdown,
                raw,
            ))
            .unwrap();
        assert_eq!(loaded.status, 200);
        assert_eq!(loaded.data, expected);
    }

    #[tokio::test]
    async fn missing_document_is_not_found_and_logged_once() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let route = route_with(MemorySource::new());
        let err = route.load(&params("no-such-doc-4821")).await.unwrap_err();

        assert!(matches!(err, LoaderError::NotFound { ref slug } if slug == "no-such-doc-4821"));
        assert_eq!(logs.lines_containing("no-such-doc-4821"), 1);
        assert_eq!(logs.lines_containing("ERROR"), 1);

        let route_error = RouteError::from(err);
        assert_eq!(
            route_error,
            RouteError::Response(ErrorResponse::new(404, NOT_FOUND_STATUS_TEXT))
        );
    }

    #[tokio::test]
    async fn missing_slug_never_reaches_the_source() {
        let source = Arc::new(CountingSource {
            inner: MemorySource::new(),
            lookups: AtomicUsize::new(0),
        });
        let route = DocRoute::from_shared(source.clone());

        let err = route.load(&RouteParams::new()).await.unwrap_err();
        assert!(matches!(err, LoaderError::MissingParam(ParamError::Missing { .. })));

        let err = route.load(&params("")).await.unwrap_err();
        assert!(matches!(err, LoaderError::MissingParam(ParamError::Empty { .. })));

        assert_eq!(source.lookups.load(Ordering::SeqCst), 0);
        assert_eq!(RouteError::from(err).status(), 400);
    }

    #[tokio::test]
    async fn lookup_uses_configured_category() {
        let route = route_with(MemorySource::new().with_document(
            "guides",
            "intro",
            ContentFormat::Markdown,
            "# Intro",
        ));

        assert!(matches!(
            route.load(&params("intro")).await,
            Err(LoaderError::NotFound { .. })
        ));

        let route = route.with_category("guides");
        assert_eq!(route.load(&params("intro")).await.unwrap().status, 200);
    }

    #[tokio::test]
    async fn conversion_failure_becomes_generic_failure() {
        let route = route_with(MemorySource::new().with_document(
            "sw",
            "broken",
            ContentFormat::Markdown,
            "---\ntitle: [oops\n---\n",
        ));

        let err = route.load(&params("broken")).await.unwrap_err();
        assert!(matches!(err, LoaderError::Convert(_)));

        match RouteError::from(err) {
            RouteError::Failure { message, trace } => {
                assert_eq!(message, "Invalid frontmatter in `broken`");
                assert!(trace.starts_with("at "));
            }
            other => panic!("expected a generic failure, got {other:?}"),
        }
    }

    #[test]
    fn trace_lists_every_cause() {
        let inner = io::Error::other("disk on fire");
        let error = SourceError::ReadFailed {
            path: "content/sw/a.md".into(),
            source: inner,
        };

        assert_eq!(
            RouteError::from_error(&error),
            RouteError::failure(
                "Failed to read document file: content/sw/a.md",
                "at disk on fire"
            )
        );
    }
}
