//! Documents, the sources they are looked up in, and their conversion to HTML.
//!
//! A [`DocumentSource`] answers "is there a document for this slug in this category?". Absence is
//! a normal answer (`Ok(None)`), not an error. Found documents are turned into [`RenderedContent`]
//! by a [`MarkdownConverter`].
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod highlight;
pub mod markdown;
mod slugger;
pub mod sources;

use crate::errors::SourceError;
pub use markdown::{
    DEFAULT_THEME, Frontmatter, MarkdownConverter, MarkdownHeading, RenderedContent,
    strip_mdx_esm,
};
#[cfg(feature = "github")]
pub use sources::GithubSource;
pub use sources::{FsSource, MemorySource};

/// Category the `/sw/{slug}` route looks documents up in.
pub const DEFAULT_CATEGORY: &str = "sw";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFormat {
    Markdown,
    Mdx,
}

impl ContentFormat {
    /// Extensions are tried in this order when looking a slug up.
    pub const LOOKUP_ORDER: [ContentFormat; 2] = [ContentFormat::Mdx, ContentFormat::Markdown];

    pub fn extension(&self) -> &'static str {
        match self {
            ContentFormat::Markdown => "md",
            ContentFormat::Mdx => "mdx",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "md" | "markdown" => Some(ContentFormat::Markdown),
            "mdx" => Some(ContentFormat::Mdx),
            _ => None,
        }
    }
}

/// A raw document, as returned by a [`DocumentSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub slug: String,
    pub category: String,
    pub format: ContentFormat,
    pub raw_content: String,
}

impl Document {
    pub fn new(
        slug: impl Into<String>,
        category: impl Into<String>,
        format: ContentFormat,
        raw_content: impl Into<String>,
    ) -> Self {
        Self {
            slug: slug.into(),
            category: category.into(),
            format,
            raw_content: raw_content.into(),
        }
    }
}

/// Somewhere documents can be looked up by slug and category.
///
/// ## Example
/// ```rs
/// use swdocs::content::{DocumentSource, FsSource};
///
/// let source = FsSource::new("content");
/// // Reads content/sw/getting-started.mdx, or content/sw/getting-started.md
/// let doc = source.lookup("getting-started", "sw").await?;
/// ```
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn lookup(&self, slug: &str, category: &str) -> Result<Option<Document>, SourceError>;

    /// Short human-readable description, used in logs.
    fn describe(&self) -> String;
}

#[async_trait]
impl<S: DocumentSource + ?Sized> DocumentSource for Arc<S> {
    async fn lookup(&self, slug: &str, category: &str) -> Result<Option<Document>, SourceError> {
        (**self).lookup(slug, category).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Whether `slug` is a URL-safe identifier that can be used as a file stem.
///
/// Only ASCII alphanumerics, `-`, `_` and `.` are allowed, and the slug may not start with a dot.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('.')
        && !slug.contains("..")
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Escapes `value` for use inside a double-quoted HTML attribute.
pub(crate) fn escape_attribute(value: &str) -> String {
    maud::html! { (value) }.into_string()
}
