//! Built-in [`DocumentSource`] implementations.
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::{ContentFormat, Document, DocumentSource, is_valid_slug};
use crate::errors::SourceError;

/// Reads documents from a directory, laid out as `<root>/<category>/<slug>.mdx` (or `.md`).
#[derive(Debug, Clone)]
pub struct FsSource {
    root: PathBuf,
}

impl FsSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl DocumentSource for FsSource {
    async fn lookup(&self, slug: &str, category: &str) -> Result<Option<Document>, SourceError> {
        if !is_valid_slug(slug) || !is_valid_slug(category) {
            debug!(name: "source", "refusing to read `{}/{}` from disk", category, slug);
            return Ok(None);
        }

        for format in ContentFormat::LOOKUP_ORDER {
            let path = self
                .root
                .join(category)
                .join(format!("{}.{}", slug, format.extension()));

            match tokio::fs::read_to_string(&path).await {
                Ok(raw_content) => {
                    return Ok(Some(Document::new(slug, category, format, raw_content)));
                }
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(source) => return Err(SourceError::ReadFailed { path, source }),
            }
        }

        Ok(None)
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }
}

/// Keeps documents in memory. Mostly useful for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: FxHashMap<(String, String), (ContentFormat, String)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        category: impl Into<String>,
        slug: impl Into<String>,
        format: ContentFormat,
        raw_content: impl Into<String>,
    ) {
        self.documents
            .insert((category.into(), slug.into()), (format, raw_content.into()));
    }

    pub fn with_document(
        mut self,
        category: impl Into<String>,
        slug: impl Into<String>,
        format: ContentFormat,
        raw_content: impl Into<String>,
    ) -> Self {
        self.insert(category, slug, format, raw_content);
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DocumentSource for MemorySource {
    async fn lookup(&self, slug: &str, category: &str) -> Result<Option<Document>, SourceError> {
        Ok(self
            .documents
            .get(&(category.to_string(), slug.to_string()))
            .map(|(format, raw)| Document::new(slug, category, *format, raw.clone())))
    }

    fn describe(&self) -> String {
        format!("memory ({} documents)", self.documents.len())
    }
}

#[cfg(feature = "github")]
pub use github::GithubSource;

#[cfg(feature = "github")]
mod github {
    use super::*;

    const RAW_GITHUB_URL: &str = "https://raw.githubusercontent.com";

    /// Fetches documents from a GitHub repository through `raw.githubusercontent.com`.
    ///
    /// Documents live at `<base_path>/<category>/<slug>.mdx` (or `.md`) on the given branch.
    #[derive(Clone)]
    pub struct GithubSource {
        base_url: String,
        agent: ureq::Agent,
    }

    impl GithubSource {
        pub fn new(owner: &str, repo: &str, branch: &str, base_path: &str) -> Self {
            let base_path = base_path.trim_matches('/');
            let base_url = if base_path.is_empty() {
                format!("{RAW_GITHUB_URL}/{owner}/{repo}/{branch}")
            } else {
                format!("{RAW_GITHUB_URL}/{owner}/{repo}/{branch}/{base_path}")
            };

            Self::with_base_url(base_url)
        }

        /// Use an arbitrary base URL instead of GitHub, e.g. a mirror.
        pub fn with_base_url(base_url: impl Into<String>) -> Self {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .into();

            Self {
                base_url: base_url.into().trim_end_matches('/').to_string(),
                agent,
            }
        }

        pub fn document_url(&self, slug: &str, category: &str, format: ContentFormat) -> String {
            format!(
                "{}/{}/{}.{}",
                self.base_url,
                category,
                slug,
                format.extension()
            )
        }
    }

    fn fetch(agent: &ureq::Agent, url: &str) -> Result<Option<String>, SourceError> {
        let to_error = |source: ureq::Error| SourceError::Http {
            url: url.to_string(),
            source: Box::new(source),
        };

        let mut response = agent.get(url).call().map_err(to_error)?;
        let status = response.status();

        if status.as_u16() == 404 {
            return Ok(None);
        }

        if !status.is_success() {
            return Err(SourceError::Http {
                url: url.to_string(),
                source: format!("unexpected status {status}").into(),
            });
        }

        response
            .body_mut()
            .read_to_string()
            .map(Some)
            .map_err(to_error)
    }

    #[async_trait]
    impl DocumentSource for GithubSource {
        async fn lookup(
            &self,
            slug: &str,
            category: &str,
        ) -> Result<Option<Document>, SourceError> {
            if !is_valid_slug(slug) || !is_valid_slug(category) {
                return Ok(None);
            }

            for format in ContentFormat::LOOKUP_ORDER {
                let url = self.document_url(slug, category, format);
                let agent = self.agent.clone();

                debug!(name: "source", "fetching {}", url);
                let fetched = tokio::task::spawn_blocking(move || fetch(&agent, &url)).await??;

                if let Some(raw_content) = fetched {
                    return Ok(Some(Document::new(slug, category, format, raw_content)));
                }
            }

            Ok(None)
        }

        fn describe(&self) -> String {
            self.base_url.clone()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn builds_raw_urls() {
            let source = GithubSource::new("acme", "docs", "main", "/content/");
            assert_eq!(
                source.document_url("intro", "sw", ContentFormat::Mdx),
                "https://raw.githubusercontent.com/acme/docs/main/content/sw/intro.mdx"
            );

            let source = GithubSource::new("acme", "docs", "main", "");
            assert_eq!(
                source.document_url("intro", "sw", ContentFormat::Markdown),
                "https://raw.githubusercontent.com/acme/docs/main/sw/intro.md"
            );
        }

        #[tokio::test]
        async fn invalid_slug_is_absent_without_fetching() {
            // The base URL is unroutable, so reaching the network would fail the test.
            let source = GithubSource::with_base_url("http://127.0.0.1:9");
            assert!(source.lookup("../etc", "sw").await.unwrap().is_none());
        }
    }
}
