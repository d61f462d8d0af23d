use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::content::{DEFAULT_CATEGORY, DEFAULT_THEME, DocumentSource, FsSource, MarkdownConverter};
use crate::errors::OptionsError;
use crate::route::DocRoute;
use crate::view::ViewMode;

/// Options of a swdocs site. Usually read from `swdocs.toml`, see [`SiteOptions::load`].
///
/// ## Examples
/// Default values:
/// ```toml
/// site_title = "Docs"
/// category = "sw"
/// highlight_theme = "base16-ocean.dark"
/// view_mode = "client-only"
/// static_dir = "static"
///
/// [source]
/// kind = "fs"
/// root = "content"
/// ```
/// Reading from GitHub:
/// ```toml
/// [source]
/// kind = "github"
/// owner = "acme"
/// repo = "handbook"
/// branch = "main"
/// base_path = "docs"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteOptions {
    /// Used in the `<title>` of every page, after the document's own title.
    pub site_title: String,

    /// Category documents are looked up in. The `/sw/{slug}` route reads the `sw` category.
    pub category: String,

    pub source: SourceOptions,

    /// Name of a [syntect](https://docs.rs/syntect) default theme, or a path to a `.tmTheme` file.
    pub highlight_theme: String,

    pub view_mode: ViewMode,

    /// Served under `/static`.
    pub static_dir: PathBuf,

    /// URL of an additional stylesheet linked from every page, e.g. `/static/site.css`.
    pub stylesheet: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceOptions {
    Fs {
        root: PathBuf,
    },
    Github {
        owner: String,
        repo: String,
        #[serde(default = "default_branch")]
        branch: String,
        #[serde(default)]
        base_path: String,
    },
}

fn default_branch() -> String {
    "main".to_string()
}

impl Default for SourceOptions {
    fn default() -> Self {
        SourceOptions::Fs {
            root: "content".into(),
        }
    }
}

/// Provides default values for [`SiteOptions`]. Designed to work for most projects.
impl Default for SiteOptions {
    fn default() -> Self {
        Self {
            site_title: "Docs".into(),
            category: DEFAULT_CATEGORY.into(),
            source: SourceOptions::default(),
            highlight_theme: DEFAULT_THEME.into(),
            view_mode: ViewMode::default(),
            static_dir: "static".into(),
            stylesheet: None,
        }
    }
}

impl SiteOptions {
    pub fn load(path: &Path) -> Result<Self, OptionsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| OptionsError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml(&raw, path)
    }

    /// Parses options from TOML. `path` is only used in error messages.
    pub fn from_toml(raw: &str, path: &Path) -> Result<Self, OptionsError> {
        toml::from_str(raw).map_err(|source| OptionsError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn build_source(&self) -> Result<Arc<dyn DocumentSource>, OptionsError> {
        match &self.source {
            SourceOptions::Fs { root } => Ok(Arc::new(FsSource::new(root))),
            #[cfg(feature = "github")]
            SourceOptions::Github {
                owner,
                repo,
                branch,
                base_path,
            } => Ok(Arc::new(crate::content::GithubSource::new(
                owner, repo, branch, base_path,
            ))),
            #[cfg(not(feature = "github"))]
            SourceOptions::Github { .. } => Err(OptionsError::SourceUnavailable {
                kind: "github".into(),
            }),
        }
    }

    /// The document route as configured by these options.
    pub fn doc_route(&self) -> Result<DocRoute, OptionsError> {
        Ok(DocRoute::from_shared(self.build_source()?)
            .with_category(&self.category)
            .with_converter(MarkdownConverter::new(&self.highlight_theme)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_use_defaults() {
        let options = SiteOptions::from_toml("site_title = \"Handbook\"", Path::new("t.toml"))
            .unwrap();

        assert_eq!(options.site_title, "Handbook");
        assert_eq!(options.category, "sw");
        assert_eq!(options.view_mode, ViewMode::ClientOnly);
        assert_eq!(
            options.source,
            SourceOptions::Fs {
                root: "content".into()
            }
        );
    }

    #[test]
    fn parses_github_source_and_view_mode() {
        let raw = r#"
view_mode = "server"

[source]
kind = "github"
owner = "acme"
repo = "handbook"
"#;
        let options = SiteOptions::from_toml(raw, Path::new("t.toml")).unwrap();

        assert_eq!(options.view_mode, ViewMode::Server);
        assert_eq!(
            options.source,
            SourceOptions::Github {
                owner: "acme".into(),
                repo: "handbook".into(),
                branch: "main".into(),
                base_path: String::new(),
            }
        );
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = SiteOptions::from_toml("sitetitle = \"typo\"", Path::new("t.toml")).unwrap_err();
        assert!(matches!(err, OptionsError::ParseFailed { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("swdocs.toml");
        std::fs::write(&path, "category = \"guides\"\n").unwrap();

        let options = SiteOptions::load(&path).unwrap();
        assert_eq!(options.category, "guides");
        assert_eq!(options.doc_route().unwrap().category(), "guides");

        let err = SiteOptions::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, OptionsError::ReadFailed { .. }));
    }
}
