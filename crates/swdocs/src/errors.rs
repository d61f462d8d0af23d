//! Error types for swdocs.
use std::fmt::{self, Debug, Formatter};
use std::path::PathBuf;
use thiserror::Error;

macro_rules! impl_debug_for_error {
    ($($t:ty),*) => {
        $(
            impl Debug for $t {
                fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                    // Rust uses the Debug trait to show errors when they're returned from main,
                    // but thiserror uses the Display trait. This redirects Debug to Display.
                    write!(f, "{}", self)
                }
            }
        )*
    };
}

/// Failure to extract a required route parameter.
#[derive(Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("Missing required route parameter `{name}`")]
    Missing { name: String },
    #[error("Route parameter `{name}` must not be empty")]
    Empty { name: String },
    #[error("Route parameter `{name}` is invalid: {reason}")]
    Invalid { name: String, reason: String },
}

/// Failure of a content source. Absence of a document is not an error.
#[derive(Error)]
pub enum SourceError {
    #[error("Failed to read document file: {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("Content source task was interrupted")]
    Interrupted(#[from] tokio::task::JoinError),
}

/// Failure to convert a document into renderable content.
#[derive(Error)]
pub enum ConvertError {
    #[error("Invalid frontmatter in `{slug}`")]
    Frontmatter {
        slug: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Theme '{theme}' not found in default themes and could not be loaded from file")]
    UnknownTheme { theme: String },
    #[error("Failed to highlight code block in `{slug}`")]
    Highlight {
        slug: String,
        #[source]
        source: syntect::Error,
    },
}

/// Everything the data loader can fail with.
#[derive(Error)]
pub enum LoaderError {
    #[error("No document found for slug `{slug}`")]
    NotFound { slug: String },
    #[error(transparent)]
    MissingParam(#[from] ParamError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
}

#[derive(Error)]
pub enum OptionsError {
    #[error("Failed to read options file: {path}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse options file: {path}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("The `{kind}` content source is not available in this build")]
    SourceUnavailable { kind: String },
}

#[derive(Error, Debug)]
pub enum SwdocsError {
    #[error(transparent)]
    Options(#[from] OptionsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl_debug_for_error!(ParamError, SourceError, ConvertError, LoaderError, OptionsError);
