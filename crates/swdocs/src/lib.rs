#![cfg_attr(docsrs, feature(doc_cfg))]
//! Serve Markdown and MDX documents from a `/sw/{slug}` route.
//!
//! A request goes through three steps:
//! - the [data loader](route::DocRoute::load) extracts the slug, looks the document up in a
//!   [content source](content::DocumentSource) and converts it to HTML,
//! - on success, the [page](view::DocPage) renders a skeleton until the client-only gate is ready, then the document viewer,
//! - on failure, the [error boundary](route::ErrorBoundary) classifies the error and renders it.
//!
//! ## Example
//! ```rs
//! use swdocs::{content::FsSource, params::RouteParams, route::DocRoute};
//!
//! let route = DocRoute::new(FsSource::new("content"));
//! let params: RouteParams = [("slug", "getting-started")].into_iter().collect();
//! match route.load(&params).await {
//!     Ok(loaded) => println!("{}", loaded.data.html),
//!     Err(err) => eprintln!("{}", swdocs::route::RouteError::from(err)),
//! }
//! ```

// Modules the end-user will interact directly or indirectly with
pub mod content;
pub mod errors;
pub mod params;
pub mod route;
pub mod view;

mod options;
pub mod templating;

pub use options::{SiteOptions, SourceOptions};

/// Metadata for the `generator` meta tag, e.g. `swdocs v0.1.0`.
pub const GENERATOR: &str = concat!("swdocs v", env!("CARGO_PKG_VERSION"));
