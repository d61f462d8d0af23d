//! The page shell of the document route.
//!
//! The viewer sits behind a client-only gate: until the gate is ready only the [`Skeleton`] is rendered.
//! With [`ViewMode::ClientOnly`] the server always renders the pending state and ships the loader payload
//! along with a small script that mounts the viewer in the browser. With [`ViewMode::Server`] the gate is
//! opened before rendering, so the viewer is rendered on the server.
use std::sync::atomic::{AtomicBool, Ordering};

use maud::{Markup, PreEscaped, Render, html};
use serde::{Deserialize, Serialize};

use crate::content::RenderedContent;
use crate::route::{Loaded, RouteError, boundary::ErrorBoundary};
use crate::templating::components::{DocViewer, Skeleton};
use crate::templating::layout::layout;

const HYDRATE_SCRIPT: &str = include_str!("view/hydrate.js");

/// Id of the `<script type="application/json">` element carrying the loader payload.
pub const ROUTE_DATA_ID: &str = "__route_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    /// Render the skeleton on the server and mount the viewer in the browser.
    #[default]
    ClientOnly,
    /// Render the viewer on the server.
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
}

/// A readiness flag that flips from pending to ready at most once.
#[derive(Debug, Default)]
pub struct ClientGate {
    ready: AtomicBool,
}

impl ClientGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the gate as ready. Returns `true` only for the call that opened it.
    pub fn mount(&self) -> bool {
        !self.ready.swap(true, Ordering::AcqRel)
    }

    pub fn readiness(&self) -> Readiness {
        if self.ready.load(Ordering::Acquire) {
            Readiness::Ready
        } else {
            Readiness::Pending
        }
    }
}

/// Renders `fallback` while pending and `children` once ready, never both.
///
/// `children` is only called once the gate is ready.
pub struct ClientOnly<F, C> {
    pub fallback: F,
    pub children: C,
}

impl<F, C> ClientOnly<F, C>
where
    F: Render,
    C: Fn() -> Markup,
{
    pub fn render_with(&self, readiness: Readiness) -> Markup {
        match readiness {
            Readiness::Pending => html! {
                div data-client-only="pending" { (self.fallback) }
            },
            Readiness::Ready => html! {
                div data-client-only="ready" { ((self.children)()) }
            },
        }
    }
}

/// The full page for a successfully loaded document.
pub struct DocPage<'a> {
    pub loaded: &'a Loaded<RenderedContent>,
    pub site_title: &'a str,
    pub stylesheet: Option<&'a str>,
    pub mode: ViewMode,
}

impl DocPage<'_> {
    pub fn title(&self) -> String {
        match self.loaded.data.title() {
            Some(title) => format!("{} | {}", title, self.site_title),
            None => self.site_title.to_string(),
        }
    }

    pub fn render(&self) -> Result<Markup, serde_json::Error> {
        let gate = ClientGate::new();
        if self.mode == ViewMode::Server {
            gate.mount();
        }
        let readiness = gate.readiness();

        let content = &self.loaded.data;
        let body = ClientOnly {
            fallback: Skeleton,
            children: || DocViewer { content }.render(),
        }
        .render_with(readiness);

        let route_data = match readiness {
            Readiness::Pending => Some(route_data_json(self.loaded)?),
            Readiness::Ready => None,
        };

        Ok(layout(
            &self.title(),
            self.stylesheet,
            html! {
                main { (body) }
                @if let Some(route_data) = route_data {
                    script type="application/json" id=(ROUTE_DATA_ID) { (PreEscaped(route_data)) }
                    script { (PreEscaped(HYDRATE_SCRIPT)) }
                }
            },
        ))
    }
}

/// The page shown when the route failed.
pub struct ErrorPage<'a> {
    pub error: &'a RouteError,
    pub site_title: &'a str,
    pub stylesheet: Option<&'a str>,
}

impl Render for ErrorPage<'_> {
    fn render(&self) -> Markup {
        layout(
            self.site_title,
            self.stylesheet,
            html! {
                main { (ErrorBoundary::render(self.error)) }
            },
        )
    }
}

/// Serializes the loader payload so it can sit inside a `<script>` element.
pub fn route_data_json<T: Serialize>(loaded: &Loaded<T>) -> Result<String, serde_json::Error> {
    // `<` can only appear inside JSON strings, where the escaped form decodes to the same character
    Ok(serde_json::to_string(loaded)?.replace('<', "\\u003c"))
}
