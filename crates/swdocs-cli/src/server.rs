use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderName, HeaderValue, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use futures::FutureExt;
use maud::{Markup, Render};
use quanta::Instant;
use serde::Deserialize;
use swdocs::{
    SiteOptions,
    content::RenderedContent,
    errors::{OptionsError, SwdocsError},
    params::RouteParams,
    route::{
        BoundaryOutput, DocRoute, ErrorBoundary, ErrorResponse, Loaded, RouteError,
        boundary::UNKNOWN_ERROR_HEADING,
    },
    view::{DocPage, ErrorPage},
};
use tokio::{net::TcpSocket, signal};
use tower_http::{
    services::ServeDir,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::{Level, debug, error, warn};

use crate::server_utils::{CustomOnResponse, find_open_port, log_server_start, remember_request_uri};

/// Header carrying the status text of a failed data request.
pub const STATUS_TEXT_HEADER: &str = "x-status-text";

#[derive(Clone)]
pub struct AppState {
    route: DocRoute,
    options: Arc<SiteOptions>,
}

impl AppState {
    pub fn new(options: SiteOptions) -> Result<Self, OptionsError> {
        Ok(Self::with_route(options.doc_route()?, options))
    }

    pub fn with_route(route: DocRoute, options: SiteOptions) -> Self {
        Self {
            route,
            options: Arc::new(options),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RouteQuery {
    /// Present (even empty) on data requests, e.g. `/sw/intro?_data`.
    #[serde(rename = "_data")]
    data: Option<String>,
}

pub fn router(state: AppState) -> Router {
    let static_dir = ServeDir::new(&state.options.static_dir);

    Router::new()
        .route("/sw/{slug}", get(doc_page))
        .route("/sw/", get(doc_index))
        .route("/sw", get(doc_index))
        .nest_service("/static", static_dir)
        .fallback(not_found)
        .layer(middleware::from_fn(remember_request_uri))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(CustomOnResponse),
        )
        .with_state(state)
}

async fn doc_page(
    State(state): State<AppState>,
    Path(params): Path<HashMap<String, String>>,
    Query(query): Query<RouteQuery>,
) -> Response {
    respond(&state, RouteParams::from(params), query).await
}

/// `/sw/` without a slug still goes through the loader, which rejects the missing parameter.
async fn doc_index(State(state): State<AppState>, Query(query): Query<RouteQuery>) -> Response {
    respond(&state, RouteParams::new(), query).await
}

async fn not_found(State(state): State<AppState>) -> Response {
    let error = RouteError::Response(ErrorResponse::not_found());
    html_response(error.status(), error_page(&state.options, &error))
}

async fn respond(state: &AppState, params: RouteParams, query: RouteQuery) -> Response {
    if query.data.is_some() {
        data_response(run_loader(&state.route, &params).await)
    } else {
        let (status, markup) = render_page(state, &params).await;
        html_response(status, markup)
    }
}

/// Awaits `future`, turning a panic into [`RouteError::Unknown`].
async fn catch_panics<T>(future: impl Future<Output = Result<T, RouteError>>) -> Result<T, RouteError> {
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(_) => {
            error!(name: "route", "Request handler panicked");
            Err(RouteError::Unknown)
        }
    }
}

async fn run_loader(
    route: &DocRoute,
    params: &RouteParams,
) -> Result<Loaded<RenderedContent>, RouteError> {
    catch_panics(async { route.load(params).await.map_err(RouteError::from) }).await
}

/// Loads the document and renders either its page or the error boundary, with the status to send.
pub async fn render_page(state: &AppState, params: &RouteParams) -> (u16, Markup) {
    let options = &state.options;

    let rendered = catch_panics(async {
        let loaded = state.route.load(params).await?;
        let markup = DocPage {
            loaded: &loaded,
            site_title: &options.site_title,
            stylesheet: options.stylesheet.as_deref(),
            mode: options.view_mode,
        }
        .render()
        .map_err(|err| RouteError::from_error(&err))?;

        Ok::<_, RouteError>((loaded.status, markup))
    })
    .await;

    match rendered {
        Ok(page) => page,
        Err(error) => {
            if error.status() >= 500 {
                error!(name: "route", "{}", error);
            } else {
                debug!("{}", error);
            }
            (error.status(), error_page(options, &error))
        }
    }
}

fn error_page(options: &SiteOptions, error: &RouteError) -> Markup {
    ErrorPage {
        error,
        site_title: &options.site_title,
        stylesheet: options.stylesheet.as_deref(),
    }
    .render()
}

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn html_response(status: u16, markup: Markup) -> Response {
    (status_code(status), Html(markup.into_string())).into_response()
}

fn data_response(result: Result<Loaded<RenderedContent>, RouteError>) -> Response {
    match result {
        Ok(loaded) => (status_code(loaded.status), Json(loaded.data)).into_response(),
        Err(error) => {
            let mut response = (status_code(error.status()), Json(None::<()>)).into_response();
            match HeaderValue::from_str(&header_safe(&status_text(&error))) {
                Ok(value) => {
                    response
                        .headers_mut()
                        .insert(HeaderName::from_static(STATUS_TEXT_HEADER), value);
                }
                Err(err) => warn!(name: "route", "Could not send status text: {}", err),
            }
            response
        }
    }
}

/// The same text the error boundary shows for `error`.
fn status_text(error: &RouteError) -> String {
    match ErrorBoundary::classify(error) {
        BoundaryOutput::Display { status_text, .. } => status_text,
        BoundaryOutput::UnknownHeading => UNKNOWN_ERROR_HEADING.to_string(),
    }
}

/// Header values only allow visible ASCII and spaces.
fn header_safe(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            ' ' => ' ',
            c if c.is_ascii_graphic() => c,
            _ => '?',
        })
        .collect()
}

pub async fn start_server(options: SiteOptions, host: bool, port: u16) -> Result<(), SwdocsError> {
    let start_time = Instant::now();
    let state = AppState::new(options)?;

    debug!("reading documents from {}", state.route.source().describe());

    // Listen on every interface with --host, otherwise localhost only
    let addr = if host {
        IpAddr::from([0, 0, 0, 0])
    } else {
        IpAddr::from([127, 0, 0, 1])
    };

    let port = find_open_port(&addr, port).await?;
    let socket = TcpSocket::new_v4()?;
    socket.bind(SocketAddr::new(addr, port))?;

    let listener = socket.listen(1024)?;
    let local_addr = listener.local_addr()?;

    debug!("listening on {}", local_addr);

    log_server_start(start_time, host, local_addr);

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(name: "server", "Could not listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(err) => {
                warn!(name: "server", "Could not listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use swdocs::{
        content::{ContentFormat, Document, MemorySource},
        errors::SourceError,
        route::NOT_FOUND_STATUS_TEXT,
        view::ViewMode,
    };

    use super::*;

    struct PanickingSource;

    #[async_trait]
    impl swdocs::content::DocumentSource for PanickingSource {
        async fn lookup(&self, _slug: &str, _category: &str) -> Result<Option<Document>, SourceError> {
            panic!("source exploded");
        }

        fn describe(&self) -> String {
            "panicking".into()
        }
    }

    struct Fetched {
        status: u16,
        status_text: Option<String>,
        body: String,
    }

    fn docs() -> MemorySource {
        MemorySource::new().with_document(
            "sw",
            "intro",
            ContentFormat::Markdown,
            "---\ntitle: Intro\n---\n\n# Intro\n\nRead me.\n",
        )
    }

    async fn spawn(state: AppState) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state).into_make_service())
                .await
                .unwrap();
        });
        addr
    }

    async fn spawn_with(route: DocRoute, options: SiteOptions) -> SocketAddr {
        spawn(AppState::with_route(route, options)).await
    }

    async fn get(addr: SocketAddr, path: &str) -> Fetched {
        let url = format!("http://{addr}{path}");
        tokio::task::spawn_blocking(move || {
            let agent: ureq::Agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .into();
            let mut response = agent.get(&url).call().unwrap();
            let status_text = response
                .headers()
                .get(STATUS_TEXT_HEADER)
                .map(|value| value.to_str().unwrap().to_string());
            Fetched {
                status: response.status().as_u16(),
                status_text,
                body: response.body_mut().read_to_string().unwrap(),
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn existing_document_renders_skeleton_page() {
        let addr = spawn_with(DocRoute::new(docs()), SiteOptions::default()).await;

        let res = get(addr, "/sw/intro").await;
        assert_eq!(res.status, 200);
        assert!(res.body.contains("data-client-only=\"pending\""));
        assert!(res.body.contains("<title>Intro | Docs</title>"));
    }

    #[tokio::test]
    async fn server_view_mode_renders_viewer() {
        let options = SiteOptions {
            view_mode: ViewMode::Server,
            ..Default::default()
        };
        let addr = spawn_with(DocRoute::new(docs()), options).await;

        let res = get(addr, "/sw/intro").await;
        assert_eq!(res.status, 200);
        assert!(res.body.contains("data-client-only=\"ready\""));
        assert!(res.body.contains("<p>Read me.</p>"));
    }

    #[tokio::test]
    async fn missing_document_is_404_with_fixed_text() {
        let addr = spawn_with(DocRoute::new(docs()), SiteOptions::default()).await;

        let res = get(addr, "/sw/no-such-doc").await;
        assert_eq!(res.status, 404);
        assert!(res.body.contains(NOT_FOUND_STATUS_TEXT));
    }

    #[tokio::test]
    async fn missing_slug_is_400() {
        let addr = spawn_with(DocRoute::new(docs()), SiteOptions::default()).await;

        assert_eq!(get(addr, "/sw/").await.status, 400);
        assert_eq!(get(addr, "/sw").await.status, 400);
    }

    #[tokio::test]
    async fn unknown_paths_are_404() {
        let addr = spawn_with(DocRoute::new(docs()), SiteOptions::default()).await;

        let res = get(addr, "/elsewhere").await;
        assert_eq!(res.status, 404);
        assert!(res.body.contains(NOT_FOUND_STATUS_TEXT));
    }

    #[tokio::test]
    async fn data_requests_return_json() {
        let addr = spawn_with(DocRoute::new(docs()), SiteOptions::default()).await;

        let res = get(addr, "/sw/intro?_data").await;
        assert_eq!(res.status, 200);
        let content: RenderedContent = serde_json::from_str(&res.body).unwrap();
        assert_eq!(content.slug, "intro");
        assert_eq!(content.title(), Some("Intro"));

        let res = get(addr, "/sw/nope?_data").await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body, "null");
        assert_eq!(res.status_text.as_deref(), Some(NOT_FOUND_STATUS_TEXT));
    }

    #[tokio::test]
    async fn panicking_loader_shows_unknown_error() {
        let addr = spawn_with(DocRoute::new(PanickingSource), SiteOptions::default()).await;

        let res = get(addr, "/sw/intro").await;
        assert_eq!(res.status, 500);
        assert!(res.body.contains(UNKNOWN_ERROR_HEADING));

        let res = get(addr, "/sw/intro?_data").await;
        assert_eq!(res.status, 500);
        assert_eq!(res.status_text.as_deref(), Some(UNKNOWN_ERROR_HEADING));
    }

    #[tokio::test]
    async fn failed_conversion_sends_boundary_text_on_data_requests() {
        let source = MemorySource::new().with_document(
            "sw",
            "broken",
            ContentFormat::Markdown,
            "---\ntitle: [oops\n---\n",
        );
        let addr = spawn_with(DocRoute::new(source), SiteOptions::default()).await;

        let res = get(addr, "/sw/broken?_data").await;
        assert_eq!(res.status, 500);
        assert_eq!(res.body, "null");
        let status_text = res.status_text.unwrap();
        assert!(status_text.starts_with("Message: Invalid frontmatter in `broken`. Stack: at "));

        let page = get(addr, "/sw/broken").await;
        assert_eq!(page.status, 500);
        assert!(page.body.contains("Message: Invalid frontmatter in `broken`. Stack: at "));
    }

    #[test]
    fn header_text_is_sanitized() {
        assert_eq!(header_safe("Oops! Not found."), "Oops! Not found.");
        assert_eq!(header_safe("line\nbreak é"), "line?break ?");
    }
}
