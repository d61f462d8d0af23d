use axum::{
    body::Body,
    extract::Request,
    http::Uri,
    middleware::Next,
    response::Response,
};
use colored::Colorize;
use local_ip_address::local_ip;
use std::{
    net::{IpAddr, SocketAddr},
    time::Duration,
};
use tokio::net::TcpSocket;
use tower_http::trace::OnResponse;
use tracing::{Span, debug, info};

use crate::logging::{FormatElapsedTimeOptions, format_elapsed_time};

pub fn log_server_start(start_time: quanta::Instant, host: bool, addr: SocketAddr) {
    info!(name: "SKIP_FORMAT", "");
    let elapsed_time =
        format_elapsed_time(start_time.elapsed(), &FormatElapsedTimeOptions::startup());
    info!(name: "SKIP_FORMAT", "{} {}", "swdocs 📄".bold().bright_blue(), format!("server started in {}", elapsed_time));
    info!(name: "SKIP_FORMAT", "");

    let port = addr.port();
    let url = format!("\x1b]8;;http://localhost:{port}\x1b\\http://localhost:{port}\x1b]8;;\x1b\\")
        .bold()
        .underline()
        .bright_blue();
    let network_url = if host {
        match local_ip() {
            Ok(local_ip) => format!(
                "\x1b]8;;http://{local_ip}:{port}\x1b\\http://{local_ip}:{port}\x1b]8;;\x1b\\"
            )
            .bold()
            .underline()
            .bright_magenta(),
            Err(_) => "Could not determine the local network address".dimmed(),
        }
    } else {
        "Use --host to expose the server to your network".dimmed()
    };
    info!(name: "SKIP_FORMAT", "🮔  {}    {}", "Local".bold(), url);
    info!(name: "SKIP_FORMAT", "🮔  {}  {}", "Network".bold(), network_url);
    info!(name: "SKIP_FORMAT", "");

    info!(name: "server", "{}", "waiting for requests...".dimmed());
}

/// Copies the request URI into the response extensions, so [`CustomOnResponse`] can log it.
pub async fn remember_request_uri(req: Request, next: Next) -> Response {
    let uri = req.uri().clone();
    let mut response = next.run(req).await;
    response.extensions_mut().insert(uri);
    response
}

#[derive(Clone, Debug)]
pub struct CustomOnResponse;

impl OnResponse<Body> for CustomOnResponse {
    fn on_response(self, response: &Response<Body>, latency: Duration, _span: &Span) {
        let status = response.status();

        // Skip informational responses
        if status.is_informational() {
            return;
        }

        let status = if status.is_server_error() {
            status.to_string().red()
        } else if status.is_client_error() {
            status.to_string().yellow()
        } else {
            status.to_string().green()
        };

        let uri = response
            .extensions()
            .get::<Uri>()
            .map(Uri::to_string)
            .unwrap_or_default()
            .bold();

        let latency = format_elapsed_time(latency, &FormatElapsedTimeOptions::default());

        let message = format!("{} {} {}", status, uri, latency);

        info!(name: "", "{}", message);
    }
}

pub async fn find_open_port(address: &IpAddr, starting_port: u16) -> std::io::Result<u16> {
    let mut port = starting_port;

    loop {
        let socket = match address {
            IpAddr::V4(_) => TcpSocket::new_v4()?,
            IpAddr::V6(_) => TcpSocket::new_v6()?,
        };
        let socket_addr = SocketAddr::new(*address, port);
        match socket.bind(socket_addr) {
            Ok(_) => {
                debug!("Found open port: {}", port);
                return Ok(port);
            }
            Err(err) if port == u16::MAX => return Err(err),
            Err(_) => {
                debug!(
                    "Port {} is already in use or failed to bind, trying next one",
                    port
                );
                port += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn skips_ports_in_use() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let taken_port = taken.local_addr().unwrap().port();

        let port = find_open_port(&IpAddr::from([127, 0, 0, 1]), taken_port)
            .await
            .unwrap();
        assert_ne!(port, taken_port);
        assert!(port > taken_port);
    }
}
