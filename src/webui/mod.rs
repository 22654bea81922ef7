//! Local web configurator.
//!
//! Serves a single-page form on localhost plus a small JSON API. One
//! session per process: the state lives in a mutex-guarded record that
//! every handler receives explicitly.

mod handlers;
mod page;
mod session;

pub use session::{ImageAction, SessionState, UserProfile};

use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use tiny_http::{Header, Response, Server};
use tracing::{error, info};

use crate::config::Config;

const MAX_JSON_BYTES: usize = 64 * 1024;
const MAX_IMAGE_BYTES: usize = 8 * 1024 * 1024; // 8 MiB

/// Everything a handler needs: the session record plus the environment.
pub struct ServerContext {
    pub work_dir: PathBuf,
    pub store_path: PathBuf,
    pub session: Mutex<SessionState>,
}

/// Run the configurator until the process is stopped.
pub fn serve(config: &Config, work_dir: PathBuf) -> Result<()> {
    let bind_addr = format!("127.0.0.1:{}", config.server.port);
    let server =
        Server::http(&bind_addr).map_err(|e| anyhow!("failed to bind {bind_addr}: {e}"))?;
    info!("configurator listening on http://{bind_addr}");

    let ctx = Arc::new(ServerContext {
        store_path: work_dir.join(&config.paths.store_file),
        work_dir,
        session: Mutex::new(SessionState::default()),
    });

    for mut request in server.incoming_requests() {
        let method = request.method().to_string();
        let url = request.url().to_string();
        let path = url.split('?').next().unwrap_or(url.as_str()).to_string();

        match (method.as_str(), path.as_str()) {
            ("GET", "/") => respond_html(request, page::INDEX_HTML),
            ("GET", "/api/state") => handlers::state_snapshot(&ctx, request),
            ("POST", "/api/profile") => match read_body(&mut request, MAX_JSON_BYTES) {
                Ok(body) => handlers::set_profile(&ctx, &body, request),
                Err(response) => {
                    let _ = request.respond(response);
                }
            },
            ("POST", "/api/sites/select") => match read_body(&mut request, MAX_JSON_BYTES) {
                Ok(body) => handlers::select_sites(&ctx, &body, request),
                Err(response) => {
                    let _ = request.respond(response);
                }
            },
            ("POST", "/api/sites/custom") => match read_body(&mut request, MAX_JSON_BYTES) {
                Ok(body) => handlers::add_custom_site(&ctx, &body, request),
                Err(response) => {
                    let _ = request.respond(response);
                }
            },
            ("DELETE", _) if path.starts_with("/api/sites/custom/") => {
                handlers::remove_custom_site(&ctx, &path, request)
            }
            ("POST", "/api/credentials") => match read_body(&mut request, MAX_JSON_BYTES) {
                Ok(body) => handlers::save_credentials(&ctx, &body, request),
                Err(response) => {
                    let _ = request.respond(response);
                }
            },
            ("POST", "/api/images") => match read_body(&mut request, MAX_IMAGE_BYTES) {
                Ok(body) => handlers::upload_image(&ctx, body, request),
                Err(response) => {
                    let _ = request.respond(response);
                }
            },
            ("POST", "/api/images/action") => match read_body(&mut request, MAX_JSON_BYTES) {
                Ok(body) => handlers::set_image_action(&ctx, &body, request),
                Err(response) => {
                    let _ = request.respond(response);
                }
            },
            ("POST", "/api/package") => handlers::build_package(&ctx, request),
            _ => respond_json(request, 404, serde_json::json!({ "error": "not_found" })),
        }
    }

    Ok(())
}

fn json_content_type() -> Header {
    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .unwrap_or_else(|()| unreachable!("static header"))
}

fn respond_json(request: tiny_http::Request, status_code: u16, value: serde_json::Value) {
    let body =
        serde_json::to_string(&value).unwrap_or_else(|_| "{\"error\":\"serialize\"}".to_string());
    let response = Response::from_string(body)
        .with_status_code(status_code)
        .with_header(json_content_type());
    let _ = request.respond(response);
}

fn respond_html(request: tiny_http::Request, html: &str) {
    let header = Header::from_bytes(&b"Content-Type"[..], &b"text/html; charset=utf-8"[..])
        .unwrap_or_else(|()| unreachable!("static header"));
    let response = Response::from_string(html).with_header(header);
    let _ = request.respond(response);
}

fn read_body(
    request: &mut tiny_http::Request,
    limit: usize,
) -> Result<Vec<u8>, Response<std::io::Cursor<Vec<u8>>>> {
    let mut body = Vec::new();
    let mut reader = request.as_reader().take((limit + 1) as u64);
    if let Err(e) = reader.read_to_end(&mut body) {
        error!("failed to read request body: {e}");
        let response = Response::from_string("{\"error\":\"bad_request\"}")
            .with_status_code(400)
            .with_header(json_content_type());
        return Err(response);
    }

    if body.len() > limit {
        let response = Response::from_string("{\"error\":\"payload_too_large\"}")
            .with_status_code(413)
            .with_header(json_content_type());
        return Err(response);
    }

    Ok(body)
}

fn header_value(request: &tiny_http::Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.equiv(name))
        .map(|header| header.value.as_str().to_string())
}
