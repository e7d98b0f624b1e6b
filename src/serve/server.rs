// src/serve/server.rs

//! Live-reload HTTP server (axum).

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{
        IntoResponse, Response, Sse,
        sse::{Event, KeepAlive},
    },
    routing::get,
};
use regex::Regex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::{Stream, StreamExt, wrappers::BroadcastStream};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::serve::hub::{HubMessage, ReloadHub};

/// Server-Sent Events endpoint browsers subscribe to.
pub const EVENTS_PATH: &str = "/__devpipe/events";
/// Reload client script injected into HTML pages.
pub const RELOAD_SCRIPT_PATH: &str = "/__devpipe/reload.js";

const RELOAD_SCRIPT: &str = r#"(function () {
  var source = new EventSource("/__devpipe/events");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
})();
"#;

static BODY_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</body\s*>").expect("body regex is valid"));

#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub root: PathBuf,
    /// File served for `/` and for directory requests.
    pub index: String,
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
struct ServeState {
    root: PathBuf,
    index: String,
    hub: ReloadHub,
}

/// A running server.
///
/// Dropping the handle requests shutdown without waiting for it.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    hub: ReloadHub,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl ServerHandle {
    /// The bound address (useful when the port was 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections, end reload streams and wait for the
    /// server task to finish.
    pub async fn shutdown(mut self) {
        self.request_shutdown();
        if let Some(join) = self.join.take() {
            if let Err(err) = join.await {
                warn!(error = %err, "server task ended abnormally");
            }
        }
        info!(addr = %self.addr, "server stopped");
    }

    fn request_shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            self.hub.close_all();
            let _ = tx.send(());
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.request_shutdown();
    }
}

/// Bind and start serving `options.root` in the background.
pub async fn start(options: ServeOptions, hub: ReloadHub) -> Result<ServerHandle> {
    let listener = TcpListener::bind(options.addr)
        .await
        .with_context(|| format!("binding live-reload server to {}", options.addr))?;
    let addr = listener
        .local_addr()
        .context("reading bound server address")?;

    let state = ServeState {
        root: options.root.clone(),
        index: options.index.clone(),
        hub: hub.clone(),
    };
    let app = router(state);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let join = tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(err) = served {
            warn!(error = %err, "live-reload server error");
        }
    });

    info!(url = %format!("http://{addr}"), root = %options.root.display(), "serving");

    Ok(ServerHandle {
        addr,
        hub,
        shutdown_tx: Some(shutdown_tx),
        join: Some(join),
    })
}

fn router(state: ServeState) -> Router {
    Router::new()
        .route(EVENTS_PATH, get(handle_events))
        .route(RELOAD_SCRIPT_PATH, get(handle_reload_script))
        .fallback(handle_file)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(Arc::new(state))
}

async fn handle_events(
    State(state): State<Arc<ServeState>>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.hub.subscribe();
    debug!(clients = state.hub.client_count(), "reload client connected");

    // A lagged receiver missed reloads; one reload covers them.
    let stream = BroadcastStream::new(rx)
        .take_while(|msg| !matches!(msg, Ok(HubMessage::Close)))
        .map(|msg| {
            let data = match msg {
                Ok(HubMessage::Reload(seq)) => seq.to_string(),
                _ => "lagged".to_string(),
            };
            Ok(Event::default().event("reload").data(data))
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn handle_reload_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        RELOAD_SCRIPT,
    )
}

async fn handle_file(State(state): State<Arc<ServeState>>, uri: Uri) -> Response {
    let Some(rel) = sanitize_request_path(uri.path(), &state.index) else {
        debug!(path = %uri.path(), "rejected request path");
        return not_found(uri.path());
    };

    let mut file = state.root.join(&rel);
    if tokio::fs::metadata(&file).await.is_ok_and(|m| m.is_dir()) {
        file = file.join(&state.index);
    }

    if !within_root(&state.root, &file).await {
        return not_found(uri.path());
    }

    match tokio::fs::read(&file).await {
        Ok(content) => {
            let content_type = content_type_for(&file);
            let body = if content_type.starts_with("text/html") {
                inject_reload_script(&content)
            } else {
                content
            };
            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, content_type)
                .header(header::CACHE_CONTROL, "no-cache")
                .body(Body::from(body))
                .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => not_found(uri.path()),
        Err(err) => {
            warn!(file = %file.display(), error = %err, "failed to read file");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn not_found(path: &str) -> Response {
    (StatusCode::NOT_FOUND, format!("File not found: {path}")).into_response()
}

/// Map a request path to a path relative to the served root.
///
/// Returns `None` for anything that could step outside the root.
fn sanitize_request_path(path: &str, index: &str) -> Option<PathBuf> {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return Some(PathBuf::from(index));
    }
    if trimmed.contains('\\') {
        return None;
    }

    let rel = Path::new(trimmed);
    let mut clean = PathBuf::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(clean)
}

/// Guards against symlinks resolving outside the served root.
async fn within_root(root: &Path, file: &Path) -> bool {
    let (Ok(root), Ok(file)) = (
        tokio::fs::canonicalize(root).await,
        tokio::fs::canonicalize(file).await,
    ) else {
        // Missing files are reported as 404 by the read.
        return true;
    };
    file.starts_with(root)
}

/// Insert the reload client before the last `</body>`, or append it.
pub(crate) fn inject_reload_script(content: &[u8]) -> Vec<u8> {
    let html = String::from_utf8_lossy(content);
    let tag = format!(r#"<script src="{RELOAD_SCRIPT_PATH}"></script>"#);

    match BODY_CLOSE.find_iter(&html).last() {
        Some(m) => {
            let mut out = String::with_capacity(html.len() + tag.len() + 1);
            out.push_str(&html[..m.start()]);
            out.push_str(&tag);
            out.push('\n');
            out.push_str(&html[m.start()..]);
            out.into_bytes()
        }
        None => {
            let mut out = html.into_owned();
            out.push('\n');
            out.push_str(&tag);
            out.into_bytes()
        }
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "application/javascript",
        "json" | "map" => "application/json",
        "css" => "text/css",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_before_closing_body() {
        let out = inject_reload_script(b"<html><BODY><h1>x</h1></BODY></html>");
        let out = String::from_utf8(out).unwrap();
        let script = out.find("/__devpipe/reload.js").unwrap();
        let body = out.find("</BODY>").unwrap();
        assert!(script < body);
        assert_eq!(out.matches("<script").count(), 1);
    }

    #[test]
    fn appends_when_no_body_tag() {
        let out = String::from_utf8(inject_reload_script(b"<h1>x</h1>")).unwrap();
        assert!(out.starts_with("<h1>x</h1>"));
        assert!(out.ends_with(r#"<script src="/__devpipe/reload.js"></script>"#));
    }

    #[test]
    fn rejects_parent_components() {
        assert_eq!(sanitize_request_path("/", "index.html"), Some(PathBuf::from("index.html")));
        assert_eq!(
            sanitize_request_path("/a/./b.js", "index.html"),
            Some(PathBuf::from("a/b.js"))
        );
        assert_eq!(sanitize_request_path("/../secret", "index.html"), None);
        assert_eq!(sanitize_request_path("/a/../../x", "index.html"), None);
        assert_eq!(sanitize_request_path("/a\\..\\x", "index.html"), None);
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type_for(Path::new("a.HTML")), "text/html; charset=utf-8");
        assert_eq!(content_type_for(Path::new("simple.umd.js")), "application/javascript");
        assert_eq!(content_type_for(Path::new("simple.umd.js.map")), "application/json");
        assert_eq!(content_type_for(Path::new("blob")), "application/octet-stream");
    }
}
