//! Static server implementation.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use url::Url;

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen address {0}")]
    Address(String),

    #[error("Failed to bind to {addr}: {message}")]
    Bind { addr: SocketAddr, message: String },
}

/// A static file server bound to a local port for the duration of one run.
///
/// Port `0` asks the OS for a free port; the actual port is available via
/// [`StaticServer::port`] after start.
pub struct StaticServer {
    url: Url,
    port: u16,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl StaticServer {
    /// Bind the listener and start serving files rooted at `root`.
    pub async fn start(root: PathBuf, host: &str, port: u16) -> Result<Self, ServerError> {
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ServerError::Address(format!("{}:{}", host, port)))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr,
                message: e.to_string(),
            })?;

        let local = listener.local_addr().map_err(|e| ServerError::Bind {
            addr,
            message: e.to_string(),
        })?;

        let url = Url::parse(&format!("http://{}/", local))
            .map_err(|e| ServerError::Address(e.to_string()))?;

        let app = Router::new()
            .fallback(serve_file)
            .with_state(Arc::new(root));

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = rx.await;
            });

            if let Err(e) = serve.await {
                tracing::warn!("Static server exited with error: {}", e);
            }
        });

        tracing::debug!("Static server listening at {}", url);

        Ok(Self {
            url,
            port: local.port(),
            shutdown: Some(tx),
            handle,
        })
    }

    /// Base URL of the running server, e.g. `http://127.0.0.1:34171/`.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The port actually bound (useful when started with port `0`).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Gracefully shut the listener down and wait for the serve task.
    pub async fn close(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
        tracing::debug!("Static server closed");
    }
}

/// Where a request path resolves on disk.
#[derive(Debug, PartialEq, Eq)]
enum Resolution {
    File(PathBuf),
    NotFound,
}

/// Map a request path onto the served tree.
///
/// Directories serve their `index.html`; missing extension-less paths fall
/// back to the root `index.html` (SPA client routing); missing paths with an
/// extension are 404.
fn resolve_request(root: &Path, request_path: &str) -> Resolution {
    let trimmed = request_path.trim_start_matches('/');

    if trimmed.split('/').any(|segment| segment == "..") {
        return Resolution::NotFound;
    }

    let mut candidate = root.join(trimmed);
    if candidate.is_dir() {
        candidate = candidate.join("index.html");
    }

    if candidate.is_file() {
        return Resolution::File(candidate);
    }

    let last_segment = trimmed.rsplit('/').next().unwrap_or("");
    if !last_segment.contains('.') {
        let fallback = root.join("index.html");
        if fallback.is_file() {
            return Resolution::File(fallback);
        }
    }

    Resolution::NotFound
}

async fn serve_file(State(root): State<Arc<PathBuf>>, uri: Uri) -> Response {
    match resolve_request(&root, uri.path()) {
        Resolution::File(path) => match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let mime = mime_guess::from_path(&path).first_or_octet_stream();
                (
                    [
                        (header::CONTENT_TYPE, mime.to_string()),
                        (header::CACHE_CONTROL, "no-cache".to_string()),
                    ],
                    bytes,
                )
                    .into_response()
            }
            Err(e) if e.kind() == ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Resolution::NotFound => StatusCode::NOT_FOUND.into_response(),
    }
}
