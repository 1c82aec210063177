//! Development server implementation.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use tower_http::compression::CompressionLayer;
use tower_http::services::{ServeDir, ServeFile};

use quire_static::{BuildConfig, StaticBuilder};

use crate::watcher::{FileWatcher, WatchEvent};
use crate::websocket::{client_script, next_message, ReloadHub, ReloadMessage};

/// Path of the live reload WebSocket.
pub const SOCKET_PATH: &str = "/__quire/ws";

/// Path of the live reload client script.
pub const CLIENT_PATH: &str = "/__quire/client.js";

/// How the output directory is served.
#[derive(Debug, Clone)]
pub struct ContentOptions {
    /// Gzip responses
    pub compress: bool,

    /// Document served for paths that match no file (history API routing)
    pub fallback: Option<String>,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            compress: true,
            fallback: Some("index.html".to_string()),
        }
    }
}

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Build to run on start and on every change
    pub build: BuildConfig,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,

    /// Show build errors in the browser
    pub overlay: bool,

    /// Serving options for the output directory
    pub content: ContentOptions,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            build: BuildConfig::default(),
            port: 3000,
            host: "127.0.0.1".to_string(),
            open: true,
            overlay: true,
            content: ContentOptions::default(),
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),
}

/// Shared server state.
struct ServerState {
    hub: ReloadHub,
    overlay: bool,
}

/// Router serving a built site from `dir`.
pub fn content_router(dir: &Path, options: &ContentOptions) -> Router {
    let router = match &options.fallback {
        Some(document) => Router::new()
            .fallback_service(ServeDir::new(dir).fallback(ServeFile::new(dir.join(document)))),
        None => Router::new().fallback_service(ServeDir::new(dir)),
    };

    if options.compress {
        router.layer(CompressionLayer::new())
    } else {
        router
    }
}

/// Directories whose changes should trigger a rebuild.
pub fn watch_paths(build: &BuildConfig) -> Vec<PathBuf> {
    let mut paths = vec![build.pages_dir.clone()];
    paths.extend(build.includes_dir.iter().cloned());
    paths.extend(
        build
            .scripts
            .iter()
            .chain(&build.styles)
            .filter_map(|entry| entry.parent().map(Path::to_path_buf)),
    );
    paths.extend(build.copy.iter().map(|rule| rule.from.clone()));

    paths.sort();
    paths.dedup();
    paths
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    /// Create a new development server.
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    /// Build the site, then serve it and rebuild on every source change.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                ServerError::InvalidAddress(format!("{}:{}", self.config.host, self.config.port))
            })?;

        let mut build = self.config.build.clone();
        build.live_reload = Some(CLIENT_PATH.to_string());
        let output_dir = build.output_dir.clone();
        let watch = watch_paths(&build);
        let builder = Arc::new(StaticBuilder::new(build));

        let hub = ReloadHub::new();
        rebuild(&builder, &hub).await;

        let ignore = output_dir.canonicalize().ok();
        let (watcher, mut rx) =
            FileWatcher::new(&watch, ignore).map_err(|e| ServerError::WatchError(e.to_string()))?;

        // Events are handled one at a time, so rebuilds never overlap
        let watch_hub = hub.clone();
        let watch_builder = Arc::clone(&builder);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                log_watch_event(&event);
                // One rebuild covers everything already queued
                while let Ok(event) = rx.try_recv() {
                    log_watch_event(&event);
                }
                rebuild(&watch_builder, &watch_hub).await;
            }
            // Keep watcher alive
            drop(watcher);
        });

        let state = Arc::new(ServerState {
            hub,
            overlay: self.config.overlay,
        });

        let app = Router::new()
            .route(SOCKET_PATH, get(ws_handler))
            .route(CLIENT_PATH, get(client_handler))
            .with_state(state)
            .merge(content_router(&output_dir, &self.config.content));

        tracing::info!("Starting dev server at http://{}", addr);

        if self.config.open {
            let url = format!("http://{}", addr);
            let _ = open::that(&url);
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        Ok(())
    }
}

fn log_watch_event(event: &WatchEvent) {
    match event {
        WatchEvent::TemplateModified(path) => {
            tracing::info!("Template modified: {}", path.display())
        }
        WatchEvent::ScriptModified(path) => tracing::info!("Script modified: {}", path.display()),
        WatchEvent::StyleModified(path) => {
            tracing::info!("Stylesheet modified: {}", path.display())
        }
        other => tracing::debug!("Changed: {}", other.path().display()),
    }
}

/// Run a build off the async runtime and report the outcome to clients.
async fn rebuild(builder: &Arc<StaticBuilder>, hub: &ReloadHub) {
    let builder = Arc::clone(builder);

    match tokio::task::spawn_blocking(move || builder.build()).await {
        Ok(Ok(result)) => {
            tracing::info!(
                "Built {} pages in {}ms",
                result.pages,
                result.duration_ms
            );
            hub.send(ReloadMessage::Reload);
        }
        Ok(Err(e)) => {
            tracing::error!("Build failed: {}", e);
            hub.send(ReloadMessage::BuildFailed {
                message: e.to_string(),
            });
        }
        Err(e) => tracing::error!("Build task failed: {}", e),
    }
}

/// Handler for the live reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Forward reload messages to one WebSocket client.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();

    if send_message(&mut socket, &ReloadMessage::Connected)
        .await
        .is_err()
    {
        return;
    }

    while let Some(msg) = next_message(&mut rx).await {
        if send_message(&mut socket, &msg).await.is_err() {
            break;
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

/// Handler for the live reload client script.
async fn client_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let script = client_script(SOCKET_PATH, state.overlay);
    ([("content-type", "application/javascript")], script)
}
