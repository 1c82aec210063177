//! Development server with live reload for quire sites.
//!
//! Serves the build output, watches the sources, rebuilds on change and
//! tells connected browsers to reload (or shows the build error).

pub mod server;
pub mod watcher;
pub mod websocket;

pub use server::{content_router, ContentOptions, DevServer, DevServerConfig, ServerError};
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{ReloadHub, ReloadMessage};
