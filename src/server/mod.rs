//! HTTP service
//!
//! One `POST` route per operation, each taking a multipart upload and
//! answering with the transformed file as an attachment. Errors come back
//! as `{"code": ..., "detail": ...}` JSON.

mod error;
mod form;
mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::request::Parts;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::{ApiError, ErrorBody};
pub use form::{Upload, UploadForm};

use crate::config::ServiceConfig;
use crate::convert::Converters;
use crate::error::Result;
use crate::pdf::FontBook;
use crate::session::SessionRoot;

/// Shared, read-only state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<StateInner>,
}

#[derive(Debug)]
struct StateInner {
    sessions: SessionRoot,
    fonts: FontBook,
    converters: Arc<Converters>,
}

impl AppState {
    pub fn new(sessions: SessionRoot, fonts: FontBook, converters: Converters) -> Self {
        Self {
            inner: Arc::new(StateInner {
                sessions,
                fonts,
                converters: Arc::new(converters),
            }),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        Ok(Self::new(config.session_root()?, config.fonts(), config.converters()))
    }

    pub fn sessions(&self) -> &SessionRoot {
        &self.inner.sessions
    }

    pub fn fonts(&self) -> FontBook {
        self.inner.fonts.clone()
    }

    pub fn converters(&self) -> Arc<Converters> {
        Arc::clone(&self.inner.converters)
    }
}

/// Build the application router
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/split", post(handlers::split))
        .route("/merge", post(handlers::merge))
        .route("/rotate", post(handlers::rotate))
        .route("/encrypt", post(handlers::encrypt))
        .route("/decrypt", post(handlers::decrypt))
        .route("/add-watermark", post(handlers::add_watermark))
        .route("/edit", post(handlers::edit))
        .route("/convert-from-pdf", post(handlers::convert_from_pdf))
        .route("/convert-to-pdf", post(handlers::convert_to_pdf))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors())
        .with_state(state)
}

/// Only the desktop shell and local dev servers may call the service
fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _: &Parts| {
            origin.to_str().is_ok_and(is_local_origin)
        }))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

fn is_local_origin(origin: &str) -> bool {
    if origin == "app://." {
        return true;
    }
    let Some(rest) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };
    let host = rest.split(':').next().unwrap_or_default();
    host == "localhost" || host == "127.0.0.1"
}

/// A bound, not yet running, service
#[derive(Debug)]
pub struct Server {
    listener: std::net::TcpListener,
    router: Router,
    sessions: SessionRoot,
}

impl Server {
    /// Bind the listener and build the state.
    ///
    /// The port is known as soon as this returns, before any request is
    /// served.
    pub fn bind(config: &ServiceConfig) -> Result<Self> {
        let state = AppState::from_config(config)?;
        let sessions = state.sessions().clone();
        let listener = config.bind()?;
        Ok(Self {
            listener,
            router: router(state, config.max_upload_bytes),
            sessions,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until Ctrl-C or SIGTERM, then clear leftover sessions
    pub async fn run(self) -> Result<()> {
        self.listener.set_nonblocking(true)?;
        let listener = tokio::net::TcpListener::from_std(self.listener)?;
        info!("listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        match self.sessions.purge() {
            Ok(0) => {}
            Ok(n) => info!("removed {} leftover session directories", n),
            Err(e) => warn!("cannot purge {}: {}", self.sessions.path().display(), e),
        }
        info!("server shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("cannot listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_origins() {
        assert!(is_local_origin("http://localhost:5173"));
        assert!(is_local_origin("http://127.0.0.1"));
        assert!(is_local_origin("https://localhost"));
        assert!(is_local_origin("app://."));
        assert!(!is_local_origin("http://localhost.evil.com"));
        assert!(!is_local_origin("https://example.com"));
        assert!(!is_local_origin("null"));
    }
}
