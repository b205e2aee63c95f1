//! # HTTP Server
//!
//! Main HTTP server combining all endpoint routers.
//!
//! This is the unified entry point for the lookup gateway API.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::observability::Logger;
use crate::service::ServiceContext;

use super::lookup_routes::lookup_routes;

/// HTTP server for the lookup gateway
pub struct HttpServer {
    listen_addr: String,
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server bound to the given address string
    pub fn new(listen_addr: &str, context: Arc<ServiceContext>) -> Self {
        let router = Self::build_router(context);
        Self {
            listen_addr: listen_addr.to_string(),
            router,
        }
    }

    /// Build the combined router with all endpoints
    fn build_router(context: Arc<ServiceContext>) -> Router {
        // Permissive CORS; the bearer check is the access control layer
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new().merge(lookup_routes(context)).layer(cors)
    }

    /// Get the configured listen address
    pub fn listen_addr(&self) -> &str {
        &self.listen_addr
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start the HTTP server (async)
    pub async fn start(self) -> Result<(), io::Error> {
        let addr: SocketAddr = self.listen_addr.parse().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid listen address '{}': {}", self.listen_addr, e),
            )
        })?;

        let listener = TcpListener::bind(addr).await?;
        Logger::info("SERVER_LISTENING", &[("addr", &self.listen_addr)]);

        axum::serve(listener, self.router).await?;

        Ok(())
    }
}
