//! HTTP/SSE control surface (C8, SPEC_FULL §4.8/§6): an axum router sitting
//! in front of the command/event bus and asset repository. Grounded on the
//! teacher's `tower-http` trace/cors layering (the original binary wired
//! these the same way around its Tauri commands).

pub mod error;
pub mod routes;

pub use error::ServerError;
pub use routes::{router, ServerState};

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the full app router with tracing and permissive CORS, the way the
/// teacher's HTTP-adjacent services are layered.
pub fn app(state: ServerState) -> axum::Router {
    router(state).layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive())
}
