//! REST API for the kiosk front-end
//!
//! The front-end owns all rendering and routing between views; this surface
//! only exposes the core operations and streams kiosk events over SSE.

pub mod handlers;
pub mod sse;

use crate::kiosk::CheckinKiosk;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub kiosk: Arc<CheckinKiosk>,
    pub port: u16,
}

/// Create the API router
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Health check (no prefix for health endpoint)
        .route("/health", get(handlers::health))
        // API v1 routes
        .nest(
            "/api/v1",
            Router::new()
                // Member registry endpoints
                .route("/members", get(handlers::list_members))
                .route("/members/load", post(handlers::reload_members))
                .route("/members/stats", get(handlers::member_stats))
                .route("/members/resolve", post(handlers::resolve_member))
                // Scanner endpoints
                .route("/scanner", get(handlers::scanner_status))
                .route("/scanner/start", post(handlers::start_scanner))
                .route("/scanner/stop", post(handlers::stop_scanner))
                .route("/scanner/frame", post(handlers::push_frame))
                // Check-in workflow endpoints
                .route("/checkin", get(handlers::checkin_status))
                .route("/checkin/identify", post(handlers::identify_member))
                .route("/checkin/details", post(handlers::open_details))
                .route("/checkin/details/cancel", post(handlers::cancel_details))
                .route("/checkin/begin", post(handlers::begin_session))
                .route("/checkin/cancel", post(handlers::cancel_checkin))
                .route("/checkin/end", post(handlers::end_session))
                // Attendance log endpoints
                .route("/attendance", get(handlers::attendance_records))
                .route("/attendance/stats", get(handlers::attendance_stats))
                // SSE events
                .route("/events", get(sse::event_stream)),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}
