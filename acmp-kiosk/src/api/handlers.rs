//! HTTP request handlers
//!
//! Implements the kiosk REST endpoints over the core components.

use crate::api::AppContext;
use crate::checkin::{AttendanceRecord, LogStats};
use crate::error::Error;
use crate::registry::RegistryStats;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
    port: u16,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberListResponse {
    members: Vec<acmp_common::Member>,
    demo_mode: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    identifier: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerStatusResponse {
    state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FrameRequest {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinStatusResponse {
    phase: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<crate::checkin::CheckinSession>,
}

#[derive(Debug, Deserialize)]
pub struct BeginRequest {
    purpose: String,
    #[serde(default)]
    topic: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeginResponse {
    session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct EndRequest {
    /// The operator confirmation dialog result; ending is destructive
    #[serde(default)]
    confirm: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceResponse {
    records: Vec<AttendanceRecord>,
}

// ============================================================================
// Error mapping
// ============================================================================

type ApiError = (StatusCode, Json<StatusResponse>);

fn error_response(e: &Error) -> ApiError {
    let status = match e {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::InvalidState(_) => StatusCode::CONFLICT,
        Error::MemberNotFound(_) => StatusCode::NOT_FOUND,
        Error::Camera(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(StatusResponse {
            status: format!("error: {e}"),
        }),
    )
}

// ============================================================================
// Health Endpoint
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "acmp-kiosk".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        port: ctx.port,
    })
}

// ============================================================================
// Member Registry Endpoints
// ============================================================================

/// GET /members - Current member set
pub async fn list_members(State(ctx): State<AppContext>) -> Json<MemberListResponse> {
    let registry = ctx.kiosk.registry();
    Json(MemberListResponse {
        members: registry.members().await,
        demo_mode: registry.demo_mode().await,
    })
}

/// POST /members/load - Reload the member set from the remote registry
pub async fn reload_members(State(ctx): State<AppContext>) -> Json<MemberListResponse> {
    let registry = ctx.kiosk.registry();
    let members = registry.load().await;
    info!("Member reload requested: {} members", members.len());
    Json(MemberListResponse {
        members,
        demo_mode: registry.demo_mode().await,
    })
}

/// GET /members/stats - Derived registry statistics
pub async fn member_stats(State(ctx): State<AppContext>) -> Json<RegistryStats> {
    Json(ctx.kiosk.registry().stats().await)
}

/// POST /members/resolve - Resolve an identifier to a member record
pub async fn resolve_member(
    State(ctx): State<AppContext>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<acmp_common::Member>, ApiError> {
    match ctx.kiosk.registry().resolve(&req.identifier).await {
        Ok(member) => Ok(Json(member)),
        Err(e) => Err(error_response(&e)),
    }
}

// ============================================================================
// Scanner Endpoints
// ============================================================================

/// GET /scanner - Scanner lifecycle state
pub async fn scanner_status(State(ctx): State<AppContext>) -> Json<ScannerStatusResponse> {
    let scanner = ctx.kiosk.scanner();
    Json(ScannerStatusResponse {
        state: scanner.state().await.to_string(),
        last_error: scanner.last_error().await.map(|e| e.user_message()),
    })
}

/// POST /scanner/start - Start the camera and arm the decode loop
pub async fn start_scanner(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, ApiError> {
    match ctx.kiosk.scanner().start().await {
        Ok(()) => Ok(Json(StatusResponse {
            status: "started".to_string(),
        })),
        Err(e) => {
            error!("Scanner start failed: {e}");
            Err(error_response(&Error::Camera(e)))
        }
    }
}

/// POST /scanner/stop - Release the camera
pub async fn stop_scanner(State(ctx): State<AppContext>) -> Json<StatusResponse> {
    ctx.kiosk.scanner().stop().await;
    Json(StatusResponse {
        status: "stopped".to_string(),
    })
}

/// POST /scanner/frame - Inject decoded frame text from the capture layer
pub async fn push_frame(
    State(ctx): State<AppContext>,
    Json(req): Json<FrameRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    if ctx.kiosk.camera().push_decoded(req.text) {
        Ok(Json(StatusResponse {
            status: "accepted".to_string(),
        }))
    } else {
        Err((
            StatusCode::CONFLICT,
            Json(StatusResponse {
                status: "error: scanner is not active".to_string(),
            }),
        ))
    }
}

// ============================================================================
// Check-in Workflow Endpoints
// ============================================================================

/// GET /checkin - Workflow phase + session snapshot
pub async fn checkin_status(State(ctx): State<AppContext>) -> Json<CheckinStatusResponse> {
    let (phase, session) = ctx.kiosk.session().snapshot().await;
    Json(CheckinStatusResponse {
        phase: phase.to_string(),
        session,
    })
}

/// POST /checkin/identify - Manual-entry identification fallback
pub async fn identify_member(
    State(ctx): State<AppContext>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<acmp_common::Member>, ApiError> {
    match ctx.kiosk.manual_checkin(&req.identifier).await {
        Ok(member) => Ok(Json(member)),
        Err(e) => Err(error_response(&e)),
    }
}

/// POST /checkin/details - Present the purpose/topic capture step
pub async fn open_details(State(ctx): State<AppContext>) -> Result<Json<StatusResponse>, ApiError> {
    match ctx.kiosk.session().start_details().await {
        Ok(()) => Ok(Json(StatusResponse {
            status: "detailing".to_string(),
        })),
        Err(e) => Err(error_response(&e)),
    }
}

/// POST /checkin/details/cancel - Withdraw the capture step, discard session
pub async fn cancel_details(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, ApiError> {
    match ctx.kiosk.session().cancel_details().await {
        Ok(()) => Ok(Json(StatusResponse {
            status: "cancelled".to_string(),
        })),
        Err(e) => Err(error_response(&e)),
    }
}

/// POST /checkin/begin - Officially begin the visit
pub async fn begin_session(
    State(ctx): State<AppContext>,
    Json(req): Json<BeginRequest>,
) -> Result<Json<BeginResponse>, ApiError> {
    match ctx.kiosk.session().begin(&req.purpose, &req.topic).await {
        Ok(session_id) => Ok(Json(BeginResponse { session_id })),
        Err(e) => Err(error_response(&e)),
    }
}

/// POST /checkin/cancel - Discard an unstarted check-in
pub async fn cancel_checkin(
    State(ctx): State<AppContext>,
) -> Result<Json<StatusResponse>, ApiError> {
    match ctx.kiosk.session().cancel().await {
        Ok(()) => Ok(Json(StatusResponse {
            status: "cancelled".to_string(),
        })),
        Err(e) => Err(error_response(&e)),
    }
}

/// POST /checkin/end - Close the active session and record it.
///
/// Destructive: requires the operator confirmation flag.
pub async fn end_session(
    State(ctx): State<AppContext>,
    Json(req): Json<EndRequest>,
) -> Result<Json<AttendanceRecord>, ApiError> {
    if !req.confirm {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(StatusResponse {
                status: "error: confirmation required to end a session".to_string(),
            }),
        ));
    }
    match ctx.kiosk.session().end().await {
        Ok(record) => Ok(Json(record)),
        Err(e) => Err(error_response(&e)),
    }
}

// ============================================================================
// Attendance Log Endpoints
// ============================================================================

/// GET /attendance - Stored records, newest first
pub async fn attendance_records(State(ctx): State<AppContext>) -> Json<AttendanceResponse> {
    Json(AttendanceResponse {
        records: ctx.kiosk.attendance_log().records().await,
    })
}

/// GET /attendance/stats - Derived log statistics
pub async fn attendance_stats(State(ctx): State<AppContext>) -> Json<LogStats> {
    let active = ctx.kiosk.session().is_active().await;
    Json(ctx.kiosk.attendance_log().stats(active).await)
}
