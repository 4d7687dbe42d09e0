//! API Routes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use crate::checkin_machine::{CheckInView, SubmitAck};
use crate::device_selector::{pick_device, VideoInputDevice};
use crate::models::ApiResponse;
use crate::realtime_hub::HubMessage;
use crate::state::AppState;
use crate::ticket_catalog::{DayCard, TicketRow};

/// Upper bound for `limit` on the ticket list
const MAX_TICKETS_LIMIT: u32 = 1000;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Gate console
        .route("/api/checkin", get(get_checkin))
        .route("/api/checkin/validate", post(submit_token))
        .route("/api/checkin/camera/pause", post(pause_camera))
        .route("/api/checkin/camera/resume", post(resume_camera))
        .route("/api/checkin/dismiss", post(dismiss_result))
        .route("/api/checkin/devices", get(list_devices))
        // Catalog (read-only)
        .route("/api/ticket-days", get(list_ticket_days))
        .route("/api/tickets", get(list_tickets))
        // WebSocket
        .route("/api/ws", get(websocket_handler))
        .with_state(state)
}

// ========================================
// Gate Console Handlers
// ========================================

async fn get_checkin(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(state.checkin.view()))
}

#[derive(Debug, Deserialize)]
struct SubmitTokenRequest {
    #[serde(default)]
    token: String,
}

#[derive(Debug, Serialize)]
struct SubmitTokenResponse {
    ack: SubmitAck,
    view: CheckInView,
}

/// Manual token entry
/// POST /api/checkin/validate
async fn submit_token(
    State(state): State<AppState>,
    Json(req): Json<SubmitTokenRequest>,
) -> impl IntoResponse {
    match state.checkin.submit_manual(&req.token).await {
        Ok(ack) => Json(ApiResponse::success(SubmitTokenResponse {
            ack,
            view: state.checkin.view(),
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn pause_camera(State(state): State<AppState>) -> impl IntoResponse {
    match state.checkin.pause_camera().await {
        Ok(()) => Json(ApiResponse::success(state.checkin.view())).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn resume_camera(State(state): State<AppState>) -> impl IntoResponse {
    match state.checkin.resume_camera().await {
        Ok(()) => Json(ApiResponse::success(state.checkin.view())).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn dismiss_result(State(state): State<AppState>) -> impl IntoResponse {
    match state.checkin.dismiss().await {
        Ok(()) => Json(ApiResponse::success(state.checkin.view())).into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Serialize)]
struct DevicesResponse {
    devices: Vec<VideoInputDevice>,
    /// Device the selector would pick
    selected: Option<String>,
    /// CAMERA_DEVICE override
    configured: Option<String>,
}

/// Enumerated cameras and the current pick
/// GET /api/checkin/devices
async fn list_devices(State(state): State<AppState>) -> impl IntoResponse {
    match state.scanner.backend().list_video_inputs().await {
        Ok(devices) => {
            let selected = pick_device(&devices).ok();
            Json(ApiResponse::success(DevicesResponse {
                devices,
                selected,
                configured: state.config.camera_device.clone(),
            }))
            .into_response()
        }
        Err(e) => e.into_response(),
    }
}

// ========================================
// Catalog Handlers
// ========================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogQuery {
    event_id: Option<String>,
    limit: Option<u32>,
}

/// GET /api/ticket-days
async fn list_ticket_days(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> impl IntoResponse {
    let event_id = query.event_id.unwrap_or_else(|| state.config.event_id.clone());

    match state.catalog.get_ticket_days(&event_id).await {
        Ok(days) => {
            let cards: Vec<DayCard> = days.iter().map(DayCard::from).collect();
            Json(ApiResponse::success(cards)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// GET /api/tickets
async fn list_tickets(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> impl IntoResponse {
    let event_id = query.event_id.unwrap_or_else(|| state.config.event_id.clone());
    let limit = query
        .limit
        .unwrap_or(state.config.tickets_list_limit)
        .clamp(1, MAX_TICKETS_LIMIT);

    match state.catalog.get_tickets(&event_id, limit).await {
        Ok(tickets) => {
            let rows: Vec<TicketRow> = tickets.iter().map(TicketRow::from).collect();
            Json(ApiResponse::success(rows)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

// ========================================
// WebSocket Handler
// ========================================

/// WebSocket upgrade handler
async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (conn_id, mut rx) = state.realtime.register().await;

    // late joiners start from the current view
    state
        .realtime
        .send_to(&conn_id, &HubMessage::CheckInUpdate(state.checkin.view()))
        .await;

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                return;
            }
        }
        // hub dropped us
        let _ = sender.send(Message::Close(None)).await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => {
                    tracing::debug!(connection_id = %conn_id, "WebSocket close received");
                    break;
                }
                Err(e) => {
                    tracing::warn!(connection_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
                _ => {}
            }
        }
        conn_id
    });

    let conn_id = tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            conn_id
        }
        result = &mut recv_task => {
            send_task.abort();
            result.unwrap_or(conn_id)
        }
    };

    state.realtime.unregister(&conn_id).await;
}
