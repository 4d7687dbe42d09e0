//! Gate Check-In - QR ticket scanning console
//!
//! Main entry point for the gate service.

use gate_checkin::{
    checkin_machine::CheckInMachine,
    realtime_hub::RealtimeHub,
    scan_loop::{
        v4l2::{FfmpegCamera, ZbarDecoder},
        ScanLoop,
    },
    state::{AppConfig, AppState},
    ticket_catalog::TicketCatalogClient,
    validation_client::ValidationClient,
    web_api,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gate_checkin=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Gate Check-In v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    let checkin_config = config.checkin_config()?;
    tracing::info!(
        api_base_url = %config.api_base_url,
        event_id = %config.event_id,
        camera_device = config.camera_device.as_deref().unwrap_or("auto"),
        decode_fps = config.decode_fps,
        reset_delay_ms = config.reset_delay_ms,
        timezone = %config.timezone,
        "Configuration loaded"
    );

    tokio::fs::create_dir_all(&config.temp_dir).await?;

    // Back-end clients
    let validation = Arc::new(ValidationClient::with_timeout(
        config.api_base_url.clone(),
        config.api_auth_token.clone(),
        config.http_timeout(),
    )?);
    let catalog = Arc::new(TicketCatalogClient::new(
        config.api_base_url.clone(),
        config.api_auth_token.clone(),
        config.http_timeout(),
    )?);

    if validation.health_check().await {
        tracing::info!("Ticket back-end reachable");
    } else {
        tracing::warn!(api_base_url = %config.api_base_url, "Ticket back-end not reachable, validations will fail until it is");
    }

    // Camera pipeline
    let camera = Arc::new(FfmpegCamera::new(config.ffmpeg_path.clone(), config.decode_fps));
    let decoder = Arc::new(ZbarDecoder::new(
        config.zbarimg_path.clone(),
        config.temp_dir.clone(),
    ));
    let scanner = Arc::new(ScanLoop::new(camera, decoder));
    tracing::info!("ScanLoop initialized (v4l2 + ffmpeg + zbarimg)");

    let realtime = Arc::new(RealtimeHub::new());

    let checkin = CheckInMachine::new(
        scanner.clone(),
        validation.clone(),
        realtime.clone(),
        checkin_config,
    );

    let state = AppState {
        config: config.clone(),
        checkin: checkin.clone(),
        scanner,
        validation,
        catalog,
        realtime,
        started_at: Instant::now(),
    };

    // Console opens with the camera on
    checkin.resume_camera().await?;

    let mut app = web_api::create_router(state.clone());
    if let Some(ref static_dir) = config.static_dir {
        let serve_dir = ServeDir::new(static_dir)
            .not_found_service(ServeFile::new(static_dir.join("index.html")));
        app = app.fallback_service(serve_dir);
        tracing::info!(static_dir = %static_dir.display(), "Static file serving enabled");
    }
    let app = app
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    let realtime = state.realtime.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            realtime.close_all().await;
        })
        .await?;

    // Release the camera before exiting
    checkin.shutdown().await;
    tracing::info!("Gate Check-In stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
