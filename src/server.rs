//! Web server for the warp UI and API

use anyhow::Result;
use arc_swap::ArcSwapOption;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse,
    },
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use parking_lot::{Mutex, RwLock};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::corners::{
    corners_from_percent, corners_from_relative, corners_to_percent, corners_to_relative,
    default_corners, CornerKey, CornerPoints, Point,
};
use crate::error::WarpError;
use crate::handles::{corner_handles, guide_lines, CornerHandle, GuideLines};
use crate::surface::{Measurement, SurfaceRect, Viewport};
use crate::transform::{matrix3d_from_corners, Matrix3d};
use crate::warp::{BodyStyle, EventOutcome, PointerEvent, RenderSurface, WarpSurface};

/// Embedded static files for the web UI
#[derive(RustEmbed)]
#[folder = "static/"]
struct StaticAssets;

/// Capacity of the transform change channel
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// The nested banner layer; keeps the CSS transform it was last given
#[derive(Clone, Default)]
struct BannerLayer {
    transform: Arc<RwLock<String>>,
}

impl RenderSurface for BannerLayer {
    fn apply_transform(&mut self, transform: &Matrix3d) {
        *self.transform.write() = transform.to_string();
    }

    fn clear_transform(&mut self) {
        self.transform.write().clear();
    }
}

/// Shared application state
pub struct AppState {
    pub config: Config,
    /// The warp session; events are applied one at a time under this lock
    surface: Mutex<WarpSurface>,
    layer: BannerLayer,
    /// Every committed corner update, for `/api/warp/events`
    changes: broadcast::Sender<CornerPoints>,
    /// Most recent corners reported to the listener
    last_change: Arc<ArcSwapOption<CornerPoints>>,
    /// Pending debounced reset
    reset_task: Mutex<Option<JoinHandle<()>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let layer = BannerLayer::default();
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let last_change = Arc::new(ArcSwapOption::empty());

        let mut surface = WarpSurface::new(&config.surface, Box::new(layer.clone()));
        {
            let changes = changes.clone();
            let last_change = last_change.clone();
            surface.set_listener(Box::new(move |corners: &CornerPoints| {
                last_change.store(Some(Arc::new(*corners)));
                // No subscribers is fine
                let _ = changes.send(*corners);
            }));
        }

        Self {
            config,
            surface: Mutex::new(surface),
            layer,
            changes,
            last_change,
            reset_task: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CornerPoints> {
        self.changes.subscribe()
    }

    /// Apply a layout measurement, arming the debounced reset if needed
    pub fn measure(self: &Arc<Self>, measurement: Measurement) -> Result<(), WarpError> {
        measurement.validate()?;
        let mut surface = self.surface.lock();
        if let Some(deadline) = surface.measure(measurement, Instant::now()) {
            // Armed under the surface lock so timers replace each other in deadline order
            self.schedule_reset(deadline);
        }
        Ok(())
    }

    pub fn handle_event(&self, event: &PointerEvent) -> EventOutcome {
        self.surface.lock().handle_event(event)
    }

    pub fn cancel(&self) -> EventOutcome {
        self.surface.lock().cancel()
    }

    pub fn reset(&self) -> bool {
        let mut surface = self.surface.lock();
        if let Some(task) = self.reset_task.lock().take() {
            task.abort();
        }
        surface.reset()
    }

    /// Spawn the timer for a debounced reset, replacing any earlier one.
    ///
    /// The task keeps waiting while the surface still has a later deadline
    /// pending, so a superseded timer can never strand the reset.
    fn schedule_reset(self: &Arc<Self>, deadline: Instant) {
        let state = self.clone();
        let task = tokio::spawn(async move {
            let mut deadline = deadline;
            loop {
                tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
                let next = {
                    let mut surface = state.surface.lock();
                    if surface.poll(Instant::now()) {
                        tracing::info!("Corners reset after resize");
                        None
                    } else {
                        surface.pending_reset()
                    }
                };
                match next {
                    Some(next) => deadline = next,
                    None => break,
                }
            }
        });
        if let Some(previous) = self.reset_task.lock().replace(task) {
            previous.abort();
        }
    }

    /// Most recent corners reported to the listener, without taking the
    /// session lock
    pub fn last_change(&self) -> Option<CornerPoints> {
        self.last_change.load_full().map(|c| *c)
    }

    pub fn snapshot(&self) -> WarpSnapshot {
        let last_change = self.last_change();
        let surface = self.surface.lock();
        let rect = *surface.rect();
        let corners = surface.corners().copied();
        let (width, height) = (rect.width, rect.height);
        let measured = rect.is_measured();
        let matrix = surface.transform();

        WarpSnapshot {
            measured,
            rect,
            viewport: *surface.viewport(),
            corners,
            percent: corners
                .filter(|_| measured)
                .map(|c| corners_to_percent(&c, width, height)),
            relative: corners.map(|c| corners_to_relative(&c, width, height)),
            matrix,
            transform: matrix
                .map(|_| self.layer.transform.read().clone())
                .unwrap_or_default(),
            dragging: surface.dragging(),
            drag_offset: surface.drag_offset(),
            will_change: surface.will_change(),
            body_style: surface.body_style(),
            handles: corners
                .map(|c| {
                    corner_handles(
                        &c,
                        &rect,
                        self.config.surface.handle_size,
                        surface.dragging(),
                    )
                })
                .unwrap_or_default(),
            guides: corners.map(|c| guide_lines(&c, &rect)),
            reset_pending: surface.pending_reset().is_some(),
            last_change,
        }
    }
}

/// Full session state for the UI
#[derive(Debug, Serialize)]
pub struct WarpSnapshot {
    measured: bool,
    rect: SurfaceRect,
    viewport: Viewport,
    corners: Option<CornerPoints>,
    percent: Option<CornerPoints>,
    relative: Option<CornerPoints>,
    matrix: Option<Matrix3d>,
    /// CSS transform currently applied to the banner layer
    transform: String,
    dragging: Option<CornerKey>,
    drag_offset: Option<Point>,
    will_change: &'static str,
    body_style: BodyStyle,
    handles: Vec<CornerHandle>,
    guides: Option<GuideLines>,
    reset_pending: bool,
    last_change: Option<CornerPoints>,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Static files and UI
        .route("/", get(index_handler))
        .route("/static/*path", get(static_handler))
        // Warp session
        .route("/api/warp", get(get_warp))
        .route("/api/warp/measure", post(measure))
        .route("/api/warp/pointer", post(pointer))
        .route("/api/warp/cancel", post(cancel))
        .route("/api/warp/reset", post(reset))
        .route("/api/warp/events", get(transform_events))
        // Stateless geometry
        .route("/api/matrix", post(compute_matrix))
        // System info
        .route("/api/info", get(get_info))
        .layer(cors)
        .with_state(state)
}

/// Run the web server
pub async fn run_server(addr: &str, state: Arc<AppState>) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Serve the main index page
async fn index_handler() -> impl IntoResponse {
    match StaticAssets::get("index.html") {
        Some(content) => Html(content.data.to_vec()).into_response(),
        None => (StatusCode::NOT_FOUND, "Index not found").into_response(),
    }
}

/// Serve static files
async fn static_handler(Path(path): Path<String>) -> impl IntoResponse {
    let path = path.trim_start_matches('/');

    match StaticAssets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                [(axum::http::header::CONTENT_TYPE, mime.as_ref())],
                content.data.to_vec(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

async fn get_warp(State(state): State<Arc<AppState>>) -> Json<WarpSnapshot> {
    Json(state.snapshot())
}

/// Report the container rectangle and viewport
async fn measure(
    State(state): State<Arc<AppState>>,
    Json(measurement): Json<Measurement>,
) -> Result<Json<WarpSnapshot>, WarpError> {
    state.measure(measurement)?;
    Ok(Json(state.snapshot()))
}

#[derive(Serialize)]
struct PointerResponse {
    outcome: EventOutcome,
    corners: Option<CornerPoints>,
    transform: String,
}

/// Apply one pointer or touch event
async fn pointer(
    State(state): State<Arc<AppState>>,
    Json(event): Json<PointerEvent>,
) -> Json<PointerResponse> {
    let outcome = state.handle_event(&event);
    let snapshot = state.snapshot();
    Json(PointerResponse {
        outcome,
        corners: snapshot.corners,
        transform: snapshot.transform,
    })
}

async fn cancel(State(state): State<Arc<AppState>>) -> Json<EventOutcome> {
    Json(state.cancel())
}

/// Reset corners to the untransformed rectangle
async fn reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.reset() {
        Json(state.snapshot()).into_response()
    } else {
        (StatusCode::CONFLICT, "Surface not measured").into_response()
    }
}

/// Server-sent stream of committed corner updates.
///
/// A new subscriber first receives the last reported corners, if any.
async fn transform_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let updates = BroadcastStream::new(state.subscribe());
    let latest = state
        .last_change()
        .into_iter()
        .map(Ok::<_, BroadcastStreamRecvError>);

    let stream = tokio_stream::iter(latest).chain(updates).filter_map(|msg| match msg {
        Ok(corners) => Event::default()
            .event("transform")
            .json_data(corners)
            .ok()
            .map(Ok),
        Err(e) => {
            tracing::warn!("Transform event stream lagged: {}", e);
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum CornerUnits {
    #[default]
    Pixels,
    Percent,
    /// Pixels measured from the rectangle's center
    Relative,
}

#[derive(Deserialize)]
struct MatrixRequest {
    width: f64,
    height: f64,
    corners: CornerPoints,
    #[serde(default)]
    units: CornerUnits,
}

#[derive(Serialize)]
struct MatrixResponse {
    matrix: Matrix3d,
    transform: String,
    corners: CornerPoints,
    relative: CornerPoints,
    /// Source corners (0,0), (w,0), (w,h), (0,h) pushed through `matrix`
    mapped: [Point; 4],
    /// The quad was degenerate and the identity was substituted
    degenerate: bool,
}

/// Compute a transform without touching the session
async fn compute_matrix(Json(req): Json<MatrixRequest>) -> Result<Json<MatrixResponse>, WarpError> {
    let (width, height) = (req.width, req.height);
    if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
        return Err(WarpError::InvalidSourceSize { width, height });
    }

    let corners = match req.units {
        CornerUnits::Pixels => req.corners,
        CornerUnits::Percent => corners_from_percent(&req.corners, width, height),
        CornerUnits::Relative => corners_from_relative(&req.corners, width, height),
    };
    let matrix = matrix3d_from_corners(width, height, &corners);
    let source = default_corners(width, height);

    Ok(Json(MatrixResponse {
        matrix,
        transform: matrix.to_string(),
        corners,
        relative: corners_to_relative(&corners, width, height),
        mapped: source.outline().map(|p| matrix.transform_point(p)),
        degenerate: matrix.is_identity() && corners != source,
    }))
}

/// System information response
#[derive(Serialize)]
struct InfoResponse {
    version: String,
    design: String,
    aspect_ratio: f64,
    handle_size: f64,
    handle_hit_area: f64,
    render_scale: f64,
    resize_debounce_ms: u64,
}

async fn get_info(State(state): State<Arc<AppState>>) -> Json<InfoResponse> {
    let config = &state.config;

    Json(InfoResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        design: config.design.name.clone(),
        aspect_ratio: config.design.aspect_ratio(),
        handle_size: config.surface.handle_size,
        handle_hit_area: config.surface.handle_hit_area,
        render_scale: config.surface.render_scale,
        resize_debounce_ms: config.surface.resize_debounce_ms,
    })
}
