//! Interactive warp surface
//!
//! Owns the four corners of one warp session and turns pointer and touch
//! gestures into corner updates. Every committed update recomputes the
//! transform, pushes it to the rendering surface and notifies the change
//! listener.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Dragging(k)     (press on handle k, single pointer)
//! Dragging(k) -> Dragging(k)   (move: corner = pointer - offset, clamped)
//! Dragging(k) -> Idle     (release, touch end/cancel, external cancel)
//! ```
//!
//! A press while already dragging is ignored, as is any touch gesture with
//! more than one active touch point.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::config::SurfaceConfig;
use crate::corners::{apply_drag, default_corners, CornerKey, CornerPoints, Point};
use crate::debounce::ResizeDebounce;
use crate::handles::hit_test;
use crate::surface::{DragBounds, Measurement, SurfaceRect, Viewport};
use crate::transform::{matrix3d_from_corners, Matrix3d};

/// Receives the transform for the nested banner layer
pub trait RenderSurface: Send {
    fn apply_transform(&mut self, transform: &Matrix3d);

    /// Drop the applied transform; the layer has no size to warp
    fn clear_transform(&mut self);
}

/// Called with the new corners after every committed update
pub type TransformListener = Box<dyn FnMut(&CornerPoints) + Send>;

/// Document-wide style applied while a drag is in progress
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BodyStyle {
    pub user_select: Option<&'static str>,
    pub cursor: Option<&'static str>,
}

/// Held for the lifetime of a drag; restores the body style when dropped
#[derive(Debug)]
pub struct DragLock {
    style: Arc<Mutex<BodyStyle>>,
}

impl DragLock {
    fn acquire(style: &Arc<Mutex<BodyStyle>>) -> Self {
        *style.lock() = BodyStyle {
            user_select: Some("none"),
            cursor: Some("grabbing"),
        };
        Self {
            style: style.clone(),
        }
    }
}

impl Drop for DragLock {
    fn drop(&mut self) {
        *self.style.lock() = BodyStyle::default();
    }
}

/// Drag session state
#[derive(Debug, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        corner: CornerKey,
        /// Pointer position minus corner position at press time
        offset: Point,
        _lock: DragLock,
    },
}

/// Raw input from the host, in screen coordinates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    MouseDown {
        /// Handle that received the press; hit-tested when absent
        #[serde(default)]
        corner: Option<CornerKey>,
        x: f64,
        y: f64,
    },
    MouseMove {
        x: f64,
        y: f64,
    },
    MouseUp,
    TouchStart {
        #[serde(default)]
        corner: Option<CornerKey>,
        touches: Vec<Point>,
    },
    TouchMove {
        touches: Vec<Point>,
    },
    TouchEnd,
    TouchCancel,
}

/// What an event did to the session
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum EventOutcome {
    Ignored,
    DragStarted { corner: CornerKey },
    Moved { corner: CornerKey, point: Point },
    DragEnded { corner: CornerKey },
}

pub struct WarpSurface {
    rect: SurfaceRect,
    viewport: Viewport,
    corners: Option<CornerPoints>,
    drag: DragState,
    body_style: Arc<Mutex<BodyStyle>>,
    resize: ResizeDebounce,
    hit_area: f64,
    renderer: Box<dyn RenderSurface>,
    listener: Option<TransformListener>,
}

impl WarpSurface {
    pub fn new(config: &SurfaceConfig, renderer: Box<dyn RenderSurface>) -> Self {
        Self {
            rect: SurfaceRect::default(),
            viewport: Viewport::default(),
            corners: None,
            drag: DragState::Idle,
            body_style: Arc::new(Mutex::new(BodyStyle::default())),
            resize: ResizeDebounce::new(config.resize_debounce()),
            hit_area: config.handle_hit_area,
            renderer,
            listener: None,
        }
    }

    /// Register the `onTransformChange` callback
    pub fn set_listener(&mut self, listener: TransformListener) {
        self.listener = Some(listener);
    }

    pub fn rect(&self) -> &SurfaceRect {
        &self.rect
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn corners(&self) -> Option<&CornerPoints> {
        self.corners.as_ref()
    }

    pub fn dragging(&self) -> Option<CornerKey> {
        match self.drag {
            DragState::Dragging { corner, .. } => Some(corner),
            DragState::Idle => None,
        }
    }

    pub fn drag_offset(&self) -> Option<Point> {
        match self.drag {
            DragState::Dragging { offset, .. } => Some(offset),
            DragState::Idle => None,
        }
    }

    pub fn body_style(&self) -> BodyStyle {
        self.body_style.lock().clone()
    }

    /// Rendering hint for the banner layer
    pub fn will_change(&self) -> &'static str {
        if self.dragging().is_some() {
            "transform"
        } else {
            "auto"
        }
    }

    pub fn pending_reset(&self) -> Option<Instant> {
        self.resize.deadline()
    }

    /// Current transform; `None` until a non-zero size has been measured
    pub fn transform(&self) -> Option<Matrix3d> {
        if !self.rect.is_measured() {
            return None;
        }
        self.corners
            .as_ref()
            .map(|c| matrix3d_from_corners(self.rect.width, self.rect.height, c))
    }

    /// Record a layout measurement.
    ///
    /// The first non-zero size initializes the corners. A later size change
    /// schedules a debounced reset and returns its deadline; a move with the
    /// same size (scrolling) only updates the rectangle.
    pub fn measure(&mut self, measurement: Measurement, now: Instant) -> Option<Instant> {
        let previous = std::mem::replace(&mut self.rect, measurement.rect);
        self.viewport = measurement.viewport;

        if !self.rect.is_measured() {
            self.resize.cancel();
            if self.dragging().is_some() {
                debug!("Surface collapsed, ending drag");
                self.drag = DragState::Idle;
            }
            if previous.is_measured() && self.corners.is_some() {
                self.renderer.clear_transform();
            }
            return None;
        }

        if self.corners.is_none() {
            debug!(
                "Surface measured at {}x{}, initializing corners",
                self.rect.width, self.rect.height
            );
            self.corners = Some(default_corners(self.rect.width, self.rect.height));
            self.render();
            return None;
        }

        let deadline = if previous.same_size(&self.rect) {
            None
        } else {
            Some(self.resize.schedule(&self.rect, now))
        };
        self.render();
        deadline
    }

    /// Run the debounced reset if it is due. Returns true if corners were reset.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some((width, height)) = self.resize.poll(now) else {
            return false;
        };
        if !self.rect.is_measured() || self.rect.width != width || self.rect.height != height {
            return false;
        }
        debug!("Resize settled at {}x{}, resetting corners", width, height);
        self.commit(default_corners(width, height));
        true
    }

    /// Reset to the untransformed rectangle at the current size
    pub fn reset(&mut self) -> bool {
        if !self.rect.is_measured() {
            return false;
        }
        self.resize.cancel();
        self.commit(default_corners(self.rect.width, self.rect.height));
        true
    }

    pub fn handle_event(&mut self, event: &PointerEvent) -> EventOutcome {
        match event {
            PointerEvent::MouseDown { corner, x, y } => self.press(*corner, Point::new(*x, *y)),
            PointerEvent::TouchStart { corner, touches } => match touches.as_slice() {
                [touch] => self.press(*corner, *touch),
                _ => {
                    debug!("Ignoring touch start with {} touches", touches.len());
                    EventOutcome::Ignored
                }
            },
            PointerEvent::MouseMove { x, y } => self.drag_to(Point::new(*x, *y)),
            PointerEvent::TouchMove { touches } => match touches.as_slice() {
                [touch] => self.drag_to(*touch),
                _ => {
                    debug!("Ignoring touch move with {} touches", touches.len());
                    EventOutcome::Ignored
                }
            },
            PointerEvent::MouseUp | PointerEvent::TouchEnd | PointerEvent::TouchCancel => {
                self.release()
            }
        }
    }

    /// End the drag session from outside the input stream
    pub fn cancel(&mut self) -> EventOutcome {
        self.release()
    }

    fn press(&mut self, corner: Option<CornerKey>, screen: Point) -> EventOutcome {
        if let Some(active) = self.dragging() {
            debug!("Already dragging {}, ignoring press", active);
            return EventOutcome::Ignored;
        }
        if !self.rect.is_measured() {
            return EventOutcome::Ignored;
        }
        let Some(corners) = self.corners else {
            return EventOutcome::Ignored;
        };
        let Some(corner) =
            corner.or_else(|| hit_test(&corners, &self.rect, screen, self.hit_area))
        else {
            return EventOutcome::Ignored;
        };

        let offset = self.rect.to_local(screen).sub(corners.get(corner));
        debug!("Drag start on {} (offset {:.1}, {:.1})", corner, offset.x, offset.y);
        self.drag = DragState::Dragging {
            corner,
            offset,
            _lock: DragLock::acquire(&self.body_style),
        };
        EventOutcome::DragStarted { corner }
    }

    fn drag_to(&mut self, screen: Point) -> EventOutcome {
        let DragState::Dragging { corner, offset, .. } = self.drag else {
            return EventOutcome::Ignored;
        };
        let Some(corners) = self.corners else {
            return EventOutcome::Ignored;
        };
        if !self.rect.is_measured() {
            return EventOutcome::Ignored;
        }

        let local = self.rect.to_local(screen).sub(offset);
        let point = DragBounds::for_viewport(&self.rect, &self.viewport).clamp(local);
        self.commit(apply_drag(&corners, corner, point));
        EventOutcome::Moved { corner, point }
    }

    fn release(&mut self) -> EventOutcome {
        match std::mem::take(&mut self.drag) {
            DragState::Dragging { corner, .. } => {
                debug!("Drag end on {}", corner);
                EventOutcome::DragEnded { corner }
            }
            DragState::Idle => EventOutcome::Ignored,
        }
    }

    fn commit(&mut self, corners: CornerPoints) {
        self.corners = Some(corners);
        self.render();
        if let Some(listener) = self.listener.as_mut() {
            listener(&corners);
        }
    }

    fn render(&mut self) {
        if let Some(transform) = self.transform() {
            self.renderer.apply_transform(&transform);
        }
    }
}
