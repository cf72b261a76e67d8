//! Display zoom for the editing surface.
//!
//! Zoom is a view transform only: it never changes the logical canvas size,
//! stored positions, or exports.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Smallest display zoom.
pub const ZOOM_MIN: f64 = 0.5;
/// Largest display zoom.
pub const ZOOM_MAX: f64 = 3.0;
/// Increment used by zoom in/out.
pub const ZOOM_STEP: f64 = 0.2;

/// Clamp a zoom factor into range. Non-finite input falls back to 1.0.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(ZOOM_MIN, ZOOM_MAX)
    } else {
        1.0
    }
}

/// View state for the on-screen surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Current display zoom (1.0 = logical pixels).
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { zoom: 1.0 }
    }
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transform from logical canvas coordinates to screen coordinates.
    pub fn transform(&self) -> Affine {
        Affine::scale(self.zoom)
    }

    /// Inverse transform for pointer input.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom)
    }

    pub fn screen_to_logical(&self, screen_point: Point) -> Point {
        self.inverse_transform() * screen_point
    }

    pub fn logical_to_screen(&self, logical_point: Point) -> Point {
        self.transform() * logical_point
    }

    /// Convert a pointer movement into logical units.
    pub fn screen_delta_to_logical(&self, delta: Vec2) -> Vec2 {
        delta / self.zoom
    }

    /// Set the zoom, clamped. Returns the applied value.
    pub fn set_zoom(&mut self, zoom: f64) -> f64 {
        self.zoom = clamp_zoom(zoom);
        self.zoom
    }

    pub fn zoom_in(&mut self) -> f64 {
        self.set_zoom(self.zoom + ZOOM_STEP)
    }

    pub fn zoom_out(&mut self) -> f64 {
        self.set_zoom(self.zoom - ZOOM_STEP)
    }

    /// Reset to 100%.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
    }
}
