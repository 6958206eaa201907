use crate::foundation::error::{ApngError, ApngResult};

/// Full animation canvas size in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Build a canvas size, rejecting empty dimensions.
    pub fn new(width: u32, height: u32) -> ApngResult<Self> {
        if width == 0 || height == 0 {
            return Err(ApngError::validation(format!(
                "canvas must be non-empty, got {width}x{height}"
            )));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels covered by the canvas.
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Rectangle covering the whole canvas.
    pub fn bounds(self) -> PixelRect {
        PixelRect {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        }
    }
}

/// Axis-aligned pixel rectangle, top-left origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Build a rectangle from origin and size.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge, saturating.
    pub fn right(self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating.
    pub fn bottom(self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Whether the rectangle covers no pixels.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the rectangle lies entirely inside `canvas`.
    pub fn fits(self, canvas: Canvas) -> bool {
        self.right() <= canvas.width && self.bottom() <= canvas.height
    }

    /// Intersect with the canvas bounds. `None` when nothing is left.
    pub fn clip_to(self, canvas: Canvas) -> Option<PixelRect> {
        let right = self.right().min(canvas.width);
        let bottom = self.bottom().min(canvas.height);
        if self.x >= right || self.y >= bottom {
            return None;
        }
        Some(PixelRect {
            x: self.x,
            y: self.y,
            width: right - self.x,
            height: bottom - self.y,
        })
    }
}

/// Diagnostic output level, passed explicitly at construction.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Only warnings about malformed input.
    #[default]
    Silent,
    /// Lifecycle messages: prepare, frame counts, loop source.
    Debug,
    /// Per-frame messages on top of `Debug`.
    Verbose,
}

impl Verbosity {
    /// Lifecycle logging enabled.
    pub fn debug(self) -> bool {
        self >= Verbosity::Debug
    }

    /// Per-frame logging enabled.
    pub fn verbose(self) -> bool {
        self >= Verbosity::Verbose
    }
}

/// Uniform scale that fits `canvas` inside a `surface_width x surface_height` surface.
pub fn fit_scale(surface_width: u32, surface_height: u32, canvas: Canvas) -> f32 {
    if canvas.width == 0 || canvas.height == 0 {
        return 0.0;
    }
    let by_width = surface_width as f32 / canvas.width as f32;
    let by_height = surface_height as f32 / canvas.height as f32;
    by_width.min(by_height)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
