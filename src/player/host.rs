use std::time::Instant;

use crate::model::canvas::CanvasBuffer;

/// Timer and redraw primitives of the host that drives a [`crate::Player`].
///
/// The player calls these while holding its state lock; implementations must not call back into
/// the player synchronously. Typical hosts record the request and invoke
/// [`crate::Player::tick`] / [`crate::Player::on_draw`] later from their own loop.
pub trait PlaybackHost: Send {
    /// Arrange a single call to [`crate::Player::tick`] at `deadline` (monotonic clock).
    ///
    /// A new request replaces any pending one.
    fn schedule_tick(&mut self, deadline: Instant);

    /// Drop the pending tick, if any.
    fn cancel_tick(&mut self);

    /// Ask the render surface to refresh, which ends in a [`crate::Player::on_draw`] call.
    fn request_redraw(&mut self);
}

/// Display surface receiving composited canvases.
pub trait RenderSurface {
    /// Surface size in pixels.
    fn size(&self) -> (u32, u32);

    /// Show `canvas` uniformly scaled by `scale`.
    fn present(&mut self, canvas: &CanvasBuffer, scale: f32);
}
