//! Decode collaborators consumed by the player.

use crate::foundation::error::{ApngError, ApngResult};
use crate::model::canvas::CanvasBuffer;
use crate::model::frame::{Animation, AnimationInfo, FrameRecord};

pub(crate) mod memory;
pub(crate) mod apng;

/// Supplies container metadata and per-frame pixels for one animation.
///
/// Implementations may block; the player calls them from its draw path.
pub trait AnimationSource: Send {
    /// Read global metadata and every frame control record, in display order.
    ///
    /// Fails with [`ApngError::Container`] when the source is not an animated PNG.
    fn decode_container(&mut self) -> ApngResult<(AnimationInfo, Vec<FrameRecord>)>;

    /// Decode the RGBA8 sub-image of frame `index` (its own width and height, not the canvas).
    ///
    /// Fails with [`ApngError::FrameDecode`].
    fn decode_frame_pixels(&mut self, index: usize) -> ApngResult<CanvasBuffer>;

    /// Full-size base image shown as frame 0.
    ///
    /// Defaults to frame 0's pixels placed on a transparent canvas.
    fn decode_base_image(&mut self, anim: &Animation) -> ApngResult<CanvasBuffer> {
        let canvas = anim.canvas();
        let first = anim
            .frame(0)
            .ok_or_else(|| ApngError::container("animation has no frames"))?;
        let pixels = self.decode_frame_pixels(0)?;
        let mut base = CanvasBuffer::transparent(canvas.width, canvas.height)?;
        base.draw_over(&pixels, first.x_offset, first.y_offset);
        Ok(base)
    }
}

impl<S: AnimationSource + ?Sized> AnimationSource for Box<S> {
    fn decode_container(&mut self) -> ApngResult<(AnimationInfo, Vec<FrameRecord>)> {
        (**self).decode_container()
    }

    fn decode_frame_pixels(&mut self, index: usize) -> ApngResult<CanvasBuffer> {
        (**self).decode_frame_pixels(index)
    }

    fn decode_base_image(&mut self, anim: &Animation) -> ApngResult<CanvasBuffer> {
        (**self).decode_base_image(anim)
    }
}
