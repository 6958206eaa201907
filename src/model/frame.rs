use std::time::Duration;

use crate::foundation::core::{Canvas, PixelRect};
use crate::foundation::error::{ApngError, ApngResult};

/// Delay denominator used when a record stores 0.
pub const DEFAULT_DELAY_DEN: u32 = 100;

/// What happens to a frame's region after it has been shown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposeOp {
    /// Leave the canvas as is.
    #[default]
    None,
    /// Clear the frame rectangle to transparent.
    Background,
    /// Revert to the canvas state before this frame.
    Previous,
}

/// How a frame's pixels combine with the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendOp {
    /// Replace the frame rectangle, transparent pixels included.
    #[default]
    Source,
    /// Alpha-composite over the existing canvas.
    Over,
}

/// Per-frame control record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FrameRecord {
    /// Sub-image width.
    pub width: u32,
    /// Sub-image height.
    pub height: u32,
    /// Left offset on the canvas.
    pub x_offset: u32,
    /// Top offset on the canvas.
    pub y_offset: u32,
    /// Delay numerator, seconds.
    pub delay_num: u32,
    /// Delay denominator; 0 means [`DEFAULT_DELAY_DEN`].
    pub delay_den: u32,
    /// Disposal applied after this frame is shown.
    pub dispose_op: DisposeOp,
    /// Blending applied when this frame is drawn.
    pub blend_op: BlendOp,
}

impl FrameRecord {
    /// Full-canvas frame with the given delay and default operations.
    pub fn full(canvas: Canvas, delay_num: u32, delay_den: u32) -> Self {
        Self {
            width: canvas.width,
            height: canvas.height,
            x_offset: 0,
            y_offset: 0,
            delay_num,
            delay_den,
            dispose_op: DisposeOp::None,
            blend_op: BlendOp::Source,
        }
    }

    /// Rectangle this frame occupies on the canvas.
    pub fn rect(&self) -> PixelRect {
        PixelRect::new(self.x_offset, self.y_offset, self.width, self.height)
    }

    /// Denominator with the zero convention applied.
    pub fn effective_delay_den(&self) -> u32 {
        if self.delay_den == 0 {
            DEFAULT_DELAY_DEN
        } else {
            self.delay_den
        }
    }

    /// Display time in whole milliseconds, rounded half up.
    pub fn delay_millis(&self) -> u64 {
        let num = u64::from(self.delay_num) * 1000;
        let den = u64::from(self.effective_delay_den());
        (num + den / 2) / den
    }

    /// Display time as a [`Duration`].
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_millis())
    }
}

/// Global animation metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AnimationInfo {
    /// Number of animation frames.
    pub frame_count: u32,
    /// Requested plays; 0 loops forever.
    pub requested_loops: u32,
    /// Full canvas size.
    pub canvas: Canvas,
}

/// Immutable, index-ordered frame record store.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Animation {
    info: AnimationInfo,
    frames: Vec<FrameRecord>,
}

impl Animation {
    /// Validate and freeze decoded container metadata.
    ///
    /// Rectangles outside the canvas are accepted with a warning; drawing clips them.
    pub fn new(info: AnimationInfo, frames: Vec<FrameRecord>) -> ApngResult<Self> {
        if info.canvas.width == 0 || info.canvas.height == 0 {
            return Err(ApngError::container("canvas has zero size"));
        }
        if frames.is_empty() {
            return Err(ApngError::container("animation has no frames"));
        }
        if frames.len() != info.frame_count as usize {
            return Err(ApngError::container(format!(
                "frame count mismatch: header says {}, found {} frame records",
                info.frame_count,
                frames.len()
            )));
        }
        for (i, f) in frames.iter().enumerate() {
            if !f.rect().fits(info.canvas) {
                tracing::warn!(
                    frame = i,
                    x = f.x_offset,
                    y = f.y_offset,
                    width = f.width,
                    height = f.height,
                    "frame rectangle exceeds canvas, it will be clipped"
                );
            }
        }
        Ok(Self { info, frames })
    }

    /// Global metadata.
    pub fn info(&self) -> &AnimationInfo {
        &self.info
    }

    /// Canvas size.
    pub fn canvas(&self) -> Canvas {
        self.info.canvas
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Record for `index`.
    pub fn frame(&self, index: usize) -> Option<&FrameRecord> {
        self.frames.get(index)
    }

    /// All records in display order.
    pub fn frames(&self) -> &[FrameRecord] {
        &self.frames
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/frame.rs"]
mod tests;
