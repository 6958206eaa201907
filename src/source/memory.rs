use crate::foundation::error::{ApngError, ApngResult};
use crate::model::canvas::CanvasBuffer;
use crate::model::frame::{AnimationInfo, FrameRecord};
use crate::source::AnimationSource;

/// In-memory animation source for tests, tools and hosts that decode elsewhere.
#[derive(Debug, Clone)]
pub struct MemorySource {
    info: AnimationInfo,
    frames: Vec<FrameRecord>,
    pixels: Vec<Option<CanvasBuffer>>,
}

impl MemorySource {
    /// Build from records and one decoded sub-image per record.
    pub fn new(
        info: AnimationInfo,
        frames: Vec<FrameRecord>,
        pixels: Vec<CanvasBuffer>,
    ) -> ApngResult<Self> {
        if frames.len() != pixels.len() {
            return Err(ApngError::validation(format!(
                "{} frame records but {} pixel buffers",
                frames.len(),
                pixels.len()
            )));
        }
        Ok(Self {
            info,
            frames,
            pixels: pixels.into_iter().map(Some).collect(),
        })
    }

    /// Drop the pixels of `index` so decoding it fails.
    pub fn remove_frame_pixels(&mut self, index: usize) {
        if let Some(slot) = self.pixels.get_mut(index) {
            *slot = None;
        }
    }
}

impl AnimationSource for MemorySource {
    fn decode_container(&mut self) -> ApngResult<(AnimationInfo, Vec<FrameRecord>)> {
        Ok((self.info, self.frames.clone()))
    }

    fn decode_frame_pixels(&mut self, index: usize) -> ApngResult<CanvasBuffer> {
        match self.pixels.get(index) {
            Some(Some(buf)) => buf.try_clone(),
            Some(None) => Err(ApngError::frame_decode(index, "pixels unavailable")),
            None => Err(ApngError::frame_decode(index, "frame index out of range")),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/memory.rs"]
mod tests;
