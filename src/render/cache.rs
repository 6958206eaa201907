use std::sync::Arc;

use crate::foundation::core::Verbosity;
use crate::foundation::error::{ApngError, ApngResult};
use crate::model::canvas::CanvasBuffer;
use crate::model::frame::Animation;
use crate::render::compositor::{self, ComposedFrames};
use crate::source::AnimationSource;

/// Counters describing cache activity since construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameCacheStats {
    /// Lookups answered from a stored buffer.
    pub hits: u64,
    /// Frames composited on demand.
    pub composited: u64,
    /// Buffers released by eviction.
    pub evicted: u64,
}

/// Memoized composited buffers, one slot per frame index.
///
/// Slot 0 holds the base image and survives [`FrameCache::evict`]. Other slots are filled lazily
/// by [`FrameCache::resolve`] and released on eviction.
#[derive(Debug, Default)]
pub struct FrameCache {
    slots: Vec<Option<Arc<CanvasBuffer>>>,
    stats: FrameCacheStats,
}

impl FrameCache {
    /// Empty cache with room for `frame_count` slots.
    pub fn new(frame_count: usize) -> Self {
        Self {
            slots: vec![None; frame_count],
            stats: FrameCacheStats::default(),
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Stored buffer for `index`.
    pub fn get(&self, index: usize) -> Option<Arc<CanvasBuffer>> {
        self.slots.get(index).cloned().flatten()
    }

    /// Store `buffer` for `index`, replacing any previous one.
    pub fn put(&mut self, index: usize, buffer: Arc<CanvasBuffer>) -> ApngResult<()> {
        let capacity = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| {
            ApngError::validation(format!(
                "cache slot {index} out of range (capacity {capacity})"
            ))
        })?;
        *slot = Some(buffer);
        Ok(())
    }

    /// Release every buffer except the one at `keep`.
    pub fn evict(&mut self, keep: usize) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if i != keep && slot.take().is_some() {
                self.stats.evicted += 1;
            }
        }
    }

    /// Number of stored buffers.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether no buffer is stored.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Activity counters.
    pub fn stats(&self) -> FrameCacheStats {
        self.stats
    }

    /// Stored buffer for `index`, compositing it and any missing frame it is drawn over first.
    ///
    /// The base image must already sit in slot 0. Decode and allocation failures surface as
    /// [`ApngError::FrameDecode`] for the frame that failed; frames composited before the failure
    /// stay cached.
    pub fn resolve(
        &mut self,
        index: usize,
        anim: &Animation,
        source: &mut dyn AnimationSource,
        verbosity: Verbosity,
    ) -> ApngResult<Arc<CanvasBuffer>> {
        if let Some(buf) = self.get(index) {
            self.stats.hits += 1;
            return Ok(buf);
        }
        if index >= self.slots.len() {
            return Err(ApngError::frame_decode(index, "frame index out of range"));
        }
        let base = self
            .get(0)
            .ok_or_else(|| ApngError::frame_decode(index, "base image is not cached"))?;

        // Walk back over the frames this one is actually drawn on.
        let mut pending = Vec::new();
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            if i == 0 || self.slots[i].is_some() {
                break;
            }
            pending.push(i);
            cursor = compositor::backdrop_index(i, anim);
        }

        for i in pending.into_iter().rev() {
            let pixels = source
                .decode_frame_pixels(i)
                .map_err(|e| e.into_frame_decode(i))?;
            let buf = compositor::composite(i, anim, &*self, &base, &pixels)
                .map_err(|e| e.into_frame_decode(i))?;
            if verbosity.verbose() {
                tracing::trace!(frame = i, "composited frame buffer");
            }
            self.slots[i] = Some(Arc::new(buf));
            self.stats.composited += 1;
        }

        self.slots[index]
            .clone()
            .ok_or_else(|| ApngError::frame_decode(index, "composited buffer missing"))
    }
}

impl ComposedFrames for FrameCache {
    fn composed(&self, index: usize) -> Option<&CanvasBuffer> {
        self.slots.get(index)?.as_deref()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cache.rs"]
mod tests;
