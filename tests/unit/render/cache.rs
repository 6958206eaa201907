use super::*;
use crate::foundation::core::{Canvas, PixelRect};
use crate::model::frame::{AnimationInfo, BlendOp, DisposeOp, FrameRecord};
use crate::render::blend::Rgba8;
use crate::source::memory::MemorySource;

const RED: Rgba8 = [255, 0, 0, 255];
const BLUE: Rgba8 = [0, 0, 255, 255];

/// Counts pixel decodes so tests can observe memoization.
struct CountingSource {
    inner: MemorySource,
    decodes: Vec<usize>,
}

impl AnimationSource for CountingSource {
    fn decode_container(
        &mut self,
    ) -> ApngResult<(AnimationInfo, Vec<crate::model::frame::FrameRecord>)> {
        self.inner.decode_container()
    }

    fn decode_frame_pixels(&mut self, index: usize) -> ApngResult<CanvasBuffer> {
        self.decodes.push(index);
        self.inner.decode_frame_pixels(index)
    }
}

fn fixture(frames: usize) -> (Animation, CountingSource, Arc<CanvasBuffer>) {
    let canvas = Canvas::new(4, 1).unwrap();
    let info = AnimationInfo {
        frame_count: frames as u32,
        requested_loops: 0,
        canvas,
    };
    let mut records = vec![FrameRecord::full(canvas, 1, 10)];
    let mut pixels = vec![CanvasBuffer::filled(4, 1, RED).unwrap()];
    for i in 1..frames {
        let rect = PixelRect::new(i as u32 % 4, 0, 1, 1);
        records.push(FrameRecord {
            width: 1,
            height: 1,
            x_offset: rect.x,
            y_offset: rect.y,
            delay_num: 1,
            delay_den: 10,
            dispose_op: DisposeOp::None,
            blend_op: BlendOp::Over,
        });
        pixels.push(CanvasBuffer::filled(1, 1, BLUE).unwrap());
    }
    let anim = Animation::new(info, records.clone()).unwrap();
    let base = Arc::new(pixels[0].clone());
    let source = CountingSource {
        inner: MemorySource::new(info, records, pixels).unwrap(),
        decodes: Vec::new(),
    };
    (anim, source, base)
}

#[test]
fn put_get_and_len() {
    let mut cache = FrameCache::new(3);
    assert!(cache.is_empty());
    let buf = Arc::new(CanvasBuffer::transparent(1, 1).unwrap());
    cache.put(2, buf.clone()).unwrap();
    assert_eq!(cache.len(), 1);
    assert!(Arc::ptr_eq(&cache.get(2).unwrap(), &buf));
    assert!(cache.get(1).is_none());
    assert!(cache.put(3, buf).is_err());
}

#[test]
fn resolve_composites_lazily_and_memoizes() {
    let (anim, mut source, base) = fixture(3);
    let mut cache = FrameCache::new(anim.frame_count());
    cache.put(0, base).unwrap();

    let first = cache.resolve(2, &anim, &mut source, Verbosity::Silent).unwrap();
    assert_eq!(source.decodes, vec![1, 2]);
    assert_eq!(cache.len(), 3);

    let again = cache.resolve(2, &anim, &mut source, Verbosity::Silent).unwrap();
    assert_eq!(source.decodes, vec![1, 2]);
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(cache.stats().hits, 1);
    assert_eq!(cache.stats().composited, 2);
}

#[test]
fn cache_hit_matches_fresh_composite() {
    let (anim, mut source, base) = fixture(4);
    let mut cache = FrameCache::new(anim.frame_count());
    cache.put(0, base.clone()).unwrap();
    let cached = cache.resolve(3, &anim, &mut source, Verbosity::Silent).unwrap();

    let mut fresh = FrameCache::new(anim.frame_count());
    fresh.put(0, base).unwrap();
    let recomputed = fresh.resolve(3, &anim, &mut source, Verbosity::Silent).unwrap();
    assert_eq!(*cached, *recomputed);
}

#[test]
fn base_slot_is_returned_without_decoding() {
    let (anim, mut source, base) = fixture(2);
    let mut cache = FrameCache::new(anim.frame_count());
    cache.put(0, base.clone()).unwrap();
    let out = cache.resolve(0, &anim, &mut source, Verbosity::Silent).unwrap();
    assert!(Arc::ptr_eq(&out, &base));
    assert!(source.decodes.is_empty());
}

#[test]
fn evict_keeps_only_the_base() {
    let (anim, mut source, base) = fixture(4);
    let mut cache = FrameCache::new(anim.frame_count());
    cache.put(0, base.clone()).unwrap();
    cache.resolve(3, &anim, &mut source, Verbosity::Silent).unwrap();
    assert_eq!(cache.len(), 4);

    cache.evict(0);
    assert_eq!(cache.len(), 1);
    assert!(Arc::ptr_eq(&cache.get(0).unwrap(), &base));
    assert_eq!(cache.stats().evicted, 3);

    // Recomputes after eviction.
    source.decodes.clear();
    cache.resolve(1, &anim, &mut source, Verbosity::Silent).unwrap();
    assert_eq!(source.decodes, vec![1]);
}

#[test]
fn decode_failure_keeps_earlier_frames() {
    let (anim, mut source, base) = fixture(4);
    source.inner.remove_frame_pixels(2);
    let mut cache = FrameCache::new(anim.frame_count());
    cache.put(0, base).unwrap();

    let err = cache
        .resolve(3, &anim, &mut source, Verbosity::Silent)
        .unwrap_err();
    assert!(matches!(err, ApngError::FrameDecode { index: 2, .. }));
    assert!(cache.get(1).is_some());
    assert!(cache.get(2).is_none());
    assert!(cache.get(3).is_none());
}

#[test]
fn resolve_without_base_fails() {
    let (anim, mut source, _) = fixture(2);
    let mut cache = FrameCache::new(anim.frame_count());
    assert!(
        cache
            .resolve(1, &anim, &mut source, Verbosity::Silent)
            .is_err()
    );
}

#[test]
fn resolve_out_of_range_fails() {
    let (anim, mut source, base) = fixture(2);
    let mut cache = FrameCache::new(anim.frame_count());
    cache.put(0, base).unwrap();
    assert!(matches!(
        cache.resolve(5, &anim, &mut source, Verbosity::Silent),
        Err(ApngError::FrameDecode { index: 5, .. })
    ));
}

#[test]
fn reverted_frame_failure_does_not_block_later_frames() {
    let canvas = Canvas::new(4, 1).unwrap();
    let info = AnimationInfo {
        frame_count: 4,
        requested_loops: 0,
        canvas,
    };
    let dot = |x: u32, dispose_op: DisposeOp| FrameRecord {
        width: 1,
        height: 1,
        x_offset: x,
        y_offset: 0,
        delay_num: 1,
        delay_den: 10,
        dispose_op,
        blend_op: BlendOp::Over,
    };
    let records = vec![
        FrameRecord::full(canvas, 1, 10),
        dot(1, DisposeOp::None),
        dot(2, DisposeOp::Previous),
        dot(3, DisposeOp::None),
    ];
    let pixels = vec![
        CanvasBuffer::filled(4, 1, RED).unwrap(),
        CanvasBuffer::filled(1, 1, BLUE).unwrap(),
        CanvasBuffer::filled(1, 1, BLUE).unwrap(),
        CanvasBuffer::filled(1, 1, BLUE).unwrap(),
    ];
    let anim = Animation::new(info, records.clone()).unwrap();
    let base = Arc::new(pixels[0].clone());
    let mut source = CountingSource {
        inner: MemorySource::new(info, records, pixels).unwrap(),
        decodes: Vec::new(),
    };
    source.inner.remove_frame_pixels(2);

    let mut cache = FrameCache::new(anim.frame_count());
    cache.put(0, base).unwrap();
    assert!(matches!(
        cache.resolve(2, &anim, &mut source, Verbosity::Silent),
        Err(ApngError::FrameDecode { index: 2, .. })
    ));

    // Frame 2 reverts, so frame 3 is drawn over frame 1.
    source.decodes.clear();
    let out = cache.resolve(3, &anim, &mut source, Verbosity::Silent).unwrap();
    assert_eq!(source.decodes, vec![3]);
    assert_eq!(out.pixel(0, 0), Some(RED));
    assert_eq!(out.pixel(1, 0), Some(BLUE));
    assert_eq!(out.pixel(2, 0), Some(RED));
    assert_eq!(out.pixel(3, 0), Some(BLUE));
    assert!(cache.get(2).is_none());
}
