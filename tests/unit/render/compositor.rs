use super::*;
use crate::foundation::core::PixelRect;
use crate::model::frame::AnimationInfo;
use crate::render::blend::{Rgba8, TRANSPARENT};

const RED: Rgba8 = [255, 0, 0, 255];
const BLUE: Rgba8 = [0, 0, 255, 255];
const GREEN: Rgba8 = [0, 255, 0, 255];
const WHITE: Rgba8 = [255, 255, 255, 255];

fn canvas() -> Canvas {
    Canvas::new(4, 4).unwrap()
}

fn record(rect: PixelRect, dispose_op: DisposeOp, blend_op: BlendOp) -> FrameRecord {
    FrameRecord {
        width: rect.width,
        height: rect.height,
        x_offset: rect.x,
        y_offset: rect.y,
        delay_num: 1,
        delay_den: 10,
        dispose_op,
        blend_op,
    }
}

fn anim(frames: Vec<FrameRecord>) -> Animation {
    Animation::new(
        AnimationInfo {
            frame_count: frames.len() as u32,
            requested_loops: 0,
            canvas: canvas(),
        },
        frames,
    )
    .unwrap()
}

fn solid(w: u32, h: u32, px: Rgba8) -> CanvasBuffer {
    CanvasBuffer::filled(w, h, px).unwrap()
}

/// Composite every frame in order, the way the cache fills itself.
fn compose_all(anim: &Animation, base: &CanvasBuffer, pixels: &[CanvasBuffer]) -> Vec<CanvasBuffer> {
    let mut out: Vec<CanvasBuffer> = Vec::new();
    for i in 0..anim.frame_count() {
        let buf = composite(i, anim, &out, base, &pixels[i]).unwrap();
        out.push(buf);
    }
    out
}

#[test]
fn frame_zero_is_the_base_image() {
    let base = solid(4, 4, RED);
    let a = anim(vec![record(canvas().bounds(), DisposeOp::None, BlendOp::Source)]);
    let empty: Vec<CanvasBuffer> = Vec::new();
    let out = composite(0, &a, &empty, &base, &solid(1, 1, BLUE)).unwrap();
    assert_eq!(out, base);
}

#[test]
fn compositing_twice_is_pixel_identical() {
    let base = solid(4, 4, RED);
    let a = anim(vec![
        record(canvas().bounds(), DisposeOp::Background, BlendOp::Source),
        record(PixelRect::new(1, 1, 2, 2), DisposeOp::None, BlendOp::Over),
    ]);
    let composed = vec![base.clone()];
    let px = solid(2, 2, [0, 0, 255, 128]);
    let first = composite(1, &a, &composed, &base, &px).unwrap();
    let second = composite(1, &a, &composed, &base, &px).unwrap();
    assert_eq!(first, second);
}

#[test]
fn dispose_none_keeps_previous_buffer() {
    let base = solid(4, 4, RED);
    let a = anim(vec![
        record(canvas().bounds(), DisposeOp::None, BlendOp::Source),
        record(PixelRect::new(0, 0, 1, 1), DisposeOp::None, BlendOp::Over),
        record(PixelRect::new(3, 3, 1, 1), DisposeOp::None, BlendOp::Over),
    ]);
    let pixels = [solid(4, 4, RED), solid(1, 1, BLUE), solid(1, 1, GREEN)];
    let composed = compose_all(&a, &base, &pixels);

    match resolve_disposal(2, &a, &composed).unwrap() {
        WorkingCanvas::Unchanged(buf) => assert_eq!(buf, &composed[1]),
        other => panic!("expected unchanged canvas, got {other:?}"),
    }
    assert_eq!(composed[2].pixel(0, 0), Some(BLUE));
    assert_eq!(composed[2].pixel(3, 3), Some(GREEN));
}

#[test]
fn dispose_background_clears_only_previous_rect() {
    let base = solid(4, 4, RED);
    let prev_rect = PixelRect::new(1, 0, 2, 2);
    let a = anim(vec![
        record(canvas().bounds(), DisposeOp::None, BlendOp::Source),
        record(prev_rect, DisposeOp::Background, BlendOp::Over),
        record(PixelRect::new(3, 3, 1, 1), DisposeOp::None, BlendOp::Over),
    ]);
    let pixels = [solid(4, 4, RED), solid(2, 2, BLUE), solid(1, 1, GREEN)];
    let composed = compose_all(&a, &base, &pixels);

    let working = resolve_disposal(2, &a, &composed)
        .unwrap()
        .into_buffer(canvas())
        .unwrap();
    for y in 0..4 {
        for x in 0..4 {
            let inside = (1..3).contains(&x) && (0..2).contains(&y);
            let expect = if inside {
                TRANSPARENT
            } else {
                composed[1].pixel(x, y).unwrap()
            };
            assert_eq!(working.pixel(x, y), Some(expect), "pixel ({x},{y})");
        }
    }
    // The cached frame itself is untouched by disposal.
    assert_eq!(composed[1].pixel(1, 0), Some(BLUE));
}

#[test]
fn dispose_previous_chain_reverts_to_nearest_non_previous_ancestor() {
    let base = solid(4, 4, RED);
    let a = anim(vec![
        record(canvas().bounds(), DisposeOp::None, BlendOp::Source),
        record(PixelRect::new(0, 0, 1, 1), DisposeOp::None, BlendOp::Over),
        record(PixelRect::new(1, 0, 1, 1), DisposeOp::Previous, BlendOp::Over),
        record(PixelRect::new(2, 0, 1, 1), DisposeOp::Previous, BlendOp::Over),
        record(PixelRect::new(3, 3, 1, 1), DisposeOp::None, BlendOp::Over),
    ]);
    let pixels = [
        solid(4, 4, RED),
        solid(1, 1, BLUE),
        solid(1, 1, GREEN),
        solid(1, 1, WHITE),
        solid(1, 1, BLUE),
    ];
    let composed = compose_all(&a, &base, &pixels);

    match resolve_disposal(4, &a, &composed).unwrap() {
        WorkingCanvas::Unchanged(buf) => assert_eq!(buf, &composed[1]),
        other => panic!("expected frame 1 buffer, got {other:?}"),
    }
    // Frame 3 reverts to frame 1 as well, so green never shows there.
    assert_eq!(composed[3].pixel(1, 0), Some(RED));
    assert_eq!(composed[3].pixel(2, 0), Some(WHITE));
    assert_eq!(composed[4].pixel(0, 0), Some(BLUE));
    assert_eq!(composed[4].pixel(1, 0), Some(RED));
    assert_eq!(composed[4].pixel(2, 0), Some(RED));
    assert_eq!(composed[4].pixel(3, 3), Some(BLUE));
}

#[test]
fn dispose_previous_to_background_ancestor_clears_ancestor_rect() {
    let base = solid(4, 4, RED);
    let a = anim(vec![
        record(canvas().bounds(), DisposeOp::None, BlendOp::Source),
        record(PixelRect::new(0, 0, 2, 1), DisposeOp::Background, BlendOp::Over),
        record(PixelRect::new(2, 2, 1, 1), DisposeOp::Previous, BlendOp::Over),
        record(PixelRect::new(3, 3, 1, 1), DisposeOp::None, BlendOp::Over),
    ]);
    let pixels = [
        solid(4, 4, RED),
        solid(2, 1, BLUE),
        solid(1, 1, GREEN),
        solid(1, 1, WHITE),
    ];
    let composed = compose_all(&a, &base, &pixels);

    let working = resolve_disposal(3, &a, &composed)
        .unwrap()
        .into_buffer(canvas())
        .unwrap();
    assert_eq!(working.pixel(0, 0), Some(TRANSPARENT));
    assert_eq!(working.pixel(1, 0), Some(TRANSPARENT));
    assert_eq!(working.pixel(2, 2), Some(RED));
    assert_eq!(working.pixel(2, 0), Some(RED));
}

#[test]
fn previous_chain_without_ancestor_draws_on_transparent_canvas() {
    let base = solid(4, 4, RED);
    let a = anim(vec![
        record(canvas().bounds(), DisposeOp::Previous, BlendOp::Source),
        record(PixelRect::new(1, 1, 1, 1), DisposeOp::None, BlendOp::Over),
    ]);
    let composed = vec![base.clone()];
    assert!(matches!(
        resolve_disposal(1, &a, &composed).unwrap(),
        WorkingCanvas::Empty
    ));

    let out = composite(1, &a, &composed, &base, &solid(1, 1, BLUE)).unwrap();
    assert_eq!(out.pixel(1, 1), Some(BLUE));
    assert_eq!(out.pixel(0, 0), Some(TRANSPARENT));
}

#[test]
fn blend_source_replaces_region_even_where_transparent() {
    let base = solid(4, 4, RED);
    let a = anim(vec![
        record(canvas().bounds(), DisposeOp::None, BlendOp::Source),
        record(PixelRect::new(1, 1, 2, 1), DisposeOp::None, BlendOp::Source),
    ]);
    let mut px = CanvasBuffer::transparent(2, 1).unwrap();
    px.set_pixel(0, 0, [0, 0, 255, 128]);
    let composed = vec![base.clone()];
    let out = composite(1, &a, &composed, &base, &px).unwrap();

    assert_eq!(out.pixel(1, 1), Some([0, 0, 255, 128]));
    assert_eq!(out.pixel(2, 1), Some(TRANSPARENT));
    assert_eq!(out.pixel(0, 1), Some(RED));
    assert_eq!(out.pixel(3, 1), Some(RED));
}

#[test]
fn blend_over_shows_prior_canvas_under_transparent_pixels() {
    let base = solid(4, 4, RED);
    let a = anim(vec![
        record(canvas().bounds(), DisposeOp::None, BlendOp::Source),
        record(PixelRect::new(1, 1, 2, 1), DisposeOp::None, BlendOp::Over),
    ]);
    let mut px = CanvasBuffer::transparent(2, 1).unwrap();
    px.set_pixel(0, 0, BLUE);
    let composed = vec![base.clone()];
    let out = composite(1, &a, &composed, &base, &px).unwrap();

    assert_eq!(out.pixel(1, 1), Some(BLUE));
    assert_eq!(out.pixel(2, 1), Some(RED));
}

#[test]
fn missing_predecessor_is_a_frame_decode_error() {
    let base = solid(4, 4, RED);
    let a = anim(vec![
        record(canvas().bounds(), DisposeOp::None, BlendOp::Source),
        record(canvas().bounds(), DisposeOp::None, BlendOp::Source),
        record(canvas().bounds(), DisposeOp::None, BlendOp::Source),
    ]);
    let composed = vec![base.clone()];
    let err = composite(2, &a, &composed, &base, &solid(4, 4, BLUE)).unwrap_err();
    assert!(matches!(err, ApngError::FrameDecode { index: 1, .. }));
}

#[test]
fn index_out_of_range_is_rejected() {
    let base = solid(4, 4, RED);
    let a = anim(vec![record(canvas().bounds(), DisposeOp::None, BlendOp::Source)]);
    let composed = vec![base.clone()];
    assert!(composite(1, &a, &composed, &base, &base).is_err());
}

#[test]
fn overhanging_frame_is_clipped() {
    let base = solid(4, 4, RED);
    let a = anim(vec![
        record(canvas().bounds(), DisposeOp::Background, BlendOp::Source),
        record(PixelRect::new(3, 3, 2, 2), DisposeOp::None, BlendOp::Source),
    ]);
    let composed = vec![base.clone()];
    let out = composite(1, &a, &composed, &base, &solid(2, 2, BLUE)).unwrap();
    assert_eq!(out.pixel(3, 3), Some(BLUE));
    assert_eq!(out.pixel(2, 2), Some(TRANSPARENT));
}

#[test]
fn backdrop_follows_disposal_of_previous_frame() {
    let rect = PixelRect::new(0, 0, 1, 1);
    let a = anim(vec![
        record(canvas().bounds(), DisposeOp::Previous, BlendOp::Source),
        record(rect, DisposeOp::Background, BlendOp::Over),
        record(rect, DisposeOp::Previous, BlendOp::Over),
        record(rect, DisposeOp::Previous, BlendOp::Over),
        record(rect, DisposeOp::None, BlendOp::Over),
    ]);
    assert_eq!(backdrop_index(0, &a), None);
    // Frame 0 reverts with nothing before it.
    assert_eq!(backdrop_index(1, &a), None);
    assert_eq!(backdrop_index(2, &a), Some(1));
    assert_eq!(backdrop_index(3, &a), Some(1));
    assert_eq!(backdrop_index(4, &a), Some(1));
}
