use crate::foundation::error::{ApngError, ApngResult};

/// Straight (non-premultiplied) RGBA8 pixel.
pub type Rgba8 = [u8; 4];

/// Fully transparent pixel.
pub const TRANSPARENT: Rgba8 = [0, 0, 0, 0];

/// Porter-Duff source-over for straight alpha pixels.
///
/// Equivalent to `out = src + dst * (1 - src_alpha)` evaluated on premultiplied values and
/// converted back to straight alpha. Exact for the common cases: a transparent source keeps `dst`,
/// an opaque source or a transparent destination yields `src`.
pub fn over(dst: Rgba8, src: Rgba8) -> Rgba8 {
    let sa = u32::from(src[3]);
    if sa == 0 {
        return dst;
    }
    let da = u32::from(dst[3]);
    if sa == 255 || da == 0 {
        return src;
    }

    let inv = 255 - sa;
    // Alpha scaled by 255.
    let out_a = sa * 255 + da * inv;

    let mut out = [0u8; 4];
    for i in 0..3 {
        let num = u32::from(src[i]) * sa * 255 + u32::from(dst[i]) * da * inv;
        out[i] = div_round(num, out_a).min(255) as u8;
    }
    out[3] = div_round(out_a, 255).min(255) as u8;
    out
}

/// Source-over every pixel of `src` onto `dst`.
pub fn over_in_place(dst: &mut [u8], src: &[u8]) -> ApngResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(ApngError::validation(
            "over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

fn div_round(num: u32, den: u32) -> u32 {
    (num + den / 2) / den
}

#[cfg(test)]
#[path = "../../tests/unit/render/blend.rs"]
mod tests;
