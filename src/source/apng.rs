use std::io::Cursor;
use std::path::Path;

use anyhow::Context;

use crate::foundation::core::Canvas;
use crate::foundation::error::{ApngError, ApngResult};
use crate::model::canvas::CanvasBuffer;
use crate::model::frame::{AnimationInfo, BlendOp, DisposeOp, FrameRecord};
use crate::source::AnimationSource;

/// APNG source over encoded bytes, backed by the `png` crate.
///
/// `decode_container` walks the whole stream once and keeps every frame's decoded sub-image;
/// `decode_frame_pixels` then serves copies from that table.
pub struct PngSource {
    bytes: Vec<u8>,
    decoded: Option<Vec<CanvasBuffer>>,
}

impl std::fmt::Debug for PngSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PngSource")
            .field("bytes", &self.bytes.len())
            .field("decoded_frames", &self.decoded.as_ref().map(Vec::len))
            .finish()
    }
}

impl PngSource {
    /// Wrap encoded APNG bytes. Nothing is parsed until `decode_container`.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            decoded: None,
        }
    }

    /// Read an APNG file into memory.
    pub fn open(path: impl AsRef<Path>) -> ApngResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| ApngError::container(format!("read '{}': {e}", path.display())))?;
        Ok(Self::from_bytes(bytes))
    }
}

impl AnimationSource for PngSource {
    fn decode_container(&mut self) -> ApngResult<(AnimationInfo, Vec<FrameRecord>)> {
        let decoded = decode_apng(&self.bytes).map_err(|e| match e {
            ApngError::Container(_) => e,
            other => ApngError::container(other.to_string()),
        })?;
        self.decoded = Some(decoded.pixels);
        Ok((decoded.info, decoded.records))
    }

    fn decode_frame_pixels(&mut self, index: usize) -> ApngResult<CanvasBuffer> {
        let frames = self
            .decoded
            .as_ref()
            .ok_or_else(|| ApngError::frame_decode(index, "container has not been decoded"))?;
        frames
            .get(index)
            .ok_or_else(|| ApngError::frame_decode(index, "frame index out of range"))?
            .try_clone()
            .map_err(|e| e.into_frame_decode(index))
    }
}

struct DecodedApng {
    info: AnimationInfo,
    records: Vec<FrameRecord>,
    pixels: Vec<CanvasBuffer>,
}

fn decode_apng(bytes: &[u8]) -> ApngResult<DecodedApng> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::normalize_to_color8());
    let mut reader = decoder
        .read_info()
        .map_err(|e| ApngError::container(format!("read png header: {e}")))?;

    let info = reader.info();
    let canvas = Canvas::new(info.width, info.height)
        .map_err(|e| ApngError::container(e.to_string()))?;
    let actl = info
        .animation_control()
        .cloned()
        .ok_or_else(|| ApngError::container("png has no acTL chunk, not an animated png"))?;
    if actl.num_frames == 0 {
        return Err(ApngError::container("acTL declares zero frames"));
    }
    // A default image without a preceding fcTL is not part of the animation.
    let skip_default_image = info.frame_control().is_none();

    let mut buf = vec![0u8; reader.output_buffer_size()];
    if skip_default_image {
        reader
            .next_frame(&mut buf)
            .context("decode default image")?;
    }

    let mut records = Vec::with_capacity(actl.num_frames as usize);
    let mut pixels = Vec::with_capacity(actl.num_frames as usize);
    for index in 0..actl.num_frames as usize {
        let out = reader
            .next_frame(&mut buf)
            .with_context(|| format!("decode frame {index}"))?;
        let fc = reader
            .info()
            .frame_control()
            .cloned()
            .ok_or_else(|| ApngError::container(format!("frame {index} has no fcTL chunk")))?;

        records.push(FrameRecord {
            width: fc.width,
            height: fc.height,
            x_offset: fc.x_offset,
            y_offset: fc.y_offset,
            delay_num: u32::from(fc.delay_num),
            delay_den: u32::from(fc.delay_den),
            dispose_op: match fc.dispose_op {
                png::DisposeOp::None => DisposeOp::None,
                png::DisposeOp::Background => DisposeOp::Background,
                png::DisposeOp::Previous => DisposeOp::Previous,
            },
            blend_op: match fc.blend_op {
                png::BlendOp::Source => BlendOp::Source,
                png::BlendOp::Over => BlendOp::Over,
            },
        });
        pixels.push(to_rgba8(
            &buf[..out.buffer_size()],
            out.width,
            out.height,
            out.color_type,
        )?);
    }

    Ok(DecodedApng {
        info: AnimationInfo {
            frame_count: actl.num_frames,
            requested_loops: actl.num_plays,
            canvas,
        },
        records,
        pixels,
    })
}

/// Expand an 8-bit decoder output row buffer to RGBA8.
fn to_rgba8(
    buf: &[u8],
    width: u32,
    height: u32,
    color_type: png::ColorType,
) -> ApngResult<CanvasBuffer> {
    let px = (width as usize) * (height as usize);
    let channels = match color_type {
        png::ColorType::Grayscale => 1,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        png::ColorType::Indexed => {
            return Err(ApngError::container(
                "indexed output after expansion, unsupported",
            ));
        }
    };
    if buf.len() < px * channels {
        return Err(ApngError::container(format!(
            "decoded buffer too small: {} bytes for {width}x{height}x{channels}",
            buf.len()
        )));
    }

    let mut rgba = Vec::with_capacity(px * 4);
    for chunk in buf[..px * channels].chunks_exact(channels) {
        let pixel = match channels {
            1 => [chunk[0], chunk[0], chunk[0], 255],
            2 => [chunk[0], chunk[0], chunk[0], chunk[1]],
            3 => [chunk[0], chunk[1], chunk[2], 255],
            _ => [chunk[0], chunk[1], chunk[2], chunk[3]],
        };
        rgba.extend_from_slice(&pixel);
    }
    CanvasBuffer::from_rgba8(width, height, rgba)
}

#[cfg(test)]
#[path = "../../tests/unit/source/apng.rs"]
mod tests;
