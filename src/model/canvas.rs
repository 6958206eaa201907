use crate::foundation::core::{Canvas, PixelRect};
use crate::foundation::error::{ApngError, ApngResult};
use crate::render::blend::{self, Rgba8};

/// Row-major RGBA8 pixel grid with straight alpha.
///
/// Used both for full-size canvas states and for the decoded sub-image of a single frame.
#[derive(Clone, PartialEq, Eq)]
pub struct CanvasBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl std::fmt::Debug for CanvasBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl CanvasBuffer {
    /// Allocate a fully transparent buffer.
    ///
    /// Allocation failure is reported instead of aborting so callers can skip the frame.
    pub fn transparent(width: u32, height: u32) -> ApngResult<Self> {
        let len = byte_len(width, height)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            ApngError::validation(format!("allocate {width}x{height} rgba8 buffer: {e}"))
        })?;
        data.resize(len, 0);
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Wrap existing RGBA8 bytes.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> ApngResult<Self> {
        let len = byte_len(width, height)?;
        if data.len() != len {
            return Err(ApngError::validation(format!(
                "rgba8 buffer for {width}x{height} must be {len} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Copy that reports allocation failure instead of aborting.
    pub fn try_clone(&self) -> ApngResult<Self> {
        let mut data = Vec::new();
        data.try_reserve_exact(self.data.len()).map_err(|e| {
            ApngError::validation(format!(
                "allocate {}x{} rgba8 buffer: {e}",
                self.width, self.height
            ))
        })?;
        data.extend_from_slice(&self.data);
        Ok(Self {
            width: self.width,
            height: self.height,
            data,
        })
    }

    /// Buffer filled with a single pixel value.
    pub fn filled(width: u32, height: u32, px: Rgba8) -> ApngResult<Self> {
        let mut buf = Self::transparent(width, height)?;
        for d in buf.data.chunks_exact_mut(4) {
            d.copy_from_slice(&px);
        }
        Ok(buf)
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Buffer dimensions as a [`Canvas`].
    pub fn size(&self) -> Canvas {
        Canvas {
            width: self.width,
            height: self.height,
        }
    }

    /// Raw RGBA8 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Consume into raw RGBA8 bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at `(x, y)`, `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    /// Overwrite the pixel at `(x, y)`. Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, px: Rgba8) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&px);
    }

    /// Set every pixel inside `rect` to fully transparent. The rectangle is clipped first.
    pub fn clear_rect(&mut self, rect: PixelRect) {
        let Some(r) = rect.clip_to(self.size()) else {
            return;
        };
        let row_bytes = r.width as usize * 4;
        for y in r.y..r.bottom() {
            let start = self.index(r.x, y);
            self.data[start..start + row_bytes].fill(0);
        }
    }

    /// Source-over `src` with its top-left corner at `(x, y)`, clipped to this buffer.
    pub fn draw_over(&mut self, src: &CanvasBuffer, x: u32, y: u32) {
        let placed = PixelRect::new(x, y, src.width, src.height);
        let Some(r) = placed.clip_to(self.size()) else {
            return;
        };
        let row_bytes = r.width as usize * 4;
        for row in 0..r.height {
            let dst_start = self.index(r.x, r.y + row);
            let src_start = src.index(0, row);
            let dst_row = &mut self.data[dst_start..dst_start + row_bytes];
            let src_row = &src.data[src_start..src_start + row_bytes];
            for (d, s) in dst_row.chunks_exact_mut(4).zip(src_row.chunks_exact(4)) {
                let out = blend::over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
                d.copy_from_slice(&out);
            }
        }
    }

    /// Convert into an `image` crate buffer for encoding.
    pub fn to_rgba_image(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            let i = self.index(x, y);
            image::Rgba([
                self.data[i],
                self.data[i + 1],
                self.data[i + 2],
                self.data[i + 3],
            ])
        })
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }
}

fn byte_len(width: u32, height: u32) -> ApngResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| ApngError::validation(format!("rgba8 buffer size overflow: {width}x{height}")))
}

#[cfg(test)]
#[path = "../../tests/unit/model/canvas.rs"]
mod tests;
