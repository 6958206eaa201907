//! Frame compositor: disposal resolution followed by blending.
//!
//! Frame `i` is built from the composited buffer of an earlier frame (chosen by the disposal
//! operation of frame `i - 1`) plus the decoded sub-image of frame `i`. Frame 0 is the base image.

use crate::foundation::core::Canvas;
use crate::foundation::error::{ApngError, ApngResult};
use crate::model::canvas::CanvasBuffer;
use crate::model::frame::{Animation, BlendOp, DisposeOp, FrameRecord};

/// Read access to already composited frames, by index.
pub trait ComposedFrames {
    /// Composited buffer of `index`, if available.
    fn composed(&self, index: usize) -> Option<&CanvasBuffer>;
}

impl ComposedFrames for [CanvasBuffer] {
    fn composed(&self, index: usize) -> Option<&CanvasBuffer> {
        self.get(index)
    }
}

impl ComposedFrames for Vec<CanvasBuffer> {
    fn composed(&self, index: usize) -> Option<&CanvasBuffer> {
        self.get(index)
    }
}

/// Canvas a frame is drawn onto once the previous frame's disposal has been applied.
#[derive(Debug)]
pub enum WorkingCanvas<'a> {
    /// An earlier composited frame, untouched.
    Unchanged(&'a CanvasBuffer),
    /// A copy of an earlier composited frame with that frame's rectangle cleared.
    Disposed(CanvasBuffer),
    /// No prior background: every earlier frame disposes to `Previous`.
    Empty,
}

impl WorkingCanvas<'_> {
    /// Materialize as an owned full-size buffer; `Empty` becomes fully transparent.
    pub fn into_buffer(self, canvas: Canvas) -> ApngResult<CanvasBuffer> {
        match self {
            WorkingCanvas::Unchanged(buf) => buf.try_clone(),
            WorkingCanvas::Disposed(buf) => Ok(buf),
            WorkingCanvas::Empty => CanvasBuffer::transparent(canvas.width, canvas.height),
        }
    }
}

/// Resolve the working canvas for `index` (>= 1) from the disposal of frame `index - 1`.
pub fn resolve_disposal<'a, C>(
    index: usize,
    anim: &Animation,
    composed: &'a C,
) -> ApngResult<WorkingCanvas<'a>>
where
    C: ComposedFrames + ?Sized,
{
    if index == 0 || index >= anim.frame_count() {
        return Err(ApngError::validation(format!(
            "disposal resolution needs an index in 1..{}, got {index}",
            anim.frame_count()
        )));
    }

    let prev = index - 1;
    let prev_record = frame_record(anim, prev)?;
    match prev_record.dispose_op {
        DisposeOp::None => Ok(WorkingCanvas::Unchanged(composed_or_err(composed, prev)?)),
        DisposeOp::Background => Ok(WorkingCanvas::Disposed(cleared_copy(
            composed_or_err(composed, prev)?,
            prev_record,
        )?)),
        DisposeOp::Previous => {
            let Some(i) = revert_target(anim, prev) else {
                tracing::warn!(
                    frame = index,
                    "previous-disposal chain has no ancestor, drawing on a transparent canvas"
                );
                return Ok(WorkingCanvas::Empty);
            };
            let record = frame_record(anim, i)?;
            let buf = composed_or_err(composed, i)?;
            match record.dispose_op {
                DisposeOp::Background => Ok(WorkingCanvas::Disposed(cleared_copy(buf, record)?)),
                DisposeOp::None | DisposeOp::Previous => Ok(WorkingCanvas::Unchanged(buf)),
            }
        }
    }
}

/// Index of the composited frame that `index` is drawn over.
///
/// `None` for frame 0 and for frames whose `Previous` chain has no ancestor.
pub(crate) fn backdrop_index(index: usize, anim: &Animation) -> Option<usize> {
    let prev = index.checked_sub(1)?;
    match anim.frame(prev)?.dispose_op {
        DisposeOp::None | DisposeOp::Background => Some(prev),
        DisposeOp::Previous => revert_target(anim, prev),
    }
}

/// Nearest frame before `prev` that does not itself revert.
fn revert_target(anim: &Animation, prev: usize) -> Option<usize> {
    (0..prev)
        .rev()
        .find(|&i| anim.frames()[i].dispose_op != DisposeOp::Previous)
}

/// Draw the decoded sub-image of `record` onto a fresh copy of `working`.
pub fn blend_frame(
    working: WorkingCanvas<'_>,
    record: &FrameRecord,
    pixels: &CanvasBuffer,
    canvas: Canvas,
) -> ApngResult<CanvasBuffer> {
    let has_background = !matches!(working, WorkingCanvas::Empty);
    let mut out = working.into_buffer(canvas)?;
    if has_background && record.blend_op == BlendOp::Source {
        out.clear_rect(record.rect());
    }
    out.draw_over(pixels, record.x_offset, record.y_offset);
    Ok(out)
}

/// Composite frame `index`.
///
/// `composed` must hold the buffers of every earlier frame the disposal chain reaches. `pixels` is
/// the decoded sub-image of frame `index`. Frame 0 returns `base` unchanged.
#[tracing::instrument(level = "trace", skip(anim, composed, base, pixels))]
pub fn composite<C>(
    index: usize,
    anim: &Animation,
    composed: &C,
    base: &CanvasBuffer,
    pixels: &CanvasBuffer,
) -> ApngResult<CanvasBuffer>
where
    C: ComposedFrames + ?Sized,
{
    if index == 0 {
        return base.try_clone();
    }
    let record = frame_record(anim, index)?;
    let working = resolve_disposal(index, anim, composed)?;
    blend_frame(working, record, pixels, anim.canvas())
}

fn frame_record(anim: &Animation, index: usize) -> ApngResult<&FrameRecord> {
    anim.frame(index).ok_or_else(|| {
        ApngError::validation(format!(
            "frame {index} out of range (frame count {})",
            anim.frame_count()
        ))
    })
}

fn composed_or_err<C>(composed: &C, index: usize) -> ApngResult<&CanvasBuffer>
where
    C: ComposedFrames + ?Sized,
{
    composed
        .composed(index)
        .ok_or_else(|| ApngError::frame_decode(index, "composited buffer is not available"))
}

fn cleared_copy(buf: &CanvasBuffer, record: &FrameRecord) -> ApngResult<CanvasBuffer> {
    let mut out = buf.try_clone()?;
    out.clear_rect(record.rect());
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
