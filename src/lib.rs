//! apngview composites Animated PNG frames and schedules their playback.
//!
//! The crate has two cores:
//!
//! - **Compositing**: each frame is drawn onto the canvas left behind by the previous frame's
//!   disposal (`None`, `Background`, `Previous`) using its blend operation (`Source`, `Over`).
//!   Results are memoized per frame in a [`FrameCache`].
//! - **Playback**: [`Player`] is a small state machine driven by two host callbacks. The timer
//!   calls [`Player::tick`], which schedules the next tick after the frame delay. The surface
//!   calls [`Player::on_draw`], which presents the frame, counts loops and advances.
//!
//! Decoding is delegated to an [`AnimationSource`]. [`PngSource`] reads APNG bytes with the `png`
//! crate and [`MemorySource`] serves frames that were decoded elsewhere.
//!
//! Pixels are straight-alpha RGBA8 throughout.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;
mod model;
mod player;
mod render;
mod source;

pub use foundation::core::{Canvas, PixelRect, Verbosity, fit_scale};
pub use foundation::error::{ApngError, ApngResult};
pub use model::canvas::CanvasBuffer;
pub use model::frame::{
    Animation, AnimationInfo, BlendOp, DEFAULT_DELAY_DEN, DisposeOp, FrameRecord,
};
pub use player::events::{PlaybackEvent, StopReason};
pub use player::host::{PlaybackHost, RenderSurface};
pub use player::opts::PlayerOpts;
pub use player::scheduler::{PlaybackState, Player};
pub use render::blend::{Rgba8, TRANSPARENT, over, over_in_place};
pub use render::cache::{FrameCache, FrameCacheStats};
pub use render::compositor::{
    ComposedFrames, WorkingCanvas, blend_frame, composite, resolve_disposal,
};
pub use source::AnimationSource;
pub use source::apng::PngSource;
pub use source::memory::MemorySource;
