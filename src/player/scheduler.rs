//! Playback scheduler.
//!
//! Timing and frame advance are split across two entry points driven by the host:
//!
//! - [`Player::tick`] runs on the host timer. It schedules the next tick after the current frame's
//!   delay and asks the surface to redraw.
//! - [`Player::on_draw`] runs on the surface refresh. It presents the current frame, does loop
//!   accounting and advances the frame index.
//!
//! All state sits behind one mutex so both callbacks (and `start`/`stop`) are serialized.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::foundation::core::{Canvas, fit_scale};
use crate::foundation::error::{ApngError, ApngResult};
use crate::model::canvas::CanvasBuffer;
use crate::model::frame::Animation;
use crate::player::events::{PlaybackEvent, StopReason};
use crate::player::host::{PlaybackHost, RenderSurface};
use crate::player::opts::PlayerOpts;
use crate::render::cache::{FrameCache, FrameCacheStats};
use crate::source::AnimationSource;

/// Snapshot of the scheduler state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaybackState {
    /// Frame to draw next; -1 before the first start.
    pub current_frame: i64,
    /// Loops completed in the current run.
    pub current_loop: u32,
    /// Whether playback is running.
    pub running: bool,
    /// Loop limit in effect for the current run; 0 plays forever.
    pub requested_loops: u32,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_frame: -1,
            current_loop: 0,
            running: false,
            requested_loops: 0,
        }
    }
}

struct Prepared {
    anim: Animation,
    cache: FrameCache,
}

struct PlayerInner {
    opts: PlayerOpts,
    source: Box<dyn AnimationSource>,
    host: Box<dyn PlaybackHost>,
    notifier: Option<Sender<PlaybackEvent>>,
    prepared: Option<Prepared>,
    state: PlaybackState,
    last_shown: Option<Arc<CanvasBuffer>>,
}

/// Timed APNG playback over an [`AnimationSource`].
///
/// `Player` is `Sync`; share it behind an `Arc` when the host timer and the surface live on
/// different threads.
pub struct Player {
    inner: Mutex<PlayerInner>,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Player")
            .field("opts", &inner.opts)
            .field("state", &inner.state)
            .field("prepared", &inner.prepared.is_some())
            .finish()
    }
}

impl Player {
    /// Create an idle player. Nothing is decoded until [`Player::start`] or [`Player::prepare`].
    pub fn new(
        source: Box<dyn AnimationSource>,
        host: Box<dyn PlaybackHost>,
        opts: PlayerOpts,
    ) -> Self {
        Self {
            inner: Mutex::new(PlayerInner {
                opts,
                source,
                host,
                notifier: None,
                prepared: None,
                state: PlaybackState::default(),
                last_shown: None,
            }),
        }
    }

    /// Deliver [`PlaybackEvent`]s to `tx`. A dropped receiver silently disables delivery.
    pub fn with_notifier(self, tx: Sender<PlaybackEvent>) -> Self {
        self.lock().notifier = Some(tx);
        self
    }

    /// Decode container metadata and the base image if not done yet.
    pub fn prepare(&self) -> ApngResult<()> {
        self.lock().ensure_prepared()
    }

    /// Start playback from frame 0. No-op while running.
    ///
    /// Fails with [`ApngError::Container`] when the source cannot be prepared; the player then
    /// stays idle.
    pub fn start(&self) -> ApngResult<()> {
        self.start_at(Instant::now())
    }

    /// [`Player::start`] with an explicit monotonic "now" for the first tick.
    pub fn start_at(&self, now: Instant) -> ApngResult<()> {
        let mut inner = self.lock();
        if inner.state.running {
            return Ok(());
        }
        if let Err(e) = inner.ensure_prepared() {
            tracing::warn!(error = %e, "prepare failed, playback not started");
            return Err(e);
        }
        inner.state.current_frame = 0;
        inner.state.running = true;

        let container_loops = inner
            .prepared
            .as_ref()
            .map_or(0, |p| p.anim.info().requested_loops);
        let requested = inner.opts.requested_loops.unwrap_or(container_loops);
        inner.state.requested_loops = requested;
        if inner.opts.verbosity.debug() {
            let origin = if inner.opts.requested_loops.is_some() {
                "user defined"
            } else {
                "media info"
            };
            tracing::debug!(requested_loops = requested, origin, "playback started");
        }

        inner.tick_at(now);
        Ok(())
    }

    /// Stop playback, cancel the pending tick and release cached frames except the base.
    /// No-op while idle.
    pub fn stop(&self) {
        self.lock().stop(StopReason::Requested);
    }

    /// Whether playback is running.
    pub fn is_running(&self) -> bool {
        self.lock().state.running
    }

    /// Number of frames; 0 before preparation.
    pub fn frame_count(&self) -> usize {
        self.lock()
            .prepared
            .as_ref()
            .map_or(0, |p| p.anim.frame_count())
    }

    /// Canvas size, once prepared.
    pub fn canvas(&self) -> Option<Canvas> {
        self.lock().prepared.as_ref().map(|p| p.anim.canvas())
    }

    /// Loop limit: the running value, otherwise the override or the container value.
    pub fn requested_loops(&self) -> u32 {
        let inner = self.lock();
        if inner.state.running {
            return inner.state.requested_loops;
        }
        let container = inner
            .prepared
            .as_ref()
            .map_or(0, |p| p.anim.info().requested_loops);
        inner.opts.requested_loops.unwrap_or(container)
    }

    /// Override the container loop count (0 plays forever). Applies from the next `start`.
    pub fn set_requested_loops(&self, loops: u32) {
        self.lock().opts.requested_loops = Some(loops);
    }

    /// Current scheduler state.
    pub fn state(&self) -> PlaybackState {
        self.lock().state
    }

    /// Number of composited buffers currently cached, base included.
    pub fn cached_frames(&self) -> usize {
        self.lock().prepared.as_ref().map_or(0, |p| p.cache.len())
    }

    /// Cache activity counters.
    pub fn cache_stats(&self) -> FrameCacheStats {
        self.lock()
            .prepared
            .as_ref()
            .map(|p| p.cache.stats())
            .unwrap_or_default()
    }

    /// Release every cached buffer except the base. Frames are recomposited on demand.
    pub fn recycle(&self) {
        if let Some(p) = self.lock().prepared.as_mut() {
            p.cache.evict(0);
        }
    }

    /// Timer callback: schedule the next tick and request a redraw. No-op while idle.
    ///
    /// Returns the deadline that was scheduled.
    pub fn tick(&self) -> Option<Instant> {
        self.tick_at(Instant::now())
    }

    /// [`Player::tick`] with an explicit monotonic "now".
    pub fn tick_at(&self, now: Instant) -> Option<Instant> {
        self.lock().tick_at(now)
    }

    /// Surface callback: present the current frame, account loops and advance.
    ///
    /// While idle the last presented canvas is shown again and nothing advances.
    pub fn on_draw(&self, surface: &mut dyn RenderSurface) {
        self.lock().draw(surface);
    }

    /// Composite up to `ahead` frames after the current one so later draws do not block.
    pub fn prewarm(&self, ahead: usize) {
        self.lock().prewarm(ahead);
    }

    fn lock(&self) -> MutexGuard<'_, PlayerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlayerInner {
    fn ensure_prepared(&mut self) -> ApngResult<()> {
        if self.prepared.is_some() {
            return Ok(());
        }
        let debug = self.opts.verbosity.debug();
        if debug {
            tracing::debug!("reading animation container");
        }

        let (info, records) = self.source.decode_container()?;
        let anim = Animation::new(info, records)?;
        let base = self
            .source
            .decode_base_image(&anim)
            .map_err(|e| ApngError::container(format!("base image: {e}")))?;
        if base.size() != anim.canvas() {
            return Err(ApngError::container(format!(
                "base image is {}x{}, canvas is {}x{}",
                base.width(),
                base.height(),
                anim.canvas().width,
                anim.canvas().height
            )));
        }

        let mut cache = FrameCache::new(anim.frame_count());
        cache.put(0, Arc::new(base))?;
        if debug {
            tracing::debug!(
                frames = anim.frame_count(),
                width = anim.canvas().width,
                height = anim.canvas().height,
                container_loops = anim.info().requested_loops,
                "animation prepared"
            );
        }
        self.prepared = Some(Prepared { anim, cache });
        Ok(())
    }

    fn stop(&mut self, reason: StopReason) {
        if !self.state.running {
            return;
        }
        self.state.current_loop = 0;
        self.host.cancel_tick();
        self.state.running = false;
        if let Some(p) = self.prepared.as_mut() {
            p.cache.evict(0);
        }
        if self.opts.verbosity.debug() {
            tracing::debug!(?reason, "playback stopped");
        }
        self.notify(PlaybackEvent::Stopped { reason });
    }

    fn tick_at(&mut self, now: Instant) -> Option<Instant> {
        if !self.state.running {
            return None;
        }
        let anim = &self.prepared.as_ref()?.anim;
        let last = anim.frame_count() as i64 - 1;
        if self.state.current_frame < 0 || self.state.current_frame > last {
            self.state.current_frame = 0;
        }
        let record = anim.frame(self.state.current_frame as usize)?;
        let deadline = now + record.delay();
        if self.opts.verbosity.verbose() {
            tracing::trace!(
                frame = self.state.current_frame,
                delay_ms = record.delay_millis(),
                "tick"
            );
        }

        self.host.schedule_tick(deadline);
        self.host.request_redraw();
        Some(deadline)
    }

    fn draw(&mut self, surface: &mut dyn RenderSurface) {
        if !self.state.running {
            if let (Some(buf), Some(p)) = (&self.last_shown, &self.prepared) {
                let (w, h) = surface.size();
                surface.present(buf, fit_scale(w, h, p.anim.canvas()));
            }
            return;
        }
        let verbose = self.opts.verbosity.verbose();
        let Some(p) = self.prepared.as_mut() else {
            return;
        };
        let frame_count = p.anim.frame_count();
        let index = self.state.current_frame;
        if verbose {
            tracing::trace!(frame = index, "draw");
        }

        // Extra refreshes between ticks can run past the last frame; they re-present.
        let resolved = if index <= 0 {
            Some(
                p.cache
                    .get(0)
                    .ok_or_else(|| ApngError::frame_decode(0, "base image missing")),
            )
        } else if (index as usize) < frame_count {
            Some(p.cache.resolve(
                index as usize,
                &p.anim,
                &mut *self.source,
                self.opts.verbosity,
            ))
        } else {
            None
        };
        let canvas = p.anim.canvas();

        match resolved {
            Some(Ok(buf)) => self.last_shown = Some(buf),
            Some(Err(e)) => {
                tracing::warn!(frame = index, error = %e, "frame skipped");
                self.notify(PlaybackEvent::FrameSkipped {
                    index: index.max(0) as usize,
                    reason: e.to_string(),
                });
            }
            None => {}
        }
        if let Some(buf) = &self.last_shown {
            let (w, h) = surface.size();
            surface.present(buf, fit_scale(w, h, canvas));
        }

        // Count the loop before the stop check: the draw that shows the last frame of the final
        // loop is the one that stops playback.
        let requested = self.state.requested_loops;
        if requested > 0 && index == frame_count as i64 - 1 {
            self.state.current_loop += 1;
            if verbose {
                tracing::trace!(
                    loop_count = self.state.current_loop,
                    requested,
                    "loop completed"
                );
            }
            self.notify(PlaybackEvent::LoopCompleted {
                loop_count: self.state.current_loop,
                requested_loops: requested,
            });
        }
        if requested > 0 && self.state.current_loop >= requested {
            self.stop(StopReason::LoopsExhausted);
            return;
        }

        self.state.current_frame += 1;
        if self.opts.prewarm_ahead > 0 {
            self.prewarm(self.opts.prewarm_ahead);
        }
    }

    fn prewarm(&mut self, ahead: usize) {
        let Some(p) = self.prepared.as_mut() else {
            return;
        };
        let frame_count = p.anim.frame_count();
        let from = self.state.current_frame.max(0) as usize;
        let to = from.saturating_add(ahead).min(frame_count.saturating_sub(1));
        if ahead == 0 || to < from {
            return;
        }
        if let Err(e) = p
            .cache
            .resolve(to, &p.anim, &mut *self.source, self.opts.verbosity)
            && self.opts.verbosity.debug()
        {
            tracing::debug!(frame = to, error = %e, "prewarm stopped early");
        }
    }

    fn notify(&self, event: PlaybackEvent) {
        if let Some(tx) = &self.notifier {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/player/scheduler.rs"]
mod tests;
