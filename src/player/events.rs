/// Why playback left the running state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// `stop()` was called.
    Requested,
    /// The requested number of loops has been shown.
    LoopsExhausted,
}

/// Non-fatal notifications emitted during playback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// A frame could not be decoded or composited; the previous canvas stays on screen.
    FrameSkipped {
        /// Frame that failed.
        index: usize,
        /// Error message.
        reason: String,
    },
    /// The last frame was drawn, completing one loop.
    LoopCompleted {
        /// Loops completed in this run.
        loop_count: u32,
        /// Loops requested for this run.
        requested_loops: u32,
    },
    /// Playback stopped.
    Stopped {
        /// Stop cause.
        reason: StopReason,
    },
}
