use crate::foundation::core::Verbosity;
use crate::foundation::error::{ApngError, ApngResult};

/// Construction-time player configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlayerOpts {
    /// Diagnostic output level.
    pub verbosity: Verbosity,
    /// Loop count overriding the container value; `Some(0)` forces endless playback.
    pub requested_loops: Option<u32>,
    /// Frames composited ahead of the current one after each draw. 0 disables pre-warming.
    pub prewarm_ahead: usize,
}

impl PlayerOpts {
    /// Parse options from JSON; missing fields take their defaults.
    pub fn from_json(s: &str) -> ApngResult<Self> {
        serde_json::from_str(s).map_err(|e| ApngError::validation(format!("player opts: {e}")))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/player/opts.rs"]
mod tests;
