/// Convenience result type used across apngview.
pub type ApngResult<T> = Result<T, ApngError>;

/// Top-level error taxonomy used by compositing and playback APIs.
#[derive(thiserror::Error, Debug)]
pub enum ApngError {
    /// The source is not a readable APNG or carries no animation chunks.
    #[error("container error: {0}")]
    Container(String),

    /// Pixel data for one frame could not be produced.
    #[error("frame decode error: frame {index}: {reason}")]
    FrameDecode {
        /// Frame index that failed.
        index: usize,
        /// Human readable cause.
        reason: String,
    },

    /// Invalid caller-provided data (buffer sizes, dimensions).
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApngError {
    /// Build an [`ApngError::Container`] value.
    pub fn container(msg: impl Into<String>) -> Self {
        Self::Container(msg.into())
    }

    /// Build an [`ApngError::FrameDecode`] value.
    pub fn frame_decode(index: usize, reason: impl Into<String>) -> Self {
        Self::FrameDecode {
            index,
            reason: reason.into(),
        }
    }

    /// Build an [`ApngError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether playback absorbs this error and carries on with the next frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::FrameDecode { .. })
    }

    /// Re-tag any error as a decode failure of `index`, keeping its message.
    pub(crate) fn into_frame_decode(self, index: usize) -> Self {
        match self {
            Self::FrameDecode { .. } => self,
            other => Self::frame_decode(index, other.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
