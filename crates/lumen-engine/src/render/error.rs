use crate::coords::ViewportSize;

/// Failures of the deferred renderer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    /// Setup mistake (e.g. light count does not match the composite
    /// specialization). Not retried; rendering cannot proceed meaningfully.
    #[error("renderer configuration error: {0}")]
    Configuration(String),

    /// A resize was requested with a zero dimension. The frame is skipped.
    #[error("degenerate resize to {}x{}", .0.width, .0.height)]
    DegenerateResize(ViewportSize),

    /// G-buffer allocation failed. The previous attachments stay in place and
    /// the resize is retried on the next frame.
    #[error("cannot allocate {}x{} G-buffer: {reason}", .size.width, .size.height)]
    ResourceExhaustion { size: ViewportSize, reason: String },
}

impl RenderError {
    /// `true` for errors that only cost the current frame.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RenderError::Configuration(_))
    }

    pub(crate) fn light_count_mismatch(expected: usize, actual: usize) -> Self {
        RenderError::Configuration(format!(
            "composite program is specialized for {expected} lights, light set has {actual}"
        ))
    }
}
