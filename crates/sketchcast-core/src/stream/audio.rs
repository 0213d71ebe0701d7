//! Silent audio track contract.

use super::StreamError;

/// A generated audio track carrying silence.
///
/// Implementations typically route a muted oscillator through a zero-gain node
/// into a stream destination. The track joins the published stream like any
/// other; [`SilentAudio::close`] stops the generator and releases its context.
pub trait SilentAudio {
    type Track;

    fn track(&self) -> Self::Track;
    fn close(&self) -> Result<(), StreamError>;
}
