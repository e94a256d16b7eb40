use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::SessionState;

/// Event delegate for recording notifications.
///
/// Called from whichever thread drives the session's ticks. Implementations
/// should marshal to a UI thread if needed.
pub trait RecordingDelegate: Send + Sync {
    fn on_state_changed(&self, state: SessionState);

    /// Called when a session fails. The session has already been cleaned up.
    fn on_error(&self, error: &RecorderError);

    /// Called when a recording completes and its output is closed.
    fn on_clip_recorded(&self, result: &RecordingResult);
}
