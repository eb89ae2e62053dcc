//! Timelapse: a timed series of pictures

use crate::camera::{CallOutcome, Camera};
use crate::error::{CameraError, Result};
use std::time::Duration;
use tracing::{info, warn};

impl Camera {
    /// Take `count` pictures, waiting `interval` after each one.
    ///
    /// A frame that fails is recorded as [`CallOutcome::Failed`] and the
    /// series goes on; only losing the connection ends it early. Frames are
    /// returned in order once the whole series is done.
    pub async fn timelapse(&self, count: usize, interval: Duration) -> Result<Vec<CallOutcome>> {
        self.timelapse_with_progress(count, interval, |_, _, _| {}).await
    }

    /// [`timelapse`](Self::timelapse) with a callback invoked after each
    /// frame with `(index, count, outcome)`.
    pub async fn timelapse_with_progress<F>(
        &self,
        count: usize,
        interval: Duration,
        mut on_frame: F,
    ) -> Result<Vec<CallOutcome>>
    where
        F: FnMut(usize, usize, &CallOutcome),
    {
        if count < 2 {
            return Err(CameraError::InvalidArgument(
                "Too few timelapse frames. Timelapse requires two or more frames.".to_string(),
            ));
        }
        if !self.is_connected() {
            return Err(CameraError::NotConnected);
        }

        let mut frames = Vec::with_capacity(count);
        for i in 0..count {
            info!("timelapse {} of {}", i + 1, count);

            let outcome = match self.picture().await {
                Ok(outcome) => outcome,
                Err(CameraError::NotConnected) => return Err(CameraError::NotConnected),
                Err(e) => {
                    warn!("timelapse frame {} failed: {}", i + 1, e);
                    CallOutcome::Failed(e)
                }
            };
            tokio::time::sleep(interval).await;

            on_frame(i, count, &outcome);
            frames.push(outcome);
        }

        Ok(frames)
    }
}
