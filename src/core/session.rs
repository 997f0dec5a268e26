// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tracking session over one pose estimator.
//!
//! A session goes through `Constructed -> (process_image)* -> shutdown`.
//! `shutdown` consumes the session, so no frame can follow it.
//! A session dropped without `shutdown` does not stop its estimator:
//! hosts must call `shutdown` before exiting, otherwise the engine
//! resources (mapping threads, viewer, map) leak.

use log::{debug, trace};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::path::Path;

use crate::config::SessionConfig;
use crate::core::estimator::PoseEstimator;
use crate::core::frame::{self, FrameBuffer};
use crate::core::trajectory::{Selection, Trajectory, TrajectoryRecorder};
use crate::error::{InitializationError, ResourceError};
use crate::misc::interop;
use crate::misc::type_aliases::{Float, Mat4};

/// Status string of a tracked frame.
pub const STATUS_OK: &str = "OK";
/// Status string of a lost frame.
pub const STATUS_LOST: &str = "Lost";

/// Outcome of tracking one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoseResult {
    /// Camera pose (world to camera), nonzero determinant.
    Tracked(Mat4),
    /// The estimator could not localize the camera for this frame.
    Lost,
}

impl PoseResult {
    /// Interpret a matrix returned by an estimator.
    ///
    /// Any nonzero determinant is a tracked pose, even a tiny one.
    /// This exact comparison is the estimator convention for loss,
    /// do not replace it with a threshold.
    #[allow(clippy::float_cmp)]
    pub fn from_transform(transform: Mat4) -> Self {
        if transform.determinant() != 0.0 {
            PoseResult::Tracked(transform)
        } else {
            PoseResult::Lost
        }
    }

    /// `"OK"` or `"Lost"`.
    pub fn status(&self) -> &'static str {
        match self {
            PoseResult::Tracked(_) => STATUS_OK,
            PoseResult::Lost => STATUS_LOST,
        }
    }

    /// Pose matrix, if tracked.
    pub fn pose(&self) -> Option<&Mat4> {
        match self {
            PoseResult::Tracked(pose) => Some(pose),
            PoseResult::Lost => None,
        }
    }

    /// True if tracked.
    pub fn is_tracked(&self) -> bool {
        self.pose().is_some()
    }
}

/// `{"status": "OK", "pose": [[..4], ..4]}` with a row-major pose,
/// or `{"status": "Lost"}`.
impl Serialize for PoseResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PoseResult::Tracked(pose) => {
                let mut state = serializer.serialize_struct("PoseResult", 2)?;
                state.serialize_field("status", STATUS_OK)?;
                state.serialize_field("pose", &interop::row_major_from_matrix(pose))?;
                state.end()
            }
            PoseResult::Lost => {
                let mut state = serializer.serialize_struct("PoseResult", 1)?;
                state.serialize_field("status", STATUS_LOST)?;
                state.end()
            }
        }
    }
}

/// A tracking session exclusively owning its estimator.
///
/// `process_image` needs `&mut self`, so submissions are serialized.
/// `trajectory` only needs `&self`, but sharing the session across threads
/// is only sound if the estimator synchronizes its trajectory queries.
pub struct Session<E: PoseEstimator> {
    estimator: E,
    image_scale: Float,
    recorder: TrajectoryRecorder,
}

impl<E: PoseEstimator> Session<E> {
    /// Build the estimator from its vocabulary and settings resources.
    ///
    /// Estimator errors are returned unchanged.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        vocabulary_path: P,
        settings_path: Q,
        enable_viewer: bool,
    ) -> Result<Self, InitializationError> {
        let vocabulary_path = vocabulary_path.as_ref();
        let settings_path = settings_path.as_ref();
        debug!(
            "Opening session with vocabulary {} and settings {}",
            vocabulary_path.display(),
            settings_path.display()
        );
        let estimator = E::construct(vocabulary_path, settings_path, enable_viewer)?;
        Self::with_estimator(estimator)
    }

    /// Build the estimator described by a config.
    pub fn from_config(config: &SessionConfig) -> Result<Self, InitializationError> {
        let mut session = Self::new(
            &config.vocabulary_path,
            &config.settings_path,
            config.enable_viewer,
        )?;
        session.recorder = TrajectoryRecorder::new(config.scratch_dir.clone());
        Ok(session)
    }

    /// Session over an already constructed estimator.
    ///
    /// Fails if the estimator image scale is not a positive finite number.
    pub fn with_estimator(estimator: E) -> Result<Self, InitializationError> {
        let image_scale = estimator.image_scale();
        if !(image_scale.is_finite() && image_scale > 0.0) {
            return Err(InitializationError::InvalidImageScale(image_scale));
        }
        debug!("Session ready, image scale {}", image_scale);
        Ok(Session {
            estimator,
            image_scale,
            recorder: TrajectoryRecorder::default(),
        })
    }

    /// Use a specific directory for trajectory scratch files.
    pub fn with_recorder(mut self, recorder: TrajectoryRecorder) -> Self {
        self.recorder = recorder;
        self
    }

    /// Scale applied to every frame before tracking, fixed at construction.
    pub fn image_scale(&self) -> Float {
        self.image_scale
    }

    /// The owned estimator.
    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    /// Track one frame.
    ///
    /// Timestamps are expected to be non-decreasing, which is not checked.
    /// A lost frame is a normal outcome, the session is still usable.
    pub fn process_image(&mut self, frame: &FrameBuffer, timestamp: f64) -> PoseResult {
        let img = frame::prepare(frame, self.image_scale);
        let transform = self.estimator.track_monocular(&img, timestamp);
        let result = PoseResult::from_transform(transform);
        match result {
            PoseResult::Tracked(_) => trace!("Frame {} tracked", timestamp),
            PoseResult::Lost => debug!("Frame {} lost", timestamp),
        }
        result
    }

    /// Retrieve the trajectory accumulated so far.
    pub fn trajectory(&self, selection: Selection) -> Result<Trajectory, ResourceError> {
        self.recorder.retrieve(&self.estimator, selection)
    }

    /// Stop the estimator and release it.
    pub fn shutdown(mut self) {
        debug!("Shutting down session");
        self.estimator.shutdown();
    }
}

// TESTS #############################################################
