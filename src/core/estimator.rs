// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interface of the monocular pose estimation engine driven by a session.
//!
//! The engine does all the vision work (features, tracking, mapping,
//! loop closure). A session only converts frames, calls the engine
//! and marshals its results, so everything the session needs is here.

use image::RgbImage;
use std::io;
use std::path::Path;

use crate::error::InitializationError;
use crate::misc::type_aliases::{Float, Mat4};

/// A monocular SLAM engine.
///
/// Implementations typically run mapping threads and hold large resources.
/// They are owned by exactly one session and released by `shutdown`.
///
/// Trajectory queries (`save_*`) go through `&self` and may be called
/// between two tracking calls. Calling them from another thread while
/// `track_monocular` is running is only valid if the implementation
/// synchronizes its own history, which no session checks.
pub trait PoseEstimator: Sized {
    /// Load the vocabulary and settings resources.
    ///
    /// `enable_viewer` may open a visualization window.
    fn construct(
        vocabulary_path: &Path,
        settings_path: &Path,
        enable_viewer: bool,
    ) -> Result<Self, InitializationError>;

    /// Scale expected by the engine for incoming images.
    fn image_scale(&self) -> Float;

    /// Track one image, already scaled.
    ///
    /// Returns the camera pose as a homogeneous transform from world to camera.
    /// A matrix with a zero determinant (usually all zeros) means tracking is lost.
    fn track_monocular(&mut self, img: &RgbImage, timestamp: f64) -> Mat4;

    /// Write the trajectory of every tracked frame in TUM format.
    fn save_trajectory_tum(&self, path: &Path) -> io::Result<()>;

    /// Write the trajectory of keyframes in TUM format.
    fn save_keyframe_trajectory_tum(&self, path: &Path) -> io::Result<()>;

    /// Stop all engine threads and release resources.
    /// Called exactly once, no other call happens afterwards.
    fn shutdown(&mut self);
}
