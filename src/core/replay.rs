// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Deterministic estimator replaying a recorded trajectory.
//!
//! The vocabulary resource is a TUM trajectory of camera poses
//! (world from camera, as in ground truth files).
//! The settings resource is a JSON file:
//!
//! ```json
//! { "image_scale": 0.5, "keyframe_interval": 5, "time_tolerance": 0.001 }
//! ```
//!
//! A frame is tracked if a reference pose lies within `time_tolerance`
//! of its timestamp, lost otherwise.
//! Every `keyframe_interval`-th tracked frame becomes a keyframe.
//! History is kept in memory and only written to files when asked.

use image::RgbImage;
use log::{debug, warn};
use serde::Deserialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::core::estimator::PoseEstimator;
use crate::dataset::tum_rgbd::{parse, TrajectoryEntry};
use crate::error::InitializationError;
use crate::misc::type_aliases::{Float, Mat4};

/// Decimals of the trajectory files written by the estimator.
const SAVE_PRECISION: usize = 9;

/// Settings of a `ReplayEstimator`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaySettings {
    /// Scale applied by sessions to frames before tracking.
    #[serde(default = "default_image_scale")]
    pub image_scale: Float,
    /// One keyframe every `keyframe_interval` tracked frames, starting with the first.
    #[serde(default = "default_keyframe_interval")]
    pub keyframe_interval: usize,
    /// Maximal time difference (s) between a frame and its reference pose.
    #[serde(default = "default_time_tolerance")]
    pub time_tolerance: f64,
}

fn default_image_scale() -> Float {
    1.0
}

fn default_keyframe_interval() -> usize {
    1
}

fn default_time_tolerance() -> f64 {
    1e-3
}

impl Default for ReplaySettings {
    fn default() -> Self {
        ReplaySettings {
            image_scale: default_image_scale(),
            keyframe_interval: default_keyframe_interval(),
            time_tolerance: default_time_tolerance(),
        }
    }
}

/// Estimator answering with the poses of a reference trajectory.
#[derive(Debug)]
pub struct ReplayEstimator {
    settings: ReplaySettings,
    reference: Vec<TrajectoryEntry>,
    frames: Vec<TrajectoryEntry>,
    keyframes: Vec<TrajectoryEntry>,
    running: bool,
}

impl ReplayEstimator {
    /// Estimator over an in-memory reference trajectory.
    pub fn from_parts(
        mut reference: Vec<TrajectoryEntry>,
        settings: ReplaySettings,
    ) -> Result<Self, String> {
        if settings.keyframe_interval == 0 {
            return Err("keyframe_interval must be at least 1".to_string());
        }
        if settings.time_tolerance.is_nan() || settings.time_tolerance < 0.0 {
            return Err("time_tolerance must be non negative".to_string());
        }
        if reference.is_empty() {
            return Err("empty reference trajectory".to_string());
        }
        reference.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));
        Ok(ReplayEstimator {
            settings,
            reference,
            frames: Vec::new(),
            keyframes: Vec::new(),
            running: true,
        })
    }

    /// Settings in use.
    pub fn settings(&self) -> &ReplaySettings {
        &self.settings
    }

    /// Reference pose closest in time, if within tolerance.
    fn lookup(&self, timestamp: f64) -> Option<&TrajectoryEntry> {
        let idx = self.reference.partition_point(|e| e.timestamp < timestamp);
        let before = idx.checked_sub(1).and_then(|i| self.reference.get(i));
        let after = self.reference.get(idx);
        let closest = match (before, after) {
            (Some(b), Some(a)) => {
                if timestamp - b.timestamp <= a.timestamp - timestamp {
                    b
                } else {
                    a
                }
            }
            (Some(b), None) => b,
            (None, Some(a)) => a,
            (None, None) => return None,
        };
        if (closest.timestamp - timestamp).abs() <= self.settings.time_tolerance {
            Some(closest)
        } else {
            None
        }
    }
}

fn read_resource(path: &Path) -> Result<String, InitializationError> {
    if !path.is_file() {
        return Err(InitializationError::MissingResource {
            path: path.to_owned(),
        });
    }
    fs::read_to_string(path).map_err(|source| InitializationError::Io {
        path: path.to_owned(),
        source,
    })
}

fn malformed(path: &Path, reason: String) -> InitializationError {
    InitializationError::MalformedResource {
        path: path.to_owned(),
        reason,
    }
}

fn save(entries: &[TrajectoryEntry], path: &Path) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for entry in entries {
        entry.write_line(&mut writer, SAVE_PRECISION)?;
    }
    writer.flush()
}

impl PoseEstimator for ReplayEstimator {
    fn construct(
        vocabulary_path: &Path,
        settings_path: &Path,
        enable_viewer: bool,
    ) -> Result<Self, InitializationError> {
        let reference_content = read_resource(vocabulary_path)?;
        let settings_content = read_resource(settings_path)?;
        let reference = parse::trajectory(&reference_content)
            .map_err(|reason| malformed(vocabulary_path, reason))?;
        let settings: ReplaySettings = serde_json::from_str(&settings_content)
            .map_err(|err| malformed(settings_path, err.to_string()))?;
        if enable_viewer {
            warn!("Replay estimator has no viewer, ignoring it");
        }
        if reference.is_empty() {
            return Err(malformed(vocabulary_path, "no pose".to_string()));
        }
        let estimator = Self::from_parts(reference, settings)
            .map_err(|reason| malformed(settings_path, reason))?;
        debug!("Replaying {} reference poses", estimator.reference.len());
        Ok(estimator)
    }

    fn image_scale(&self) -> Float {
        self.settings.image_scale
    }

    fn track_monocular(&mut self, img: &RgbImage, timestamp: f64) -> Mat4 {
        let (width, height) = img.dimensions();
        if !self.running || width == 0 || height == 0 {
            return Mat4::zeros();
        }
        let camera_pose = match self.lookup(timestamp) {
            Some(entry) => entry.isometry(),
            None => return Mat4::zeros(),
        };
        let entry = TrajectoryEntry::from_isometry(timestamp, &camera_pose);
        if self.frames.len() % self.settings.keyframe_interval == 0 {
            self.keyframes.push(entry);
        }
        self.frames.push(entry);
        camera_pose.inverse().to_homogeneous()
    }

    fn save_trajectory_tum(&self, path: &Path) -> io::Result<()> {
        save(&self.frames, path)
    }

    fn save_keyframe_trajectory_tum(&self, path: &Path) -> io::Result<()> {
        save(&self.keyframes, path)
    }

    fn shutdown(&mut self) {
        debug!(
            "Replay estimator stopping after {} tracked frames",
            self.frames.len()
        );
        self.running = false;
        self.reference = Vec::new();
    }
}

// TESTS #############################################################
