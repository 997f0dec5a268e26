// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Retrieval of the trajectory accumulated by an estimator.
//!
//! Estimators persist their trajectory to a file.
//! The recorder gives them a uniquely named scratch file,
//! reads it back with a permissive parser and removes it
//! before returning, whatever happened in between.

use log::{debug, warn};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::core::estimator::PoseEstimator;
use crate::dataset::tum_rgbd::{parse, TrajectoryEntry};
use crate::error::ResourceError;
use crate::misc::type_aliases::Float;

/// Prefix of scratch file names.
pub const SCRATCH_PREFIX: &str = "slam_trajectory_";

/// Which frames of the history to retrieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Every tracked frame, in chronological order.
    AllFrames,
    /// Keyframes only, in chronological keyframe order.
    Keyframes,
}

impl Selection {
    /// `Keyframes` if `keyframes_only`, `AllFrames` otherwise.
    pub fn from_keyframes_only(keyframes_only: bool) -> Self {
        if keyframes_only {
            Selection::Keyframes
        } else {
            Selection::AllFrames
        }
    }
}

/// Ordered poses retrieved from an estimator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    entries: Vec<TrajectoryEntry>,
}

/// Column form of a trajectory: N timestamps aligned with N poses
/// `[tx, ty, tz, qx, qy, qz, qw]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryColumns {
    /// Timestamps of the poses.
    pub timestamps: Vec<f64>,
    /// Poses, one 7 values array per timestamp.
    pub poses: Vec<[Float; 7]>,
}

impl Trajectory {
    /// Trajectory made of the given entries, in order.
    pub fn new(entries: Vec<TrajectoryEntry>) -> Self {
        Trajectory { entries }
    }

    /// Number of poses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no pose was retrieved.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, in the order written by the estimator.
    pub fn entries(&self) -> &[TrajectoryEntry] {
        &self.entries
    }

    /// Timestamps of all entries.
    pub fn timestamps(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.timestamp).collect()
    }

    /// Poses of all entries, aligned with `timestamps()`.
    pub fn poses(&self) -> Vec<[Float; 7]> {
        self.entries.iter().map(TrajectoryEntry::pose).collect()
    }

    /// Both columns at once.
    pub fn columns(&self) -> TrajectoryColumns {
        TrajectoryColumns {
            timestamps: self.timestamps(),
            poses: self.poses(),
        }
    }

    /// Write in TUM format with 6 decimals.
    pub fn write_tum<W: Write>(&self, mut writer: W) -> io::Result<()> {
        for entry in &self.entries {
            entry.write_line(&mut writer, 6)?;
        }
        writer.flush()
    }
}

impl IntoIterator for Trajectory {
    type Item = TrajectoryEntry;
    type IntoIter = std::vec::IntoIter<TrajectoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Retrieves trajectories through scratch files.
#[derive(Debug, Clone, Default)]
pub struct TrajectoryRecorder {
    scratch_dir: Option<PathBuf>,
}

impl TrajectoryRecorder {
    /// Recorder using scratch files in `scratch_dir`,
    /// or in the system temporary directory if `None`.
    pub fn new(scratch_dir: Option<PathBuf>) -> Self {
        TrajectoryRecorder { scratch_dir }
    }

    /// Directory of scratch files, if not the system one.
    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_deref()
    }

    /// Ask the estimator for its trajectory and parse it.
    ///
    /// Malformed lines are dropped. The scratch file never outlives this call.
    pub fn retrieve<E: PoseEstimator>(
        &self,
        estimator: &E,
        selection: Selection,
    ) -> Result<Trajectory, ResourceError> {
        let scratch = self.create_scratch()?;
        let content = write_and_read(estimator, selection, &scratch);
        remove_scratch(scratch);
        let (entries, dropped) = parse::trajectory_lenient(&content?);
        if dropped > 0 {
            debug!("Dropped {} malformed trajectory lines", dropped);
        }
        debug!("Retrieved {} poses ({:?})", entries.len(), selection);
        Ok(Trajectory::new(entries))
    }

    fn create_scratch(&self) -> Result<tempfile::TempPath, ResourceError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX);
        let file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(ResourceError::Create)?;
        // Close our handle, the estimator opens the file by name.
        Ok(file.into_temp_path())
    }
}

/// Remove the scratch file, or an empty directory the estimator left in its place.
fn remove_scratch(scratch: tempfile::TempPath) {
    let path = scratch.to_path_buf();
    let removed = match scratch.close() {
        Err(_) if path.is_dir() => fs::remove_dir(&path),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    };
    if let Err(err) = removed {
        warn!("Failed to remove scratch file {}: {}", path.display(), err);
    }
}

fn write_and_read<E: PoseEstimator>(
    estimator: &E,
    selection: Selection,
    scratch: &Path,
) -> Result<String, ResourceError> {
    match selection {
        Selection::AllFrames => estimator.save_trajectory_tum(scratch),
        Selection::Keyframes => estimator.save_keyframe_trajectory_tum(scratch),
    }
    .map_err(ResourceError::Write)?;
    let bytes = fs::read(scratch).map_err(ResourceError::Read)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use crate::core::estimator::mock::MockEstimator;

    fn scratch_files(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    fn recorder_in(dir: &tempfile::TempDir) -> TrajectoryRecorder {
        TrajectoryRecorder::new(Some(dir.path().to_owned()))
    }

    #[test]
    fn well_formed_lines_survive_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut estimator = MockEstimator::with_scale(1.0);
        estimator.trajectory = "\
            0.1 0 0 0 0 0 0 1\n\
            garbage\n\
            0.2 1 0 0 0 0 0 1\n\
            0.3 1 0\n\
            \n\
            0.4 2 0 0 0 0 0 1\n\
            0.45 2 0 0 0 0 x 1\n\
            0.5 3 0 0 0 0 0 1\n"
            .to_string();
        let trajectory = recorder_in(&dir)
            .retrieve(&estimator, Selection::AllFrames)
            .unwrap();
        assert_eq!(vec![0.1, 0.2, 0.4, 0.5], trajectory.timestamps());
        let xs: Vec<Float> = trajectory.poses().iter().map(|p| p[0]).collect();
        assert_eq!(vec![0.0, 1.0, 2.0, 3.0], xs);
        assert!(scratch_files(dir.path()).is_empty());
    }

    #[test]
    fn scratch_is_unique_and_named() {
        let dir = tempfile::tempdir().unwrap();
        let estimator = MockEstimator::with_scale(1.0);
        let recorder = recorder_in(&dir);
        recorder.retrieve(&estimator, Selection::AllFrames).unwrap();
        recorder.retrieve(&estimator, Selection::AllFrames).unwrap();
        let written = estimator.written.borrow();
        assert_eq!(2, written.len());
        assert_ne!(written[0], written[1]);
        for path in written.iter() {
            assert_eq!(Some(dir.path()), path.parent());
            let name = path.file_name().unwrap().to_str().unwrap();
            assert!(name.starts_with(SCRATCH_PREFIX));
            assert!(!path.exists());
        }
    }

    #[test]
    fn selections_give_aligned_columns() {
        let dir = tempfile::tempdir().unwrap();
        let mut estimator = MockEstimator::with_scale(1.0);
        estimator.trajectory = "1 0 0 0 0 0 0 1\n2 0 0 0 0 0 0 1\n3 0 0 0 0 0 0 1\n".to_string();
        estimator.keyframes = "1 0 0 0 0 0 0 1\n3 0 0 0 0 0 0 1\n".to_string();
        let recorder = recorder_in(&dir);
        let all = recorder.retrieve(&estimator, Selection::AllFrames).unwrap();
        let keyframes = recorder.retrieve(&estimator, Selection::Keyframes).unwrap();
        for (trajectory, len) in &[(all, 3), (keyframes, 2)] {
            let columns = trajectory.columns();
            assert_eq!(*len, columns.timestamps.len());
            assert_eq!(*len, columns.poses.len());
            assert!(columns.poses.iter().all(|p| p.len() == 7));
        }
        assert!(scratch_files(dir.path()).is_empty());
    }

    #[test]
    fn scratch_removed_when_estimator_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut estimator = MockEstimator::with_scale(1.0);
        estimator.trajectory = "1 0 0 0 0 0 0 1\n".to_string();
        estimator.fail_write = true;
        let result = recorder_in(&dir).retrieve(&estimator, Selection::AllFrames);
        assert!(matches!(result, Err(ResourceError::Write(_))));
        assert!(scratch_files(dir.path()).is_empty());
    }

    #[test]
    fn scratch_removed_when_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let mut estimator = MockEstimator::with_scale(1.0);
        estimator.trajectory = "1 0 0 0 0 0 0 1\n".to_string();
        estimator.unreadable = true;
        let result = recorder_in(&dir).retrieve(&estimator, Selection::AllFrames);
        assert!(matches!(result, Err(ResourceError::Read(_))));
        assert!(scratch_files(dir.path()).is_empty());
    }

    #[test]
    fn concurrent_recorders_share_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let recorder = recorder_in(&dir);
                std::thread::spawn(move || {
                    let mut estimator = MockEstimator::with_scale(1.0);
                    estimator.trajectory = format!("{} 0 0 0 0 0 0 1\n", i);
                    for _ in 0..25 {
                        let trajectory =
                            recorder.retrieve(&estimator, Selection::AllFrames).unwrap();
                        assert_eq!(vec![i as f64], trajectory.timestamps());
                    }
                    estimator.written.into_inner()
                })
            })
            .collect();
        let mut paths: Vec<PathBuf> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(100, paths.len());
        paths.sort();
        paths.dedup();
        assert_eq!(100, paths.len());
        assert!(scratch_files(dir.path()).is_empty());
    }

    #[test]
    fn creation_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = TrajectoryRecorder::new(Some(dir.path().join("missing")));
        let estimator = MockEstimator::with_scale(1.0);
        let result = recorder.retrieve(&estimator, Selection::Keyframes);
        assert!(matches!(result, Err(ResourceError::Create(_))));
        assert!(estimator.written.borrow().is_empty());
    }

    #[test]
    fn empty_history() {
        let dir = tempfile::tempdir().unwrap();
        let estimator = MockEstimator::with_scale(1.0);
        let trajectory = recorder_in(&dir)
            .retrieve(&estimator, Selection::AllFrames)
            .unwrap();
        assert!(trajectory.is_empty());
        assert_eq!(
            r#"{"timestamps":[],"poses":[]}"#,
            serde_json::to_string(&trajectory.columns()).unwrap()
        );
    }

    #[test]
    fn tum_output_has_six_decimals() {
        let trajectory = Trajectory::new(vec![TrajectoryEntry {
            timestamp: 1.5,
            translation: [1.0, 2.0, 3.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
        }]);
        let mut out = Vec::new();
        trajectory.write_tum(&mut out).unwrap();
        assert_eq!(
            "1.500000 1.000000 2.000000 3.000000 0.000000 0.000000 0.000000 1.000000\n",
            String::from_utf8(out).unwrap()
        );
    }
}
