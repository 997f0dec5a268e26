// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Configuration of a tracking session.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Everything needed to open a session.
///
/// ```json
/// {
///     "vocabulary_path": "ORBvoc.txt",
///     "settings_path": "camera.yaml",
///     "enable_viewer": false,
///     "scratch_dir": "/tmp"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Vocabulary resource of the estimator.
    pub vocabulary_path: PathBuf,
    /// Settings resource of the estimator (camera intrinsics, ...).
    pub settings_path: PathBuf,
    /// Ask the estimator to open its visualization window.
    #[serde(default)]
    pub enable_viewer: bool,
    /// Directory of trajectory scratch files.
    /// The system temporary directory if absent.
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,
}

impl SessionConfig {
    /// Config with default options for the two estimator resources.
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(vocabulary_path: P, settings_path: Q) -> Self {
        SessionConfig {
            vocabulary_path: vocabulary_path.into(),
            settings_path: settings_path.into(),
            enable_viewer: false,
            scratch_dir: None,
        }
    }

    /// Parse a JSON config.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(ConfigError::from)
    }

    /// Read and parse a JSON config file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&content)
    }
}

// TESTS #############################################################
