// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error types of the crate.
//!
//! ```text
//! InitializationError  (session construction, fatal, no session returned)
//! ResourceError        (scratch file of a trajectory retrieval)
//! FrameError           (invalid frame buffer geometry)
//! ConfigError          (session config file loading)
//! ```
//!
//! Tracking loss is not an error,
//! see [`PoseResult::Lost`](crate::core::session::PoseResult::Lost).

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::misc::type_aliases::Float;

/// Failure to construct a session or its estimator.
#[derive(Debug, Error)]
pub enum InitializationError {
    /// A vocabulary or settings resource does not exist.
    #[error("resource not found: {}", path.display())]
    MissingResource {
        /// Path of the missing resource.
        path: PathBuf,
    },

    /// A vocabulary or settings resource exists but cannot be understood.
    #[error("malformed resource {}: {reason}", path.display())]
    MalformedResource {
        /// Path of the malformed resource.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A resource could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Path of the resource.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The estimator declared an image scale that is not a positive finite number.
    #[error("invalid image scale: {0}")]
    InvalidImageScale(Float),
}

/// Failure of the scratch file round trip of a trajectory retrieval.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The scratch file could not be created. Nothing was written.
    #[error("failed to create scratch file: {0}")]
    Create(#[source] io::Error),

    /// The estimator failed to write its trajectory.
    #[error("estimator failed to write trajectory: {0}")]
    Write(#[source] io::Error),

    /// The scratch file could not be read back.
    #[error("failed to read scratch file: {0}")]
    Read(#[source] io::Error),
}

/// Invalid geometry of an external frame buffer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// Only interleaved 3 channels images are supported.
    #[error("expected 3 channels, got {0}")]
    Channels(usize),

    /// The row stride is shorter than a row of pixels.
    #[error("row stride {stride} is smaller than {min} bytes")]
    Stride {
        /// Declared row stride in bytes.
        stride: usize,
        /// Bytes of one row of pixels.
        min: usize,
    },

    /// The buffer is too small for the declared geometry.
    #[error("buffer has {len} bytes, {expected} needed")]
    Length {
        /// Actual buffer length.
        len: usize,
        /// Minimal length for the declared geometry.
        expected: usize,
    },

    /// Image dimensions do not fit the image backend.
    #[error("image of {height}x{width} is too large")]
    TooLarge {
        /// Declared height.
        height: usize,
        /// Declared width.
        width: usize,
    },
}

/// Failure to load a session config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The config file is not valid JSON for a session config.
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
