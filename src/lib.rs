// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Monocular SLAM tracking sessions.
//!
//! A [`Session`](core::session::Session) owns one pose estimator, pushes
//! timestamped camera frames through it and returns one
//! [`PoseResult`](core::session::PoseResult) per frame.
//! The accumulated trajectory is retrieved on demand,
//! either for every tracked frame or for keyframes only.
//!
//! The crate contains no vision algorithm.
//! The estimator is anything implementing
//! [`PoseEstimator`](core::estimator::PoseEstimator).
//! A deterministic [`ReplayEstimator`](core::replay::ReplayEstimator)
//! replaying a recorded trajectory is provided.

#![warn(missing_docs)]

pub mod config;
pub mod core;
pub mod dataset;
pub mod error;
pub mod misc;
