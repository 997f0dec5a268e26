// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Type aliases for common types used all over the code base.

use nalgebra as na;

/// Poses are exchanged in single precision with the estimator.
/// Timestamps stay in `f64`.
pub type Float = f32;

/// A 4x4 matrix of Floats.
pub type Mat4 = na::Matrix4<Float>;

/// A direct 3D isometry, also known as rigid body motion.
pub type Iso3 = na::Isometry3<Float>;

/// Row-major 4x4 pose, as handed over to hosts.
pub type RowMajor4 = [[Float; 4]; 4];
