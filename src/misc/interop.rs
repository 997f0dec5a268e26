// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Interoperability conversions between matrix types and host facing arrays.

use nalgebra::{Quaternion, Translation3, UnitQuaternion};

use crate::misc::type_aliases::{Float, Iso3, Mat4, RowMajor4};

/// Convert a pose matrix into row-major nested arrays.
///
/// nalgebra stores matrices column major,
/// so this is the transposition of the raw storage.
pub fn row_major_from_matrix(mat: &Mat4) -> RowMajor4 {
    let mut rows = [[0.0; 4]; 4];
    for (r, row) in rows.iter_mut().enumerate() {
        for (c, value) in row.iter_mut().enumerate() {
            *value = mat[(r, c)];
        }
    }
    rows
}

/// Convert row-major nested arrays into a pose matrix.
/// Inverse operation of `row_major_from_matrix`.
pub fn matrix_from_row_major(rows: &RowMajor4) -> Mat4 {
    Mat4::from_fn(|r, c| rows[r][c])
}

/// Build an isometry from TUM components.
///
/// The quaternion is renormalized.
pub fn isometry_from_tum(translation: [Float; 3], rotation: [Float; 4]) -> Iso3 {
    let [tx, ty, tz] = translation;
    let [qx, qy, qz, qw] = rotation;
    Iso3::from_parts(
        Translation3::new(tx, ty, tz),
        UnitQuaternion::from_quaternion(Quaternion::new(qw, qx, qy, qz)),
    )
}

/// Split an isometry into TUM components `([tx, ty, tz], [qx, qy, qz, qw])`.
pub fn tum_from_isometry(iso: &Iso3) -> ([Float; 3], [Float; 4]) {
    let t = iso.translation.vector;
    let q = iso.rotation.into_inner().coords;
    ([t.x, t.y, t.z], [q.x, q.y, q.z, q.w])
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use approx;
    use quickcheck_macros;

    #[test]
    #[rustfmt::skip]
    fn row_major_keeps_rows() {
        let mat = Mat4::new(
            1.0,  2.0,  3.0,  4.0,
            5.0,  6.0,  7.0,  8.0,
            9.0,  10.0, 11.0, 12.0,
            13.0, 14.0, 15.0, 16.0,
        );
        let rows = row_major_from_matrix(&mat);
        assert_eq!([1.0, 2.0, 3.0, 4.0], rows[0]);
        assert_eq!([13.0, 14.0, 15.0, 16.0], rows[3]);
        assert_eq!(mat, matrix_from_row_major(&rows));
    }

    #[test]
    fn tum_components_of_identity() {
        let (t, q) = tum_from_isometry(&Iso3::identity());
        assert_eq!([0.0, 0.0, 0.0], t);
        assert_eq!([0.0, 0.0, 0.0, 1.0], q);
    }

    // PROPERTY TESTS ################################################

    #[quickcheck_macros::quickcheck]
    fn tum_components_give_back_isometry(t: (i8, i8, i8), a: (i8, i8, i8)) -> bool {
        let translation = Translation3::new(t.0 as Float, t.1 as Float, t.2 as Float);
        let rotation = UnitQuaternion::from_euler_angles(
            a.0 as Float / 50.0,
            a.1 as Float / 50.0,
            a.2 as Float / 50.0,
        );
        let iso = Iso3::from_parts(translation, rotation);
        let (t, q) = tum_from_isometry(&iso);
        approx::relative_eq!(iso, isometry_from_tum(t, q), epsilon = 1e-5)
    }
}
