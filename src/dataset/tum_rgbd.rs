// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Trajectories in the TUM RGB-D text format.
//!
//! One pose per line, 8 whitespace separated numbers:
//! `timestamp tx ty tz qx qy qz qw`.

use std::fmt;
use std::io::{self, Write};

use crate::misc::interop;
use crate::misc::type_aliases::{Float, Iso3};

/// Timestamp and 3D camera pose of a frame, as written in a TUM trajectory.
///
/// Components are kept as written, the quaternion is not renormalized.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectoryEntry {
    /// Timestamp of the frame, in seconds.
    pub timestamp: f64,
    /// Translation `[tx, ty, tz]`.
    pub translation: [Float; 3],
    /// Rotation quaternion `[qx, qy, qz, qw]`.
    pub rotation: [Float; 4],
}

impl TrajectoryEntry {
    /// Entry of a rigid body motion at a given time.
    pub fn from_isometry(timestamp: f64, pose: &Iso3) -> Self {
        let (translation, rotation) = interop::tum_from_isometry(pose);
        TrajectoryEntry {
            timestamp,
            translation,
            rotation,
        }
    }

    /// Pose as the 7 values `[tx, ty, tz, qx, qy, qz, qw]`.
    pub fn pose(&self) -> [Float; 7] {
        let [tx, ty, tz] = self.translation;
        let [qx, qy, qz, qw] = self.rotation;
        [tx, ty, tz, qx, qy, qz, qw]
    }

    /// Pose as a rigid body motion (renormalized quaternion).
    pub fn isometry(&self) -> Iso3 {
        interop::isometry_from_tum(self.translation, self.rotation)
    }

    /// Write the entry as one line with a fixed number of decimals.
    pub fn write_line<W: Write>(&self, writer: &mut W, precision: usize) -> io::Result<()> {
        let [tx, ty, tz, qx, qy, qz, qw] = self.pose();
        writeln!(
            writer,
            "{:.p$} {:.p$} {:.p$} {:.p$} {:.p$} {:.p$} {:.p$} {:.p$}",
            self.timestamp,
            tx,
            ty,
            tz,
            qx,
            qy,
            qz,
            qw,
            p = precision
        )
    }
}

/// `timestamp tx ty tz qx qy qz qw`
impl fmt::Display for TrajectoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [tx, ty, tz, qx, qy, qz, qw] = self.pose();
        write!(
            f,
            "{} {} {} {} {} {} {} {}",
            self.timestamp, tx, ty, tz, qx, qy, qz, qw
        )
    }
}

/// Parse trajectory files in the TUM RGB-D format.
pub mod parse {
    use super::*;
    use nom::{alt, anychar, do_parse, double, many0, map, named, space, tag, types::CompleteStr};

    /// Parse a trajectory, keeping only well formed lines.
    ///
    /// A line is well formed when it starts with 8 numbers.
    /// Anything after the 8th number is ignored.
    /// Other lines (comments, truncated or corrupted lines) are dropped.
    /// Also returns the number of dropped non empty lines.
    pub fn trajectory_lenient(file_content: &str) -> (Vec<TrajectoryEntry>, usize) {
        let mut entries = Vec::new();
        let mut dropped = 0;
        for line in file_content.lines().map(str::trim_start) {
            match entry(CompleteStr(line)) {
                Ok((_, e)) => entries.push(e),
                Err(_) if line.is_empty() => (),
                Err(_) => dropped += 1,
            }
        }
        (entries, dropped)
    }

    /// Parse a trajectory file into a vector of `TrajectoryEntry`.
    ///
    /// Comments (starting with `#`) and blank lines are allowed,
    /// any other malformed line is an error.
    pub fn trajectory(file_content: &str) -> Result<Vec<TrajectoryEntry>, String> {
        let mut entries = Vec::new();
        for (line_nb, line) in file_content.lines().map(str::trim_start).enumerate() {
            if line.is_empty() {
                continue;
            }
            match trajectory_line(CompleteStr(line)) {
                Ok((_, Some(e))) => entries.push(e),
                Ok(_) => (),
                Err(_) => return Err(format!("Parsing error at line {}", line_nb + 1)),
            }
        }
        Ok(entries)
    }

    // nom parsers #############################################################

    // Trajectory line is either a comment or an entry.
    named!(trajectory_line<CompleteStr, Option<TrajectoryEntry> >,
        alt!( map!(comment, |_| None) | map!(entry, Some) )
    );

    // Parse a comment.
    named!(comment<CompleteStr,()>,
        do_parse!( tag!("#") >> many0!(anychar) >> ())
    );

    // Parse a timestamp and pose.
    // Components are read in double precision, like the estimators write them.
    named!(entry<CompleteStr, TrajectoryEntry>,
        do_parse!(
            timestamp: double >> space >>
            tx: double >> space >>
            ty: double >> space >>
            tz: double >> space >>
            qx: double >> space >>
            qy: double >> space >>
            qz: double >> space >>
            qw: double >>
            (TrajectoryEntry {
                timestamp,
                translation: [tx as Float, ty as Float, tz as Float],
                rotation: [qx as Float, qy as Float, qz as Float, qw as Float],
            })
        )
    );

} // pub mod parse

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;

    const WELL_FORMED: &str = "1305031102.175304 1.3405 0.6266 1.6575 0.6574 0.6126 -0.2949 -0.3248";

    #[test]
    fn reads_eight_fields() {
        let (entries, dropped) = parse::trajectory_lenient(WELL_FORMED);
        assert_eq!(0, dropped);
        assert_eq!(1, entries.len());
        let e = entries[0];
        assert_eq!(1305031102.175304, e.timestamp);
        assert_eq!([1.3405, 0.6266, 1.6575], e.translation);
        assert_eq!([0.6574, 0.6126, -0.2949, -0.3248], e.rotation);
    }

    #[test]
    fn lenient_drops_malformed_lines_in_order() {
        let content = "\
            # timestamp tx ty tz qx qy qz qw\n\
            0.0 0 0 0 0 0 0 1\n\
            1.0 0 0 0 0 0 1\n\
            2.0 1 2 3 0 0 0 1 trailing\n\
            \n\
            3.0 1 2 nan 0 0 0 1\n\
            \t 4.0\t1e-3 -2.5 .5 0 0 0 1\n\
            oops\n";
        let (entries, dropped) = parse::trajectory_lenient(content);
        let timestamps: Vec<f64> = entries.iter().map(|e| e.timestamp).collect();
        assert_eq!(vec![0.0, 2.0, 4.0], timestamps);
        assert_eq!([0.001, -2.5, 0.5], entries[2].translation);
        assert_eq!(4, dropped);
    }

    #[test]
    fn strict_accepts_comments_and_blank_lines() {
        let content = format!("# ground truth\n\n{}\n", WELL_FORMED);
        assert_eq!(Ok(1), parse::trajectory(&content).map(|v| v.len()));
    }

    #[test]
    fn strict_rejects_malformed_line() {
        let content = format!("{}\n1.0 2.0 3.0\n", WELL_FORMED);
        assert_eq!(
            Err("Parsing error at line 2".to_string()),
            parse::trajectory(&content)
        );
    }

    #[test]
    fn written_line_parses_back() {
        let e = TrajectoryEntry {
            timestamp: 12.5,
            translation: [0.25, -1.0, 3.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
        };
        let mut buffer = Vec::new();
        e.write_line(&mut buffer, 6).unwrap();
        let line = String::from_utf8(buffer).unwrap();
        assert_eq!("12.500000 0.250000 -1.000000 3.000000 0.000000 0.000000 0.000000 1.000000\n", line);
        assert_eq!(vec![e], parse::trajectory(&line).unwrap());
    }

    #[test]
    fn display_is_a_tum_line() {
        let e = TrajectoryEntry {
            timestamp: 1.0,
            translation: [1.0, 2.0, 3.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
        };
        assert_eq!("1 1 2 3 0 0 0 1", e.to_string());
    }
}
