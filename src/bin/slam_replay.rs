// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use itertools::Itertools;
use log::{info, warn, LevelFilter};
use std::{
    env,
    error::Error,
    fs::File,
    io,
    path::{Path, PathBuf},
};

use hypr_slam::core::estimator::PoseEstimator;
use hypr_slam::core::frame::FrameBuffer;
use hypr_slam::core::replay::ReplayEstimator;
use hypr_slam::core::session::Session;
use hypr_slam::core::trajectory::{Selection, Trajectory};

fn main() {
    env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .init();
    let args: Vec<String> = env::args().collect();
    if let Err(error) = my_run(&args) {
        eprintln!("{}", error);
        std::process::exit(1);
    }
}

const USAGE: &str =
    "Usage: ./slam_replay reference.txt settings.json images_dir [--keyframes] [output.tum]";

fn my_run(args: &[String]) -> Result<(), Box<dyn Error>> {
    let valid_args = check_args(args)?;

    // Frames are PNG files named by their timestamp, tracked in time order.
    let frames = list_frames(&valid_args.images_dir)?;
    info!("Found {} frames", frames.len());

    let session = Session::<ReplayEstimator>::new(
        &valid_args.reference_path,
        &valid_args.settings_path,
        false,
    )?;
    let (nb_tracked, trajectory) = replay(session, &frames, valid_args.selection)?;
    eprintln!(
        "Processed {} frames, {} tracked, trajectory has {} poses",
        frames.len(),
        nb_tracked,
        trajectory.len()
    );

    match &valid_args.output_path {
        Some(path) => {
            trajectory.write_tum(File::create(path)?)?;
            eprintln!("Saved trajectory to {}", path.display());
        }
        None => trajectory.write_tum(io::stdout().lock())?,
    }
    Ok(())
}

/// Track all frames then retrieve the trajectory.
/// The session is shut down even if a frame or the trajectory could not be read.
fn replay<E: PoseEstimator>(
    mut session: Session<E>,
    frames: &[(f64, PathBuf)],
    selection: Selection,
) -> Result<(usize, Trajectory), Box<dyn Error>> {
    let outcome = track_all(&mut session, frames, selection);
    session.shutdown();
    outcome
}

fn track_all<E: PoseEstimator>(
    session: &mut Session<E>,
    frames: &[(f64, PathBuf)],
    selection: Selection,
) -> Result<(usize, Trajectory), Box<dyn Error>> {
    let mut nb_tracked = 0;
    for (timestamp, path) in frames {
        let img = image::open(path)?.to_rgb8();
        let result = session.process_image(&FrameBuffer::from_image(&img), *timestamp);
        if result.is_tracked() {
            nb_tracked += 1;
        } else {
            warn!("Frame {} tracking lost", timestamp);
        }
    }
    Ok((nb_tracked, session.trajectory(selection)?))
}

struct Args {
    reference_path: PathBuf,
    settings_path: PathBuf,
    images_dir: PathBuf,
    selection: Selection,
    output_path: Option<PathBuf>,
}

/// Verify that command line arguments are correct.
fn check_args(args: &[String]) -> Result<Args, String> {
    let (flags, positional): (Vec<&String>, Vec<&String>) =
        args.iter().skip(1).partition(|a| a.starts_with("--"));
    let keyframes_only = match flags.as_slice() {
        [] => false,
        [flag] if flag.as_str() == "--keyframes" => true,
        _ => {
            eprintln!("{}", USAGE);
            return Err(format!("Unknown options: {:?}", flags));
        }
    };
    let (reference, settings, images, output) = match positional.as_slice() {
        [r, s, i] => (r, s, i, None),
        [r, s, i, o] => (r, s, i, Some(PathBuf::from(o.as_str()))),
        _ => {
            eprintln!("{}", USAGE);
            return Err("Wrong number of arguments".to_string());
        }
    };
    let images_dir = PathBuf::from(images.as_str());
    if !images_dir.is_dir() {
        eprintln!("{}", USAGE);
        return Err(format!(
            "The images directory does not exist or is not reachable: {}",
            images
        ));
    }
    Ok(Args {
        reference_path: PathBuf::from(reference.as_str()),
        settings_path: PathBuf::from(settings.as_str()),
        images_dir,
        selection: Selection::from_keyframes_only(keyframes_only),
        output_path: output,
    })
}

/// PNG files of a directory with the timestamp of their file stem, sorted by timestamp.
/// Files whose stem is not a number are skipped.
fn list_frames(dir: &Path) -> io::Result<Vec<(f64, PathBuf)>> {
    let mut frames = Vec::new();
    for entry in dir.read_dir()? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("png") {
            continue;
        }
        match path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<f64>().ok())
        {
            Some(timestamp) => frames.push((timestamp, path)),
            None => warn!("Skipping {}, not a timestamp", path.display()),
        }
    }
    Ok(frames
        .into_iter()
        .sorted_by(|(t1, _), (t2, _)| t1.total_cmp(t2))
        .collect())
}

// TESTS #############################################################

#[cfg(test)]
mod tests {

    use super::*;
    use hypr_slam::error::InitializationError;
    use hypr_slam::misc::type_aliases::{Float, Mat4};
    use image::RgbImage;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Counting {
        shutdowns: Rc<Cell<usize>>,
    }

    impl PoseEstimator for Counting {
        fn construct(_: &Path, _: &Path, _: bool) -> Result<Self, InitializationError> {
            unreachable!()
        }
        fn image_scale(&self) -> Float {
            1.0
        }
        fn track_monocular(&mut self, _: &RgbImage, _: f64) -> Mat4 {
            Mat4::identity()
        }
        fn save_trajectory_tum(&self, path: &Path) -> io::Result<()> {
            std::fs::write(path, "1 0 0 0 0 0 0 1\n")
        }
        fn save_keyframe_trajectory_tum(&self, _: &Path) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "no keyframes"))
        }
        fn shutdown(&mut self) {
            self.shutdowns.set(self.shutdowns.get() + 1);
        }
    }

    fn session(shutdowns: &Rc<Cell<usize>>) -> Session<Counting> {
        let estimator = Counting {
            shutdowns: Rc::clone(shutdowns),
        };
        Session::with_estimator(estimator).unwrap()
    }

    #[test]
    fn shutdown_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.png");
        RgbImage::new(4, 3).save(&path).unwrap();
        let shutdowns = Rc::new(Cell::new(0));
        let (nb_tracked, trajectory) =
            replay(session(&shutdowns), &[(1.0, path)], Selection::AllFrames).unwrap();
        assert_eq!((1, 1), (nb_tracked, trajectory.len()));
        assert_eq!(1, shutdowns.get());
    }

    #[test]
    fn shutdown_when_a_frame_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("2.png");
        let shutdowns = Rc::new(Cell::new(0));
        assert!(replay(session(&shutdowns), &[(2.0, missing)], Selection::AllFrames).is_err());
        assert_eq!(1, shutdowns.get());
    }

    #[test]
    fn shutdown_when_retrieval_fails() {
        let shutdowns = Rc::new(Cell::new(0));
        assert!(replay(session(&shutdowns), &[], Selection::Keyframes).is_err());
        assert_eq!(1, shutdowns.get());
    }
}
