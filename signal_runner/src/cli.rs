use clap::Parser;
use std::fmt;
use std::path::PathBuf;

pub const MISSING_SOURCE: &str =
    "Error: Please provide either -p/--path for video or -l/--live for webcam.";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "signal_runner",
    version,
    about = "AI Traffic Signal Control System - Ambulance Detection Only"
)]
pub struct Args {
    /// Path to video file (MP4)
    #[arg(short = 'p', long, value_name = "FILE", conflicts_with = "live")]
    pub path: Option<PathBuf>,

    /// Use live webcam feed
    #[arg(short = 'l', long)]
    pub live: bool,

    /// TOML configuration file (overrides AMBU_CONFIG)
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Process frames without opening a display window
    #[arg(long)]
    pub headless: bool,

    /// Do not start the GPS ingestion endpoint
    #[arg(long)]
    pub no_server: bool,
}

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    File(PathBuf),
    Camera(i32),
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VideoSource::File(path) => write!(f, "file {}", path.display()),
            VideoSource::Camera(index) => write!(f, "camera {}", index),
        }
    }
}

impl VideoSource {
    /// Points a camera source at `index`; files are returned unchanged.
    pub fn with_camera_index(self, index: i32) -> Self {
        match self {
            VideoSource::Camera(_) => VideoSource::Camera(index),
            file => file,
        }
    }
}

impl Args {
    /// The requested source, or `None` when neither `--path` nor `--live` was
    /// given. `--live` selects camera 0.
    pub fn source(&self) -> Option<VideoSource> {
        if self.live {
            Some(VideoSource::Camera(0))
        } else {
            self.path.clone().map(VideoSource::File)
        }
    }
}
