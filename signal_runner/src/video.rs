use crate::cli::VideoSource;
use crate::config::RunnerConfig;
use crate::dispatch::Dispatcher;
use amburoute::{FrameReport, SignalState};

/// Counters for one run over a video source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub go_frames: u64,
    pub advisory_rounds: u64,
}

impl RunSummary {
    /// `advised` is whether this frame started a background advisory round.
    pub fn record(&mut self, report: &FrameReport, advised: bool) {
        self.frames += 1;
        if report.signal == SignalState::Go {
            self.go_frames += 1;
        }
        if advised {
            self.advisory_rounds += 1;
        }
    }
}

/// Reads `source` frame by frame until it is exhausted or `q` is pressed,
/// showing the annotated frames unless `headless` is set.
#[cfg(feature = "opencv")]
pub fn run(
    source: &VideoSource,
    config: &RunnerConfig,
    dispatcher: &mut Dispatcher,
    headless: bool,
) -> anyhow::Result<RunSummary> {
    crate::capture::run(source, config, dispatcher, headless)
}

#[cfg(not(feature = "opencv"))]
pub fn run(
    source: &VideoSource,
    _config: &RunnerConfig,
    _dispatcher: &mut Dispatcher,
    _headless: bool,
) -> anyhow::Result<RunSummary> {
    Err(anyhow::anyhow!(
        "cannot open {}: signal_runner was built without the `opencv` feature (rebuild with `--features opencv`)",
        source
    ))
}
