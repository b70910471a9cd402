// THEORY:
// The `pipeline` module is the top-level API of the signal controller. It chains
// the per-frame stages into a single call:
//
//     detector -> interpreter -> signal state -> renderer
//
// The signal state is an explicit output of `process_frame`, returned inside a
// `FrameReport`, rather than something the pipeline remembers. Callers that care
// about transitions (logging, dispatch) compare consecutive reports themselves.

use crate::core_modules::canvas::Canvas;
use crate::core_modules::detection::{Detection, Detector};
use crate::core_modules::interpreter::{self, InterpreterConfig};
use crate::core_modules::renderer::{self, LightStyle};
use anyhow::Result;

// Re-export key data structures for the public API.
pub use crate::core_modules::interpreter::Presence;
pub use crate::core_modules::signal::SignalState;

/// Configuration for the SignalPipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub interpreter: InterpreterConfig,
    pub light: LightStyle,
}

/// The outcome of processing one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub signal: SignalState,
    pub presence: Presence,
    /// Target-class detections that were annotated on the frame.
    pub matches: Vec<Detection>,
    /// Total number of detections the detector returned, of any class.
    pub detection_count: usize,
}

/// Runs the detect/interpret/render chain over frames of any canvas type the
/// detector understands.
pub struct SignalPipeline<D> {
    detector: D,
    config: PipelineConfig,
}

impl<D> SignalPipeline<D> {
    pub fn new(detector: D, config: PipelineConfig) -> Self {
        Self { detector, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Processes one frame in place: annotates matches, paints the light and
    /// returns the resulting signal state.
    pub fn process_frame<F>(&mut self, frame: &mut F) -> Result<FrameReport>
    where
        D: Detector<F>,
        F: Canvas + ?Sized,
    {
        // Stage 1: Detection
        let detections = self.detector.detect(frame)?;

        // Stage 2: Interpretation and annotation
        let interpretation = interpreter::interpret(&detections, &self.config.interpreter, frame)?;

        // Stage 3: Signal decision
        let signal = SignalState::from_presence(interpretation.presence);

        // Stage 4: Render the light
        renderer::draw_signal(frame, signal, &self.config.light)?;

        log::debug!(
            "{} detections from {}, {} matched class {}, signal {}",
            detections.len(),
            self.detector.name(),
            interpretation.matches.len(),
            self.config.interpreter.target_class_id,
            signal
        );

        Ok(FrameReport {
            signal,
            presence: interpretation.presence,
            matches: interpretation.matches,
            detection_count: detections.len(),
        })
    }
}
