// THEORY:
// The interpreter turns a frame's raw detections into the single fact the signal
// controller cares about: is an ambulance in view or not. It is a stateless
// utility with no memory of previous frames.
//
// The "ambulance" is identified purely by class id. The stock COCO models have no
// ambulance class, so the default target is class 5 ("bus") as a stand-in; the id
// is configuration and can be pointed at a purpose-trained model's class.

use crate::core_modules::canvas::{Canvas, Color};
use crate::core_modules::detection::Detection;
use anyhow::Result;

/// COCO class id for "bus", the default stand-in for an ambulance.
pub const DEFAULT_TARGET_CLASS: u32 = 5;
pub const DEFAULT_LABEL: &str = "AMBULANCE";
/// Vertical offset of the label above the box's top edge.
const LABEL_OFFSET: i32 = 10;

/// Whether the target class was seen in a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Present,
    Absent,
}

impl Presence {
    pub fn is_present(self) -> bool {
        matches!(self, Presence::Present)
    }
}

/// How matches are recognized and annotated.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    pub target_class_id: u32,
    /// Extra confidence floor on top of the detector's own threshold. `0.0` disables it.
    pub min_confidence: f32,
    pub label: String,
    pub annotation_color: Color,
    pub annotation_thickness: u32,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            target_class_id: DEFAULT_TARGET_CLASS,
            min_confidence: 0.0,
            label: DEFAULT_LABEL.to_string(),
            annotation_color: Color::YELLOW,
            annotation_thickness: 3,
        }
    }
}

/// The interpreter's verdict for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub presence: Presence,
    /// Every detection that matched the target class, in detector order.
    pub matches: Vec<Detection>,
}

impl InterpreterConfig {
    pub fn is_target(&self, detection: &Detection) -> bool {
        detection.class_id == self.target_class_id && detection.confidence >= self.min_confidence
    }
}

/// Scans `detections` for the target class and annotates every match on `canvas`.
pub fn interpret<C: Canvas + ?Sized>(
    detections: &[Detection],
    config: &InterpreterConfig,
    canvas: &mut C,
) -> Result<Interpretation> {
    let mut matches = Vec::new();
    for detection in detections.iter().filter(|d| config.is_target(d)) {
        let bbox = detection.bbox;
        canvas.draw_rect(&bbox, config.annotation_color, config.annotation_thickness)?;
        canvas.draw_label(
            &config.label,
            (bbox.x1, bbox.y1 - LABEL_OFFSET),
            config.annotation_color,
        )?;
        matches.push(detection.clone());
    }

    let presence = if matches.is_empty() {
        Presence::Absent
    } else {
        Presence::Present
    };
    Ok(Interpretation { presence, matches })
}
