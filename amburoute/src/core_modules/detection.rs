// THEORY:
// The `detection` module defines the boundary between the signal controller and
// whatever object detector produces boxes for a frame. The controller never looks
// at pixels itself; it only consumes `Detection`s.
//
// Key architectural principles:
// 1.  **Dumb Data Containers**: `BoundingBox` and `Detection` carry no behavior
//     beyond a few geometric helpers. They are produced fresh for every frame and
//     discarded once the frame has been interpreted.
// 2.  **Frame-Generic Seam**: `Detector<F>` is generic over the frame type so the
//     same pipeline can run over an OpenCV matrix in production and over an
//     `image::RgbImage` (or a plain test double) everywhere else.
// 3.  **Thresholds Belong to the Detector**: confidence filtering and duplicate
//     suppression happen inside the detector. The interpreter takes the boxes as
//     given.

use anyhow::Result;

/// An axis-aligned rectangle in frame pixel coordinates, stored as its
/// top-left `(x1, y1)` and bottom-right `(x2, y2)` corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    /// Builds a box from any two opposite corners.
    pub fn from_corners(a: (i32, i32), b: (i32, i32)) -> Self {
        Self {
            x1: a.0.min(b.0),
            y1: a.1.min(b.1),
            x2: a.0.max(b.0),
            y2: a.1.max(b.1),
        }
    }

    /// Builds a box from a center point and a size, as YOLO heads report them.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        let x1 = (cx - w / 2.0).round() as i32;
        let y1 = (cy - h / 2.0).round() as i32;
        let x2 = (cx + w / 2.0).round() as i32;
        let y2 = (cy + h / 2.0).round() as i32;
        Self::from_corners((x1, y1), (x2, y2))
    }

    pub fn width(&self) -> u32 {
        (self.x2 - self.x1).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 - self.y1).max(0) as u32
    }

    /// Clamps the box so it lies inside a `width` x `height` frame.
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let max_x = width.saturating_sub(1) as i32;
        let max_y = height.saturating_sub(1) as i32;
        Self {
            x1: self.x1.clamp(0, max_x),
            y1: self.y1.clamp(0, max_y),
            x2: self.x2.clamp(0, max_x),
            y2: self.y2.clamp(0, max_y),
        }
    }
}

/// A single object reported by a detector for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Class index in the detector's label set (COCO for the bundled YOLO models).
    pub class_id: u32,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_id: u32, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }
}

/// An object detector that can run over frames of type `F`.
pub trait Detector<F: ?Sized> {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Runs detection on one frame. The frame is only read.
    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<F: ?Sized, D: Detector<F> + ?Sized> Detector<F> for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>> {
        (**self).detect(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}

/// A detector that replays a fixed list of detections for every frame.
/// Useful for tests and for dry runs without a model file.
#[derive(Debug, Clone, Default)]
pub struct FixedDetector {
    detections: Vec<Detection>,
}

impl FixedDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn set(&mut self, detections: Vec<Detection>) {
        self.detections = detections;
    }
}

impl<F: ?Sized> Detector<F> for FixedDetector {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn detect(&mut self, _frame: &F) -> Result<Vec<Detection>> {
        Ok(self.detections.clone())
    }
}
