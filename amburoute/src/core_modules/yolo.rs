// THEORY:
// A YOLOv8 detection head is a `[1, 4 + classes, anchors]` float tensor laid out
// channel-major: for anchor `a`, channel `c` sits at `c * anchors + a`. The first
// four channels are the box center and size in model-input pixels; the rest are
// per-class scores with no separate objectness term.
//
// Decoding is kept apart from any inference runtime so it runs on a plain slice.
// Duplicate suppression is left to the caller, which owns the NMS implementation.

use crate::core_modules::detection::{BoundingBox, Detection};
use anyhow::{Result, bail};

/// Number of leading box channels (cx, cy, w, h).
const BOX_CHANNELS: usize = 4;

/// Turns a raw YOLOv8 head into frame-space candidate detections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloDecoder {
    /// Square model input edge, in pixels.
    pub input_size: u32,
    /// Candidates scoring below this are dropped.
    pub confidence: f32,
}

impl YoloDecoder {
    pub fn new(input_size: u32, confidence: f32) -> Self {
        Self { input_size, confidence }
    }

    /// Decodes `data`, a `channels x anchors` head, for a `frame` of `(width, height)`.
    ///
    /// Each anchor keeps its best-scoring class. Boxes are rescaled from model
    /// input to frame coordinates and clamped to the frame.
    pub fn decode(&self, data: &[f32], channels: usize, anchors: usize, frame: (u32, u32)) -> Result<Vec<Detection>> {
        if channels <= BOX_CHANNELS {
            bail!("model head has {} channels, expected more than {}", channels, BOX_CHANNELS);
        }
        if data.len() != channels * anchors {
            bail!(
                "model head holds {} values, expected {} channels x {} anchors",
                data.len(),
                channels,
                anchors
            );
        }
        if self.input_size == 0 {
            bail!("model input size must be positive");
        }

        let at = |channel: usize, anchor: usize| data[channel * anchors + anchor];
        let (width, height) = frame;
        let x_factor = width as f32 / self.input_size as f32;
        let y_factor = height as f32 / self.input_size as f32;

        let mut detections = Vec::new();
        for anchor in 0..anchors {
            let (class_id, score) = (BOX_CHANNELS..channels)
                .map(|channel| (channel - BOX_CHANNELS, at(channel, anchor)))
                .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
            if score < self.confidence {
                continue;
            }
            let bbox = BoundingBox::from_center(
                at(0, anchor) * x_factor,
                at(1, anchor) * y_factor,
                at(2, anchor) * x_factor,
                at(3, anchor) * y_factor,
            )
            .clamp_to(width, height);
            detections.push(Detection::new(class_id as u32, score, bbox));
        }
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Lays anchors out channel-major the way the model emits them.
    fn head(anchors: &[[f32; 7]]) -> Vec<f32> {
        let mut data = vec![0.0; 7 * anchors.len()];
        for (a, values) in anchors.iter().enumerate() {
            for (c, value) in values.iter().enumerate() {
                data[c * anchors.len() + a] = *value;
            }
        }
        data
    }

    #[test]
    fn weak_anchors_are_dropped() {
        let data = head(&[
            [320.0, 320.0, 64.0, 64.0, 0.1, 0.2, 0.1],
            [100.0, 100.0, 20.0, 20.0, 0.0, 0.9, 0.0],
        ]);
        let found = YoloDecoder::new(640, 0.25).decode(&data, 7, 2, (640, 640)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].class_id, 1);
        assert_eq!(found[0].confidence, 0.9);
    }

    #[test]
    fn boxes_are_scaled_to_the_frame() {
        // A 64x32 box centered in the 640 input, decoded onto a 1280x720 frame.
        let data = head(&[[320.0, 320.0, 64.0, 32.0, 0.0, 0.0, 0.8]]);
        let found = YoloDecoder::new(640, 0.25).decode(&data, 7, 1, (1280, 720)).unwrap();
        assert_eq!(found[0].bbox, BoundingBox::from_corners((576, 342), (704, 378)));
    }

    #[test]
    fn best_class_wins() {
        let data = head(&[[50.0, 50.0, 10.0, 10.0, 0.3, 0.6, 0.5]]);
        let found = YoloDecoder::new(640, 0.25).decode(&data, 7, 1, (640, 640)).unwrap();
        assert_eq!(found[0].class_id, 1);
        assert_eq!(found[0].confidence, 0.6);
    }

    #[test]
    fn boxes_past_the_edge_are_clamped() {
        let data = head(&[[630.0, 5.0, 40.0, 40.0, 0.9, 0.0, 0.0]]);
        let found = YoloDecoder::new(640, 0.25).decode(&data, 7, 1, (640, 480)).unwrap();
        assert_eq!(found[0].bbox, BoundingBox::from_corners((610, 0), (639, 19)));
    }

    #[test]
    fn mismatched_shapes_are_errors() {
        let decoder = YoloDecoder::new(640, 0.25);
        assert!(decoder.decode(&[0.0; 8], 4, 2, (640, 640)).is_err());
        assert!(decoder.decode(&[0.0; 13], 7, 2, (640, 640)).is_err());
        assert!(YoloDecoder::new(0, 0.25).decode(&[0.0; 7], 7, 1, (640, 640)).is_err());
        assert!(decoder.decode(&[], 7, 0, (640, 640)).unwrap().is_empty());
    }
}
