// THEORY:
// Everything that touches OpenCV lives here: opening the capture, wrapping its
// `Mat` frames so the library can draw on them, running the YOLOv8 ONNX model
// through the DNN module, and the display window.
//
// The loop is single-threaded on purpose: HighGUI windows must be driven from
// the thread that created them, and the 1 ms `wait_key` poll is the only way the
// user can stop a live feed.

use crate::cli::VideoSource;
use crate::config::{DetectorSettings, RunnerConfig};
use crate::dispatch::Dispatcher;
use crate::video::RunSummary;
use amburoute::{BoundingBox, Canvas, Color, Detection, Detector, SignalPipeline, YoloDecoder};
use anyhow::{Context, Result, anyhow, bail};
use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Size, Vector},
    dnn, highgui, imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};

const LABEL_FONT_SCALE: f64 = 0.8;
const LABEL_THICKNESS: i32 = 2;
/// Per-class box offset for NMS; larger than any frame edge.
const CLASS_NMS_OFFSET: i32 = 4096;

/// A BGR OpenCV frame the signal pipeline can draw on.
pub struct MatFrame(pub Mat);

fn scalar(color: Color) -> Scalar {
    let [b, g, r] = color.to_bgr();
    Scalar::new(b as f64, g as f64, r as f64, 0.0)
}

impl Canvas for MatFrame {
    fn dimensions(&self) -> (u32, u32) {
        (self.0.cols().max(0) as u32, self.0.rows().max(0) as u32)
    }

    fn draw_rect(&mut self, bbox: &BoundingBox, color: Color, thickness: u32) -> Result<()> {
        imgproc::rectangle_points(
            &mut self.0,
            Point::new(bbox.x1, bbox.y1),
            Point::new(bbox.x2, bbox.y2),
            scalar(color),
            thickness as i32,
            imgproc::LINE_8,
            0,
        )?;
        Ok(())
    }

    fn draw_label(&mut self, text: &str, origin: (i32, i32), color: Color) -> Result<()> {
        imgproc::put_text(
            &mut self.0,
            text,
            Point::new(origin.0, origin.1),
            imgproc::FONT_HERSHEY_SIMPLEX,
            LABEL_FONT_SCALE,
            scalar(color),
            LABEL_THICKNESS,
            imgproc::LINE_8,
            false,
        )?;
        Ok(())
    }

    fn fill_circle(&mut self, center: (i32, i32), radius: u32, color: Color) -> Result<()> {
        imgproc::circle(
            &mut self.0,
            Point::new(center.0, center.1),
            radius as i32,
            scalar(color),
            imgproc::FILLED,
            imgproc::LINE_8,
            0,
        )?;
        Ok(())
    }
}

/// YOLOv8 detector running an ONNX export through OpenCV DNN.
pub struct OnnxDetector {
    net: dnn::Net,
    input_size: i32,
    head: YoloDecoder,
    iou: f32,
}

impl OnnxDetector {
    pub fn load(settings: &DetectorSettings) -> Result<Self> {
        let path = settings
            .model_path
            .to_str()
            .ok_or_else(|| anyhow!("model path {} is not valid UTF-8", settings.model_path.display()))?;
        let net = dnn::read_net_from_onnx(path).with_context(|| format!("failed to load model {}", path))?;
        log::info!("loaded detector model {}", path);
        Ok(Self {
            net,
            input_size: settings.input_size,
            head: YoloDecoder::new(settings.input_size.max(0) as u32, settings.confidence),
            iou: settings.iou,
        })
    }

    /// Decodes a `[1, 4 + classes, anchors]` head and suppresses duplicates per class.
    fn decode(&self, output: &Mat, width: u32, height: u32) -> Result<Vec<Detection>> {
        let shape = output.mat_size().to_vec();
        if shape.len() != 3 {
            bail!("unexpected model output shape {:?}", shape);
        }
        let candidates = self.head.decode(
            output.data_typed::<f32>()?,
            shape[1].max(0) as usize,
            shape[2].max(0) as usize,
            (width, height),
        )?;

        let mut nms_boxes = Vector::<Rect>::new();
        let mut nms_scores = Vector::<f32>::new();
        for detection in &candidates {
            nms_boxes.push(nms_rect(&detection.bbox, detection.class_id));
            nms_scores.push(detection.confidence);
        }
        let mut keep = Vector::<i32>::new();
        dnn::nms_boxes(&nms_boxes, &nms_scores, self.head.confidence, self.iou, &mut keep, 1.0, 0)?;
        Ok(keep
            .iter()
            .filter_map(|index| candidates.get(index as usize).cloned())
            .collect())
    }
}

/// Shifts a box by its class so one NMS pass never merges different classes.
fn nms_rect(bbox: &BoundingBox, class_id: u32) -> Rect {
    let offset = class_id as i32 * CLASS_NMS_OFFSET;
    Rect::new(bbox.x1 + offset, bbox.y1 + offset, bbox.width() as i32 + 1, bbox.height() as i32 + 1)
}

impl Detector<MatFrame> for OnnxDetector {
    fn name(&self) -> &'static str {
        "yolov8-onnx"
    }

    fn detect(&mut self, frame: &MatFrame) -> Result<Vec<Detection>> {
        let (width, height) = frame.dimensions();
        let blob = dnn::blob_from_image(
            &frame.0,
            1.0 / 255.0,
            Size::new(self.input_size, self.input_size),
            Scalar::default(),
            true,
            false,
            core::CV_32F,
        )?;
        self.net.set_input(&blob, "", 1.0, Scalar::default())?;
        let output = self.net.forward_single("")?;
        self.decode(&output, width, height)
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = Mat::new_rows_cols_with_default(
            self.input_size,
            self.input_size,
            core::CV_8UC3,
            Scalar::all(0.0),
        )?;
        self.detect(&MatFrame(blank)).map(|_| ())
    }
}

pub fn open_capture(source: &VideoSource) -> Result<VideoCapture> {
    let cap = match source {
        VideoSource::File(path) => {
            let path = path
                .to_str()
                .ok_or_else(|| anyhow!("video path {} is not valid UTF-8", path.display()))?;
            VideoCapture::from_file(path, videoio::CAP_ANY)
        }
        VideoSource::Camera(index) => VideoCapture::new(*index, videoio::CAP_ANY),
    }
    .with_context(|| format!("could not open {}", source))?;
    if !cap.is_opened()? {
        bail!("could not open {}", source);
    }
    Ok(cap)
}

pub fn run(
    source: &VideoSource,
    config: &RunnerConfig,
    dispatcher: &mut Dispatcher,
    headless: bool,
) -> Result<RunSummary> {
    // --- 1. Video I/O Initialization ---
    let mut cap = open_capture(source)?;
    log::info!("reading frames from {}", source);

    // --- 2. Pipeline Initialization ---
    let mut detector = OnnxDetector::load(&config.detector)?;
    detector.warm_up().context("detector warm-up failed")?;
    let mut pipeline = SignalPipeline::new(detector, config.pipeline.clone());

    let title = config.video.window_title.as_str();
    if !headless {
        highgui::named_window(title, highgui::WINDOW_AUTOSIZE)?;
    }

    // --- 3. Main Processing Loop ---
    let mut summary = RunSummary::default();
    loop {
        let mut frame = Mat::default();
        match cap.read(&mut frame) {
            Ok(true) if !frame.empty() => {}
            Ok(_) => break,
            Err(err) => {
                log::error!("error reading frame: {}", err);
                break;
            }
        }

        let mut frame = MatFrame(frame);
        let report = pipeline.process_frame(&mut frame)?;
        let round = dispatcher.observe(&report);
        summary.record(&report, round.is_some());

        if !headless {
            highgui::imshow(title, &frame.0)?;
            if highgui::wait_key(1)? & 0xFF == 'q' as i32 {
                log::info!("quit requested");
                break;
            }
        }
    }

    cap.release()?;
    if !headless {
        highgui::destroy_all_windows()?;
    }
    Ok(summary)
}
