// THEORY:
// This file is the main entry point for the `amburoute` library crate.
//
// The primary goal is to export the `SignalPipeline` and the seams around it
// (`Detector`, `Canvas`, `RouteAdvisor`) together with the shared `GpsStore`.
// The video runner and the web server both build on these types; neither needs
// to know how the other one works.

pub mod core_modules;
pub mod pipeline;

pub use core_modules::canvas::{Canvas, Color};
pub use core_modules::detection::{BoundingBox, Detection, Detector, FixedDetector};
pub use core_modules::gps_store::{GeoPoint, GpsStore};
pub use core_modules::interpreter::{InterpreterConfig, Presence};
pub use core_modules::renderer::LightStyle;
pub use core_modules::routing::{MapsConfig, MapsRouteAdvisor, RouteAdvisor, RouteEstimate, StubRouteAdvisor};
pub use core_modules::signal::SignalState;
pub use core_modules::yolo::YoloDecoder;
pub use pipeline::{FrameReport, PipelineConfig, SignalPipeline};
