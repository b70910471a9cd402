pub mod canvas;
pub mod detection;
pub mod gps_store;
pub mod interpreter;
pub mod renderer;
pub mod routing;
pub mod signal;
pub mod yolo;
