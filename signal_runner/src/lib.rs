pub mod cli;
pub mod config;
pub mod dispatch;
pub mod video;

#[cfg(feature = "opencv")]
pub mod capture;
