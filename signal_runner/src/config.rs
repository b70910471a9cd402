use amburoute::core_modules::routing::{DEFAULT_MAPS_BASE_URL, DEFAULT_NEAR_THRESHOLD_M, DEFAULT_SIGNAL_LOCATION};
use amburoute::{
    GeoPoint, InterpreterConfig, LightStyle, MapsConfig, MapsRouteAdvisor, PipelineConfig, RouteAdvisor,
    StubRouteAdvisor,
};
use amburoute_server::DEFAULT_BIND_ADDR;
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DEFAULT_MODEL_PATH: &str = "yolov8n.onnx";
const DEFAULT_CONFIDENCE: f32 = 0.25;
const DEFAULT_IOU: f32 = 0.7;
const DEFAULT_INPUT_SIZE: i32 = 640;
const DEFAULT_WINDOW_TITLE: &str = "AmbuRouteAI - Ambulance Detection";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RunnerConfigFile {
    server: Option<ServerConfigFile>,
    detector: Option<DetectorConfigFile>,
    signal: Option<SignalConfigFile>,
    maps: Option<MapsConfigFile>,
    video: Option<VideoConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ServerConfigFile {
    bind_addr: Option<String>,
    enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    model_path: Option<PathBuf>,
    confidence: Option<f32>,
    iou: Option<f32>,
    input_size: Option<i32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SignalConfigFile {
    target_class_id: Option<u32>,
    min_confidence: Option<f32>,
    light_x: Option<i32>,
    light_y: Option<i32>,
    light_radius: Option<u32>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MapsConfigFile {
    api_key: Option<String>,
    near_threshold_m: Option<f64>,
    hospital_latitude: Option<f64>,
    hospital_longitude: Option<f64>,
    base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct VideoConfigFile {
    camera_index: Option<i32>,
    window_title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub server: ServerSettings,
    pub detector: DetectorSettings,
    pub pipeline: PipelineConfig,
    pub signal_location: GeoPoint,
    pub maps: MapsSettings,
    pub video: VideoSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind_addr: String,
    pub enabled: bool,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub model_path: PathBuf,
    pub confidence: f32,
    pub iou: f32,
    pub input_size: i32,
}

#[derive(Debug, Clone)]
pub struct MapsSettings {
    pub api_key: Option<String>,
    pub near_threshold_m: f64,
    pub hospital: Option<GeoPoint>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct VideoSettings {
    pub camera_index: i32,
    pub window_title: String,
}

impl RunnerConfig {
    /// Resolves configuration from, in increasing priority: defaults, the TOML
    /// file (`path`, else `AMBU_CONFIG`), then `AMBU_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var("AMBU_CONFIG").ok().map(PathBuf::from);
        let file_cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => read_config_file(&path)?,
            None => RunnerConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg)?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: RunnerConfigFile) -> Result<Self> {
        let server = file.server.unwrap_or_default();
        let detector = file.detector.unwrap_or_default();
        let signal = file.signal.unwrap_or_default();
        let maps = file.maps.unwrap_or_default();
        let video = file.video.unwrap_or_default();

        let defaults = InterpreterConfig::default();
        let light = LightStyle::default();
        let pipeline = PipelineConfig {
            interpreter: InterpreterConfig {
                target_class_id: signal.target_class_id.unwrap_or(defaults.target_class_id),
                min_confidence: signal.min_confidence.unwrap_or(defaults.min_confidence),
                ..defaults
            },
            light: LightStyle {
                center: (
                    signal.light_x.unwrap_or(light.center.0),
                    signal.light_y.unwrap_or(light.center.1),
                ),
                radius: signal.light_radius.unwrap_or(light.radius),
            },
        };

        let signal_location = GeoPoint::new(
            signal.latitude.unwrap_or(DEFAULT_SIGNAL_LOCATION.latitude),
            signal.longitude.unwrap_or(DEFAULT_SIGNAL_LOCATION.longitude),
        );

        let hospital = match (maps.hospital_latitude, maps.hospital_longitude) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            (None, None) => None,
            _ => return Err(anyhow!("maps.hospital_latitude and maps.hospital_longitude must be set together")),
        };

        Ok(Self {
            server: ServerSettings {
                bind_addr: server.bind_addr.unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
                enabled: server.enabled.unwrap_or(true),
            },
            detector: DetectorSettings {
                model_path: detector.model_path.unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH)),
                confidence: detector.confidence.unwrap_or(DEFAULT_CONFIDENCE),
                iou: detector.iou.unwrap_or(DEFAULT_IOU),
                input_size: detector.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
            },
            pipeline,
            signal_location,
            maps: MapsSettings {
                api_key: maps.api_key.filter(|key| !key.is_empty()),
                near_threshold_m: maps.near_threshold_m.unwrap_or(DEFAULT_NEAR_THRESHOLD_M),
                hospital,
                base_url: maps.base_url.unwrap_or_else(|| DEFAULT_MAPS_BASE_URL.to_string()),
            },
            video: VideoSettings {
                camera_index: video.camera_index.unwrap_or(0),
                window_title: video.window_title.unwrap_or_else(|| DEFAULT_WINDOW_TITLE.to_string()),
            },
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(addr) = non_empty_env("AMBU_BIND") {
            self.server.bind_addr = addr;
        }
        if let Some(model) = non_empty_env("AMBU_MODEL") {
            self.detector.model_path = PathBuf::from(model);
        }
        if let Some(class) = non_empty_env("AMBU_TARGET_CLASS") {
            self.pipeline.interpreter.target_class_id = class
                .parse()
                .map_err(|_| anyhow!("AMBU_TARGET_CLASS must be a non-negative integer, got '{}'", class))?;
        }
        if let Some(key) = non_empty_env("AMBU_MAPS_API_KEY") {
            self.maps.api_key = Some(key);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.detector.confidence) {
            return Err(anyhow!("detector.confidence must be within [0, 1]"));
        }
        if !unit.contains(&self.detector.iou) {
            return Err(anyhow!("detector.iou must be within [0, 1]"));
        }
        if !unit.contains(&self.pipeline.interpreter.min_confidence) {
            return Err(anyhow!("signal.min_confidence must be within [0, 1]"));
        }
        if self.detector.input_size <= 0 {
            return Err(anyhow!("detector.input_size must be positive"));
        }
        if self.pipeline.light.radius == 0 {
            return Err(anyhow!("signal.light_radius must be positive"));
        }
        Ok(())
    }

    /// Maps-backed advisor when an API key is configured, the stub otherwise.
    pub fn route_advisor(&self) -> Arc<dyn RouteAdvisor> {
        match &self.maps.api_key {
            Some(key) => Arc::new(MapsRouteAdvisor::new(MapsConfig {
                api_key: key.clone(),
                signal_location: self.signal_location,
                near_threshold_m: self.maps.near_threshold_m,
                base_url: self.maps.base_url.clone(),
            })),
            None => Arc::new(StubRouteAdvisor),
        }
    }

    /// Where dispatch advisories route to: the hospital if configured, else the signal.
    pub fn route_destination(&self) -> GeoPoint {
        self.maps.hospital.unwrap_or(self.signal_location)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_config_file(path: &Path) -> Result<RunnerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("failed to parse config file {}", path.display()))
}
