use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use amburoute::GeoPoint;
use signal_runner::config::RunnerConfig;
use tempfile::NamedTempFile;

static ENV_LOCK: Mutex<()> = Mutex::new(());

const ENV_KEYS: [&str; 5] = [
    "AMBU_CONFIG",
    "AMBU_BIND",
    "AMBU_MODEL",
    "AMBU_TARGET_CLASS",
    "AMBU_MAPS_API_KEY",
];

fn clear_env() {
    for key in ENV_KEYS {
        // SAFETY: tests touching the environment serialize on ENV_LOCK.
        unsafe { std::env::remove_var(key) };
    }
}

fn set_env(key: &str, value: &str) {
    // SAFETY: tests touching the environment serialize on ENV_LOCK.
    unsafe { std::env::set_var(key, value) };
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_file_or_env() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let cfg = RunnerConfig::load(None).expect("load defaults");

    assert_eq!(cfg.server.bind_addr, "127.0.0.1:5000");
    assert!(cfg.server.enabled);
    assert_eq!(cfg.detector.model_path, PathBuf::from("yolov8n.onnx"));
    assert_eq!(cfg.detector.confidence, 0.25);
    assert_eq!(cfg.detector.input_size, 640);
    assert_eq!(cfg.pipeline.interpreter.target_class_id, 5);
    assert_eq!(cfg.pipeline.interpreter.min_confidence, 0.0);
    assert_eq!(cfg.pipeline.light.center, (50, 50));
    assert_eq!(cfg.pipeline.light.radius, 30);
    assert_eq!(cfg.signal_location, GeoPoint::new(40.758896, -73.985130));
    assert_eq!(cfg.video.camera_index, 0);
    assert_eq!(cfg.video.window_title, "AmbuRouteAI - Ambulance Detection");
    assert!(cfg.maps.api_key.is_none());
    assert_eq!(cfg.route_advisor().name(), "stub");
    assert_eq!(cfg.route_destination(), cfg.signal_location);
}

#[test]
fn loads_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let file = write_config(
        r#"
        [server]
        bind_addr = "0.0.0.0:8080"
        enabled = false

        [detector]
        model_path = "models/ambulance.onnx"
        confidence = 0.4
        iou = 0.5

        [signal]
        target_class_id = 0
        light_x = 600
        light_y = 40
        light_radius = 20
        latitude = 51.5
        longitude = -0.12

        [maps]
        api_key = "from-file"
        near_threshold_m = 350.0
        hospital_latitude = 51.49
        hospital_longitude = -0.11

        [video]
        camera_index = 2
        window_title = "junction 4"
        "#,
    );
    set_env("AMBU_CONFIG", file.path().to_str().unwrap());
    set_env("AMBU_BIND", "127.0.0.1:9100");
    set_env("AMBU_TARGET_CLASS", "7");

    let cfg = RunnerConfig::load(None).expect("load config");

    assert_eq!(cfg.server.bind_addr, "127.0.0.1:9100");
    assert!(!cfg.server.enabled);
    assert_eq!(cfg.detector.model_path, PathBuf::from("models/ambulance.onnx"));
    assert_eq!(cfg.detector.confidence, 0.4);
    assert_eq!(cfg.detector.iou, 0.5);
    assert_eq!(cfg.pipeline.interpreter.target_class_id, 7);
    assert_eq!(cfg.pipeline.light.center, (600, 40));
    assert_eq!(cfg.pipeline.light.radius, 20);
    assert_eq!(cfg.signal_location, GeoPoint::new(51.5, -0.12));
    assert_eq!(cfg.maps.api_key.as_deref(), Some("from-file"));
    assert_eq!(cfg.maps.near_threshold_m, 350.0);
    assert_eq!(cfg.route_destination(), GeoPoint::new(51.49, -0.11));
    assert_eq!(cfg.route_advisor().name(), "google-maps");
    assert_eq!(cfg.video.camera_index, 2);
    assert_eq!(cfg.video.window_title, "junction 4");

    clear_env();
}

#[test]
fn explicit_path_wins_over_env_path() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let env_file = write_config("[detector]\nmodel_path = \"env.onnx\"\n");
    let cli_file = write_config("[detector]\nmodel_path = \"cli.onnx\"\n");
    set_env("AMBU_CONFIG", env_file.path().to_str().unwrap());

    let cfg = RunnerConfig::load(Some(cli_file.path())).expect("load config");
    assert_eq!(cfg.detector.model_path, PathBuf::from("cli.onnx"));

    clear_env();
}

#[test]
fn maps_key_from_env_enables_maps_advisor() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();
    set_env("AMBU_MAPS_API_KEY", "secret");

    let cfg = RunnerConfig::load(None).expect("load config");
    assert_eq!(cfg.route_advisor().name(), "google-maps");

    clear_env();
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let file = write_config("[detector]\nconfidence = 1.5\n");
    assert!(RunnerConfig::load(Some(file.path())).is_err());

    let file = write_config("[maps]\nhospital_latitude = 1.0\n");
    assert!(RunnerConfig::load(Some(file.path())).is_err());

    let file = write_config("[signal]\nlight_radius = 0\n");
    assert!(RunnerConfig::load(Some(file.path())).is_err());

    let file = write_config("[unknown]\nkey = 1\n");
    assert!(RunnerConfig::load(Some(file.path())).is_err());

    set_env("AMBU_TARGET_CLASS", "bus");
    assert!(RunnerConfig::load(None).is_err());

    clear_env();
}

#[test]
fn misspelled_section_keys_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    for contents in [
        "[detector]\nconfidance = 0.9\n",
        "[signal]\ntarget_class = 2\n",
        "[server]\nbind = \"0.0.0.0:80\"\n",
        "[maps]\napikey = \"k\"\n",
        "[video]\ncamera = 1\n",
    ] {
        let file = write_config(contents);
        let err = RunnerConfig::load(Some(file.path())).unwrap_err();
        assert!(
            format!("{err:#}").contains("unknown field"),
            "{contents:?} gave: {err:#}"
        );
    }
}

#[test]
fn missing_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    clear_env();

    let err = RunnerConfig::load(Some(std::path::Path::new("/nonexistent/amburoute.toml"))).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read config file"));
}
