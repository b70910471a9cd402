use amburoute::GpsStore;
use amburoute_server::{ServerConfig, start_server};
use clap::Parser;
use signal_runner::cli::{Args, MISSING_SOURCE};
use signal_runner::config::RunnerConfig;
use signal_runner::dispatch::Dispatcher;
use signal_runner::video;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // --- 1. Argument Parsing & Setup ---
    let args = Args::parse();
    let Some(source) = args.source() else {
        eprintln!("{}", MISSING_SOURCE);
        std::process::exit(1);
    };
    let config = RunnerConfig::load(args.config.as_deref())?;
    let source = source.with_camera_index(config.video.camera_index);

    // --- 2. GPS Endpoint ---
    // The server and advisory rounds share this runtime; the video loop stays on the main thread.
    let store = GpsStore::new();
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let server = if config.server.enabled && !args.no_server {
        let cfg = ServerConfig {
            bind_addr: config.server.bind_addr.clone(),
        };
        Some(runtime.block_on(start_server(store.clone(), cfg))?)
    } else {
        log::info!("gps endpoint disabled");
        None
    };

    // --- 3. Video Loop ---
    let advisor = config.route_advisor();
    log::info!("route advisor: {}", advisor.name());
    let mut dispatcher = Dispatcher::new(store, advisor, config.route_destination(), runtime.handle().clone());
    let result = video::run(&source, &config, &mut dispatcher, args.headless);

    // --- 4. Shutdown ---
    if let Some(handle) = server {
        handle.task.abort();
    }
    runtime.shutdown_background();

    let summary = result?;
    log::info!(
        "processed {} frames, {} with the light green, {} advisory rounds",
        summary.frames,
        summary.go_frames,
        summary.advisory_rounds
    );
    Ok(())
}
