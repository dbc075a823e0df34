use anyhow::Result;
use std::sync::{atomic::AtomicBool, Arc};

use co2mon_bridge::{
    boot,
    cli::{self, cleanup},
    core::Supervisor,
    device,
    mqtt::{publish_discovery, LoggingSink, MqttSink, PublishSink},
};

fn main() {
    let matches = cli::parse_args();
    // The logger must exist before config resolution can warn, so only the
    // log file setting is peeked at here.
    let log_file = matches
        .get_one::<String>("config")
        .and_then(|path| cli::BridgeConfig::from_file(path).ok())
        .and_then(|config| config.log_file);
    boot::init_logger(log_file.as_deref());

    if let Err(err) = run(&matches) {
        log::error!("{err:#}");
        cleanup::run_cleanups();
        std::process::exit(1);
    }
    cleanup::run_cleanups();
}

fn run(matches: &clap::ArgMatches) -> Result<()> {
    let config = cli::resolve_config(matches)?;
    log::debug!("Configuration: {config:?}");

    let sink: Arc<dyn PublishSink> = if config.dry_run {
        log::info!("Dry run: publications are only logged");
        Arc::new(LoggingSink)
    } else {
        let mqtt = MqttSink::connect(&config.mqtt_settings())?;
        let on_exit = mqtt.clone();
        cleanup::register_cleanup(move || on_exit.disconnect());
        Arc::new(mqtt)
    };

    publish_discovery(sink.as_ref())?;

    let running = Arc::new(AtomicBool::new(true));
    boot::install_shutdown_handler(Arc::clone(&running))?;

    Supervisor::new(device::default_provider(), sink, config.supervisor_config())
        .with_running_flag(running)
        .run();

    Ok(())
}
