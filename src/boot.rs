use anyhow::{anyhow, Result};
use chrono::Local;
use log::LevelFilter;
use std::{
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use env_logger::{Builder, Target};

use crate::cli::cleanup;

/// Multi-writer for logging to both file and stdout
struct DualWriter {
    file: std::fs::File,
    stdout: io::Stdout,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        self.stdout.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.stdout.flush()?;
        Ok(())
    }
}

/// Install the global logger.
///
/// `CO2MON_LOG_FILE` takes precedence over `log_file`. With a file, lines go
/// to both the file and stdout; otherwise to stderr. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_logger(log_file: Option<&str>) {
    let path = std::env::var("CO2MON_LOG_FILE")
        .ok()
        .or_else(|| log_file.map(str::to_owned));

    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter_level(LevelFilter::Info)
        .parse_default_env();

    let mut file_error = None;
    if let Some(path) = &path {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(Target::Pipe(Box::new(DualWriter {
                    file,
                    stdout: io::stdout(),
                })));
            }
            Err(err) => file_error = Some(err),
        }
    }

    builder.init();

    match (path, file_error) {
        (Some(path), Some(err)) => {
            log::error!("Failed to initialize file logger at '{path}': {err}")
        }
        (Some(path), None) => log::info!("Logging to {path} and terminal"),
        _ => {}
    }
}

/// Clear `running` and run registered cleanups on Ctrl-C.
pub fn install_shutdown_handler(running: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("Shutdown requested");
        running.store(false, Ordering::SeqCst);
        cleanup::run_cleanups();
    })
    .map_err(|e| anyhow!("Failed to install Ctrl-C handler: {e}"))
}
