use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogSettings;

/// Stderr always; `handoff.log` under `log.dir` when configured.
/// `RUST_LOG` wins over both the config level and `-v`.
pub fn init(settings: &LogSettings, verbose: u8) -> Option<WorkerGuard> {
	let level = match verbose {
		0 => settings.level.clone().unwrap_or_else(|| "info".to_string()),
		1 => "debug".to_string(),
		_ => "trace".to_string(),
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

	let (file_layer, guard) = match &settings.dir {
		Some(dir) => {
			std::fs::create_dir_all(dir).ok();
			let file_appender = tracing_appender::rolling::never(dir, "handoff.log");
			let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
			let layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
			(Some(layer), Some(guard))
		}
		None => (None, None),
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(fmt::layer().with_target(false).with_writer(std::io::stderr))
		.with(file_layer)
		.init();

	guard
}
