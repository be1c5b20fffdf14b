mod commands;
mod config;
mod logging;

use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::{ArgAction, Parser, Subcommand};
use tracing::error;

use crate::commands::RunOutcome;

/// File handoff through Pending → Working → Completed | Error folders.
#[derive(Debug, Parser)]
#[command(name = "handoff", version, about)]
struct Cli {
	/// Config file (defaults to the platform config dir, handoff/handoff.toml)
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// -v for debug, -vv for trace
	#[arg(short, long, global = true, action = ArgAction::Count)]
	verbose: u8,

	#[command(subcommand)]
	command: Cmd,
}

#[derive(Debug, Subcommand)]
enum Cmd {
	/// Print every path a transaction for FILE would use, as JSON
	Paths { file: PathBuf },

	/// Claim FILE, run CMD on the working copy, archive by exit status
	Run {
		file: PathBuf,
		#[arg(last = true, required = true)]
		cmd: Vec<String>,
	},

	/// Run CMD once per file currently in Pending
	RunAll {
		#[arg(last = true, required = true)]
		cmd: Vec<String>,
	},

	/// Remove archive entries older than their retention window
	Cleanup {
		/// Overrides [retention] completed, e.g. "30d"
		#[arg(long, value_parser = humantime::parse_duration)]
		completed: Option<Duration>,

		/// Overrides [retention] error, e.g. "90d"
		#[arg(long, value_parser = humantime::parse_duration)]
		error: Option<Duration>,

		/// Extension of archived files, needed for undated archives
		#[arg(long)]
		extension: Option<String>,
	},
}

fn main() -> anyhow::Result<ExitCode> {
	let cli = Cli::parse();
	let settings = config::load(cli.config.as_deref())?;
	let _guard = logging::init(&settings.log, cli.verbose);
	let folders = &settings.folders;

	match cli.command {
		Cmd::Paths { file } => {
			println!("{}", commands::paths(folders, &file)?);
			Ok(ExitCode::SUCCESS)
		}
		Cmd::Run { file, cmd } => match commands::run_one(folders, &file, &cmd) {
			Ok(RunOutcome::Completed) => Ok(ExitCode::SUCCESS),
			Ok(RunOutcome::Errored) => Ok(ExitCode::from(1)),
			Err(e) => {
				error!(file = %file.display(), error = %e, "transaction failed");
				Ok(ExitCode::from(2))
			}
		},
		Cmd::RunAll { cmd } => {
			let result = commands::run_all(folders, &cmd)?;
			println!("{}", serde_json::to_string(&result)?);
			if result.failed > 0 {
				Ok(ExitCode::from(2))
			} else {
				Ok(ExitCode::SUCCESS)
			}
		}
		Cmd::Cleanup { completed, error, extension } => {
			let configured = settings.retention.to_retention();
			let retention = handoff_core::Retention::new(
				completed.or(configured.completed),
				error.or(configured.error),
			);
			let report = commands::cleanup(folders, extension, retention)?;
			for path in &report.removed {
				println!("{}", path.display());
			}
			Ok(ExitCode::SUCCESS)
		}
	}
}
