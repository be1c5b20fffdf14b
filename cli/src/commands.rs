use std::{
	path::{Path, PathBuf},
	process::Command,
};

use anyhow::Context;
use handoff_core::{
	Cleanup, CleanupReport, DatedBucket, InstanceToken, PathContext, Retention, Transaction, TransactionConfig,
	TransactionError,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};
use walkdir::WalkDir;

/// Env var carrying the working file path to the processing command.
pub const WORKING_FILE_ENV: &str = "HANDOFF_WORKING_FILE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
	Completed,
	Errored,
}

/// Which half of a run failed.
#[derive(Debug, Error)]
pub enum RunError {
	/// Nothing was claimed, or the claim was never completed.
	#[error("begin failed: {0}")]
	Begin(#[source] TransactionError),

	/// The file was ours; it may be stranded in Working.
	#[error("end failed: {0}")]
	End(#[source] TransactionError),
}

impl RunError {
	/// Another process has the file, or it was gone before anything was touched.
	pub fn is_skippable(&self) -> bool {
		match self {
			RunError::Begin(e) => e.is_contention() || e.is_missing_pending(),
			RunError::End(_) => false,
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
	pub completed: u64,
	pub errored: u64,
	pub skipped: u64,
	pub failed: u64,
}

/// Every derived path for `file`, as pretty JSON. Touches nothing on disk.
pub fn paths(config: &TransactionConfig, file: &Path) -> anyhow::Result<String> {
	let filename = file
		.file_name()
		.and_then(|n| n.to_str())
		.with_context(|| format!("no usable filename in {}", file.display()))?;
	let ctx = PathContext::new(config, filename, InstanceToken::new(), DatedBucket::today())?;
	Ok(serde_json::to_string_pretty(&ctx.resolve())?)
}

/// One full transaction: begin, run `cmd` on the working file, end by exit status.
pub fn run_one(config: &TransactionConfig, file: &Path, cmd: &[String]) -> Result<RunOutcome, RunError> {
	let mut txn = Transaction::new(config.clone()).map_err(RunError::Begin)?;
	txn.begin(file).map_err(RunError::Begin)?;

	let completed = match txn.working_file() {
		Some(working_file) => run_processor(cmd, &working_file),
		None => false,
	};

	txn.end(completed).map_err(RunError::End)?;
	Ok(if completed {
		RunOutcome::Completed
	} else {
		RunOutcome::Errored
	})
}

fn run_processor(cmd: &[String], working_file: &Path) -> bool {
	let Some((program, args)) = cmd.split_first() else {
		warn!("no processing command given");
		return false;
	};

	let status = Command::new(program)
		.args(args)
		.arg(working_file)
		.env(WORKING_FILE_ENV, working_file)
		.status();

	match status {
		Ok(status) if status.success() => true,
		Ok(status) => {
			warn!(program, %status, file = %working_file.display(), "processing command failed");
			false
		}
		Err(e) => {
			warn!(program, error = %e, "processing command could not be started");
			false
		}
	}
}

/// Process every file currently sitting directly under Pending.
pub fn run_all(config: &TransactionConfig, cmd: &[String]) -> anyhow::Result<BatchResult> {
	let mut result = BatchResult::default();

	for file in pending_files(&config.pending)? {
		match run_one(config, &file, cmd) {
			Ok(RunOutcome::Completed) => result.completed += 1,
			Ok(RunOutcome::Errored) => result.errored += 1,
			Err(e) if e.is_skippable() => {
				warn!(file = %file.display(), error = %e, "skipping file claimed elsewhere");
				result.skipped += 1;
			}
			Err(e) => {
				error!(file = %file.display(), error = %e, "transaction failed");
				result.failed += 1;
			}
		}
	}

	Ok(result)
}

/// Regular files under Pending, sorted, excluding claim temp names.
pub fn pending_files(pending: &Path) -> anyhow::Result<Vec<PathBuf>> {
	let mut files = Vec::new();
	for entry in WalkDir::new(pending).min_depth(1).max_depth(1).sort_by_file_name() {
		let entry = entry.with_context(|| format!("listing {}", pending.display()))?;
		if !entry.file_type().is_file() {
			continue;
		}
		if is_claim_temp(&entry.file_name().to_string_lossy()) {
			continue;
		}
		files.push(entry.into_path());
	}
	Ok(files)
}

/// `<id>.<ulid>` is another transaction's renamed claim, not new work.
pub fn is_claim_temp(name: &str) -> bool {
	name.rsplit_once('.')
		.is_some_and(|(id, ext)| !id.is_empty() && ulid::Ulid::from_string(ext).is_ok())
}

pub fn cleanup(
	config: &TransactionConfig,
	extension: Option<String>,
	retention: Retention,
) -> Result<CleanupReport, TransactionError> {
	Cleanup::new(config.clone(), extension).run(retention)
}
