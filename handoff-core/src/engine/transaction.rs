use std::{
	fs, io,
	path::{Path, PathBuf},
};

use tracing::{debug, error, info, warn};

use crate::{
	engine::{
		cleanup::{Cleanup, CleanupReport},
		error::{TransactionError, PENDING_FILE},
		fsutil::{delete_dir_with_wait, WORKING_DIR_DELETE_WAIT},
		paths::PathContext,
		transfer::{LocalTransfer, Transfer},
		validate::{validate_config, validate_roots},
	},
	models::{
		config::TransactionConfig,
		retention::Retention,
		state::{DatedBucket, InstanceToken, Outcome, TransactionState},
	},
};

/// Custody of one file as it passes Pending → Working → (Completed | Error).
///
/// Create one per file, call [`begin`](Self::begin), process the working file,
/// then call [`end`](Self::end). An instance is not reusable after `end`.
///
/// Nothing is rolled back when a step fails part way: an empty working
/// folder or a temp-named Pending file may be left for an operator.
#[derive(Debug)]
pub struct Transaction<T: Transfer = LocalTransfer> {
	config: TransactionConfig,
	token: InstanceToken,
	bucket: DatedBucket,
	state: TransactionState,
	filename: Option<String>,
	transfer: T,
}

impl Transaction<LocalTransfer> {
	/// New transaction on the local filesystem, dated today.
	pub fn new(config: TransactionConfig) -> Result<Self, TransactionError> {
		Self::with_parts(config, InstanceToken::new(), DatedBucket::today(), LocalTransfer)
	}
}

impl<T: Transfer> Transaction<T> {
	pub fn with_parts(
		config: TransactionConfig,
		token: InstanceToken,
		bucket: DatedBucket,
		transfer: T,
	) -> Result<Self, TransactionError> {
		if let Err(e) = validate_config(&config) {
			error!(op = "new", token = %token, error = %e, "invalid transaction config");
			return Err(e);
		}
		Ok(Self {
			config,
			token,
			bucket,
			state: TransactionState::Pending,
			filename: None,
			transfer,
		})
	}

	pub fn token(&self) -> InstanceToken {
		self.token
	}

	pub fn state(&self) -> TransactionState {
		self.state
	}

	pub fn filename(&self) -> Option<&str> {
		self.filename.as_deref()
	}

	/// Last-seen extension, used by flat-mode cleanup.
	pub fn extension(&self) -> Option<&str> {
		self.paths().map(|ctx| ctx.extension())
	}

	/// Path derivation for the current file; `None` before a valid `begin`.
	pub fn paths(&self) -> Option<PathContext<'_>> {
		let filename = self.filename.as_deref()?;
		PathContext::new(&self.config, filename, self.token, self.bucket).ok()
	}

	pub fn working_file(&self) -> Option<PathBuf> {
		self.paths().map(|ctx| ctx.working_file())
	}

	/// Claim `source_path` (a file directly under Pending) and bring it into Working.
	pub fn begin(&mut self, source_path: impl AsRef<Path>) -> Result<(), TransactionError> {
		let result = self.try_begin(source_path.as_ref());
		if let Err(e) = &result {
			self.report("begin", e);
		}
		result
	}

	/// Archive the working file under Completed or Error and tear down Working.
	///
	/// The state only turns terminal once every step, including the copy+rename
	/// rename back, has succeeded. A failure leaves it at `Working` even when the
	/// archive copy was written and the working folder is gone.
	pub fn end(&mut self, completed: bool) -> Result<(), TransactionError> {
		let result = self.try_end(Outcome::from_completed(completed));
		if let Err(e) = &result {
			self.report("end", e);
		}
		result
	}

	/// Retire archive entries older than the retention window, as of now.
	pub fn cleanup(&self, retention: Retention) -> Result<CleanupReport, TransactionError> {
		self.cleanup_at(retention, chrono::Local::now().naive_local())
	}

	pub fn cleanup_at(
		&self,
		retention: Retention,
		now: chrono::NaiveDateTime,
	) -> Result<CleanupReport, TransactionError> {
		Cleanup::new(self.config.clone(), self.extension().map(str::to_string)).run_at(retention, now)
	}

	fn report(&self, op: &'static str, err: &TransactionError) {
		let filename = self.filename.as_deref().unwrap_or("");
		if err.is_contention() {
			warn!(
				op,
				filename,
				token = %self.token,
				state = %self.state,
				error = %err,
				"transaction step lost to another process"
			);
		} else {
			error!(
				op,
				filename,
				token = %self.token,
				state = %self.state,
				kind = ?err.kind(),
				error = %err,
				"transaction step failed"
			);
		}
	}

	fn try_begin(&mut self, source_path: &Path) -> Result<(), TransactionError> {
		if self.filename.is_some() || self.state != TransactionState::Pending {
			return Err(TransactionError::InvalidConfig(format!(
				"begin already called on this transaction (state {})",
				self.state
			)));
		}

		let filename = source_path
			.file_name()
			.and_then(|n| n.to_str())
			.ok_or_else(|| {
				TransactionError::InvalidConfig(format!("no usable filename in {}", source_path.display()))
			})?
			.to_string();
		self.filename = Some(filename);
		self.state = TransactionState::Pending;

		validate_roots(&self.config)?;
		let ctx = context(&self.config, self.filename.as_deref(), self.token, self.bucket)?;

		let pending_file = ctx.pending_file();
		if self.config.rename && !self.transfer.exists(&pending_file) {
			// Most likely renamed to a racer's temp name a moment ago.
			return Err(TransactionError::ClaimLost(pending_file));
		}
		self.ensure(PENDING_FILE, &pending_file)?;

		let working_dir = ctx.working_dir();
		if self.transfer.exists(&working_dir) {
			return Err(TransactionError::WorkingDirExists(working_dir));
		}
		// Non-recursive create: this call, not the check above, decides who owns the id.
		fs::create_dir(&working_dir).map_err(|e| match e.kind() {
			io::ErrorKind::AlreadyExists => TransactionError::WorkingDirExists(working_dir.clone()),
			_ => TransactionError::io(&working_dir, e),
		})?;
		self.ensure("WorkingDir", &working_dir)?;

		let working_file = ctx.working_file();
		if self.config.rename {
			let pending_temp = ctx.pending_file_temp();
			self.transfer.rename(&pending_file, &pending_temp).map_err(|e| claim_error(e, &pending_file))?;
			self.ensure("PendingFileTemp after rename", &pending_temp)?;

			let working_temp = ctx.working_file_temp();
			self.carry(&pending_temp, &working_temp)?;
			self.ensure("WorkingFileTemp after copy or move", &working_temp)?;

			// Copy mode leaves the temp-named original in Pending until end.
			self.transfer.rename(&working_temp, &working_file)?;
			self.ensure("WorkingFile after rename", &working_file)?;
		} else {
			self.carry(&pending_file, &working_file)?;
			self.ensure("WorkingFile", &working_file)?;
		}

		self.state = TransactionState::Working;
		info!(
			filename = ctx.filename(),
			token = %self.token,
			working_file = %working_file.display(),
			"transaction begun"
		);
		Ok(())
	}

	fn try_end(&mut self, outcome: Outcome) -> Result<(), TransactionError> {
		if self.state != TransactionState::Working {
			return Err(TransactionError::InvalidConfig(format!(
				"end requires a working transaction (state {})",
				self.state
			)));
		}

		validate_roots(&self.config)?;
		let ctx = context(&self.config, self.filename.as_deref(), self.token, self.bucket)?;

		let working_file = ctx.working_file();
		self.ensure("WorkingFile", &working_file)?;

		if let Some(bucket_dir) = ctx.archive_dir(outcome) {
			if !self.transfer.exists(&bucket_dir) {
				debug!(path = %bucket_dir.display(), "creating dated folder");
				fs::create_dir_all(&bucket_dir).map_err(|e| TransactionError::io(&bucket_dir, e))?;
			}
		}

		let archive_file = ctx.archive_file(outcome);
		let copied = self.transfer.copy_file(&working_file, &archive_file, true)?;
		self.ensure(archive_label(outcome), &archive_file)?;
		debug!(
			path = %archive_file.display(),
			bytes = copied.bytes_copied,
			hash = %copied.dest_hash,
			"archived"
		);

		if outcome == Outcome::Error && self.config.restore_on_error {
			// Only a move removed the original. A copied original is still in
			// Pending, possibly under its temp name, which is handled below.
			if self.config.move_pending {
				let pending_file = ctx.pending_file();
				self.transfer.copy_file(&working_file, &pending_file, false)?;
				self.ensure("PendingFile after restore", &pending_file)?;
			}
		}

		delete_dir_with_wait(&ctx.working_dir(), WORKING_DIR_DELETE_WAIT)?;

		if self.config.rename && !self.config.move_pending {
			let pending_temp = ctx.pending_file_temp();
			let pending_file = ctx.pending_file();
			self.ensure("PendingFileTemp before rename back", &pending_temp)?;
			self.transfer.rename(&pending_temp, &pending_file)?;
			self.ensure("PendingFile after rename back", &pending_file)?;
		}
		self.state = outcome.state();

		info!(
			filename = ctx.filename(),
			token = %self.token,
			state = %self.state,
			archive = %archive_file.display(),
			"transaction ended"
		);
		Ok(())
	}

	/// The Pending → Working hop, by move or copy per config.
	fn carry(&self, from: &Path, to: &Path) -> Result<(), TransactionError> {
		if self.config.move_pending {
			self.transfer.move_file(from, to)
		} else {
			let copied = self.transfer.copy_file(from, to, false)?;
			debug!(bytes = copied.bytes_copied, hash = %copied.source_hash, "copied into working");
			Ok(())
		}
	}

	fn ensure(&self, what: &'static str, path: &Path) -> Result<(), TransactionError> {
		if self.transfer.exists(path) {
			Ok(())
		} else {
			Err(TransactionError::missing(what, path))
		}
	}
}

fn context<'a>(
	config: &'a TransactionConfig,
	filename: Option<&'a str>,
	token: InstanceToken,
	bucket: DatedBucket,
) -> Result<PathContext<'a>, TransactionError> {
	let filename =
		filename.ok_or_else(|| TransactionError::InvalidConfig("transaction filename is not set".into()))?;
	PathContext::new(config, filename, token, bucket)
}

/// A claim rename whose source vanished means another process won it.
fn claim_error(err: TransactionError, pending_file: &Path) -> TransactionError {
	match err {
		TransactionError::Io { ref source, .. } if source.kind() == io::ErrorKind::NotFound => {
			TransactionError::ClaimLost(pending_file.to_path_buf())
		}
		other => other,
	}
}

fn archive_label(outcome: Outcome) -> &'static str {
	match outcome {
		Outcome::Completed => "CompletedFile",
		Outcome::Error => "ErrorFile",
	}
}
