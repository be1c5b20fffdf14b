use std::path::PathBuf;

use serde::Serialize;

use crate::{
	engine::error::TransactionError,
	models::{
		config::TransactionConfig,
		state::{DatedBucket, InstanceToken, Outcome},
	},
};

/// Split a bare filename into `(id, extension)` on the last dot.
/// The extension keeps its leading dot; either half may come back empty.
pub fn split_filename(filename: &str) -> (&str, &str) {
	match filename.rfind('.') {
		Some(i) if i + 1 < filename.len() => (&filename[..i], &filename[i..]),
		Some(i) => (&filename[..i], ""),
		None => (filename, ""),
	}
}

/// Everything that path derivation depends on, borrowed for the duration of a call.
/// Every path is recomputed on demand; nothing is cached.
#[derive(Debug, Clone, Copy)]
pub struct PathContext<'a> {
	config: &'a TransactionConfig,
	filename: &'a str,
	token: InstanceToken,
	bucket: DatedBucket,
}

/// Snapshot of every derived path, for display.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ResolvedPaths {
	pub id: String,
	pub extension: String,
	pub temp_filename: String,
	pub pending_file: PathBuf,
	pub pending_file_temp: PathBuf,
	pub working_dir: PathBuf,
	pub working_file: PathBuf,
	pub working_file_temp: PathBuf,
	pub completed_file: PathBuf,
	pub completed_dated_file: PathBuf,
	pub error_file: PathBuf,
	pub error_dated_file: PathBuf,
}

impl<'a> PathContext<'a> {
	/// Fails when the filename has no usable id or extension.
	pub fn new(
		config: &'a TransactionConfig,
		filename: &'a str,
		token: InstanceToken,
		bucket: DatedBucket,
	) -> Result<Self, TransactionError> {
		crate::engine::validate::validate_filename(filename)?;
		Ok(Self { config, filename, token, bucket })
	}

	pub fn filename(&self) -> &'a str {
		self.filename
	}

	pub fn id(&self) -> &'a str {
		split_filename(self.filename).0
	}

	pub fn extension(&self) -> &'a str {
		split_filename(self.filename).1
	}

	/// `.<token>`: never equal to a real extension, unique per instance.
	pub fn temp_extension(&self) -> String {
		format!(".{}", self.token)
	}

	pub fn temp_filename(&self) -> String {
		format!("{}{}", self.id(), self.temp_extension())
	}

	pub fn pending_file(&self) -> PathBuf {
		self.config.pending.join(self.filename)
	}

	pub fn pending_file_temp(&self) -> PathBuf {
		self.config.pending.join(self.temp_filename())
	}

	/// Per-transaction subfolder, named by the bare id.
	pub fn working_dir(&self) -> PathBuf {
		self.config.working.join(self.id())
	}

	pub fn working_file(&self) -> PathBuf {
		self.working_dir().join(self.filename)
	}

	pub fn working_file_temp(&self) -> PathBuf {
		self.working_dir().join(self.temp_filename())
	}

	pub fn completed_dated_path(&self) -> PathBuf {
		self.config.completed.join(self.bucket.name())
	}

	pub fn completed_file(&self) -> PathBuf {
		self.config.completed.join(self.filename)
	}

	pub fn completed_dated_file(&self) -> PathBuf {
		self.completed_dated_path().join(self.filename)
	}

	pub fn error_dated_path(&self) -> PathBuf {
		self.config.error.join(self.bucket.name())
	}

	pub fn error_file(&self) -> PathBuf {
		self.config.error.join(self.filename)
	}

	pub fn error_dated_file(&self) -> PathBuf {
		self.error_dated_path().join(self.filename)
	}

	/// Bucket folder to create before archiving, if the outcome uses dated mode.
	pub fn archive_dir(&self, outcome: Outcome) -> Option<PathBuf> {
		match outcome {
			Outcome::Completed if self.config.dated_completed => Some(self.completed_dated_path()),
			Outcome::Error if self.config.dated_error => Some(self.error_dated_path()),
			_ => None,
		}
	}

	pub fn archive_file(&self, outcome: Outcome) -> PathBuf {
		match outcome {
			Outcome::Completed if self.config.dated_completed => self.completed_dated_file(),
			Outcome::Completed => self.completed_file(),
			Outcome::Error if self.config.dated_error => self.error_dated_file(),
			Outcome::Error => self.error_file(),
		}
	}

	pub fn resolve(&self) -> ResolvedPaths {
		ResolvedPaths {
			id: self.id().to_string(),
			extension: self.extension().to_string(),
			temp_filename: self.temp_filename(),
			pending_file: self.pending_file(),
			pending_file_temp: self.pending_file_temp(),
			working_dir: self.working_dir(),
			working_file: self.working_file(),
			working_file_temp: self.working_file_temp(),
			completed_file: self.completed_file(),
			completed_dated_file: self.completed_dated_file(),
			error_file: self.error_file(),
			error_dated_file: self.error_dated_file(),
		}
	}
}
