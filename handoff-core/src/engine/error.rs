use std::{io, path::PathBuf};

use thiserror::Error;

pub(crate) const PENDING_FILE: &str = "PendingFile";

#[derive(Debug, Error)]
pub enum TransactionError {
	#[error("invalid configuration: {0}")]
	InvalidConfig(String),

	#[error("{what} does not exist: {}", path.display())]
	Postcondition { what: &'static str, path: PathBuf },

	#[error("claim lost, pending file was taken by another process: {}", .0.display())]
	ClaimLost(PathBuf),

	#[error("working folder already exists: {}", .0.display())]
	WorkingDirExists(PathBuf),

	#[error("unable to parse folder '{name}' in path '{}' with format 'yyyy-MM-dd'", path.display())]
	UnparsableBucket { name: String, path: PathBuf },

	#[error("hash mismatch: source={source_hash}, dest={dest_hash}")]
	HashMismatch {
		source_hash: String,
		dest_hash: String,
	},

	#[error("I/O error on {}: {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("filesystem walk error: {0}")]
	WalkError(#[from] walkdir::Error),
}

/// Coarse classification callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	InvalidConfiguration,
	PostconditionViolation,
	UnparsableName,
	ClaimLost,
	DuplicateClaim,
	Io,
}

impl TransactionError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			TransactionError::InvalidConfig(_) => ErrorKind::InvalidConfiguration,
			TransactionError::Postcondition { .. } | TransactionError::HashMismatch { .. } => {
				ErrorKind::PostconditionViolation
			}
			TransactionError::ClaimLost(_) => ErrorKind::ClaimLost,
			TransactionError::WorkingDirExists(_) => ErrorKind::DuplicateClaim,
			TransactionError::UnparsableBucket { .. } => ErrorKind::UnparsableName,
			TransactionError::Io { .. } | TransactionError::WalkError(_) => ErrorKind::Io,
		}
	}

	/// Another process got there first; the file is not ours to handle.
	pub fn is_contention(&self) -> bool {
		matches!(self.kind(), ErrorKind::ClaimLost | ErrorKind::DuplicateClaim)
	}

	/// The Pending file was already gone when `begin` looked for it, so nothing was touched.
	pub fn is_missing_pending(&self) -> bool {
		matches!(self, TransactionError::Postcondition { what: PENDING_FILE, .. })
	}

	pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
		TransactionError::Io { path: path.into(), source }
	}

	pub(crate) fn missing(what: &'static str, path: impl Into<PathBuf>) -> Self {
		TransactionError::Postcondition { what, path: path.into() }
	}
}
