use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The four staging roots and the policy flags for one kind of transaction.
/// Immutable once handed to a `Transaction`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionConfig {
	pub pending: PathBuf,
	pub working: PathBuf,
	pub completed: PathBuf,
	pub error: PathBuf,
	/// Move the file out of Pending instead of copying it.
	#[serde(rename = "move", default)]
	pub move_pending: bool,
	/// Claim the Pending file by renaming it to a per-instance temp name first.
	/// Only one of several racing processes can win the rename.
	#[serde(default)]
	pub rename: bool,
	/// Put the file back into Pending after a failed outcome (move mode only).
	#[serde(default)]
	pub restore_on_error: bool,
	#[serde(default)]
	pub dated_completed: bool,
	#[serde(default)]
	pub dated_error: bool,
}

impl TransactionConfig {
	/// Config with the four roots set and every flag off.
	pub fn new(
		pending: impl Into<PathBuf>,
		working: impl Into<PathBuf>,
		completed: impl Into<PathBuf>,
		error: impl Into<PathBuf>,
	) -> Self {
		Self {
			pending: pending.into(),
			working: working.into(),
			completed: completed.into(),
			error: error.into(),
			move_pending: false,
			rename: false,
			restore_on_error: false,
			dated_completed: false,
			dated_error: false,
		}
	}

	pub fn with_move(mut self, move_pending: bool) -> Self {
		self.move_pending = move_pending;
		self
	}

	pub fn with_rename(mut self, rename: bool) -> Self {
		self.rename = rename;
		self
	}

	pub fn with_restore_on_error(mut self, restore_on_error: bool) -> Self {
		self.restore_on_error = restore_on_error;
		self
	}

	pub fn with_dated(mut self, dated_completed: bool, dated_error: bool) -> Self {
		self.dated_completed = dated_completed;
		self.dated_error = dated_error;
		self
	}

	/// The roots in validation order, labelled for error messages.
	pub fn roots(&self) -> [(&'static str, &PathBuf); 4] {
		[
			("pending", &self.pending),
			("working", &self.working),
			("completed", &self.completed),
			("error", &self.error),
		]
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flags_default_to_false_when_absent() {
		let cfg: TransactionConfig = serde_json::from_str(
			r#"{"pending":"/p","working":"/w","completed":"/c","error":"/e","move":true}"#,
		)
		.unwrap();
		assert!(cfg.move_pending);
		assert!(!cfg.rename);
		assert!(!cfg.restore_on_error);
		assert!(!cfg.dated_completed);
		assert!(!cfg.dated_error);
	}

	#[test]
	fn builder_sets_flags() {
		let cfg = TransactionConfig::new("/p", "/w", "/c", "/e")
			.with_move(true)
			.with_rename(true)
			.with_restore_on_error(true)
			.with_dated(true, false);
		assert!(cfg.move_pending && cfg.rename && cfg.restore_on_error);
		assert!(cfg.dated_completed);
		assert!(!cfg.dated_error);
		assert_eq!(cfg.roots()[1], ("working", &PathBuf::from("/w")));
	}
}
