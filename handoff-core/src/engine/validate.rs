use crate::{
	engine::{error::TransactionError, paths::split_filename},
	models::config::TransactionConfig,
};

/// Construction-time check: every root must at least be named.
pub fn validate_config(config: &TransactionConfig) -> Result<(), TransactionError> {
	for (label, root) in config.roots() {
		if root.as_os_str().is_empty() {
			return Err(TransactionError::InvalidConfig(format!("{label} path is empty")));
		}
	}
	Ok(())
}

/// Every root must be named and exist as a directory.
pub fn validate_roots(config: &TransactionConfig) -> Result<(), TransactionError> {
	validate_config(config)?;
	for (label, root) in config.roots() {
		if !root.is_dir() {
			return Err(TransactionError::InvalidConfig(format!(
				"{label} path does not exist: {}",
				root.display()
			)));
		}
	}
	Ok(())
}

pub fn validate_filename(filename: &str) -> Result<(), TransactionError> {
	if filename.is_empty() {
		return Err(TransactionError::InvalidConfig("transaction filename is empty".into()));
	}
	let (id, extension) = split_filename(filename);
	if id.is_empty() {
		return Err(TransactionError::InvalidConfig(format!("id is invalid for filename: {filename}")));
	}
	if extension.is_empty() {
		return Err(TransactionError::InvalidConfig(format!(
			"extension is invalid for filename: {filename}"
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use std::fs;

	use super::*;

	fn roots(base: &std::path::Path) -> TransactionConfig {
		let cfg = TransactionConfig::new(
			base.join("pending"),
			base.join("working"),
			base.join("completed"),
			base.join("error"),
		);
		for (_, root) in cfg.roots() {
			fs::create_dir_all(root).unwrap();
		}
		cfg
	}

	#[test]
	fn existing_roots_pass() {
		let tmp = tempfile::tempdir().unwrap();
		let cfg = roots(tmp.path());
		validate_roots(&cfg).unwrap();
	}

	#[test]
	fn empty_root_is_rejected_before_touching_disk() {
		let mut cfg = TransactionConfig::new("/p", "/w", "/c", "/e");
		cfg.completed = "".into();
		let err = validate_config(&cfg).unwrap_err();
		assert!(err.to_string().contains("completed path is empty"));
	}

	#[test]
	fn missing_root_is_rejected() {
		let tmp = tempfile::tempdir().unwrap();
		let cfg = roots(tmp.path());
		fs::remove_dir(&cfg.error).unwrap();

		let err = validate_roots(&cfg).unwrap_err();
		assert!(err.to_string().contains("error path does not exist"));
	}

	#[test]
	fn root_that_is_a_file_is_rejected() {
		let tmp = tempfile::tempdir().unwrap();
		let cfg = roots(tmp.path());
		fs::remove_dir(&cfg.working).unwrap();
		fs::write(&cfg.working, "x").unwrap();

		assert!(validate_roots(&cfg).is_err());
	}

	#[test]
	fn filename_needs_id_and_extension() {
		validate_filename("a.txt").unwrap();
		assert!(validate_filename("").is_err());
		assert!(validate_filename("noext").is_err());
		assert!(validate_filename(".hidden").is_err());
	}
}
