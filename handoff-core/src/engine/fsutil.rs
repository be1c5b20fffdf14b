use std::{
	fs, io,
	path::Path,
	thread,
	time::{Duration, Instant},
};

use tracing::{debug, warn};

use crate::engine::error::TransactionError;

/// Window End allows for tearing down a working folder.
pub const WORKING_DIR_DELETE_WAIT: Duration = Duration::from_millis(1000);

const RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// Remove `path` recursively, retrying while something else (an indexer,
/// a virus scanner) briefly holds a handle inside it.
/// A folder that is already gone counts as deleted.
pub fn delete_dir_with_wait(path: &Path, max_wait: Duration) -> Result<(), TransactionError> {
	let deadline = Instant::now() + max_wait;
	let mut attempts = 0u32;

	loop {
		attempts += 1;
		match fs::remove_dir_all(path) {
			Ok(()) => {
				debug!(path = %path.display(), attempts, "folder deleted");
				return Ok(());
			}
			Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
			Err(e) => {
				if Instant::now() >= deadline {
					warn!(path = %path.display(), attempts, error = %e, "giving up deleting folder");
					return Err(TransactionError::io(path, e));
				}
				debug!(path = %path.display(), attempts, error = %e, "folder delete failed, retrying");
				thread::sleep(RETRY_INTERVAL);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn deletes_nested_folder() {
		let tmp = tempfile::tempdir().unwrap();
		let dir = tmp.path().join("order");
		fs::create_dir_all(dir.join("deep")).unwrap();
		fs::write(dir.join("deep/x.txt"), "x").unwrap();

		delete_dir_with_wait(&dir, WORKING_DIR_DELETE_WAIT).unwrap();
		assert!(!dir.exists());
	}

	#[test]
	fn missing_folder_is_success() {
		let tmp = tempfile::tempdir().unwrap();
		delete_dir_with_wait(&tmp.path().join("nope"), Duration::ZERO).unwrap();
	}

	#[test]
	fn gives_up_after_window() {
		let tmp = tempfile::tempdir().unwrap();
		// A regular file makes remove_dir_all fail every time.
		let file = tmp.path().join("not_a_dir.txt");
		fs::write(&file, "x").unwrap();

		let started = Instant::now();
		let err = delete_dir_with_wait(&file, Duration::from_millis(120)).unwrap_err();

		assert!(started.elapsed() >= Duration::from_millis(120));
		assert!(matches!(err, TransactionError::Io { .. }));
		assert!(file.exists());
	}
}
