use std::{
	fs,
	io::{self, Read, Write},
	path::Path,
};

use tracing::debug;

use crate::engine::error::TransactionError;

const CHUNK_SIZE: usize = 256 * 1024; // 256KB

#[derive(Debug, Clone)]
pub struct CopyResult {
	pub bytes_copied: u64,
	pub source_hash: String,
	pub dest_hash: String,
}

/// File operations a transaction needs from the storage it runs against.
///
/// The local filesystem is the only implementation; the seam is here so the
/// Pending → Working hop can later run against remote storage.
pub trait Transfer {
	/// Atomic rename. Fails if `to` already exists.
	fn rename(&self, from: &Path, to: &Path) -> Result<(), TransactionError>;

	/// Relocate `from` to `to`, removing the source. Fails if `to` already exists.
	fn move_file(&self, from: &Path, to: &Path) -> Result<(), TransactionError>;

	/// Copy `from` to `to` and verify the bytes landed intact.
	fn copy_file(&self, from: &Path, to: &Path, overwrite: bool) -> Result<CopyResult, TransactionError>;

	fn exists(&self, path: &Path) -> bool;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTransfer;

impl Transfer for LocalTransfer {
	fn rename(&self, from: &Path, to: &Path) -> Result<(), TransactionError> {
		refuse_existing(to)?;
		debug!(from = %from.display(), to = %to.display(), "rename");
		fs::rename(from, to).map_err(|e| TransactionError::io(from, e))
	}

	fn move_file(&self, from: &Path, to: &Path) -> Result<(), TransactionError> {
		refuse_existing(to)?;
		debug!(from = %from.display(), to = %to.display(), "move");
		match fs::rename(from, to) {
			Ok(()) => Ok(()),
			Err(e) if e.kind() == io::ErrorKind::NotFound => Err(TransactionError::io(from, e)),
			// Most likely a cross-device move.
			Err(e) => {
				debug!(error = %e, "rename failed, falling back to copy + remove");
				copy_and_hash(from, to, false)?;
				fs::remove_file(from).map_err(|e| TransactionError::io(from, e))
			}
		}
	}

	fn copy_file(&self, from: &Path, to: &Path, overwrite: bool) -> Result<CopyResult, TransactionError> {
		debug!(from = %from.display(), to = %to.display(), overwrite, "copy");
		copy_and_hash(from, to, overwrite)
	}

	fn exists(&self, path: &Path) -> bool {
		path.exists()
	}
}

fn refuse_existing(to: &Path) -> Result<(), TransactionError> {
	if to.exists() {
		return Err(TransactionError::io(
			to,
			io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"),
		));
	}
	Ok(())
}

/// Single pass: read → hash → write, then re-read the destination and compare.
fn copy_and_hash(source_path: &Path, dest_path: &Path, overwrite: bool) -> Result<CopyResult, TransactionError> {
	let mut source = fs::File::open(source_path).map_err(|e| TransactionError::io(source_path, e))?;

	let mut dest = if overwrite {
		fs::File::create(dest_path)
	} else {
		fs::OpenOptions::new().write(true).create_new(true).open(dest_path)
	}
	.map_err(|e| TransactionError::io(dest_path, e))?;

	let mut hasher = blake3::Hasher::new();
	let mut buf = vec![0u8; CHUNK_SIZE];
	let mut bytes_copied: u64 = 0;

	loop {
		let n = source.read(&mut buf).map_err(|e| TransactionError::io(source_path, e))?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
		dest.write_all(&buf[..n]).map_err(|e| TransactionError::io(dest_path, e))?;
		bytes_copied += n as u64;
	}

	dest.flush().map_err(|e| TransactionError::io(dest_path, e))?;
	drop(dest);

	let source_hash = hasher.finalize().to_hex().to_string();
	let dest_hash = hash_file(dest_path)?;

	if source_hash != dest_hash {
		return Err(TransactionError::HashMismatch { source_hash, dest_hash });
	}

	Ok(CopyResult { bytes_copied, source_hash, dest_hash })
}

/// Hash a file using blake3 in 256KB chunks.
fn hash_file(path: &Path) -> Result<String, TransactionError> {
	let mut file = fs::File::open(path).map_err(|e| TransactionError::io(path, e))?;
	let mut hasher = blake3::Hasher::new();
	let mut buf = vec![0u8; CHUNK_SIZE];

	loop {
		let n = file.read(&mut buf).map_err(|e| TransactionError::io(path, e))?;
		if n == 0 {
			break;
		}
		hasher.update(&buf[..n]);
	}

	Ok(hasher.finalize().to_hex().to_string())
}
