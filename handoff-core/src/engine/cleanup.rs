use std::{
	fs,
	path::{Path, PathBuf},
	time::Duration,
};

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta};
use tracing::{debug, error, info};
use walkdir::WalkDir;

use crate::{
	engine::{error::TransactionError, validate::validate_roots},
	models::{config::TransactionConfig, retention::Retention, state::DatedBucket},
};

/// Retires old entries from the Completed and Error archives.
///
/// Dated archives are retired a whole bucket at a time, by the date in the
/// bucket's name. Flat archives are retired file by file, by modification
/// time, and only files carrying `extension` are considered.
#[derive(Debug, Clone)]
pub struct Cleanup {
	config: TransactionConfig,
	extension: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
	pub removed: Vec<PathBuf>,
}

impl Cleanup {
	/// `extension` may be given with or without its leading dot.
	pub fn new(config: TransactionConfig, extension: Option<String>) -> Self {
		let extension = extension.filter(|e| !e.is_empty() && e != ".").map(|e| {
			if e.starts_with('.') {
				e
			} else {
				format!(".{e}")
			}
		});
		Self { config, extension }
	}

	pub fn run(&self, retention: Retention) -> Result<CleanupReport, TransactionError> {
		self.run_at(retention, Local::now().naive_local())
	}

	/// Like [`run`](Self::run), against an explicit local "now".
	pub fn run_at(&self, retention: Retention, now: NaiveDateTime) -> Result<CleanupReport, TransactionError> {
		let result = self.sweep_all(retention, now);
		if let Err(e) = &result {
			error!(op = "cleanup", kind = ?e.kind(), error = %e, "archive cleanup failed");
		}
		result
	}

	fn sweep_all(&self, retention: Retention, now: NaiveDateTime) -> Result<CleanupReport, TransactionError> {
		validate_roots(&self.config)?;

		let mut report = CleanupReport::default();
		if let Some(keep) = retention.completed {
			self.sweep("completed", &self.config.completed, self.config.dated_completed, keep, now, &mut report)?;
		}
		if let Some(keep) = retention.error {
			self.sweep("error", &self.config.error, self.config.dated_error, keep, now, &mut report)?;
		}

		info!(removed = report.removed.len(), "archive cleanup finished");
		Ok(report)
	}

	fn sweep(
		&self,
		side: &'static str,
		root: &Path,
		dated: bool,
		keep: Duration,
		now: NaiveDateTime,
		report: &mut CleanupReport,
	) -> Result<(), TransactionError> {
		debug!(side, root = %root.display(), dated, ?keep, "sweeping archive");
		if dated {
			sweep_buckets(root, keep, now, report)
		} else {
			let extension = self.extension.as_deref().ok_or_else(|| {
				TransactionError::InvalidConfig(format!(
					"extension was not set and the {side} archive is not dated"
				))
			})?;
			sweep_files(root, extension, keep, now, report)
		}
	}
}

fn immediate_children(root: &Path) -> WalkDir {
	WalkDir::new(root).min_depth(1).max_depth(1).follow_links(false).sort_by_file_name()
}

/// Any subfolder whose name is not a bucket date aborts the sweep.
fn sweep_buckets(
	root: &Path,
	keep: Duration,
	now: NaiveDateTime,
	report: &mut CleanupReport,
) -> Result<(), TransactionError> {
	for entry in immediate_children(root) {
		let entry = entry?;
		if !entry.file_type().is_dir() {
			continue;
		}

		let name = entry.file_name().to_string_lossy();
		let bucket = DatedBucket::parse(&name).ok_or_else(|| TransactionError::UnparsableBucket {
			name: name.to_string(),
			path: entry.path().to_path_buf(),
		})?;

		if expired(bucket.start(), keep, now) {
			fs::remove_dir_all(entry.path()).map_err(|e| TransactionError::io(entry.path(), e))?;
			debug!(path = %entry.path().display(), "removed dated folder");
			report.removed.push(entry.path().to_path_buf());
		}
	}
	Ok(())
}

fn sweep_files(
	root: &Path,
	extension: &str,
	keep: Duration,
	now: NaiveDateTime,
	report: &mut CleanupReport,
) -> Result<(), TransactionError> {
	for entry in immediate_children(root) {
		let entry = entry?;
		if !entry.file_type().is_file() || !entry.file_name().to_string_lossy().ends_with(extension) {
			continue;
		}

		let modified = entry
			.metadata()?
			.modified()
			.map_err(|e| TransactionError::io(entry.path(), e))?;
		let modified = DateTime::<Local>::from(modified).naive_local();

		if expired(modified, keep, now) {
			fs::remove_file(entry.path()).map_err(|e| TransactionError::io(entry.path(), e))?;
			debug!(path = %entry.path().display(), "removed archived file");
			report.removed.push(entry.path().to_path_buf());
		}
	}
	Ok(())
}

/// `now` is strictly past `stamp + keep`. A window too large to represent never expires.
fn expired(stamp: NaiveDateTime, keep: Duration, now: NaiveDateTime) -> bool {
	TimeDelta::from_std(keep)
		.ok()
		.and_then(|keep| stamp.checked_add_signed(keep))
		.is_some_and(|limit| now > limit)
}

#[cfg(test)]
mod tests {
	use std::time::SystemTime;

	use chrono::NaiveDate;

	use super::*;
	use crate::engine::error::ErrorKind;

	const DAY: Duration = Duration::from_secs(24 * 60 * 60);

	fn setup(base: &Path) -> TransactionConfig {
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

	fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
		NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, 0, 0).unwrap()
	}

	#[test]
	fn expiry_is_strict() {
		let stamp = at(2024, 1, 1, 0);
		assert!(!expired(stamp, DAY, at(2024, 1, 2, 0)));
		assert!(expired(stamp, DAY, at(2024, 1, 2, 1)));
		assert!(!expired(stamp, Duration::MAX, at(2999, 1, 1, 0)));
	}

	#[test]
	fn dated_sweep_removes_only_old_buckets() {
		let tmp = tempfile::tempdir().unwrap();
		let cfg = setup(tmp.path()).with_dated(true, true);
		for name in ["2024-01-01", "2024-01-08", "2024-01-09"] {
			fs::create_dir_all(cfg.completed.join(name)).unwrap();
			fs::write(cfg.completed.join(name).join("a.edi"), "x").unwrap();
		}

		let report = Cleanup::new(cfg.clone(), None)
			.run_at(Retention::new(Some(DAY), None), at(2024, 1, 9, 12))
			.unwrap();

		assert_eq!(report.removed, vec![cfg.completed.join("2024-01-01"), cfg.completed.join("2024-01-08")]);
		assert!(cfg.completed.join("2024-01-09").exists());
	}

	#[test]
	fn dated_sweep_ignores_loose_files() {
		let tmp = tempfile::tempdir().unwrap();
		let cfg = setup(tmp.path()).with_dated(true, true);
		fs::write(cfg.error.join("notes.txt"), "x").unwrap();

		let report = Cleanup::new(cfg.clone(), None)
			.run_at(Retention::new(None, Some(DAY)), at(2030, 1, 1, 0))
			.unwrap();

		assert!(report.removed.is_empty());
		assert!(cfg.error.join("notes.txt").exists());
	}

	#[test]
	fn unparsable_bucket_aborts_both_sides() {
		let tmp = tempfile::tempdir().unwrap();
		let cfg = setup(tmp.path()).with_dated(true, true);
		fs::create_dir_all(cfg.completed.join("2020-01-01")).unwrap();
		fs::create_dir_all(cfg.completed.join("manual-hold")).unwrap();
		fs::create_dir_all(cfg.completed.join("zz-later")).unwrap();
		fs::create_dir_all(cfg.error.join("2020-01-01")).unwrap();

		let err = Cleanup::new(cfg.clone(), None)
			.run_at(Retention::new(Some(DAY), Some(DAY)), at(2024, 1, 1, 0))
			.unwrap_err();

		assert_eq!(err.kind(), ErrorKind::UnparsableName);
		assert!(err.to_string().contains("manual-hold"));
		// Sorted order: buckets before the bad name are already gone, the rest is untouched.
		assert!(!cfg.completed.join("2020-01-01").exists());
		assert!(cfg.completed.join("zz-later").exists());
		assert!(cfg.error.join("2020-01-01").exists());
	}

	#[test]
	fn flat_sweep_uses_mtime_and_extension() {
		let tmp = tempfile::tempdir().unwrap();
		let cfg = setup(tmp.path());
		let old = cfg.completed.join("old.edi");
		let fresh = cfg.completed.join("fresh.edi");
		let other = cfg.completed.join("old.csv");
		for p in [&old, &fresh, &other] {
			fs::write(p, "x").unwrap();
		}
		let ten_days_ago = SystemTime::now() - 10 * DAY;
		for p in [&old, &other] {
			fs::File::options().write(true).open(p).unwrap().set_modified(ten_days_ago).unwrap();
		}

		let report = Cleanup::new(cfg.clone(), Some("edi".into()))
			.run(Retention::new(Some(7 * DAY), None))
			.unwrap();

		assert_eq!(report.removed, vec![old.clone()]);
		assert!(fresh.exists());
		assert!(other.exists());
	}

	#[test]
	fn flat_sweep_without_extension_is_config_error() {
		let tmp = tempfile::tempdir().unwrap();
		let cfg = setup(tmp.path());

		let err = Cleanup::new(cfg, None).run(Retention::new(None, Some(DAY))).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
	}

	#[test]
	fn indefinite_retention_touches_nothing() {
		let tmp = tempfile::tempdir().unwrap();
		let cfg = setup(tmp.path());
		fs::create_dir_all(cfg.completed.join("not-a-date")).unwrap();
		fs::write(cfg.error.join("a.edi"), "x").unwrap();

		// Neither the bad name nor the missing extension matters when nothing is swept.
		let report = Cleanup::new(cfg.with_dated(true, false), None)
			.run_at(Retention::indefinite(), at(2999, 1, 1, 0))
			.unwrap();
		assert!(report.removed.is_empty());
	}

	#[test]
	fn missing_root_fails_validation() {
		let tmp = tempfile::tempdir().unwrap();
		let cfg = setup(tmp.path());
		fs::remove_dir(&cfg.completed).unwrap();

		let err = Cleanup::new(cfg, Some(".edi".into())).run(Retention::indefinite()).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::InvalidConfiguration);
	}
}
