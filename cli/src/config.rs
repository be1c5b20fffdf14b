use std::{
	fs,
	path::{Path, PathBuf},
	time::Duration,
};

use anyhow::Context;
use handoff_core::{Retention, TransactionConfig};
use serde::Deserialize;

/// Contents of `handoff.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
	pub folders: TransactionConfig,
	#[serde(default)]
	pub retention: RetentionSettings,
	#[serde(default)]
	pub log: LogSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetentionSettings {
	#[serde(default, with = "humantime_opt")]
	pub completed: Option<Duration>,
	#[serde(default, with = "humantime_opt")]
	pub error: Option<Duration>,
}

impl RetentionSettings {
	pub fn to_retention(&self) -> Retention {
		Retention::new(self.completed, self.error)
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSettings {
	/// Also write `handoff.log` here.
	pub dir: Option<PathBuf>,
	pub level: Option<String>,
}

/// `~/.config/handoff/handoff.toml` or the platform equivalent.
pub fn default_path() -> Option<PathBuf> {
	dirs::config_dir().map(|dir| dir.join("handoff").join("handoff.toml"))
}

pub fn load(path: Option<&Path>) -> anyhow::Result<Settings> {
	let path = match path {
		Some(p) => p.to_path_buf(),
		None => default_path().context("no config directory on this platform, pass --config")?,
	};
	let raw = fs::read_to_string(&path).with_context(|| format!("reading config {}", path.display()))?;
	parse(&raw).with_context(|| format!("parsing config {}", path.display()))
}

pub fn parse(raw: &str) -> anyhow::Result<Settings> {
	Ok(toml::from_str(raw)?)
}

mod humantime_opt {
	use std::time::Duration;

	use serde::{Deserialize, Deserializer};

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s: Option<String> = Option::deserialize(deserializer)?;
		s.map(|s| humantime::parse_duration(&s).map_err(serde::de::Error::custom)).transpose()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const FULL: &str = r#"
[folders]
pending = "/data/edi/pending"
working = "/data/edi/working"
completed = "/data/edi/completed"
error = "/data/edi/error"
move = true
rename = true
dated_completed = true

[retention]
completed = "30days"
error = "12h"

[log]
dir = "/var/log/handoff"
level = "debug"
"#;

	#[test]
	fn parses_full_config() {
		let settings = parse(FULL).unwrap();

		assert_eq!(settings.folders.pending, PathBuf::from("/data/edi/pending"));
		assert!(settings.folders.move_pending);
		assert!(settings.folders.rename);
		assert!(!settings.folders.restore_on_error);
		assert!(settings.folders.dated_completed);
		assert!(!settings.folders.dated_error);

		let retention = settings.retention.to_retention();
		assert_eq!(retention.completed, Some(Duration::from_secs(30 * 24 * 3600)));
		assert_eq!(retention.error, Some(Duration::from_secs(12 * 3600)));

		assert_eq!(settings.log.dir, Some(PathBuf::from("/var/log/handoff")));
		assert_eq!(settings.log.level.as_deref(), Some("debug"));
	}

	#[test]
	fn retention_and_log_are_optional() {
		let settings = parse(
			r#"
[folders]
pending = "p"
working = "w"
completed = "c"
error = "e"
"#,
		)
		.unwrap();

		assert!(settings.retention.to_retention().is_indefinite());
		assert!(settings.log.dir.is_none());
	}

	#[test]
	fn bad_duration_is_rejected() {
		let raw = FULL.replace("\"12h\"", "\"soon\"");
		assert!(parse(&raw).is_err());
	}

	#[test]
	fn missing_folder_is_rejected() {
		assert!(parse("[folders]\npending = \"p\"\n").is_err());
	}

	#[test]
	fn load_reads_file() {
		let tmp = tempfile::tempdir().unwrap();
		let path = tmp.path().join("handoff.toml");
		fs::write(&path, FULL).unwrap();

		let settings = load(Some(path.as_path())).unwrap();
		assert!(settings.folders.rename);

		let err = load(Some(tmp.path().join("missing.toml").as_path())).unwrap_err();
		assert!(err.to_string().contains("reading config"));
	}
}
