use std::fmt;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Date format shared by bucket creation and cleanup parsing.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Where a transaction is in its lifecycle.
/// Advances Pending → Working → (Completed | Error) and never goes back.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
	#[default]
	Pending,
	Working,
	Error,
	Completed,
}

impl fmt::Display for TransactionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			TransactionState::Pending => "pending",
			TransactionState::Working => "working",
			TransactionState::Error => "error",
			TransactionState::Completed => "completed",
		};
		f.write_str(s)
	}
}

/// Which archive a finished transaction lands in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
	Completed,
	Error,
}

impl Outcome {
	pub fn from_completed(completed: bool) -> Self {
		if completed {
			Outcome::Completed
		} else {
			Outcome::Error
		}
	}

	pub fn state(self) -> TransactionState {
		match self {
			Outcome::Completed => TransactionState::Completed,
			Outcome::Error => TransactionState::Error,
		}
	}
}

/// Per-instance unique value. Only used to build the temp extension
/// that keeps concurrent claims on the same file from colliding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceToken(ulid::Ulid);

impl InstanceToken {
	pub fn new() -> Self {
		Self(ulid::Ulid::new())
	}
}

impl Default for InstanceToken {
	fn default() -> Self {
		Self::new()
	}
}

impl From<ulid::Ulid> for InstanceToken {
	fn from(value: ulid::Ulid) -> Self {
		Self(value)
	}
}

impl fmt::Display for InstanceToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Date-named archive subfolder, fixed when the transaction is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DatedBucket(NaiveDate);

impl DatedBucket {
	pub fn new(date: NaiveDate) -> Self {
		Self(date)
	}

	pub fn today() -> Self {
		Self(Local::now().date_naive())
	}

	pub fn date(&self) -> NaiveDate {
		self.0
	}

	pub fn name(&self) -> String {
		self.0.format(DATE_FORMAT).to_string()
	}

	/// Strict parse: the name must be exactly what `name()` would produce.
	pub fn parse(name: &str) -> Option<Self> {
		let date = NaiveDate::parse_from_str(name, DATE_FORMAT).ok()?;
		let bucket = Self(date);
		(bucket.name() == name).then_some(bucket)
	}

	/// Local midnight at the start of the bucket's day.
	pub fn start(&self) -> NaiveDateTime {
		self.0.and_time(NaiveTime::default())
	}
}

impl fmt::Display for DatedBucket {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.name())
	}
}
