use std::time::Duration;

/// How long each archive keeps its entries. `None` keeps them forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Retention {
	pub completed: Option<Duration>,
	pub error: Option<Duration>,
}

impl Retention {
	pub fn new(completed: Option<Duration>, error: Option<Duration>) -> Self {
		Self { completed, error }
	}

	/// Retain everything on both sides.
	pub fn indefinite() -> Self {
		Self::default()
	}

	pub fn is_indefinite(&self) -> bool {
		self.completed.is_none() && self.error.is_none()
	}
}
