pub mod engine;
pub mod models;

pub use engine::{
	cleanup::{Cleanup, CleanupReport},
	error::{ErrorKind, TransactionError},
	paths::PathContext,
	transaction::Transaction,
	transfer::{LocalTransfer, Transfer},
};
pub use models::{
	config::TransactionConfig,
	retention::Retention,
	state::{DatedBucket, InstanceToken, Outcome, TransactionState},
};
