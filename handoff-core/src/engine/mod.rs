pub mod cleanup;
pub mod error;
pub mod fsutil;
pub mod paths;
pub mod transaction;
pub mod transfer;
pub mod validate;
