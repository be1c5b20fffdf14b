pub mod config;
pub mod retention;
pub mod state;
