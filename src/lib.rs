pub mod builder;
pub mod commands;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;

pub use error::{Result, StageError};
