//! Configuration module for modelstage
//!
//! Loads config from `$XDG_CONFIG_HOME/modelstage/config.toml` or the platform config dir.
//! Falls back to built-in defaults if the file doesn't exist.
//! Partial configs are merged with defaults using serde's default attributes.
//!
//! # Example
//!
//! ```no_run
//! use modelstage::config::Config;
//!
//! let config = Config::load().expect("Failed to load config");
//! println!("Output directory: {}", config.output.dir.display());
//! println!("Manifest URL: {}", config.fetcher.manifest_url);
//! ```

pub mod load;
pub mod schema;

pub use load::config_path;
pub use schema::Config;
