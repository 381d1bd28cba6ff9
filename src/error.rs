use std::path::PathBuf;
use thiserror::Error;

/// Main error type for modelstage
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Model hub error: {0}\n\nTroubleshooting:\n- Check internet connection\n- Ensure sufficient disk space in ~/.cache/huggingface/\n- Set HF_TOKEN if the repository requires authentication")]
    Hub(String),

    #[error("Framework error: {0}")]
    Framework(#[from] candle_core::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Network error: {0}\n\nTroubleshooting:\n- Check internet connection\n- Verify the manifest URL in config\n- Try increasing fetcher.timeout_secs in config")]
    Network(#[from] reqwest::Error),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Config error: {0}\n\nTroubleshooting:\n- Check config file: ~/.config/modelstage/config.toml\n- Run with RUST_LOG=debug for more details")]
    Config(String),

    #[error("Refusing to write outside the target directory: {}", .0.display())]
    UnsafePath(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for StageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Manifest(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StageError>;
