//! Asset fetcher: download a hosted TensorFlow.js `model.json` and every
//! weight file it lists into the staging directory.

use crate::config::schema::FetcherConfig;
use crate::error::{Result, StageError};
use crate::models::download::{format_bytes, join_url, parent_url, AssetFetcher};
use crate::models::manifest::{ModelJson, MANIFEST_FILE};
use crate::models::staging::StagingDir;
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

/// Files written by one fetch
#[derive(Debug, Default)]
pub struct FetchReport {
    pub manifest: PathBuf,
    pub weight_files: Vec<PathBuf>,
    pub bytes_written: u64,
}

/// Where the manifest and weight files come from
#[derive(Debug, Clone)]
pub struct FetchSource {
    pub manifest_url: Url,
    pub base_url: Url,
}

impl FetchSource {
    /// Resolve URLs from config. Without `base_url`, weights are read from
    /// the manifest's directory.
    pub fn from_config(config: &FetcherConfig) -> Result<Self> {
        let manifest_url = Url::parse(&config.manifest_url).map_err(|e| {
            StageError::Config(format!("Invalid manifest URL '{}': {e}", config.manifest_url))
        })?;

        let base_url = match &config.base_url {
            Some(base) => Url::parse(base)
                .map_err(|e| StageError::Config(format!("Invalid base URL '{base}': {e}")))?,
            None => parent_url(&manifest_url)?,
        };

        Ok(Self {
            manifest_url,
            base_url,
        })
    }
}

/// Download the manifest, then each listed weight file, one at a time.
///
/// The staging directory must already exist. Nothing is cleaned up on
/// failure; files written before the error stay on disk.
pub async fn fetch_model(config: &FetcherConfig, staging: &StagingDir) -> Result<FetchReport> {
    let source = FetchSource::from_config(config)?;
    let fetcher = AssetFetcher::new(config.timeout_secs.map(Duration::from_secs))?;

    println!("\n⏬ Downloading model architecture...");
    let manifest_path = staging.path().join(MANIFEST_FILE);
    let mut bytes_written = fetcher.download(&source.manifest_url, &manifest_path).await?;
    println!("✓ {MANIFEST_FILE} downloaded");

    let manifest = ModelJson::load(&manifest_path)?;
    let mut weight_files = Vec::new();

    if manifest.weights_manifest.is_some() {
        println!("\n⏬ Downloading model weights...");
        for weight_file in manifest.weight_paths() {
            println!("  Downloading {weight_file}...");
            let url = join_url(&source.base_url, weight_file)?;
            let dest = staging.resolve(weight_file)?;

            let written = fetcher.download(&url, &dest).await?;
            bytes_written += written;
            println!("  ✓ {weight_file} ({})", format_bytes(written));

            weight_files.push(dest);
        }
    } else {
        tracing::warn!("{MANIFEST_FILE} has no weightsManifest; no weight files to fetch");
    }

    tracing::info!(
        "Fetched {} weight file(s), {} total",
        weight_files.len(),
        format_bytes(bytes_written)
    );

    Ok(FetchReport {
        manifest: manifest_path,
        weight_files,
        bytes_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_defaults_to_manifest_directory() {
        let source = FetchSource::from_config(&FetcherConfig::default()).unwrap();
        assert_eq!(
            source.base_url.as_str(),
            "https://storage.googleapis.com/tfjs-models/tfjs/mobilenet_v1_0.25_224/"
        );
        assert!(source.manifest_url.as_str().ends_with("/model.json"));
    }

    #[test]
    fn test_source_explicit_base_url() {
        let config = FetcherConfig {
            base_url: Some("https://cdn.example.com/weights/".to_string()),
            ..FetcherConfig::default()
        };
        let source = FetchSource::from_config(&config).unwrap();
        assert_eq!(source.base_url.as_str(), "https://cdn.example.com/weights/");
    }

    #[test]
    fn test_source_invalid_url() {
        let config = FetcherConfig {
            manifest_url: "::not-a-url".to_string(),
            ..FetcherConfig::default()
        };
        assert!(matches!(
            FetchSource::from_config(&config),
            Err(StageError::Config(_))
        ));
    }
}
