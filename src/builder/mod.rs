//! Synthetic-model builder: a frozen pre-trained feature extractor with a
//! small classification head, exported as TensorFlow.js assets.

pub mod classifier;
pub mod export;
pub mod framework;

use crate::config::schema::{BuilderConfig, Config};
use crate::error::{Result, StageError};
use crate::models::hub::{HfHub, ModelHub};
use crate::models::registry::BaseModelInfo;
use crate::models::staging::StagingDir;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub use classifier::{Classifier, ClassifierHead, HeadConfig};
pub use export::{ExportGraph, Exporter, TfjsLayersExporter};
pub use framework::{CandleFramework, FeatureExtractor, Framework};

/// The three external capabilities the builder depends on
pub struct Toolchain {
    pub hub: Arc<dyn ModelHub>,
    pub framework: Arc<dyn Framework>,
    pub exporter: Arc<dyn Exporter>,
}

impl Toolchain {
    /// Hugging Face hub, Candle and the TF.js layers exporter
    #[must_use]
    pub fn from_config(config: &BuilderConfig) -> Self {
        Self {
            hub: Arc::new(HfHub::new()),
            framework: Arc::new(CandleFramework::new(config.device.clone())),
            exporter: Arc::new(TfjsLayersExporter::new(config.shard_size_bytes)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ModelHub,
    Framework,
    Converter,
}

impl Capability {
    /// What to do to make the capability available
    #[must_use]
    pub const fn install_hint(self) -> &'static str {
        match self {
            Self::ModelHub => {
                "Make sure HOME (or HF_HOME) points at a writable directory for the hub cache"
            }
            Self::Framework => {
                "Use builder.device = \"cpu\", or rebuild with candle's cuda/metal feature for GPU devices"
            }
            Self::Converter => "Set builder.shard_size_bytes to a positive value",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ModelHub => write!(f, "model hub client"),
            Self::Framework => write!(f, "numeric-model framework"),
            Self::Converter => write!(f, "TensorFlow.js converter"),
        }
    }
}

/// A capability whose check failed
#[derive(Debug)]
pub struct MissingCapability {
    pub capability: Capability,
    pub reason: String,
}

/// Check every capability, collecting all that are unavailable
#[must_use]
pub fn check_capabilities(toolchain: &Toolchain) -> Vec<MissingCapability> {
    let checks = [
        (Capability::ModelHub, toolchain.hub.check()),
        (Capability::Framework, toolchain.framework.check()),
        (Capability::Converter, toolchain.exporter.check()),
    ];

    checks
        .into_iter()
        .filter_map(|(capability, result)| {
            result.err().map(|e| {
                tracing::debug!("{capability} unavailable: {e}");
                MissingCapability {
                    capability,
                    reason: e.to_string(),
                }
            })
        })
        .collect()
}

/// Result of a successful build
#[derive(Debug)]
pub struct BuildReport {
    pub base: &'static BaseModelInfo,
    pub feature_dim: usize,
    pub trainable_params: usize,
    pub files: Vec<PathBuf>,
}

/// Fetch the base weights, assemble the classifier and export it
pub async fn build(config: &Config, toolchain: &Toolchain) -> Result<BuildReport> {
    let builder = &config.builder;
    let base = BaseModelInfo::find(&builder.base_model).ok_or_else(|| {
        StageError::Config(format!("Unknown base model '{}'", builder.base_model))
    })?;

    let staging = StagingDir::new(&config.output.dir);
    staging.ensure()?;

    tracing::info!(
        "Fetching {} from {} via {}",
        base.weights_file,
        base.hf_repo,
        toolchain.hub.hub_name()
    );
    let weights = toolchain
        .hub
        .fetch(base.hf_repo, base.hf_revision, base.weights_file)
        .await?;

    let head = HeadConfig {
        input_size: builder.input_size,
        hidden_units: builder.hidden_units,
        dropout_rate: builder.dropout_rate,
        num_classes: builder.num_classes,
    };
    let framework = Arc::clone(&toolchain.framework);
    let exporter = Arc::clone(&toolchain.exporter);
    let dir = staging.path().to_path_buf();

    // Candle work is CPU-bound; keep it off the async workers
    let (feature_dim, trainable_params, files) = tokio::task::spawn_blocking(move || -> Result<_> {
        let device = framework.device()?;
        let extractor = framework.load_extractor(base, &weights, &device)?;
        let classifier = Classifier::build(extractor, head, base.hf_repo, &device)?;

        tracing::info!(
            "Classifier assembled with {} via {}",
            exporter.exporter_name(),
            framework.framework_name()
        );

        let graph = classifier.export_graph()?;
        let files = exporter.export(&graph, &dir)?;
        Ok((
            classifier.feature_dim(),
            classifier.head().trainable_count(),
            files,
        ))
    })
    .await
    .map_err(|e| StageError::Other(format!("Build task panicked: {e}")))??;

    Ok(BuildReport {
        base,
        feature_dim,
        trainable_params,
        files,
    })
}
