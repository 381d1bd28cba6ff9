//! TensorFlow.js layers-model writer.
//!
//! All tensors go into a single weight group. Their `float32` little-endian
//! bytes are concatenated in graph order and cut into fixed-size shards
//! named `group1-shard{i}of{n}.bin`.

use crate::error::{Result, StageError};
use crate::models::manifest::{ModelJson, WeightGroup, WeightSpec, MANIFEST_FILE};
use byteorder::{LittleEndian, WriteBytesExt};
use candle_core::{DType, Tensor};
use std::fs;
use std::path::{Path, PathBuf};

/// Serializable form of a built model
#[derive(Debug, Clone)]
pub struct ExportGraph {
    pub topology: serde_json::Value,
    pub weights: Vec<(String, Tensor)>,
    pub metadata: serde_json::Value,
}

/// Converter from an in-memory graph to on-disk web assets
pub trait Exporter: Send + Sync {
    /// Fail if the exporter cannot run with its current settings
    fn check(&self) -> Result<()>;

    /// Write the graph into `dir`, returning every file written
    fn export(&self, graph: &ExportGraph, dir: &Path) -> Result<Vec<PathBuf>>;

    /// Get exporter name for logging/debugging
    fn exporter_name(&self) -> &str;
}

/// Writes `model.json` plus sharded binary weights
#[derive(Debug, Clone)]
pub struct TfjsLayersExporter {
    shard_size: usize,
}

impl TfjsLayersExporter {
    #[must_use]
    pub const fn new(shard_size: usize) -> Self {
        Self { shard_size }
    }

    /// Flatten every tensor to `f32` LE bytes and describe it
    fn encode(graph: &ExportGraph) -> Result<(Vec<u8>, Vec<WeightSpec>)> {
        let mut buffer = Vec::new();
        let mut specs = Vec::with_capacity(graph.weights.len());

        for (name, tensor) in &graph.weights {
            let values = tensor.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;
            buffer.reserve(values.len() * 4);
            for value in values {
                buffer.write_f32::<LittleEndian>(value)?;
            }

            specs.push(WeightSpec {
                name: name.clone(),
                shape: tensor.dims().to_vec(),
                dtype: "float32".to_string(),
                quantization: None,
            });
        }

        Ok((buffer, specs))
    }
}

impl Default for TfjsLayersExporter {
    fn default() -> Self {
        Self::new(4 * 1024 * 1024)
    }
}

/// Shard file names for `count` shards of group 1
#[must_use]
pub fn shard_names(count: usize) -> Vec<String> {
    (1..=count)
        .map(|i| format!("group1-shard{i}of{count}.bin"))
        .collect()
}

impl Exporter for TfjsLayersExporter {
    fn check(&self) -> Result<()> {
        if self.shard_size == 0 {
            return Err(StageError::Export(
                "Shard size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    fn export(&self, graph: &ExportGraph, dir: &Path) -> Result<Vec<PathBuf>> {
        self.check()?;
        fs::create_dir_all(dir)?;

        let (buffer, specs) = Self::encode(graph)?;
        let chunks: Vec<&[u8]> = buffer.chunks(self.shard_size).collect();
        let names = shard_names(chunks.len());

        let mut written = Vec::with_capacity(chunks.len() + 1);
        for (name, chunk) in names.iter().zip(&chunks) {
            let path = dir.join(name);
            fs::write(&path, chunk)?;
            written.push(path);
        }

        tracing::info!(
            "Wrote {} weight tensors ({} bytes) across {} shard(s)",
            specs.len(),
            buffer.len(),
            chunks.len()
        );

        let mut metadata = graph.metadata.clone();
        if let Some(map) = metadata.as_object_mut() {
            map.insert(
                "exportedAt".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }

        let manifest = ModelJson {
            format: Some("layers-model".to_string()),
            generated_by: Some("candle".to_string()),
            converted_by: Some(format!(
                "{} {}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            )),
            model_topology: Some(graph.topology.clone()),
            weights_manifest: Some(vec![WeightGroup {
                paths: names,
                weights: specs,
            }]),
            user_defined_metadata: Some(metadata),
            extra: serde_json::Map::new(),
        };

        let manifest_path = dir.join(MANIFEST_FILE);
        manifest.save(&manifest_path)?;
        written.push(manifest_path);

        Ok(written)
    }

    fn exporter_name(&self) -> &str {
        "tfjs-layers"
    }
}
