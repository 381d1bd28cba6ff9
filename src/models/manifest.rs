//! The TensorFlow.js layers-model document (`model.json`).
//!
//! Only the fields this crate reads or writes are typed; everything else
//! round-trips through `extra` untouched.

use crate::error::{Result, StageError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name of the manifest inside a staging directory
pub const MANIFEST_FILE: &str = "model.json";

/// Parsed `model.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converted_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_topology: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights_manifest: Option<Vec<WeightGroup>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_defined_metadata: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One group of weights stored across one or more shard files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightGroup {
    pub paths: Vec<String>,
    #[serde(default)]
    pub weights: Vec<WeightSpec>,
}

/// Name, shape and dtype of one tensor inside a group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeightSpec {
    pub name: String,
    pub shape: Vec<usize>,
    pub dtype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization: Option<serde_json::Value>,
}

impl WeightSpec {
    /// Number of scalar elements
    #[must_use]
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }
}

impl ModelJson {
    /// Parse manifest bytes
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| StageError::Manifest(format!("Failed to parse {MANIFEST_FILE}: {e}")))
    }

    /// Load manifest from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read(path)?;
        Self::parse(&content)
    }

    /// Save manifest to file atomically (tmp + rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = path.with_extension("tmp");
        let content = serde_json::to_string(self)?;

        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, path)?;

        Ok(())
    }

    /// All shard paths listed in the weights manifest, in order.
    ///
    /// A manifest without `weightsManifest` lists no files.
    #[must_use]
    pub fn weight_paths(&self) -> Vec<&str> {
        self.weights_manifest
            .iter()
            .flatten()
            .flat_map(|group| group.paths.iter().map(String::as_str))
            .collect()
    }

    /// Total number of scalar elements across all groups
    #[must_use]
    pub fn total_elements(&self) -> usize {
        self.weights_manifest
            .iter()
            .flatten()
            .flat_map(|group| group.weights.iter())
            .map(WeightSpec::element_count)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HOSTED: &str = r#"{
        "modelTopology": {"class_name": "Model", "config": {}},
        "weightsManifest": [
            {"paths": ["group1-shard1of1"], "weights": [
                {"name": "conv1/kernel", "shape": [3, 3, 3, 8], "dtype": "float32"}
            ]},
            {"paths": ["group2-shard1of2", "group2-shard2of2"], "weights": [
                {"name": "conv2/kernel", "shape": [1, 1, 8, 16], "dtype": "float32"},
                {"name": "conv2/bias", "shape": [16], "dtype": "float32"}
            ]}
        ]
    }"#;

    #[test]
    fn test_weight_paths_in_order() {
        let manifest = ModelJson::parse(HOSTED.as_bytes()).unwrap();
        assert_eq!(
            manifest.weight_paths(),
            vec!["group1-shard1of1", "group2-shard1of2", "group2-shard2of2"]
        );
        assert_eq!(manifest.total_elements(), 216 + 128 + 16);
    }

    #[test]
    fn test_missing_weights_manifest_lists_nothing() {
        let manifest = ModelJson::parse(br#"{"format": "graph-model"}"#).unwrap();
        assert!(manifest.weights_manifest.is_none());
        assert!(manifest.weight_paths().is_empty());
        assert_eq!(manifest.format.as_deref(), Some("graph-model"));
    }

    #[test]
    fn test_malformed_manifest() {
        let err = ModelJson::parse(b"<html>not found</html>").unwrap_err();
        assert!(matches!(err, StageError::Manifest(_)));

        let err = ModelJson::parse(br#"{"weightsManifest": [{"weights": []}]}"#).unwrap_err();
        assert!(err.to_string().contains("paths"));
    }

    #[test]
    fn test_unknown_fields_survive_save() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(MANIFEST_FILE);

        let manifest =
            ModelJson::parse(br#"{"format": "layers-model", "signature": {"inputs": {}}}"#)
                .unwrap();
        manifest.save(&path).unwrap();

        let loaded = ModelJson::load(&path).unwrap();
        assert_eq!(loaded, manifest);
        assert!(loaded.extra.contains_key("signature"));
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_camel_case_keys_on_disk() {
        let manifest = ModelJson {
            format: Some("layers-model".to_string()),
            generated_by: Some("candle".to_string()),
            converted_by: None,
            model_topology: None,
            weights_manifest: Some(vec![WeightGroup {
                paths: vec!["group1-shard1of1.bin".to_string()],
                weights: Vec::new(),
            }]),
            user_defined_metadata: None,
            extra: serde_json::Map::new(),
        };

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["generatedBy"], "candle");
        assert!(json.get("convertedBy").is_none());
        assert_eq!(json["weightsManifest"][0]["paths"][0], "group1-shard1of1.bin");
    }
}
