use crate::models::registry::BaseModelInfo;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub builder: BuilderConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct BuilderConfig {
    /// Registry name of the feature extractor
    #[serde(default = "default_base_model")]
    pub base_model: String,
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default = "default_input_size")]
    pub input_size: usize,
    #[serde(default = "default_hidden_units")]
    pub hidden_units: usize,
    #[serde(default = "default_dropout_rate")]
    pub dropout_rate: f32,
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,
    #[serde(default = "default_shard_size_bytes")]
    pub shard_size_bytes: usize,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct FetcherConfig {
    #[serde(default = "default_manifest_url")]
    pub manifest_url: String,
    /// Prefix for weight file URLs. Defaults to the manifest URL's directory.
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Exit with a failure code when the fetch fails
    #[serde(default)]
    pub strict_exit: bool,
}

// Default value functions
fn default_output_dir() -> PathBuf {
    PathBuf::from("public/models/skin-disease")
}
fn default_base_model() -> String {
    BaseModelInfo::recommended().name.to_string()
}
fn default_device() -> String {
    "cpu".to_string()
}
const fn default_input_size() -> usize {
    224
}
const fn default_hidden_units() -> usize {
    256
}
const fn default_dropout_rate() -> f32 {
    0.5
}
const fn default_num_classes() -> usize {
    10
}
const fn default_shard_size_bytes() -> usize {
    4 * 1024 * 1024
}
fn default_manifest_url() -> String {
    "https://storage.googleapis.com/tfjs-models/tfjs/mobilenet_v1_0.25_224/model.json".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            base_model: default_base_model(),
            device: default_device(),
            input_size: default_input_size(),
            hidden_units: default_hidden_units(),
            dropout_rate: default_dropout_rate(),
            num_classes: default_num_classes(),
            shard_size_bytes: default_shard_size_bytes(),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            manifest_url: default_manifest_url(),
            base_url: None,
            timeout_secs: None,
            strict_exit: false,
        }
    }
}
