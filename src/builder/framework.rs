use crate::error::{Result, StageError};
use crate::models::registry::BaseModelInfo;
use candle_core::{DType, Device, Module, Tensor};
use candle_nn::{Func, VarBuilder, VarMap};
use candle_transformers::models::mobilenetv4;
use std::collections::HashSet;
use std::path::Path;

/// Numeric-model framework the classifier is assembled with
pub trait Framework: Send + Sync {
    /// Fail if the configured compute device is unusable
    fn check(&self) -> Result<()>;

    /// Compute device for tensors
    fn device(&self) -> Result<Device>;

    /// Load a frozen, headless feature extractor from a weights file
    fn load_extractor(
        &self,
        base: &BaseModelInfo,
        weights: &Path,
        device: &Device,
    ) -> Result<Box<dyn FeatureExtractor>>;

    /// Get framework name for logging/debugging
    fn framework_name(&self) -> &str;
}

/// A pre-trained network with its classification layer removed
pub trait FeatureExtractor: Send {
    /// Map an NCHW image batch to features (`[B, C]` or `[B, C, H, W]`)
    fn forward(&self, xs: &Tensor) -> Result<Tensor>;

    /// Frozen weights, sorted by name
    fn named_weights(&self) -> Vec<(String, Tensor)>;

    /// Short architecture identifier recorded in exported metadata
    fn architecture(&self) -> &str;
}

/// Candle on CPU, CUDA or Metal
#[derive(Debug, Clone)]
pub struct CandleFramework {
    device: String,
}

impl CandleFramework {
    #[must_use]
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl Framework for CandleFramework {
    fn check(&self) -> Result<()> {
        let device = self.device()?;
        // A tiny allocation proves the backend is actually usable
        Tensor::zeros((1, 1), DType::F32, &device)?;
        Ok(())
    }

    fn device(&self) -> Result<Device> {
        parse_device(&self.device)
    }

    fn load_extractor(
        &self,
        base: &BaseModelInfo,
        weights: &Path,
        device: &Device,
    ) -> Result<Box<dyn FeatureExtractor>> {
        Ok(Box::new(MobileNetV4Extractor::load(base, weights, device)?))
    }

    fn framework_name(&self) -> &str {
        "candle"
    }
}

/// Parse a device string: `cpu`, `cuda`, `cuda:N` or `metal`
pub fn parse_device(device_str: &str) -> Result<Device> {
    match device_str {
        "cpu" => Ok(Device::Cpu),
        "metal" => Device::new_metal(0).map_err(|e| {
            StageError::Config(format!("Failed to initialize Metal device: {e}"))
        }),
        s if s.starts_with("cuda") => {
            let ordinal = match s.split_once(':') {
                Some((_, n)) => n.parse::<usize>().map_err(|_| {
                    StageError::Config(format!("Invalid CUDA device: {s}"))
                })?,
                None => 0,
            };
            Device::new_cuda(ordinal).map_err(|e| {
                StageError::Config(format!("Failed to initialize CUDA device: {e}"))
            })
        }
        _ => Err(StageError::Config(format!(
            "Unknown device: {device_str}. Must be 'cpu', 'cuda[:N]' or 'metal'"
        ))),
    }
}

/// MobileNetV4 backbone from timm safetensors weights
pub struct MobileNetV4Extractor {
    func: Func<'static>,
    weights: Vec<(String, Tensor)>,
    architecture: String,
}

impl MobileNetV4Extractor {
    pub fn load(base: &BaseModelInfo, weights_path: &Path, device: &Device) -> Result<Self> {
        tracing::info!(
            "Loading {} feature extractor from {}",
            base.name,
            weights_path.display()
        );

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)?
        };
        let func = mobilenetv4::mobilenetv4_no_final_layer(&base.variant.candle_config(), vb)?;

        // timm checkpoints also carry conv_head, norm_head and classifier,
        // which the headless network never reads
        let used = backbone_tensor_names(base, device)?;
        let stored = candle_core::safetensors::load(weights_path, device)?;
        let stored_count = stored.len();
        let mut weights: Vec<(String, Tensor)> = stored
            .into_iter()
            .filter(|(name, _)| used.contains(name))
            .collect();
        weights.sort_by(|a, b| a.0.cmp(&b.0));

        tracing::debug!(
            "{} of {stored_count} checkpoint tensors kept for the backbone",
            weights.len()
        );

        Ok(Self {
            func,
            weights,
            architecture: base.name.to_string(),
        })
    }
}

/// Names of every tensor the headless network reads for `base`
pub fn backbone_tensor_names(base: &BaseModelInfo, device: &Device) -> Result<HashSet<String>> {
    let varmap = VarMap::new();
    let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
    mobilenetv4::mobilenetv4_no_final_layer(&base.variant.candle_config(), vb)?;

    let data = varmap
        .data()
        .lock()
        .map_err(|_| StageError::Other("Variable map lock poisoned".to_string()))?;
    Ok(data.keys().cloned().collect())
}

impl FeatureExtractor for MobileNetV4Extractor {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        Ok(self.func.forward(xs)?)
    }

    fn named_weights(&self) -> Vec<(String, Tensor)> {
        self.weights.clone()
    }

    fn architecture(&self) -> &str {
        &self.architecture
    }
}
