use crate::builder::export::ExportGraph;
use crate::builder::framework::FeatureExtractor;
use crate::error::{Result, StageError};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{Dropout, Linear, Module, VarBuilder, VarMap};
use serde_json::json;

/// Shape of the trainable head placed on top of the extractor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadConfig {
    pub input_size: usize,
    pub hidden_units: usize,
    pub dropout_rate: f32,
    pub num_classes: usize,
}

impl Default for HeadConfig {
    fn default() -> Self {
        Self {
            input_size: 224,
            hidden_units: 256,
            dropout_rate: 0.5,
            num_classes: 10,
        }
    }
}

/// Global average pooling over the spatial dims of an NCHW tensor.
///
/// Already pooled `[B, C]` input passes through.
pub fn global_average_pool(xs: &Tensor) -> Result<Tensor> {
    match xs.rank() {
        2 => Ok(xs.clone()),
        4 => Ok(xs.flatten_from(2)?.mean(D::Minus1)?),
        rank => Err(StageError::Other(format!(
            "Cannot pool feature map of rank {rank}, expected 2 or 4"
        ))),
    }
}

/// Dense(relu) -> Dropout -> Dense(softmax)
pub struct ClassifierHead {
    hidden: Linear,
    dropout: Dropout,
    output: Linear,
    varmap: VarMap,
    config: HeadConfig,
    feature_dim: usize,
}

impl ClassifierHead {
    /// Freshly initialized head for `feature_dim` input features
    pub fn new(feature_dim: usize, config: HeadConfig, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);

        let hidden = candle_nn::linear(feature_dim, config.hidden_units, vb.pp("dense"))?;
        let output = candle_nn::linear(config.hidden_units, config.num_classes, vb.pp("dense_1"))?;

        Ok(Self {
            hidden,
            dropout: Dropout::new(config.dropout_rate),
            output,
            varmap,
            config,
            feature_dim,
        })
    }

    /// Class probabilities from pooled features
    pub fn forward(&self, features: &Tensor, train: bool) -> Result<Tensor> {
        let xs = self.hidden.forward(features)?.relu()?;
        let xs = self.dropout.forward(&xs, train)?;
        let logits = self.output.forward(&xs)?;
        Ok(candle_nn::ops::softmax_last_dim(&logits)?)
    }

    /// Number of trainable variables held by the head
    #[must_use]
    pub fn trainable_count(&self) -> usize {
        self.varmap.all_vars().iter().map(|v| v.elem_count()).sum()
    }

    /// Keras-layout weights: kernels are `[in, out]`
    fn named_weights(&self) -> Result<Vec<(String, Tensor)>> {
        let mut weights = Vec::with_capacity(4);
        for (name, layer) in [("dense", &self.hidden), ("dense_1", &self.output)] {
            weights.push((format!("{name}/kernel"), layer.weight().t()?.contiguous()?));
            if let Some(bias) = layer.bias() {
                weights.push((format!("{name}/bias"), bias.clone()));
            }
        }
        Ok(weights)
    }
}

/// Frozen feature extractor plus trainable head
pub struct Classifier {
    extractor: Box<dyn FeatureExtractor>,
    head: ClassifierHead,
    source: String,
}

impl Classifier {
    /// Attach a head sized by running one blank image through the extractor
    pub fn build(
        extractor: Box<dyn FeatureExtractor>,
        config: HeadConfig,
        source: impl Into<String>,
        device: &Device,
    ) -> Result<Self> {
        let blank = Tensor::zeros(
            (1, 3, config.input_size, config.input_size),
            DType::F32,
            device,
        )?;
        let features = global_average_pool(&extractor.forward(&blank)?)?;
        let (_, feature_dim) = features.dims2()?;

        tracing::info!(
            "{} yields {feature_dim} features at {}x{}",
            extractor.architecture(),
            config.input_size,
            config.input_size
        );

        let head = ClassifierHead::new(feature_dim, config, device)?;

        Ok(Self {
            extractor,
            head,
            source: source.into(),
        })
    }

    #[must_use]
    pub fn feature_dim(&self) -> usize {
        self.head.feature_dim
    }

    #[must_use]
    pub fn head(&self) -> &ClassifierHead {
        &self.head
    }

    /// Class probabilities, shape `[B, num_classes]`
    pub fn forward(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        let features = global_average_pool(&self.extractor.forward(xs)?)?;
        self.head.forward(&features, train)
    }

    /// Topology and weights in the order the exporter writes them
    pub fn export_graph(&self) -> Result<ExportGraph> {
        let config = self.head.config;
        let size = config.input_size;

        let extractor_weights: Vec<(String, Tensor)> = self
            .extractor
            .named_weights()
            .into_iter()
            .map(|(name, tensor)| (format!("feature_extractor/{name}"), tensor))
            .collect();

        let layers = json!([
            {
                "class_name": "InputLayer",
                "config": {
                    "batch_input_shape": [null, size, size, 3],
                    "dtype": "float32",
                    "sparse": false,
                    "name": "input_1"
                }
            },
            {
                "class_name": "FeatureExtractor",
                "config": {
                    "name": "feature_extractor",
                    "trainable": false,
                    "architecture": self.extractor.architecture(),
                    "source": self.source,
                    "output_dim": self.head.feature_dim,
                    "dtype": "float32"
                }
            },
            {
                "class_name": "GlobalAveragePooling2D",
                "config": {
                    "name": "global_average_pooling2d",
                    "trainable": true,
                    "dtype": "float32",
                    "data_format": "channels_last"
                }
            },
            dense_layer("dense", config.hidden_units, "relu"),
            {
                "class_name": "Dropout",
                "config": {
                    "name": "dropout",
                    "trainable": true,
                    "dtype": "float32",
                    "rate": config.dropout_rate,
                    "noise_shape": null,
                    "seed": null
                }
            },
            dense_layer("dense_1", config.num_classes, "softmax")
        ]);

        let topology = json!({
            "class_name": "Sequential",
            "config": { "name": "sequential", "layers": layers },
            "keras_version": "tfjs-layers",
            "backend": "tensor_flow.js"
        });

        let mut weights = extractor_weights;
        weights.extend(self.head.named_weights()?);

        Ok(ExportGraph {
            topology,
            weights,
            metadata: json!({
                "baseModel": self.source,
                "numClasses": config.num_classes
            }),
        })
    }
}

fn dense_layer(name: &str, units: usize, activation: &str) -> serde_json::Value {
    json!({
        "class_name": "Dense",
        "config": {
            "name": name,
            "trainable": true,
            "dtype": "float32",
            "units": units,
            "activation": activation,
            "use_bias": true,
            "kernel_initializer": {"class_name": "GlorotUniform", "config": {"seed": null}},
            "bias_initializer": {"class_name": "Zeros", "config": {}},
            "kernel_regularizer": null,
            "bias_regularizer": null,
            "activity_regularizer": null,
            "kernel_constraint": null,
            "bias_constraint": null
        }
    })
}
