use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use modelstage::builder::{
    check_capabilities, Capability, FeatureExtractor, Framework, TfjsLayersExporter, Toolchain,
};
use modelstage::commands::{self, Outcome};
use modelstage::config::schema::OutputConfig;
use modelstage::config::Config;
use modelstage::models::registry::BaseModelInfo;
use modelstage::models::{ModelHub, ModelJson, MANIFEST_FILE};
use modelstage::{Result, StageError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Hub that serves a fixed local path, or fails on demand
struct FakeHub {
    available: bool,
    fail_fetch: bool,
}

#[async_trait]
impl ModelHub for FakeHub {
    fn check(&self) -> Result<()> {
        if self.available {
            Ok(())
        } else {
            Err(StageError::Hub("no cache directory".to_string()))
        }
    }

    async fn fetch(&self, repo: &str, _revision: &str, file: &str) -> Result<PathBuf> {
        if self.fail_fetch {
            return Err(StageError::Hub(format!("Failed to download {file} from {repo}")));
        }
        Ok(PathBuf::from("/fake/cache").join(file))
    }

    fn hub_name(&self) -> &str {
        "fake"
    }
}

/// 32x32 average pooling with one frozen tensor
struct StubExtractor {
    scale: Tensor,
}

impl FeatureExtractor for StubExtractor {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        Ok(xs.avg_pool2d(32)?)
    }

    fn named_weights(&self) -> Vec<(String, Tensor)> {
        vec![("stem/scale".to_string(), self.scale.clone())]
    }

    fn architecture(&self) -> &str {
        "stub"
    }
}

struct FakeFramework {
    fail_load: bool,
}

impl Framework for FakeFramework {
    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn device(&self) -> Result<Device> {
        Ok(Device::Cpu)
    }

    fn load_extractor(
        &self,
        base: &BaseModelInfo,
        weights: &Path,
        device: &Device,
    ) -> Result<Box<dyn FeatureExtractor>> {
        if self.fail_load {
            return Err(StageError::Other(format!(
                "cannot load {} from {}",
                base.name,
                weights.display()
            )));
        }
        Ok(Box::new(StubExtractor {
            scale: Tensor::ones(3, DType::F32, device)?,
        }))
    }

    fn framework_name(&self) -> &str {
        "fake"
    }
}

fn toolchain(hub: FakeHub, framework: FakeFramework, shard_size: usize) -> Toolchain {
    Toolchain {
        hub: Arc::new(hub),
        framework: Arc::new(framework),
        exporter: Arc::new(TfjsLayersExporter::new(shard_size)),
    }
}

fn working_toolchain() -> Toolchain {
    toolchain(
        FakeHub {
            available: true,
            fail_fetch: false,
        },
        FakeFramework { fail_load: false },
        4096,
    )
}

fn config_for(dir: &Path) -> Config {
    Config {
        output: OutputConfig {
            dir: dir.to_path_buf(),
        },
        ..Config::default()
    }
}

#[tokio::test]
async fn test_build_exports_layers_model() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("public/models/skin-disease");
    let config = config_for(&target);

    let outcome = commands::build::run(&config, &working_toolchain()).await;

    assert_eq!(outcome, Outcome::Completed);
    assert_eq!(outcome.exit_code(), 0);

    let manifest = ModelJson::load(&target.join(MANIFEST_FILE)).unwrap();
    assert_eq!(manifest.format.as_deref(), Some("layers-model"));

    let topology = manifest.model_topology.as_ref().unwrap();
    assert_eq!(topology["class_name"], "Sequential");
    assert_eq!(topology["config"]["layers"][1]["config"]["output_dim"], 3);

    // 3 frozen + (3*256 + 256) + (256*10 + 10) head parameters
    let elements = 3 + 3 * 256 + 256 + 256 * 10 + 10;
    assert_eq!(manifest.total_elements(), elements);

    let mut shard_bytes = 0;
    for path in manifest.weight_paths() {
        shard_bytes += std::fs::metadata(target.join(path)).unwrap().len();
    }
    assert_eq!(shard_bytes, elements as u64 * 4);
    assert_eq!(manifest.weight_paths().len(), (elements * 4).div_ceil(4096));

    let metadata = manifest.user_defined_metadata.unwrap();
    assert_eq!(
        metadata["baseModel"],
        "timm/mobilenetv4_conv_small.e2400_r224_in1k"
    );
    assert_eq!(metadata["numClasses"], 10);
}

#[tokio::test]
async fn test_build_rerun_overwrites() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(temp_dir.path());
    let tools = working_toolchain();

    assert_eq!(commands::build::run(&config, &tools).await, Outcome::Completed);
    let first = std::fs::read_dir(temp_dir.path()).unwrap().count();
    assert_eq!(commands::build::run(&config, &tools).await, Outcome::Completed);
    let second = std::fs::read_dir(temp_dir.path()).unwrap().count();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_build_missing_capability_exits_zero_without_writing() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("public/models/skin-disease");
    let config = config_for(&target);
    let tools = toolchain(
        FakeHub {
            available: false,
            fail_fetch: false,
        },
        FakeFramework { fail_load: false },
        0,
    );

    let missing = check_capabilities(&tools);
    let capabilities: Vec<Capability> = missing.iter().map(|m| m.capability).collect();
    assert_eq!(capabilities, vec![Capability::ModelHub, Capability::Converter]);

    let outcome = commands::build::run(&config, &tools).await;

    assert_eq!(outcome, Outcome::MissingDependencies);
    assert_eq!(outcome.exit_code(), 0);
    assert!(!target.exists());
}

#[tokio::test]
async fn test_build_hub_failure_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(temp_dir.path());
    let tools = toolchain(
        FakeHub {
            available: true,
            fail_fetch: true,
        },
        FakeFramework { fail_load: false },
        4096,
    );

    let outcome = commands::build::run(&config, &tools).await;

    assert_eq!(outcome, Outcome::Failed { signal: true });
    assert_eq!(outcome.exit_code(), 1);
    assert!(!temp_dir.path().join(MANIFEST_FILE).exists());
}

#[tokio::test]
async fn test_build_framework_failure_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(temp_dir.path());
    let tools = toolchain(
        FakeHub {
            available: true,
            fail_fetch: false,
        },
        FakeFramework { fail_load: true },
        4096,
    );

    let outcome = commands::build::run(&config, &tools).await;
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn test_build_invalid_config_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = config_for(temp_dir.path());
    config.builder.base_model = "mobilenetv3-large".to_string();

    let outcome = commands::build::run(&config, &working_toolchain()).await;

    assert_eq!(outcome, Outcome::Failed { signal: true });
    assert!(std::fs::read_dir(temp_dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn test_build_ignores_invalid_fetcher_settings() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = config_for(temp_dir.path());
    config.fetcher.manifest_url = "not a url".to_string();
    config.fetcher.base_url = Some("::".to_string());

    let outcome = commands::build::run(&config, &working_toolchain()).await;

    assert_eq!(outcome, Outcome::Completed);
    assert!(temp_dir.path().join(MANIFEST_FILE).exists());
}
