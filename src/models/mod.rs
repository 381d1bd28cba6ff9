pub mod download;
pub mod hub;
pub mod manifest;
pub mod registry;
pub mod staging;

pub use download::AssetFetcher;
pub use hub::{HfHub, ModelHub};
pub use manifest::{ModelJson, WeightGroup, WeightSpec, MANIFEST_FILE};
pub use registry::BaseModelInfo;
pub use staging::StagingDir;
