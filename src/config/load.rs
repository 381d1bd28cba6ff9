use crate::config::schema::Config;
use crate::error::{Result, StageError};
use crate::models::registry::{BaseModelInfo, MODELS};
use std::fs;
use std::path::{Path, PathBuf};

impl Config {
    /// Load config from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        Self::load_from(&path)
    }

    /// Load config from an explicit path, or defaults if the file is missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            StageError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Check both procedures' settings
    pub fn validate(&self) -> Result<()> {
        self.validate_builder()?;
        self.validate_fetcher()
    }

    /// Check the `[builder]` section, returning the selected base model
    pub fn validate_builder(&self) -> Result<&'static BaseModelInfo> {
        let builder = &self.builder;

        let Some(base) = BaseModelInfo::find(&builder.base_model) else {
            let hint = BaseModelInfo::suggest(&builder.base_model)
                .map(|name| format!("\nDid you mean '{name}'?"))
                .unwrap_or_default();
            let available: Vec<String> = MODELS
                .iter()
                .map(|m| {
                    let marker = if m.recommended { " (recommended)" } else { "" };
                    format!(
                        "  {}{marker}: {} parameters, {}px. {}",
                        m.name, m.parameters, m.native_resolution, m.description
                    )
                })
                .collect();
            return Err(StageError::Config(format!(
                "Unknown base model '{}'. Available:\n{}{hint}",
                builder.base_model,
                available.join("\n")
            )));
        };

        for (field, value) in [
            ("builder.input_size", builder.input_size),
            ("builder.hidden_units", builder.hidden_units),
            ("builder.num_classes", builder.num_classes),
            ("builder.shard_size_bytes", builder.shard_size_bytes),
        ] {
            if value == 0 {
                return Err(StageError::Config(format!("{field} must be greater than 0")));
            }
        }

        if !(0.0..1.0).contains(&builder.dropout_rate) {
            return Err(StageError::Config(format!(
                "builder.dropout_rate must be in [0, 1), got {}",
                builder.dropout_rate
            )));
        }

        Ok(base)
    }

    /// Check the `[fetcher]` URLs
    pub fn validate_fetcher(&self) -> Result<()> {
        let fetcher = &self.fetcher;
        reqwest::Url::parse(&fetcher.manifest_url).map_err(|e| {
            StageError::Config(format!(
                "Invalid fetcher.manifest_url '{}': {e}",
                fetcher.manifest_url
            ))
        })?;
        if let Some(base_url) = &fetcher.base_url {
            reqwest::Url::parse(base_url).map_err(|e| {
                StageError::Config(format!("Invalid fetcher.base_url '{base_url}': {e}"))
            })?;
        }

        Ok(())
    }
}

/// Get config file path
pub fn config_path() -> Result<PathBuf> {
    let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config)
    } else {
        dirs::config_dir()
            .ok_or_else(|| StageError::Config("Cannot determine config directory".to_string()))?
    };

    Ok(config_dir.join("modelstage").join("config.toml"))
}
