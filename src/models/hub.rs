use crate::error::{Result, StageError};
use async_trait::async_trait;
use hf_hub::api::tokio::Api;
use hf_hub::{Repo, RepoType};
use std::path::PathBuf;

/// Source of pre-trained weight files
#[async_trait]
pub trait ModelHub: Send + Sync {
    /// Fail if the client cannot be used
    fn check(&self) -> Result<()>;

    /// Download (or reuse from cache) one file of a repository
    async fn fetch(&self, repo: &str, revision: &str, file: &str) -> Result<PathBuf>;

    /// Get hub name for logging/debugging
    fn hub_name(&self) -> &str;
}

/// `HuggingFace` Hub client backed by the shared hf-hub cache
pub struct HfHub {
    api: std::result::Result<Api, String>,
}

impl HfHub {
    /// Create new hub client. Construction errors surface through `check`.
    #[must_use]
    pub fn new() -> Self {
        let api = Api::new().map_err(|e| e.to_string());
        if let Err(e) = &api {
            tracing::warn!("Failed to initialize HuggingFace API: {e}");
        }
        Self { api }
    }
}

impl Default for HfHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ModelHub for HfHub {
    fn check(&self) -> Result<()> {
        self.api
            .as_ref()
            .map(|_| ())
            .map_err(|e| StageError::Hub(format!("Failed to initialize HuggingFace API: {e}")))
    }

    async fn fetch(&self, repo: &str, revision: &str, file: &str) -> Result<PathBuf> {
        let api = self
            .api
            .as_ref()
            .map_err(|e| StageError::Hub(format!("Failed to initialize HuggingFace API: {e}")))?;

        tracing::info!("Fetching {file} from {repo}@{revision}");

        let repo_handle = api.repo(Repo::with_revision(
            repo.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));

        repo_handle
            .get(file)
            .await
            .map_err(|e| StageError::Hub(format!("Failed to download {file} from {repo}: {e}")))
    }

    fn hub_name(&self) -> &str {
        "huggingface"
    }
}
