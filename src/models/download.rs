use crate::error::{Result, StageError};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Url;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Whole-file HTTP downloader with progress tracking
pub struct AssetFetcher {
    client: reqwest::Client,
}

impl std::fmt::Debug for AssetFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetFetcher")
            .field("client", &"Client { ... }")
            .finish()
    }
}

impl AssetFetcher {
    /// Create new fetcher. `None` means no request timeout.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Download `url` to `dest`, overwriting any existing file.
    ///
    /// Returns the number of bytes written. Non-2xx responses are errors.
    pub async fn download(&self, url: &Url, dest: &Path) -> Result<u64> {
        tracing::debug!("GET {url} -> {}", dest.display());

        let response = self.client.get(url.clone()).send().await?.error_for_status()?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let progress = progress_bar(response.content_length());
        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            progress.set_position(written);
        }

        file.flush().await?;
        progress.finish_and_clear();

        tracing::debug!("Wrote {} to {}", format_bytes(written), dest.display());
        Ok(written)
    }
}

fn progress_bar(total: Option<u64>) -> ProgressBar {
    match total {
        Some(len) => {
            let bar = ProgressBar::new(len);
            let style = ProgressStyle::with_template(
                "    {bar:30.cyan/blue} {bytes}/{total_bytes} ({bytes_per_sec})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            bar
        }
        None => {
            let spinner = ProgressBar::new_spinner();
            spinner.enable_steady_tick(Duration::from_millis(120));
            spinner
        }
    }
}

/// Resolve a manifest-relative path against a base URL.
///
/// The base is treated as a directory even without a trailing slash.
pub fn join_url(base: &Url, relative: &str) -> Result<Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(relative)
        .map_err(|e| StageError::Manifest(format!("Invalid weight path '{relative}': {e}")))
}

/// Directory URL of a file URL (everything up to the last `/`)
pub fn parent_url(url: &Url) -> Result<Url> {
    url.join("./")
        .map_err(|e| StageError::Config(format!("Cannot derive base URL from {url}: {e}")))
}

/// Format bytes as human-readable string
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1_048_576), "1.00 MB");
        assert_eq!(format_bytes(4_194_304), "4.00 MB");
        assert_eq!(format_bytes(1_073_741_824), "1.00 GB");
    }

    #[test]
    fn test_parent_url() {
        let url = Url::parse(
            "https://storage.googleapis.com/tfjs-models/tfjs/mobilenet_v1_0.25_224/model.json",
        )
        .unwrap();
        assert_eq!(
            parent_url(&url).unwrap().as_str(),
            "https://storage.googleapis.com/tfjs-models/tfjs/mobilenet_v1_0.25_224/"
        );
    }

    #[test]
    fn test_join_url() {
        let base = Url::parse("http://127.0.0.1:8080/models/mobilenet/").unwrap();
        assert_eq!(
            join_url(&base, "group1-shard1of1").unwrap().as_str(),
            "http://127.0.0.1:8080/models/mobilenet/group1-shard1of1"
        );

        let bare = Url::parse("http://127.0.0.1:8080/models/mobilenet").unwrap();
        assert_eq!(
            join_url(&bare, "group1-shard1of1").unwrap().as_str(),
            "http://127.0.0.1:8080/models/mobilenet/group1-shard1of1"
        );
    }

    #[tokio::test]
    async fn test_download_unreachable_host_is_network_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let fetcher = AssetFetcher::new(Some(Duration::from_secs(2))).unwrap();
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let url = Url::parse(&format!("http://127.0.0.1:{port}/model.json")).unwrap();

        let err = fetcher
            .download(&url, &temp_dir.path().join("model.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::Network(_)));
        assert!(!temp_dir.path().join("model.json").exists());
    }
}
