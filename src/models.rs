use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{Result, SubgenError};

const GGML_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Locates whisper models on disk and downloads the missing ones
pub struct ModelManager {
    client: Client,
    models_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub filename: String,
    pub url: String,
    pub size_mb: f64,
}

impl ModelInfo {
    fn ggml(name: &str, size_mb: f64) -> Self {
        let filename = format!("ggml-{}.bin", name);
        Self {
            name: name.to_string(),
            url: format!("{}/{}", GGML_BASE_URL, filename),
            filename,
            size_mb,
        }
    }
}

impl ModelManager {
    pub fn new<P: Into<PathBuf>>(models_dir: P) -> Result<Self> {
        let models_dir = models_dir.into();
        std::fs::create_dir_all(&models_dir)?;

        let client = Client::builder()
            .user_agent(concat!("subgen/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, models_dir })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    pub fn get_available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo::ggml("tiny", 75.0),
            ModelInfo::ggml("base", 142.0),
            ModelInfo::ggml("small", 466.0),
            ModelInfo::ggml("medium", 1500.0),
            ModelInfo::ggml("large-v3", 2900.0),
            ModelInfo {
                name: "kotoba-whisper-v2.0".to_string(),
                filename: "ggml-kotoba-whisper-v2.0.bin".to_string(),
                url: "https://huggingface.co/kotoba-tech/kotoba-whisper-v2.0-ggml/resolve/main/ggml-kotoba-whisper-v2.0.bin"
                    .to_string(),
                size_mb: 1520.0,
            },
        ]
    }

    /// Local path of a registry model, whether or not it has been downloaded
    pub fn local_path(&self, model: &ModelInfo) -> PathBuf {
        self.models_dir.join(&model.filename)
    }

    /// Turn a configured model into a file path: an existing path is used as
    /// is, a registry name maps to its file under the models directory and is
    /// downloaded when missing.
    pub async fn resolve(&self, model: &str) -> Result<PathBuf> {
        let as_path = Path::new(model);
        if as_path.is_file() {
            return Ok(as_path.to_path_buf());
        }

        if model.contains('/') || model.ends_with(".bin") {
            let in_models_dir = as_path
                .file_name()
                .map(|name| self.models_dir.join(name))
                .filter(|path| path.is_file());
            if let Some(path) = in_models_dir {
                return Ok(path);
            }
            return Err(SubgenError::Model(format!(
                "Model file not found: {}",
                as_path.display()
            )));
        }

        let info = self.select_model(model)?;
        let local_path = self.local_path(&info);
        if local_path.is_file() {
            return Ok(local_path);
        }

        info!("Model '{}' not found locally", info.name);
        self.download_model(&info).await
    }

    fn select_model(&self, preferred: &str) -> Result<ModelInfo> {
        let models = self.get_available_models();

        if let Some(model) = models.iter().find(|m| m.name == preferred) {
            return Ok(model.clone());
        }

        if let Some(model) = models.iter().find(|m| m.name == "base") {
            warn!("Unknown model '{}', using 'base' instead", preferred);
            return Ok(model.clone());
        }

        Err(SubgenError::Model("No suitable whisper model found".to_string()))
    }

    pub async fn download_model(&self, model: &ModelInfo) -> Result<PathBuf> {
        let local_path = self.local_path(model);

        if local_path.exists() {
            info!("Model {} already exists at {}", model.name, local_path.display());
            return Ok(local_path);
        }

        info!("Downloading {} model ({:.1} MB)...", model.name, model.size_mb);

        let mut response = self.client.get(&model.url).send().await?;
        if !response.status().is_success() {
            return Err(SubgenError::Model(format!(
                "Failed to download model {}: HTTP {}",
                model.name,
                response.status()
            )));
        }

        let total = response
            .content_length()
            .unwrap_or((model.size_mb * 1_000_000.0) as u64);
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .map_err(|e| SubgenError::Model(format!("Invalid progress template: {}", e)))?
                .progress_chars("#>-"),
        );

        let temp_path = local_path.with_extension("tmp");
        let mut file = async_fs::File::create(&temp_path).await?;

        let mut downloaded = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            pb.set_position(downloaded);
        }

        file.flush().await?;
        drop(file);

        async_fs::rename(&temp_path, &local_path).await?;

        pb.finish_with_message(format!("Downloaded {}", model.name));
        info!("Successfully downloaded {} to {}", model.name, local_path.display());

        Ok(local_path)
    }
}
