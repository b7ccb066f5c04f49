//! On-disk model cache: existence checks and downloads
//!
//! Files are laid out the way rust-bert's `RemoteResource` lays them out, so
//! an existing rust-bert cache is reused. The Marian backend loads from here
//! too, so `install-models` and the server share one cache root.

use cached_path::{Cache, Options, ProgressBar};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::core::errors::Result;
use crate::core::models::Direction;

const HF_BASE_URL: &str = "https://huggingface.co";

/// One remote file of a pretrained model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFile {
    /// Cache subdirectory, e.g. `marian-mt-de-en/model`
    pub cache_subdir: String,
    pub url: String,
}

impl ModelFile {
    fn new(direction: Direction, local_name: &str, remote_name: &str) -> Self {
        Self {
            cache_subdir: format!("marian-mt-{}/{}", direction, local_name),
            url: format!("{}/{}/resolve/main/{}", HF_BASE_URL, direction.model_id(), remote_name),
        }
    }

    /// File name as stored on the hub
    pub fn name(&self) -> &str {
        self.url.rsplit('/').next().unwrap_or(&self.url)
    }
}

/// Files making up the Marian model of one direction
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub model: ModelFile,
    pub config: ModelFile,
    pub vocab: ModelFile,
    pub spm: ModelFile,
}

impl ModelFiles {
    pub fn for_direction(direction: Direction) -> Self {
        Self {
            model: ModelFile::new(direction, "model", "rust_model.ot"),
            config: ModelFile::new(direction, "config", "config.json"),
            vocab: ModelFile::new(direction, "vocab", "vocab.json"),
            spm: ModelFile::new(direction, "spiece", "source.spm"),
        }
    }

    /// Small files first so a broken setup fails before the weights download
    pub fn all(&self) -> [&ModelFile; 4] {
        [&self.config, &self.vocab, &self.spm, &self.model]
    }
}

/// Model cache rooted at a directory
pub struct ModelCache {
    root: PathBuf,
    online: Cache,
    offline: Cache,
}

impl ModelCache {
    /// Open (creating if needed) the cache at `root`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let online = Cache::builder()
            .dir(root.clone())
            .progress_bar(Some(ProgressBar::Light))
            .build()?;
        let offline = Cache::builder()
            .dir(root.clone())
            .offline(true)
            .progress_bar(None)
            .build()?;

        Ok(Self {
            root,
            online,
            offline,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether a cached copy of `file` exists (never touches the network)
    pub fn is_cached(&self, file: &ModelFile) -> bool {
        let cached = self
            .offline
            .cached_path_with_options(&file.url, &Options::default().subdir(&file.cache_subdir))
            .is_ok();
        debug!(file = %file.cache_subdir, cached, "Cache lookup");
        cached
    }

    /// Download `file` unless already cached, returning its local path
    pub fn download(&self, file: &ModelFile) -> Result<PathBuf> {
        info!(url = %file.url, "Fetching model file");
        let path = self
            .online
            .cached_path_with_options(&file.url, &Options::default().subdir(&file.cache_subdir))?;
        Ok(path)
    }

    /// Whether every file of `direction` is cached
    pub fn is_installed(&self, direction: Direction) -> bool {
        ModelFiles::for_direction(direction)
            .all()
            .iter()
            .all(|file| self.is_cached(file))
    }
}
