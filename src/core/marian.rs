//! Marian (opus-mt) models through rust-bert

use parking_lot::Mutex;
use rust_bert::pipelines::common::{ModelResource, ModelType};
use rust_bert::pipelines::translation::{Language, TranslationConfig, TranslationModel};
use rust_bert::resources::LocalResource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tch::{Cuda, Device};
use tracing::{debug, info};

use crate::core::cache::{ModelCache, ModelFiles};
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{DeviceKind, Direction};
use crate::core::registry::ModelLoader;
use crate::core::unit::SentenceTranslator;

/// Local copies of the files making up one Marian model
#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub model: PathBuf,
    pub config: PathBuf,
    pub vocab: PathBuf,
    pub spm: PathBuf,
}

/// Loads opus-mt models out of a [`ModelCache`], downloading missing files
pub struct MarianLoader {
    cache: ModelCache,
}

impl MarianLoader {
    pub fn new(cache: ModelCache) -> Self {
        Self { cache }
    }

    fn fetch(&self, direction: Direction) -> Result<ModelPaths> {
        let files = ModelFiles::for_direction(direction);
        Ok(ModelPaths {
            config: self.cache.download(&files.config)?,
            vocab: self.cache.download(&files.vocab)?,
            spm: self.cache.download(&files.spm)?,
            model: self.cache.download(&files.model)?,
        })
    }
}

impl ModelLoader for MarianLoader {
    fn gpu_available(&self) -> bool {
        let available = Cuda::is_available();
        debug!(available, devices = Cuda::device_count(), "CUDA probe");
        available
    }

    fn load(&self, direction: Direction, device: DeviceKind) -> Result<Arc<dyn SentenceTranslator>> {
        info!(%direction, %device, model = direction.model_id(), "Loading model");
        let paths = self.fetch(direction)?;
        let backend = MarianTranslator::load(direction, device, &paths)?;
        Ok(Arc::new(backend))
    }
}

/// One loaded Marian model.
///
/// rust-bert only guarantees `TranslationModel: Send`, so calls into one
/// model are serialised and the unit admits one job at a time.
pub struct MarianTranslator {
    model: Mutex<TranslationModel>,
    source: Language,
    target: Language,
}

impl MarianTranslator {
    pub fn load(direction: Direction, device: DeviceKind, paths: &ModelPaths) -> Result<Self> {
        let (source, target) = languages(direction);
        let config = translation_config(direction, device, paths);

        let model = TranslationModel::new(config).map_err(|e| TranslationError::ModelLoadError {
            model: direction.model_id().to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            model: Mutex::new(model),
            source,
            target,
        })
    }
}

impl SentenceTranslator for MarianTranslator {
    fn max_concurrency(&self) -> Option<usize> {
        Some(1)
    }

    fn translate(&self, sentence: &str) -> Result<String> {
        let output = self
            .model
            .lock()
            .translate(&[sentence], self.source, self.target)
            .map_err(TranslationError::inference)?;

        output
            .into_iter()
            .next()
            .ok_or_else(|| TranslationError::inference("model produced no sequence"))
    }
}

fn languages(direction: Direction) -> (Language, Language) {
    match direction {
        Direction::DeEn => (Language::German, Language::English),
        Direction::EnDe => (Language::English, Language::German),
    }
}

fn translation_config(direction: Direction, device: DeviceKind, paths: &ModelPaths) -> TranslationConfig {
    let (source, target) = languages(direction);

    TranslationConfig::new(
        ModelType::Marian,
        ModelResource::Torch(Box::new(resource(&paths.model))),
        resource(&paths.config),
        resource(&paths.vocab),
        Some(resource(&paths.spm)),
        [source],
        [target],
        tch_device(device),
    )
}

fn resource(path: &Path) -> LocalResource {
    LocalResource {
        local_path: path.to_path_buf(),
    }
}

fn tch_device(device: DeviceKind) -> Device {
    match device {
        DeviceKind::Cpu => Device::Cpu,
        DeviceKind::Gpu => Device::Cuda(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_bert::resources::ResourceProvider;

    fn paths() -> ModelPaths {
        ModelPaths {
            model: PathBuf::from("/models/de-en/rust_model.ot"),
            config: PathBuf::from("/models/de-en/config.json"),
            vocab: PathBuf::from("/models/de-en/vocab.json"),
            spm: PathBuf::from("/models/de-en/source.spm"),
        }
    }

    #[test]
    fn test_config_reads_cached_files() {
        let config = translation_config(Direction::DeEn, DeviceKind::Cpu, &paths());

        match &config.model_resource {
            ModelResource::Torch(weights) => assert_eq!(
                weights.get_local_path().unwrap(),
                PathBuf::from("/models/de-en/rust_model.ot")
            ),
            #[allow(unreachable_patterns)]
            _ => panic!("weights must be a torch resource"),
        }
        assert_eq!(
            config.config_resource.get_local_path().unwrap(),
            PathBuf::from("/models/de-en/config.json")
        );
        assert!(config.merges_resource.is_some());
        assert_eq!(config.device, Device::Cpu);
    }

    #[test]
    fn test_language_and_device_mapping() {
        assert_eq!(languages(Direction::EnDe), (Language::English, Language::German));
        assert_eq!(tch_device(DeviceKind::Gpu), Device::Cuda(0));
    }
}
