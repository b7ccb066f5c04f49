//! Process-wide registry of loaded translation units

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::core::config::ModelsConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{DeviceKind, Direction};
use crate::core::unit::{SentenceTranslator, TranslationUnit};

/// Source of loaded models
pub trait ModelLoader {
    /// Whether a GPU device can be used
    fn gpu_available(&self) -> bool;

    /// Load the model for `direction` onto `device`
    fn load(&self, direction: Direction, device: DeviceKind) -> Result<Arc<dyn SentenceTranslator>>;
}

/// Immutable (device, direction) -> unit map.
///
/// Built once by [`ModelRegistry::load`]; there is no way to add or remove
/// units afterwards.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    units: BTreeMap<DeviceKind, BTreeMap<Direction, Arc<TranslationUnit>>>,
}

impl ModelRegistry {
    /// Load every configured (device, direction) model.
    ///
    /// A GPU listed in the config is skipped when the loader reports no GPU,
    /// leaving that device key absent. Load failures abort; warm-up failures
    /// are only logged.
    pub fn load(config: &ModelsConfig, loader: &dyn ModelLoader) -> Result<Self> {
        info!(state = "loading", devices = ?config.devices, "Model registry loading");
        let start = Instant::now();

        let gpu_available = loader.gpu_available();
        let mut units: BTreeMap<DeviceKind, BTreeMap<Direction, Arc<TranslationUnit>>> =
            BTreeMap::new();

        for &device in &config.devices {
            if device == DeviceKind::Gpu && !gpu_available {
                warn!("No GPU detected, gpu models will not be available");
                continue;
            }

            for &direction in &config.directions {
                let backend = loader.load(direction, device)?;
                let unit = TranslationUnit::new(direction, device, backend);

                if config.warm_up {
                    warm_up(&unit);
                }

                info!(%device, %direction, model = direction.model_id(), "Model loaded");
                units.entry(device).or_default().insert(direction, Arc::new(unit));
            }
        }

        let registry = Self { units };
        info!(
            state = "ready",
            units = registry.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model registry ready"
        );
        Ok(registry)
    }

    /// Find the unit for a device and direction
    pub fn lookup(&self, device: DeviceKind, direction: Direction) -> Result<Arc<TranslationUnit>> {
        let by_direction = self
            .units
            .get(&device)
            .ok_or(TranslationError::DeviceUnavailable { device })?;

        by_direction
            .get(&direction)
            .cloned()
            .ok_or_else(|| TranslationError::InvalidDirection {
                direction: direction.to_string(),
            })
    }

    /// Whether any model is loaded on `device`
    pub fn has_device(&self, device: DeviceKind) -> bool {
        self.units.contains_key(&device)
    }

    /// Devices with at least one loaded model
    pub fn devices(&self) -> Vec<DeviceKind> {
        self.units.keys().copied().collect()
    }

    /// All loaded units, ordered by device then direction
    pub fn units(&self) -> impl Iterator<Item = &Arc<TranslationUnit>> {
        self.units.values().flat_map(|m| m.values())
    }

    pub fn len(&self) -> usize {
        self.units.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn warm_up(unit: &TranslationUnit) {
    let start = Instant::now();
    match unit.translate(unit.direction().warm_up_text()) {
        Ok(_) => info!(
            device = %unit.device(),
            direction = %unit.direction(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Warm-up finished"
        ),
        Err(e) => warn!(
            device = %unit.device(),
            direction = %unit.direction(),
            error = ?e,
            "Warm-up failed"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::StubLoader;

    fn config(devices: Vec<DeviceKind>) -> ModelsConfig {
        ModelsConfig {
            devices,
            ..Default::default()
        }
    }

    #[test]
    fn test_cpu_only_without_gpu() {
        let loader = StubLoader::cpu_only();
        let registry =
            ModelRegistry::load(&config(vec![DeviceKind::Cpu, DeviceKind::Gpu]), &loader).unwrap();

        assert_eq!(registry.devices(), vec![DeviceKind::Cpu]);
        assert_eq!(registry.len(), 2);
        assert_eq!(loader.loads(), 2);

        let err = registry.lookup(DeviceKind::Gpu, Direction::DeEn).unwrap_err();
        assert!(matches!(err, TranslationError::DeviceUnavailable { device: DeviceKind::Gpu }));
    }

    #[test]
    fn test_gpu_branch_when_available() {
        let loader = StubLoader::with_gpu();
        let registry =
            ModelRegistry::load(&config(vec![DeviceKind::Cpu, DeviceKind::Gpu]), &loader).unwrap();

        assert!(registry.has_device(DeviceKind::Gpu));
        let unit = registry.lookup(DeviceKind::Gpu, Direction::EnDe).unwrap();
        assert_eq!(unit.device(), DeviceKind::Gpu);
        assert_eq!(unit.direction(), Direction::EnDe);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_missing_direction_is_invalid() {
        let loader = StubLoader::cpu_only();
        let models = ModelsConfig {
            devices: vec![DeviceKind::Cpu],
            directions: vec![Direction::DeEn],
            ..Default::default()
        };
        let registry = ModelRegistry::load(&models, &loader).unwrap();

        let err = registry.lookup(DeviceKind::Cpu, Direction::EnDe).unwrap_err();
        assert!(matches!(err, TranslationError::InvalidDirection { .. }));
    }

    #[test]
    fn test_load_failure_is_fatal() {
        let loader = StubLoader::cpu_only().failing_load();
        let result = ModelRegistry::load(&config(vec![DeviceKind::Cpu]), &loader);
        assert!(matches!(result, Err(TranslationError::ModelLoadError { .. })));
    }

    #[test]
    fn test_warm_up_failure_is_not_fatal() {
        let loader = StubLoader::cpu_only().failing_inference();
        let models = ModelsConfig {
            devices: vec![DeviceKind::Cpu],
            warm_up: true,
            ..Default::default()
        };

        let registry = ModelRegistry::load(&models, &loader).unwrap();
        assert_eq!(registry.len(), 2);
    }
}
