//! Stub models for unit tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{DeviceKind, Direction};
use crate::core::registry::ModelLoader;
use crate::core::unit::SentenceTranslator;

/// Prefixes every sentence with `[tag] `
#[derive(Debug, Default)]
pub struct TaggingTranslator {
    tag: Option<String>,
    slow: Option<(String, Duration)>,
    serial: Option<Mutex<()>>,
    calls: AtomicUsize,
}

impl TaggingTranslator {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            ..Default::default()
        }
    }

    /// Always returns an empty string
    pub fn silent() -> Self {
        Self::default()
    }

    /// Sleep before answering sentences containing `pattern`
    pub fn slow_on(mut self, pattern: &str, delay: Duration) -> Self {
        self.slow = Some((pattern.to_string(), delay));
        self
    }

    /// Handle one sentence at a time, like a model behind a lock
    pub fn serial(mut self) -> Self {
        self.serial = Some(Mutex::new(()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SentenceTranslator for TaggingTranslator {
    fn max_concurrency(&self) -> Option<usize> {
        self.serial.as_ref().map(|_| 1)
    }

    fn translate(&self, sentence: &str) -> Result<String> {
        let _guard = self.serial.as_ref().map(|lock| lock.lock().unwrap());
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((pattern, delay)) = &self.slow {
            if sentence.contains(pattern.as_str()) {
                std::thread::sleep(*delay);
            }
        }
        Ok(match &self.tag {
            Some(tag) => format!("[{}] {}", tag, sentence),
            None => String::new(),
        })
    }
}

/// Fails on sentences containing a pattern, tags the others
#[derive(Debug)]
pub struct FailingTranslator {
    pattern: String,
}

impl FailingTranslator {
    pub fn on(pattern: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
        }
    }

    /// Fails on every sentence
    pub fn always() -> Self {
        Self::on("")
    }
}

impl SentenceTranslator for FailingTranslator {
    fn translate(&self, sentence: &str) -> Result<String> {
        if sentence.contains(self.pattern.as_str()) {
            return Err(TranslationError::inference(format!(
                "cannot translate '{}'",
                sentence
            )));
        }
        Ok(format!("[ok] {}", sentence))
    }
}

/// Loader handing out stub translators tagged with the target language
#[derive(Debug, Default)]
pub struct StubLoader {
    gpu: bool,
    fail_load: bool,
    fail_inference: bool,
    shared: Option<Arc<TaggingTranslator>>,
    loads: AtomicUsize,
}

impl StubLoader {
    pub fn cpu_only() -> Self {
        Self::default()
    }

    pub fn with_gpu() -> Self {
        Self {
            gpu: true,
            ..Default::default()
        }
    }

    pub fn failing_load(mut self) -> Self {
        self.fail_load = true;
        self
    }

    pub fn failing_inference(mut self) -> Self {
        self.fail_inference = true;
        self
    }

    /// Hand out `backend` for every model instead of fresh stubs
    pub fn sharing(mut self, backend: Arc<TaggingTranslator>) -> Self {
        self.shared = Some(backend);
        self
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ModelLoader for StubLoader {
    fn gpu_available(&self) -> bool {
        self.gpu
    }

    fn load(&self, direction: Direction, device: DeviceKind) -> Result<Arc<dyn SentenceTranslator>> {
        if self.fail_load {
            return Err(TranslationError::ModelLoadError {
                model: direction.model_id().to_string(),
                message: format!("no weights for {}", device),
            });
        }
        self.loads.fetch_add(1, Ordering::SeqCst);

        let backend: Arc<dyn SentenceTranslator> = if let Some(backend) = &self.shared {
            backend.clone()
        } else if self.fail_inference {
            Arc::new(FailingTranslator::always())
        } else {
            Arc::new(TaggingTranslator::new(direction.target_lang()))
        };
        Ok(backend)
    }
}
