//! Translation units: one loaded model bound to a device and direction

use std::fmt;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::{DeviceKind, Direction};

/// A loaded model able to translate one sentence at a time.
///
/// Implementations are shared between concurrent requests and must not
/// require exclusive access from callers.
pub trait SentenceTranslator: Send + Sync {
    /// Most sentences this model can usefully work on at once, `None` if
    /// unbounded. Models that serialise internally report `Some(1)`.
    fn max_concurrency(&self) -> Option<usize> {
        None
    }

    /// Translate a single sentence
    fn translate(&self, sentence: &str) -> Result<String>;
}

/// Immutable (model, device, direction) triple
#[derive(Clone)]
pub struct TranslationUnit {
    direction: Direction,
    device: DeviceKind,
    backend: Arc<dyn SentenceTranslator>,
    slots: Option<Arc<Semaphore>>,
}

impl TranslationUnit {
    pub fn new(direction: Direction, device: DeviceKind, backend: Arc<dyn SentenceTranslator>) -> Self {
        let slots = backend
            .max_concurrency()
            .map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        Self {
            direction,
            device,
            backend,
            slots,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn device(&self) -> DeviceKind {
        self.device
    }

    /// Wait until the model can take another job.
    ///
    /// The returned permit must be held for the duration of the job and is
    /// taken before a pool worker.
    pub async fn reserve(&self) -> Result<Option<OwnedSemaphorePermit>> {
        match &self.slots {
            Some(slots) => slots
                .clone()
                .acquire_owned()
                .await
                .map(Some)
                .map_err(|e| TranslationError::inference(format!("{} model closed: {}", self.direction, e))),
            None => Ok(None),
        }
    }

    /// Translate one sentence.
    ///
    /// Empty model output is reported as an inference failure.
    pub fn translate(&self, sentence: &str) -> Result<String> {
        trace!(direction = %self.direction, device = %self.device, "Translating sentence");
        let output = self.backend.translate(sentence)?;
        if output.trim().is_empty() && !sentence.trim().is_empty() {
            return Err(TranslationError::inference(format!(
                "{} model returned no output",
                self.direction
            )));
        }
        Ok(output)
    }
}

impl fmt::Debug for TranslationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationUnit")
            .field("direction", &self.direction)
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}
