//! Sentence-parallel document translation

use futures::future::try_join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::core::errors::{Result, TranslationError};
use crate::core::pool::WorkerPool;
use crate::core::splitter::split_sentences;
use crate::core::unit::TranslationUnit;

/// Splits documents into sentences, translates them on the shared worker
/// pool and joins the results in input order.
#[derive(Debug, Clone)]
pub struct TranslationPipeline {
    pool: WorkerPool,
    timeout: Option<Duration>,
}

impl TranslationPipeline {
    pub fn new(pool: WorkerPool) -> Self {
        Self {
            pool,
            timeout: None,
        }
    }

    /// Bound the wall-clock time of a whole `translate_text` call
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Translate `text` sentence by sentence.
    ///
    /// Fails as a whole if any sentence fails; no partial output is returned.
    pub async fn translate_text(&self, text: &str, unit: Arc<TranslationUnit>) -> Result<String> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(text, unit))
                .await
                .map_err(|_| TranslationError::TimeoutError {
                    timeout_ms: limit.as_millis() as u64,
                })?,
            None => self.run(text, unit).await,
        }
    }

    async fn run(&self, text: &str, unit: Arc<TranslationUnit>) -> Result<String> {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            debug!("Nothing to translate");
            return Ok(String::new());
        }

        let start = Instant::now();
        let count = sentences.len();

        let jobs = sentences.into_iter().map(|sentence| {
            let unit = unit.clone();
            async move {
                // wait for the model before taking a worker
                let slot = unit.reserve().await?;
                self.pool
                    .run(move || {
                        let _slot = slot;
                        unit.translate(&sentence.text)
                    })
                    .await
            }
        });

        // try_join_all keeps input order and stops at the first error
        let translated = try_join_all(jobs).await?;

        info!(
            direction = %unit.direction(),
            device = %unit.device(),
            sentences = count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Translated document"
        );

        Ok(translated.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{DeviceKind, Direction};
    use crate::core::testing::{FailingTranslator, TaggingTranslator};
    use crate::core::unit::SentenceTranslator;

    fn unit(backend: Arc<dyn SentenceTranslator>) -> Arc<TranslationUnit> {
        Arc::new(TranslationUnit::new(Direction::DeEn, DeviceKind::Cpu, backend))
    }

    #[tokio::test]
    async fn test_empty_text_submits_nothing() {
        let backend = Arc::new(TaggingTranslator::new("en"));
        let pipeline = TranslationPipeline::new(WorkerPool::new(4));

        let output = pipeline.translate_text("", unit(backend.clone())).await.unwrap();
        assert_eq!(output, "");
        assert_eq!(pipeline.pool().submitted(), 0);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_output_matches_sentence_by_sentence_translation() {
        let text = "Hallo Welt. Wie geht es dir? Mir geht es gut.\n\nBis morgen!";
        let backend = Arc::new(TaggingTranslator::new("en"));
        let unit = unit(backend.clone());
        let pipeline = TranslationPipeline::new(WorkerPool::new(8));

        let expected = split_sentences(text)
            .iter()
            .map(|s| unit.translate(&s.text).unwrap())
            .collect::<Vec<_>>()
            .join(" ");

        let output = pipeline.translate_text(text, unit).await.unwrap();
        assert_eq!(output, expected);
        assert_eq!(pipeline.pool().submitted(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_order_is_kept_when_first_sentence_is_slowest() {
        let backend = Arc::new(
            TaggingTranslator::new("en").slow_on("Hallo", Duration::from_millis(150)),
        );
        let pipeline = TranslationPipeline::new(WorkerPool::new(4));

        let output = pipeline
            .translate_text("Hallo Welt. Wie geht es dir?", unit(backend))
            .await
            .unwrap();
        assert_eq!(output, "[en] Hallo Welt. [en] Wie geht es dir?");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_single_failure_fails_whole_document() {
        let pipeline = TranslationPipeline::new(WorkerPool::new(4));
        let result = pipeline
            .translate_text(
                "Erster Satz. Dieser Satz geht boom. Dritter Satz.",
                unit(Arc::new(FailingTranslator::on("boom"))),
            )
            .await;

        assert!(matches!(result, Err(TranslationError::InferenceError { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_busy_serial_model_leaves_workers_for_others() {
        let pipeline = TranslationPipeline::new(WorkerPool::new(2));
        let slow = unit(Arc::new(
            TaggingTranslator::new("en")
                .serial()
                .slow_on("Satz", Duration::from_millis(100)),
        ));
        let fast = Arc::new(TranslationUnit::new(
            Direction::EnDe,
            DeviceKind::Cpu,
            Arc::new(TaggingTranslator::new("de")),
        ));

        let background = pipeline.clone();
        let document = tokio::spawn(async move {
            background
                .translate_text("Ein Satz. Zwei Satz. Drei Satz. Vier Satz.", slow)
                .await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let start = Instant::now();
        let output = pipeline.translate_text("Hello.", fast).await.unwrap();
        assert_eq!(output, "[de] Hello.");
        assert!(start.elapsed() < Duration::from_millis(90));

        let document = document.await.unwrap().unwrap();
        assert_eq!(document.matches("[en]").count(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timeout_is_reported() {
        let backend = Arc::new(
            TaggingTranslator::new("en").slow_on("langsam", Duration::from_millis(300)),
        );
        let pipeline =
            TranslationPipeline::new(WorkerPool::new(2)).with_timeout(Duration::from_millis(50));

        let result = pipeline
            .translate_text("Das ist langsam.", unit(backend))
            .await;
        assert!(matches!(result, Err(TranslationError::TimeoutError { timeout_ms: 50 })));
    }
}
