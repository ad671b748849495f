//! Bulk processing.
//!
//! Documents run in parallel on the blocking pool, bounded by a semaphore of
//! `app.max_concurrent` permits. Each document either yields a record or a
//! failure marker in its input position; one bad file never aborts the
//! batch. Only resource exhaustion stops the run.

use crate::core::loader::load_path;
use crate::core::pipeline::{Pipeline, ProcessOptions};
use crate::types::{BatchItemResult, Document};
use crate::{CvError, Result};
use ahash::AHashMap;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Runtime backing the synchronous wrappers.
///
/// Creation only fails when the process is out of threads or memory, in
/// which case nothing else would work either.
static GLOBAL_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create global Tokio runtime - system may be out of resources")
});

/// Best-effort text of a panic payload.
fn panic_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}

fn panicked(source: String, err: JoinError) -> BatchItemResult {
    let err = CvError::Panic(panic_message(err));
    tracing::error!(%source, error = %err, "Document task panicked");
    BatchItemResult::failed(source, &err)
}

async fn process_one(
    pipeline: Arc<Pipeline>,
    document: Document,
    options: Arc<ProcessOptions>,
    semaphore: Arc<Semaphore>,
    timeout: Option<Duration>,
) -> Result<BatchItemResult> {
    let permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| CvError::Other(format!("Concurrency limiter closed: {}", e)))?;

    let source = document.source.clone();
    // The permit lives as long as the blocking work, even after a timeout.
    let work = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        pipeline.process_document(&document, &options)
    });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, work).await {
            Ok(joined) => joined,
            Err(_) => {
                let err = CvError::Timeout {
                    seconds: limit.as_secs(),
                };
                tracing::warn!(%source, error = %err, "Document timed out");
                return Ok(BatchItemResult::failed(source, &err));
            }
        },
        None => work.await,
    };

    let outcome = match joined {
        Ok(outcome) => outcome,
        Err(e) => return Ok(panicked(source, e)),
    };
    match outcome {
        Ok(record) => Ok(BatchItemResult::ok(record)),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            tracing::warn!(%source, error = %e, "Document failed");
            Ok(BatchItemResult::failed(source, &e))
        }
    }
}

/// Process `documents` concurrently, preserving input order.
///
/// # Errors
///
/// Returns the first `CvError::ResourceExhausted` raised by any document.
/// Every other failure, including a panic while processing a document, is
/// reported as an unsuccessful [`BatchItemResult`].
pub async fn batch_process(
    pipeline: Arc<Pipeline>,
    documents: Vec<Document>,
    options: &ProcessOptions,
) -> Result<Vec<BatchItemResult>> {
    if documents.is_empty() {
        return Ok(Vec::new());
    }

    let app = &pipeline.config().app;
    let semaphore = Arc::new(Semaphore::new(app.concurrency()));
    let timeout = app.document_timeout_secs.map(Duration::from_secs);
    let options = Arc::new(options.clone());
    tracing::debug!(
        documents = documents.len(),
        concurrency = app.concurrency(),
        ?timeout,
        "Starting batch"
    );

    let mut tasks = JoinSet::new();
    let mut slots: AHashMap<tokio::task::Id, (usize, String)> = AHashMap::new();
    let total = documents.len();
    for (index, document) in documents.into_iter().enumerate() {
        let source = document.source.clone();
        let task = process_one(
            Arc::clone(&pipeline),
            document,
            Arc::clone(&options),
            Arc::clone(&semaphore),
            timeout,
        );
        let handle = tasks.spawn(task);
        slots.insert(handle.id(), (index, source));
    }

    let mut results: Vec<Option<BatchItemResult>> = vec![None; total];
    while let Some(joined) = tasks.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(e) => {
                let Some((index, source)) = slots.remove(&e.id()) else {
                    continue;
                };
                results[index] = Some(panicked(source, e));
                continue;
            }
        };
        let Some((index, _)) = slots.remove(&id) else {
            continue;
        };
        match outcome {
            Ok(item) => results[index] = Some(item),
            Err(e) => {
                tasks.abort_all();
                return Err(e);
            }
        }
    }

    Ok(results.into_iter().flatten().collect())
}

/// Load every path (expanding archives) and process the resulting documents.
///
/// Files that cannot be loaded, and archive members that fail to expand,
/// become failure markers at their position.
///
/// # Errors
///
/// As [`batch_process`].
///
/// # Example
///
/// ```no_run
/// use cvinsight::{Pipeline, PipelineConfig, ProcessOptions, batch_process_paths};
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let pipeline = Arc::new(Pipeline::new(PipelineConfig::default())?);
/// let results = batch_process_paths(pipeline, vec!["resumes.zip"], &ProcessOptions::default()).await?;
/// for item in results.iter().filter(|r| !r.success) {
///     println!("{} failed", item.source);
/// }
/// # Ok::<(), cvinsight::CvError>(())
/// # }).unwrap();
/// ```
pub async fn batch_process_paths(
    pipeline: Arc<Pipeline>,
    paths: Vec<impl AsRef<Path>>,
    options: &ProcessOptions,
) -> Result<Vec<BatchItemResult>> {
    enum Slot {
        Document,
        Failed(BatchItemResult),
    }

    let mut slots = Vec::new();
    let mut documents = Vec::new();
    for path in paths {
        let path = path.as_ref();
        match load_path(path, &pipeline.config().app) {
            Ok(loaded) => {
                for document in loaded.documents {
                    slots.push(Slot::Document);
                    documents.push(document);
                }
                for (member, err) in loaded.failures {
                    tracing::warn!(%member, error = %err, "Archive member failed to load");
                    slots.push(Slot::Failed(BatchItemResult::failed(member, &err)));
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Input failed to load");
                slots.push(Slot::Failed(BatchItemResult::failed(path.display().to_string(), &e)));
            }
        }
    }

    let mut processed = batch_process(pipeline, documents, options).await?.into_iter();
    Ok(slots
        .into_iter()
        .filter_map(|slot| match slot {
            Slot::Document => processed.next(),
            Slot::Failed(item) => Some(item),
        })
        .collect())
}

/// Blocking form of [`batch_process`] on a shared runtime.
///
/// Must not be called from inside an async context.
///
/// # Errors
///
/// As [`batch_process`].
pub fn batch_process_sync(
    pipeline: Arc<Pipeline>,
    documents: Vec<Document>,
    options: &ProcessOptions,
) -> Result<Vec<BatchItemResult>> {
    GLOBAL_RUNTIME.block_on(batch_process(pipeline, documents, options))
}

/// Blocking form of [`batch_process_paths`].
///
/// # Errors
///
/// As [`batch_process`].
pub fn batch_process_paths_sync(
    pipeline: Arc<Pipeline>,
    paths: Vec<impl AsRef<Path>>,
    options: &ProcessOptions,
) -> Result<Vec<BatchItemResult>> {
    GLOBAL_RUNTIME.block_on(batch_process_paths(pipeline, paths, options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PipelineConfig;
    use crate::types::FileKind;

    fn pipeline() -> Arc<Pipeline> {
        Arc::new(Pipeline::builder(PipelineConfig::default()).without_ocr().build().unwrap())
    }

    fn text(name: &str, body: &str) -> Document {
        Document::new(name, body.as_bytes().to_vec(), FileKind::PlainText)
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let documents: Vec<Document> = (0..12)
            .map(|i| text(&format!("cv-{}.txt", i), &format!("Contact: person{}@example.com", i)))
            .collect();
        let results = batch_process(pipeline(), documents, &ProcessOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 12);
        for (i, item) in results.iter().enumerate() {
            assert!(item.success);
            assert_eq!(item.source, format!("cv-{}.txt", i));
            let email = item.record.as_ref().unwrap().personal_info.email.clone();
            assert_eq!(email, Some(format!("person{}@example.com", i)));
        }
    }

    #[tokio::test]
    async fn test_failures_become_markers() {
        let documents = vec![
            text("good.txt", "Email: a@example.com"),
            Document::new("broken.png", b"not a png".to_vec(), FileKind::Image(crate::types::ImageFormat::Png)),
        ];
        let results = batch_process(pipeline(), documents, &ProcessOptions::default())
            .await
            .unwrap();
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(results[1].error.as_ref().unwrap().kind, "parsing");
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let results = batch_process(pipeline(), Vec::new(), &ProcessOptions::default())
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_sync_wrapper() {
        let results = batch_process_sync(pipeline(), vec![text("a.txt", "x")], &ProcessOptions::default()).unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].success);
    }
}
