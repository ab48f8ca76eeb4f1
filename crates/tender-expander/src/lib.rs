//! Archive expansion: given a batch, pulls the archive from Blob,
//! recursively unpacks it up to a bounded depth, filters supported
//! extensions, writes expanded files back to Blob, creates per-file work
//! items in Store, then enqueues one job per file.

pub mod error;

use std::io::Read;
use std::path::{Path, PathBuf};

use tender_blob::Blob;
use tender_config::ExpanderConfig;
use tender_queue::{Envelope, Queue};
use tender_store::{BatchState, Store};
use uuid::Uuid;

pub use error::{ExpanderError, ExpanderResult};

/// Outcome of a completed `expand_batch` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpanderOutcome {
    /// The batch was not in `QUEUED`; no work was done.
    AlreadyExpanded,
    /// Zero supported files were discovered; the batch was marked `FAILED`.
    NoSupportedFiles,
    /// Expansion succeeded; `total_files` work items were created and
    /// enqueued.
    Expanded {
        /// Number of work items created.
        total_files: i64,
    },
}

struct DiscoveredFile {
    relative_path: String,
    absolute_path: PathBuf,
    extension: String,
}

/// Unpack one archive's bytes into `target_dir`, recursing into nested
/// `.zip` entries up to `max_depth`. `depth` is the depth of entries
/// directly inside the archive being read (1 for the outermost archive).
fn expand_archive_into(
    archive_bytes: &[u8],
    target_dir: &Path,
    relative_prefix: &str,
    depth: u32,
    max_depth: u32,
    discovered: &mut Vec<DiscoveredFile>,
) -> ExpanderResult<()> {
    let cursor = std::io::Cursor::new(archive_bytes);
    let mut archive = zip::ZipArchive::new(cursor)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }

        if depth > max_depth {
            tracing::warn!(depth, max_depth, entry = entry.name(), "archive entry beyond max depth, skipping");
            continue;
        }

        let name = entry.name().to_string();
        let file_name = name.rsplit('/').next().unwrap_or(&name).to_string();
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        if extension == "zip" {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;

            let stem = file_name.strip_suffix(".zip").unwrap_or(&file_name);
            let sub_dir_name = format!("{stem}_zip");
            let sub_relative = if relative_prefix.is_empty() {
                sub_dir_name.clone()
            } else {
                format!("{relative_prefix}/{sub_dir_name}")
            };
            let sub_target = target_dir.join(&sub_dir_name);
            std::fs::create_dir_all(&sub_target)?;

            expand_archive_into(&bytes, &sub_target, &sub_relative, depth + 1, max_depth, discovered)?;
        } else {
            let relative_path = if relative_prefix.is_empty() {
                file_name.clone()
            } else {
                format!("{relative_prefix}/{file_name}")
            };
            let absolute_path = target_dir.join(&file_name);
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            std::fs::write(&absolute_path, &bytes)?;

            discovered.push(DiscoveredFile {
                relative_path,
                absolute_path,
                extension,
            });
        }
    }

    Ok(())
}

async fn fail_batch(store: &dyn Store, batch_id: &str, reason: &str) -> ExpanderResult<()> {
    store
        .transition_batch(batch_id, &[BatchState::Extracting], BatchState::Failed, Some(reason))
        .await?;
    Ok(())
}

/// Expand `batch_id`'s archive and schedule its work items.
///
/// # Errors
/// Returns [`ExpanderError`] for failures that could not be handled by
/// marking the batch `FAILED` (Store/Queue/Blob access itself failing).
/// Archive-content failures (malformed zip, zero supported files) instead
/// surface as `Ok(ExpanderOutcome::NoSupportedFiles)` or mark the batch
/// `FAILED` and return the same variant, per the Expander's failure
/// semantics.
pub async fn expand_batch(
    batch_id: &str,
    store: &dyn Store,
    blob: &dyn Blob,
    queue: &dyn Queue,
    config: &ExpanderConfig,
) -> ExpanderResult<ExpanderOutcome> {
    let applied = store
        .transition_batch(batch_id, &[BatchState::Queued], BatchState::Extracting, None)
        .await?;
    if !applied {
        return Ok(ExpanderOutcome::AlreadyExpanded);
    }

    let result = run_expansion(batch_id, store, blob, queue, config).await;

    match result {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            fail_batch(store, batch_id, &err.to_string()).await?;
            Ok(ExpanderOutcome::NoSupportedFiles)
        }
    }
}

async fn run_expansion(
    batch_id: &str,
    store: &dyn Store,
    blob: &dyn Blob,
    queue: &dyn Queue,
    config: &ExpanderConfig,
) -> ExpanderResult<ExpanderOutcome> {
    let batch = store
        .get_batch(batch_id)
        .await?
        .ok_or_else(|| ExpanderError::Store(format!("batch {batch_id} disappeared mid-expansion")))?;

    let archive_bytes = blob.get(&batch.archive_key).await?;

    let scratch = tempfile::tempdir()?;
    let mut discovered = Vec::new();
    expand_archive_into(
        &archive_bytes,
        scratch.path(),
        "",
        1,
        config.max_archive_depth,
        &mut discovered,
    )?;

    let supported: Vec<DiscoveredFile> = discovered
        .into_iter()
        .filter(|f| config.is_supported(&f.extension))
        .collect();

    if supported.is_empty() {
        fail_batch(store, batch_id, "No supported files found").await?;
        return Ok(ExpanderOutcome::NoSupportedFiles);
    }

    let mut created_doc_ids = Vec::with_capacity(supported.len());
    for file in &supported {
        let file_key = format!("extracted/{batch_id}/{}", file.relative_path);
        let bytes = std::fs::read(&file.absolute_path)?;
        blob.put(&file_key, bytes).await?;

        let doc_id = format!("{batch_id}_{}", Uuid::new_v4());
        let filename = file
            .relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&file.relative_path)
            .to_string();

        let (item, created) = store
            .create_work_item(batch_id, &doc_id, &filename, &file_key, &file.extension)
            .await?;
        if created {
            created_doc_ids.push(item.doc_id);
        }
    }

    let total_files = i64::try_from(created_doc_ids.len()).unwrap_or(i64::MAX);
    store.set_batch_total_files(batch_id, total_files).await?;
    store
        .transition_batch(batch_id, &[BatchState::Extracting], BatchState::Queued, None)
        .await?;

    for doc_id in &created_doc_ids {
        queue.enqueue(&Envelope::process_file(doc_id.clone())).await?;
    }

    tracing::info!(batch_id, total_files, "batch expanded");
    Ok(ExpanderOutcome::Expanded { total_files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tender_blob::MockBlob;
    use tender_queue::MockQueue;
    use tender_store::MockStore;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let cursor = std::io::Cursor::new(&mut buf);
            let mut writer = zip::ZipWriter::new(cursor);
            let options: zip::write::FileOptions<'_, ()> = zip::write::FileOptions::default();
            for (name, bytes) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(bytes).unwrap();
            }
            writer.finish().unwrap();
        }
        buf
    }

    fn expander_config() -> ExpanderConfig {
        ExpanderConfig {
            max_archive_depth: 3,
            supported_extensions: vec!["pdf".into(), "docx".into(), "xlsx".into()],
        }
    }

    #[tokio::test]
    async fn happy_path_creates_one_work_item_per_supported_file() {
        let store = MockStore::new();
        let blob = MockBlob::new();
        let queue = MockQueue::new();

        store.create_batch("b1", "uploads/b1/archive.zip", None).await.unwrap();
        let zip_bytes = build_zip(&[("a.pdf", b"pdf"), ("b.docx", b"docx"), ("c.xlsx", b"xlsx")]);
        blob.put("uploads/b1/archive.zip", zip_bytes).await.unwrap();

        let outcome = expand_batch("b1", &store, &blob, &queue, &expander_config())
            .await
            .unwrap();
        assert_eq!(outcome, ExpanderOutcome::Expanded { total_files: 3 });

        let batch = store.get_batch("b1").await.unwrap().unwrap();
        assert_eq!(batch.state, BatchState::Queued);
        assert_eq!(batch.total_files, 3);

        let metrics = queue.metrics().await.unwrap();
        assert_eq!(metrics.queue_length, 3);
    }

    #[tokio::test]
    async fn zero_supported_files_fails_the_batch() {
        let store = MockStore::new();
        let blob = MockBlob::new();
        let queue = MockQueue::new();

        store.create_batch("b1", "uploads/b1/archive.zip", None).await.unwrap();
        let zip_bytes = build_zip(&[("readme.md", b"hello")]);
        blob.put("uploads/b1/archive.zip", zip_bytes).await.unwrap();

        let outcome = expand_batch("b1", &store, &blob, &queue, &expander_config())
            .await
            .unwrap();
        assert_eq!(outcome, ExpanderOutcome::NoSupportedFiles);

        let batch = store.get_batch("b1").await.unwrap().unwrap();
        assert_eq!(batch.state, BatchState::Failed);
    }

    #[tokio::test]
    async fn nested_archive_is_expanded_at_next_depth() {
        let store = MockStore::new();
        let blob = MockBlob::new();
        let queue = MockQueue::new();

        let inner_zip = build_zip(&[("deep.docx", b"deep")]);
        let outer_zip = build_zip(&[("outer.pdf", b"outer"), ("inner.zip", &inner_zip)]);

        store.create_batch("b1", "uploads/b1/archive.zip", None).await.unwrap();
        blob.put("uploads/b1/archive.zip", outer_zip).await.unwrap();

        let outcome = expand_batch("b1", &store, &blob, &queue, &expander_config())
            .await
            .unwrap();
        assert_eq!(outcome, ExpanderOutcome::Expanded { total_files: 2 });

        assert!(blob.exists("extracted/b1/inner_zip/deep.docx").await.unwrap());
        assert!(blob.exists("extracted/b1/outer.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn re_running_on_already_expanded_batch_is_a_no_op() {
        let store = MockStore::new();
        let blob = MockBlob::new();
        let queue = MockQueue::new();

        store.create_batch("b1", "uploads/b1/archive.zip", None).await.unwrap();
        store
            .transition_batch("b1", &[BatchState::Queued], BatchState::Extracting, None)
            .await
            .unwrap();
        store
            .transition_batch("b1", &[BatchState::Extracting], BatchState::Queued, None)
            .await
            .unwrap();

        let outcome = expand_batch("b1", &store, &blob, &queue, &expander_config())
            .await
            .unwrap();
        assert_eq!(outcome, ExpanderOutcome::AlreadyExpanded);
    }
}
