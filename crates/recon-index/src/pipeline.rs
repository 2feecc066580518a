//! Ingestion orchestrator: discover → read → chunk → batch → embed → upsert.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use recon_llm::EmbeddingProvider;
use recon_store::{DistanceMetric, VectorPoint, VectorStore};

use crate::chunker::{Chunker, ChunkerConfig};
use crate::discovery::{DiscoveryConfig, FileDiscoverer, extension_of};
use crate::error::{IndexError, Result};
use crate::identity::{chunk_id, path_prefixes, relative_path};
use crate::loader::{Document, LoaderConfig, load_document};

/// Payload field holding every ancestor directory of the point's file.
pub const PATH_PREFIXES_FIELD: &str = "path_prefixes";

/// Payload fields with keyword indexes, used for filtering and pruning.
pub const INDEXED_PAYLOAD_FIELDS: &[&str] = &["path", PATH_PREFIXES_FIELD];

const PROGRESS_EVERY_FILES: usize = 10;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub collection: String,
    /// Vector length the collection is created with; every embedding must match it.
    pub dimension: usize,
    pub batch_size: usize,
    pub chunker: ChunkerConfig,
    pub discovery: DiscoveryConfig,
    pub loader: LoaderConfig,
    /// Delete a file's points that were not produced by this run, once all of
    /// its chunks were indexed.
    pub prune_stale: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            collection: "sovereignty-arch".into(),
            dimension: 384,
            batch_size: 32,
            chunker: ChunkerConfig::default(),
            discovery: DiscoveryConfig::default(),
            loader: LoaderConfig::default(),
            prune_stale: true,
        }
    }
}

/// Summary of an ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub files_discovered: usize,
    pub files_skipped: usize,
    pub chunks_generated: usize,
    pub chunks_indexed: usize,
    pub batches_total: usize,
    pub batches_failed: usize,
    pub files_pruned: usize,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl IngestReport {
    /// True when some chunks did not make it into the index.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.batches_failed > 0 || self.chunks_indexed < self.chunks_generated
    }
}

impl std::fmt::Display for IngestReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Files discovered: {}", self.files_discovered)?;
        writeln!(f, "Files skipped:    {}", self.files_skipped)?;
        writeln!(f, "Chunks generated: {}", self.chunks_generated)?;
        writeln!(f, "Chunks indexed:   {}", self.chunks_indexed)?;
        writeln!(
            f,
            "Batches failed:   {}/{}",
            self.batches_failed, self.batches_total
        )?;
        write!(f, "Duration:         {} ms", self.duration_ms)
    }
}

/// A chunk waiting for its embedding.
#[derive(Debug, Clone)]
struct PendingChunk {
    point_id: String,
    text: String,
    file: usize,
    payload: HashMap<String, serde_json::Value>,
}

/// Per-file bookkeeping for stale point pruning.
#[derive(Debug)]
struct FileState {
    path: String,
    point_ids: Vec<String>,
    failed: bool,
}

pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    chunker: Chunker,
    config: IngestConfig,
}

impl IngestionPipeline {
    /// # Errors
    ///
    /// Returns `IndexError::Config` for an invalid chunker config, zero batch
    /// size or zero dimension.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: IngestConfig,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.chunker)?;
        if config.batch_size == 0 {
            return Err(IndexError::Config("batch_size must be greater than 0".into()));
        }
        if config.dimension == 0 {
            return Err(IndexError::Config("dimension must be greater than 0".into()));
        }
        Ok(Self {
            embedder,
            store,
            chunker,
            config,
        })
    }

    /// Poll the vector store and embedding service until both answer or
    /// `timeout` elapses. Returns whether both became ready.
    pub async fn wait_for_services(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let store_ok = self.store.health().await.is_ok();
            let embedder_ok = self
                .embedder
                .health()
                .await
                .is_ok_and(|h| h.is_healthy());
            if store_ok && embedder_ok {
                return true;
            }
            if Instant::now() >= deadline {
                tracing::warn!(store_ok, embedder_ok, "services not ready, proceeding anyway");
                return false;
            }
            tracing::info!(store_ok, embedder_ok, "waiting for services");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    /// Index every candidate file under `root`.
    ///
    /// File-level and batch-level failures are recorded in the report and do
    /// not stop the run.
    ///
    /// # Errors
    ///
    /// Returns an error if `root` is not a directory, the collection cannot be
    /// prepared (including a vector size mismatch), or the embedding service
    /// returns vectors of the wrong dimension.
    pub async fn run(&self, root: &Path) -> Result<IngestReport> {
        let start = Instant::now();
        let mut report = IngestReport::default();

        if !root.is_dir() {
            return Err(IndexError::RepositoryNotFound(root.to_path_buf()));
        }

        self.prepare_collection().await?;

        let (pending, mut files) = self.collect_chunks(root, &mut report).await;
        report.chunks_generated = pending.len();
        tracing::info!(
            files = report.files_discovered,
            skipped = report.files_skipped,
            chunks = report.chunks_generated,
            "chunking complete"
        );

        self.index_batches(pending, &mut files, &mut report).await?;

        if self.config.prune_stale {
            self.prune(&files, &mut report).await;
        }

        report.duration_ms = start.elapsed().as_millis().try_into().unwrap_or(u64::MAX);
        tracing::info!(
            files_discovered = report.files_discovered,
            chunks_generated = report.chunks_generated,
            chunks_indexed = report.chunks_indexed,
            batches_failed = report.batches_failed,
            duration_ms = report.duration_ms,
            "ingestion finished"
        );
        Ok(report)
    }

    async fn prepare_collection(&self) -> Result<()> {
        let collection = &self.config.collection;
        self.store
            .ensure_collection(collection, self.config.dimension as u64, DistanceMetric::Cosine)
            .await?;
        for field in INDEXED_PAYLOAD_FIELDS {
            if let Err(e) = self.store.create_keyword_index(collection, field).await {
                tracing::warn!(collection = %collection, field, "payload index not created: {e}");
            }
        }
        Ok(())
    }

    async fn collect_chunks(
        &self,
        root: &Path,
        report: &mut IngestReport,
    ) -> (Vec<PendingChunk>, Vec<FileState>) {
        let discoverer = FileDiscoverer::new(root, self.config.discovery.clone());
        let mut pending = Vec::new();
        let mut files = Vec::new();

        let candidates: Vec<PathBuf> = discoverer.files().collect();

        for abs_path in candidates {
            report.files_discovered += 1;
            let rel_path = relative_path(root, &abs_path);

            let document = match load_document(&abs_path, &rel_path, &self.config.loader).await {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!(file = %rel_path, "skipped: {e}");
                    report.files_skipped += 1;
                    report.errors.push(e.to_string());
                    continue;
                }
            };

            let file_idx = files.len();
            let chunks = self.chunk_document(&document, &abs_path, file_idx);
            files.push(FileState {
                path: rel_path.clone(),
                point_ids: chunks.iter().map(|c| c.point_id.clone()).collect(),
                failed: false,
            });
            tracing::debug!(file = %rel_path, chunks = chunks.len(), "chunked");
            pending.extend(chunks);

            if report.files_discovered % PROGRESS_EVERY_FILES == 0 {
                tracing::info!(
                    files = report.files_discovered,
                    chunks = pending.len(),
                    "processed files"
                );
            }
        }
        (pending, files)
    }

    fn chunk_document(
        &self,
        document: &Document,
        abs_path: &Path,
        file: usize,
    ) -> Vec<PendingChunk> {
        let texts: Vec<String> = self.chunker.chunks(&document.content).collect();
        let total = texts.len();
        let extension = extension_of(abs_path).unwrap_or_default();
        let file_size = document.char_len();
        let prefixes = path_prefixes(&document.path);

        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let id = chunk_id(&document.path, index, &text);
                let payload = HashMap::from([
                    ("path".to_owned(), serde_json::json!(document.path)),
                    ("chunk".to_owned(), serde_json::json!(index)),
                    ("total_chunks".to_owned(), serde_json::json!(total)),
                    ("extension".to_owned(), serde_json::json!(extension)),
                    ("file_size".to_owned(), serde_json::json!(file_size)),
                    ("chunk_size".to_owned(), serde_json::json!(text.chars().count())),
                    ("text".to_owned(), serde_json::json!(text)),
                    (PATH_PREFIXES_FIELD.to_owned(), serde_json::json!(prefixes)),
                    ("content_hash".to_owned(), serde_json::json!(id.content_hash)),
                ]);
                PendingChunk {
                    point_id: id.point_id,
                    text,
                    file,
                    payload,
                }
            })
            .collect()
    }

    async fn index_batches(
        &self,
        pending: Vec<PendingChunk>,
        files: &mut [FileState],
        report: &mut IngestReport,
    ) -> Result<()> {
        let batch_size = self.config.batch_size;
        report.batches_total = pending.len().div_ceil(batch_size);
        let total = report.batches_total;

        for (i, batch) in pending.chunks(batch_size).enumerate() {
            let batch_no = i + 1;
            match self.index_batch(batch).await {
                Ok(()) => {
                    report.chunks_indexed += batch.len();
                    tracing::info!(
                        batch = batch_no,
                        size = batch.len(),
                        "uploaded batch {batch_no}/{total}"
                    );
                }
                Err(e @ IndexError::DimensionMismatch { .. }) => return Err(e),
                Err(e) => {
                    tracing::error!(
                        batch = batch_no,
                        size = batch.len(),
                        "batch {batch_no}/{total} failed: {e}"
                    );
                    report.batches_failed += 1;
                    report.errors.push(format!("batch {batch_no}: {e}"));
                    for chunk in batch {
                        files[chunk.file].failed = true;
                    }
                }
            }
        }
        Ok(())
    }

    async fn index_batch(&self, batch: &[PendingChunk]) -> Result<()> {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;

        if vectors.len() != batch.len() {
            return Err(IndexError::Embedding(recon_llm::LlmError::InvalidResponse {
                service: "embedder",
                reason: format!("expected {} vectors, got {}", batch.len(), vectors.len()),
            }));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.config.dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: self.config.dimension,
                actual: bad.len(),
            });
        }

        let points = batch
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| VectorPoint {
                id: chunk.point_id.clone(),
                vector,
                payload: chunk.payload.clone(),
            })
            .collect();
        self.store.upsert(&self.config.collection, points).await?;
        Ok(())
    }

    async fn prune(&self, files: &[FileState], report: &mut IngestReport) {
        for file in files.iter().filter(|f| !f.failed) {
            match self
                .store
                .delete_stale(&self.config.collection, &file.path, file.point_ids.clone())
                .await
            {
                Ok(()) => report.files_pruned += 1,
                Err(e) => {
                    tracing::warn!(file = %file.path, "stale point cleanup failed: {e}");
                    report.errors.push(format!("prune {}: {e}", file.path));
                }
            }
        }
    }
}
