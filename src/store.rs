//! Document and chunk persistence over redb.
//!
//! Two logical collections back the retrieval layer:
//!
//! - Documents: `id -> {title, meta, added_at}` plus a secondary index
//!   table keyed by `(added_at, id)` for listing by insertion time.
//! - Chunks: keyed by `(doc_id, ordinal)`, split across two tables:
//!   `chunks` holds the JSON text/meta record and `embeddings` holds the
//!   raw little-endian f32 vector bytes.
//!
//! All chunks for a document form a contiguous ordinal sequence starting
//! at 0, regenerated wholesale by [`Store::replace_chunks`]. The delete
//! and re-insert happen inside a single write transaction, so concurrent
//! readers observe either the old chunk set or the new one, never a
//! partial mix.

use std::path::Path;

use redb::{
    Database,
    ReadableDatabase,
    ReadableTable,
    ReadableTableMetadata,
    TableDefinition,
};
use serde::{Deserialize, Serialize};

use crate::{
    chunk_id,
    error::{Error, Result},
};

const DOCUMENTS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("documents");
const DOCUMENTS_BY_ADDED_AT: TableDefinition<(u64, &str), ()> =
    TableDefinition::new("documents_by_added_at");
const CHUNKS: TableDefinition<(&str, u32), &[u8]> =
    TableDefinition::new("chunks");
const EMBEDDINGS: TableDefinition<(&str, u32), &[u8]> =
    TableDefinition::new("embeddings");

/// An open metadata mapping attached to documents and chunks.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// How [`Store::replace_chunks`] treats `texts` and `embeddings` slices of
/// differing length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LengthPolicy {
    /// Zip to the shorter input and log a warning.
    #[default]
    Truncate,
    /// Fail with [`Error::LengthMismatch`] before writing anything.
    Reject,
}

/// A stored document, as returned by [`Store::get_document`] and
/// [`Store::list_documents`].
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    pub meta: Metadata,
    /// Unix-epoch milliseconds, refreshed on every upsert.
    pub added_at: u64,
}

/// A chunk row as returned by [`Store::scan`].
#[derive(Debug, Clone, Serialize)]
pub struct ChunkRecord {
    pub doc_id: String,
    pub chunk_id: String,
    pub text: String,
    /// May be empty; empty vectors are stored but never scored.
    pub embedding: Vec<f32>,
    pub meta: Metadata,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    title: String,
    #[serde(default)]
    meta: Metadata,
    added_at: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredChunk {
    text: String,
    #[serde(default)]
    meta: Metadata,
}

pub struct Store {
    db: Database,
    length_policy: LengthPolicy,
}

impl Store {
    /// Open or create a store at the given path and establish its tables.
    ///
    /// # Examples
    ///
    /// ```
    /// # let tmp = tempfile::tempdir().unwrap();
    /// use ragstore::Store;
    ///
    /// let store = Store::open(&tmp.path().join("store.redb")).unwrap();
    /// assert_eq!(store.count_documents().unwrap(), 0);
    /// ```
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;
        let store = Self {
            db,
            length_policy: LengthPolicy::default(),
        };
        store.ensure_indexes()?;
        Ok(store)
    }

    /// Replace the length policy applied by [`Store::replace_chunks`].
    pub fn with_length_policy(mut self, policy: LengthPolicy) -> Self {
        self.length_policy = policy;
        self
    }

    /// Idempotently establish all lookup tables: chunks keyed by document
    /// id and documents keyed by insertion time. No-op when already
    /// present.
    pub fn ensure_indexes(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        txn.open_table(DOCUMENTS)?;
        txn.open_table(DOCUMENTS_BY_ADDED_AT)?;
        txn.open_table(CHUNKS)?;
        txn.open_table(EMBEDDINGS)?;
        txn.commit()?;
        Ok(())
    }

    /// Create a document or fully replace its title and metadata,
    /// refreshing `added_at` to the current time.
    ///
    /// Repeated calls converge to the last-written state.
    pub fn upsert_document(
        &self,
        id: &str,
        title: &str,
        meta: Metadata,
    ) -> Result<()> {
        self.upsert_document_at(id, title, meta, unix_time_ms())
    }

    fn upsert_document_at(
        &self,
        id: &str,
        title: &str,
        meta: Metadata,
        added_at: u64,
    ) -> Result<()> {
        let txn = self.db.begin_write()?;
        {
            let mut docs = txn.open_table(DOCUMENTS)?;
            let mut by_added = txn.open_table(DOCUMENTS_BY_ADDED_AT)?;

            // Retire the stale index entry before the timestamp moves.
            let previous = docs.get(id)?.map(|guard| guard.value().to_vec());
            if let Some(bytes) = previous
                && let Ok(old) = serde_json::from_slice::<StoredDocument>(&bytes)
            {
                by_added.remove((old.added_at, id))?;
            }

            let record = StoredDocument {
                title: title.to_string(),
                meta,
                added_at,
            };
            docs.insert(id, serde_json::to_vec(&record)?.as_slice())?;
            by_added.insert((added_at, id), ())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Fetch a single document by id.
    pub fn get_document(&self, id: &str) -> Result<Option<DocumentRecord>> {
        let txn = self.db.begin_read()?;
        let docs = txn.open_table(DOCUMENTS)?;

        let Some(guard) = docs.get(id)? else {
            return Ok(None);
        };
        let stored: StoredDocument = serde_json::from_slice(guard.value())?;
        Ok(Some(DocumentRecord {
            id: id.to_string(),
            title: stored.title,
            meta: stored.meta,
            added_at: stored.added_at,
        }))
    }

    /// List all documents, ascending by insertion time.
    ///
    /// Served from the `(added_at, id)` index table, so same-timestamp
    /// documents order deterministically by id.
    pub fn list_documents(&self) -> Result<Vec<DocumentRecord>> {
        let txn = self.db.begin_read()?;
        let docs = txn.open_table(DOCUMENTS)?;
        let by_added = txn.open_table(DOCUMENTS_BY_ADDED_AT)?;

        let mut result = Vec::new();
        for entry in by_added.iter()? {
            let (key, _) = entry?;
            let (added_at, id) = key.value();
            if let Some(guard) = docs.get(id)? {
                let stored: StoredDocument =
                    serde_json::from_slice(guard.value())?;
                result.push(DocumentRecord {
                    id: id.to_string(),
                    title: stored.title,
                    meta: stored.meta,
                    added_at,
                });
            }
        }
        Ok(result)
    }

    /// Delete every chunk stored for `doc_id`, then insert one chunk per
    /// `(text, embedding)` pair in input order with ordinals `0..N-1`.
    /// Returns the number of chunks inserted.
    ///
    /// Runs as a single write transaction: readers see the old chunk set
    /// or the new one, never a partial state. An empty `texts` slice nets
    /// out to deleting all chunks for the document.
    ///
    /// `meta`, when given, is attached to every inserted chunk. Inputs of
    /// differing length are handled per the store's [`LengthPolicy`].
    pub fn replace_chunks(
        &self,
        doc_id: &str,
        texts: &[String],
        embeddings: &[Vec<f32>],
        meta: Option<&Metadata>,
    ) -> Result<usize> {
        if texts.len() != embeddings.len() {
            match self.length_policy {
                LengthPolicy::Reject => {
                    return Err(Error::LengthMismatch {
                        texts: texts.len(),
                        embeddings: embeddings.len(),
                    });
                }
                LengthPolicy::Truncate => {
                    tracing::warn!(
                        doc_id,
                        texts = texts.len(),
                        embeddings = embeddings.len(),
                        "length mismatch, truncating to the shorter input"
                    );
                }
            }
        }

        let txn = self.db.begin_write()?;
        let inserted = {
            let mut chunks = txn.open_table(CHUNKS)?;
            let mut vectors = txn.open_table(EMBEDDINGS)?;

            let stale: Vec<u32> = chunks
                .range((doc_id, 0u32)..=(doc_id, u32::MAX))?
                .map(|entry| entry.map(|(key, _)| key.value().1))
                .collect::<std::result::Result<_, redb::StorageError>>()?;
            for ordinal in &stale {
                chunks.remove((doc_id, *ordinal))?;
                vectors.remove((doc_id, *ordinal))?;
            }

            let mut ordinal = 0u32;
            for (text, embedding) in texts.iter().zip(embeddings) {
                let record = StoredChunk {
                    text: text.clone(),
                    meta: meta.cloned().unwrap_or_default(),
                };
                chunks.insert(
                    (doc_id, ordinal),
                    serde_json::to_vec(&record)?.as_slice(),
                )?;
                vectors.insert(
                    (doc_id, ordinal),
                    bytemuck::cast_slice::<f32, u8>(embedding),
                )?;
                ordinal += 1;
            }
            ordinal as usize
        };
        txn.commit()?;
        Ok(inserted)
    }

    /// Return at most `limit` chunks, restricted to the given document ids
    /// when a filter is present.
    ///
    /// When the true match count exceeds `limit`, which chunks are
    /// returned is unspecified; callers must not rely on it as a stable
    /// sample.
    pub fn scan(
        &self,
        filter: Option<&[String]>,
        limit: usize,
    ) -> Result<Vec<ChunkRecord>> {
        let txn = self.db.begin_read()?;
        let chunks = txn.open_table(CHUNKS)?;
        let vectors = txn.open_table(EMBEDDINGS)?;

        let mut result = Vec::new();
        match filter {
            Some(doc_ids) => {
                // Filter semantics are set-like; ignore repeated ids.
                let mut seen = std::collections::HashSet::new();
                'outer: for doc_id in doc_ids {
                    if !seen.insert(doc_id.as_str()) {
                        continue;
                    }
                    let range = chunks.range(
                        (doc_id.as_str(), 0u32)..=(doc_id.as_str(), u32::MAX),
                    )?;
                    for entry in range {
                        if result.len() >= limit {
                            break 'outer;
                        }
                        let (key, value) = entry?;
                        let (doc_id, ordinal) = key.value();
                        result.push(read_chunk(
                            &vectors,
                            doc_id,
                            ordinal,
                            value.value(),
                        )?);
                    }
                }
            }
            None => {
                for entry in chunks.iter()? {
                    if result.len() >= limit {
                        break;
                    }
                    let (key, value) = entry?;
                    let (doc_id, ordinal) = key.value();
                    result.push(read_chunk(
                        &vectors,
                        doc_id,
                        ordinal,
                        value.value(),
                    )?);
                }
            }
        }
        Ok(result)
    }

    pub fn count_documents(&self) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let docs = txn.open_table(DOCUMENTS)?;
        Ok(docs.len()?)
    }

    pub fn count_chunks(&self) -> Result<u64> {
        let txn = self.db.begin_read()?;
        let chunks = txn.open_table(CHUNKS)?;
        Ok(chunks.len()?)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("length_policy", &self.length_policy)
            .finish_non_exhaustive()
    }
}

fn read_chunk(
    vectors: &impl ReadableTable<(&'static str, u32), &'static [u8]>,
    doc_id: &str,
    ordinal: u32,
    record_bytes: &[u8],
) -> Result<ChunkRecord> {
    let stored: StoredChunk = serde_json::from_slice(record_bytes)?;
    let embedding = match vectors.get((doc_id, ordinal))? {
        Some(guard) => decode_embedding(guard.value()),
        None => Vec::new(),
    };
    Ok(ChunkRecord {
        doc_id: doc_id.to_string(),
        chunk_id: chunk_id::chunk_id(doc_id, ordinal),
        text: stored.text,
        embedding,
        meta: stored.meta,
    })
}

fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
    if bytes.len() % 4 != 0 {
        // Malformed payload; surfaces as a non-scorable empty vector.
        return Vec::new();
    }
    bytemuck::pod_collect_to_vec(bytes)
}

fn unix_time_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
