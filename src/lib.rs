//! ragstore - a minimal local vector store and retrieval layer.
//!
//! ragstore persists documents and their embedded text chunks in an
//! embedded [redb](https://github.com/cberner/redb) database and serves
//! nearest-neighbor queries by brute-force cosine similarity over a capped
//! candidate pool. Embeddings are produced elsewhere; this crate only
//! stores and ranks them.
//!
//! # Quick start
//!
//! ```no_run
//! use ragstore::{DataDir, Store, search};
//!
//! let data_dir = DataDir::resolve(None).unwrap();
//! let store = Store::open(&data_dir.store_db()).unwrap();
//!
//! store
//!     .upsert_document("guide", "User guide", Default::default())
//!     .unwrap();
//! store
//!     .replace_chunks(
//!         "guide",
//!         &["installation steps".to_string()],
//!         &[vec![0.1, 0.9, 0.3]],
//!         None,
//!     )
//!     .unwrap();
//!
//! let results = search::search(&store, &[0.1, 0.9, 0.3], 5, None).unwrap();
//! for r in &results {
//!     println!("{} (score: {:.3})", r.chunk_id, r.score);
//! }
//! ```

pub mod chunk_id;
pub mod data_dir;
pub mod error;
pub mod search;
pub mod store;

pub use data_dir::DataDir;
pub use error::{Error, Result};
pub use search::{MAX_CANDIDATES, SearchResult};
pub use store::{ChunkRecord, DocumentRecord, LengthPolicy, Metadata, Store};
