//! Route index interface and an in-memory implementation.
//!
//! The router only needs four things from an index: read and write the
//! state hash, add a batch of embedded utterances, and list what is stored.
//! Similarity search belongs to the index and is not part of this interface.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use semroute_encoders::Embedding;

use crate::error::IndexError;
use crate::hash::StateHash;
use crate::route::{RouteDetails, Utterance};

/// Result type alias for index operations.
pub type IndexResult<T> = std::result::Result<T, IndexError>;

/// Embedded utterances to store, as parallel sequences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexBatch {
    pub embeddings: Vec<Embedding>,
    pub route_names: Vec<String>,
    pub utterances: Vec<String>,
    pub function_schemas: Vec<Option<Vec<Value>>>,
    pub metadata: Vec<Option<Map<String, Value>>>,
}

impl IndexBatch {
    /// Pair embeddings with the routes they were computed from.
    pub fn new(embeddings: Vec<Embedding>, details: RouteDetails) -> Self {
        Self {
            embeddings,
            route_names: details.route_names,
            utterances: details.utterances,
            function_schemas: details.function_schemas,
            metadata: details.metadata,
        }
    }

    /// Number of embeddings.
    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Check that every sequence has the same length.
    pub fn check_aligned(&self) -> IndexResult<()> {
        let n = self.embeddings.len();
        let aligned = self.route_names.len() == n
            && self.utterances.len() == n
            && self.function_schemas.len() == n
            && self.metadata.len() == n;
        if aligned {
            return Ok(());
        }
        Err(IndexError::LengthMismatch {
            embeddings: n,
            route_names: self.route_names.len(),
            utterances: self.utterances.len(),
            function_schemas: self.function_schemas.len(),
            metadata: self.metadata.len(),
        })
    }
}

/// Storage the router keeps in sync with its local route set.
///
/// Calls are not coordinated with each other: a `read_hash` followed by a
/// `write_hash` is not atomic, so writers sharing one index must be
/// serialized by the caller.
pub trait RouteIndex {
    /// Read the stored state hash. Never-written indexes return
    /// [`StateHash::Uninitialized`].
    fn read_hash(&self) -> IndexResult<StateHash>;

    /// Replace the stored state hash.
    fn write_hash(&mut self, hash: StateHash) -> IndexResult<()>;

    /// Store a batch of embedded utterances.
    fn add(&mut self, batch: IndexBatch) -> IndexResult<()>;

    /// List every stored utterance.
    fn utterances(&self) -> IndexResult<Vec<Utterance>>;
}

impl<T: RouteIndex + ?Sized> RouteIndex for Box<T> {
    fn read_hash(&self) -> IndexResult<StateHash> {
        (**self).read_hash()
    }

    fn write_hash(&mut self, hash: StateHash) -> IndexResult<()> {
        (**self).write_hash(hash)
    }

    fn add(&mut self, batch: IndexBatch) -> IndexResult<()> {
        (**self).add(batch)
    }

    fn utterances(&self) -> IndexResult<Vec<Utterance>> {
        (**self).utterances()
    }
}

/// An entry in the local index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Route the utterance belongs to.
    pub route: String,

    /// The utterance text.
    pub utterance: String,

    /// The embedding vector.
    pub embedding: Embedding,

    /// Function schemas of the owning route.
    pub function_schemas: Option<Vec<Value>>,

    /// Metadata of the owning route.
    pub metadata: Option<Map<String, Value>>,
}

/// Persisted form of a [`LocalIndex`].
#[derive(Serialize, Deserialize)]
struct Snapshot {
    hash: StateHash,
    dimension: Option<usize>,
    entries: Vec<IndexEntry>,
}

/// An in-memory route index.
///
/// Entries are appended in insertion order; duplicates are kept. The
/// embedding dimension is fixed by [`LocalIndex::with_dimension`] or by the
/// first stored vector.
#[derive(Debug, Clone)]
pub struct LocalIndex {
    /// Stored entries.
    entries: Vec<IndexEntry>,

    /// Expected dimension of embeddings.
    dimension: Option<usize>,

    /// State hash marker.
    hash: StateHash,
}

impl Default for LocalIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            dimension: None,
            hash: StateHash::Uninitialized,
        }
    }

    /// Create an empty index that only accepts `dimension`-length vectors.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            ..Self::new()
        }
    }

    /// Expected embedding dimension, once known.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Get the number of entries in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored entries, in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Distinct route names, sorted.
    pub fn route_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.route.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Serialize the index to JSON.
    pub fn to_json(&self) -> IndexResult<String> {
        let snapshot = Snapshot {
            hash: self.hash.clone(),
            dimension: self.dimension,
            entries: self.entries.clone(),
        };
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// Load index from JSON.
    pub fn from_json(json: &str) -> IndexResult<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;

        let mut dimension = snapshot.dimension;
        for entry in &snapshot.entries {
            check_dimension(&mut dimension, &entry.embedding)?;
        }

        info!("Loaded {} entries into local index", snapshot.entries.len());
        Ok(Self {
            entries: snapshot.entries,
            dimension,
            hash: snapshot.hash,
        })
    }
}

/// Check `embedding` against the expected dimension, fixing it if unset.
fn check_dimension(dimension: &mut Option<usize>, embedding: &Embedding) -> IndexResult<()> {
    match *dimension {
        Some(expected) if expected != embedding.len() => Err(IndexError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        }),
        Some(_) => Ok(()),
        None => {
            *dimension = Some(embedding.len());
            Ok(())
        }
    }
}

impl RouteIndex for LocalIndex {
    fn read_hash(&self) -> IndexResult<StateHash> {
        Ok(self.hash.clone())
    }

    fn write_hash(&mut self, hash: StateHash) -> IndexResult<()> {
        debug!("Writing state hash {hash}");
        self.hash = hash;
        Ok(())
    }

    fn add(&mut self, batch: IndexBatch) -> IndexResult<()> {
        batch.check_aligned()?;

        // Validate everything before storing anything.
        let mut dimension = self.dimension;
        for embedding in &batch.embeddings {
            check_dimension(&mut dimension, embedding)?;
        }
        self.dimension = dimension;

        let count = batch.len();
        let entries = batch
            .embeddings
            .into_iter()
            .zip(batch.route_names)
            .zip(batch.utterances)
            .zip(batch.function_schemas)
            .zip(batch.metadata)
            .map(
                |((((embedding, route), utterance), function_schemas), metadata)| IndexEntry {
                    route,
                    utterance,
                    embedding,
                    function_schemas,
                    metadata,
                },
            );
        self.entries.extend(entries);

        debug!("Added {count} entries to local index");
        Ok(())
    }

    fn utterances(&self) -> IndexResult<Vec<Utterance>> {
        Ok(self
            .entries
            .iter()
            .map(|e| Utterance {
                route: e.route.clone(),
                utterance: e.utterance.clone(),
                function_schemas: e.function_schemas.clone(),
                metadata: e.metadata.clone(),
            })
            .collect())
    }
}
